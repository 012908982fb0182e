//! Upload orchestration: compression, per-item retry, bounded parallelism.
//!
//! [`Uploader`] wraps any [`ImageHost`] and adds everything a single host
//! call lacks:
//!
//! 1. **Compression**: oversized images are shrunk into a temp file first
//!    (see [`crate::imaging::compress`]). Conversion failures are final and
//!    never retried; the temp file is deleted on every exit path because it
//!    lives in a `TempPath`.
//! 2. **Retry**: up to `retries` attempts with capped exponential backoff
//!    plus jitter.
//! 3. **Batching**: [`Uploader::upload_batch`] fans out over a rayon pool of
//!    `max_workers` threads. Workers send results through a channel to the
//!    calling thread, which is the only place the aggregate is mutated and the
//!    only place the progress callback runs. Results are therefore in
//!    completion order, and `completed` in the callback only ever increases.
//!
//! Hosts that advertise a native bulk path (rclone) get every compressed file
//! in one [`ImageHost::upload_batch`] call instead of the pool.
//!
//! A batch never fails as a whole: every input path produces exactly one
//! [`UploadResult`], and `total == results.len() == successful + failed`.

use crate::host::{HostError, ImageHost};
use crate::imaging::{CompressOptions, Compressed, ConversionError, OutputCodec, Quality, compress};
use crate::retry::{Backoff, Pause, ThreadPause};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

/// Progress callback: `(completed, total, latest result)`.
pub type Progress<'a> = &'a dyn Fn(usize, usize, &UploadResult);

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("image conversion failed: {0}")]
    Conversion(#[from] ConversionError),
    #[error("upload of {} failed after {attempts} attempts: {source}", path.display())]
    Exhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: HostError,
    },
}

/// An input file accepted for upload, with its size at queue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub path: PathBuf,
    pub size: u64,
}

impl UploadItem {
    /// Fails with [`UploadError::NotFound`] unless `path` is a regular file.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Self {
                path: path.to_path_buf(),
                size: meta.len(),
            }),
            _ => Err(UploadError::NotFound(path.to_path_buf())),
        }
    }
}

/// Outcome for one input path. `url` is set exactly when `success` is.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub path: PathBuf,
    pub url: Option<String>,
    pub error: Option<String>,
    pub success: bool,
    pub compressed: bool,
    pub attempts: u32,
}

impl UploadResult {
    fn succeeded(path: &Path, url: String, compressed: bool, attempts: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            url: Some(url),
            error: None,
            success: true,
            compressed,
            attempts,
        }
    }

    fn failed(path: &Path, error: impl Into<String>, compressed: bool, attempts: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            url: None,
            error: Some(error.into()),
            success: false,
            compressed,
            attempts,
        }
    }

    fn skipped(path: &Path) -> Self {
        Self::failed(path, "skipped after an earlier failure", false, 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchUploadResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<UploadResult>,
}

impl BatchUploadResult {
    pub fn from_results(results: Vec<UploadResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    /// Paths whose upload failed, in result order.
    pub fn failed_paths(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.path.clone())
            .collect()
    }

    /// Original path to public URL, successful entries only.
    pub fn url_map(&self) -> HashMap<PathBuf, String> {
        self.results
            .iter()
            .filter_map(|r| r.url.as_ref().map(|u| (r.path.clone(), u.clone())))
            .collect()
    }

    /// Fraction of successful uploads in `[0, 1]`; zero for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub retries: u32,
    pub auto_compress: bool,
    pub max_size: u64,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub max_workers: usize,
    pub codec: OutputCodec,
    pub min_quality: Quality,
    pub min_scale: f32,
}

impl Default for UploadOptions {
    fn default() -> Self {
        let compress = CompressOptions::default();
        Self {
            retries: 3,
            auto_compress: true,
            max_size: 5 * 1024 * 1024,
            retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            max_workers: 4,
            codec: compress.codec,
            min_quality: compress.min_quality,
            min_scale: compress.min_scale,
        }
    }
}

impl UploadOptions {
    pub fn compress_options(&self) -> CompressOptions {
        CompressOptions {
            codec: self.codec,
            min_quality: self.min_quality,
            min_scale: self.min_scale,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.retry_delay, self.max_retry_delay)
    }
}

/// Result of one full upload attempt sequence, before it is reported.
struct Attempted {
    result: Result<String, UploadError>,
    compressed: bool,
    attempts: u32,
}

pub struct Uploader<H: ImageHost> {
    host: H,
    options: UploadOptions,
    pause: Box<dyn Pause>,
}

impl<H: ImageHost> Uploader<H> {
    pub fn new(host: H, options: UploadOptions) -> Self {
        Self {
            host,
            options,
            pause: Box::new(ThreadPause),
        }
    }

    /// Replace how backoff waits are spent.
    pub fn with_pause(mut self, pause: Box<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload one file and return its public URL.
    pub fn upload(&self, path: &Path) -> Result<String, UploadError> {
        self.attempt(path).result
    }

    /// Like [`upload`](Self::upload), but never fails.
    pub fn upload_safe(&self, path: &Path) -> UploadResult {
        let Attempted {
            result,
            compressed,
            attempts,
        } = self.attempt(path);
        match result {
            Ok(url) => UploadResult::succeeded(path, url, compressed, attempts),
            Err(e) => UploadResult::failed(path, e.to_string(), compressed, attempts),
        }
    }

    /// Upload many files, one result per path.
    ///
    /// With `stop_on_error`, the first failure stops tasks that have not
    /// started yet; they are recorded as skipped failures. Uploads already
    /// in flight run to completion.
    pub fn upload_batch(
        &self,
        paths: &[PathBuf],
        progress: Option<Progress<'_>>,
        stop_on_error: bool,
    ) -> BatchUploadResult {
        if paths.is_empty() {
            return BatchUploadResult::default();
        }
        if self.host.supports_native_batch() {
            return self.native_batch(paths, progress);
        }

        let total = paths.len();
        let mut collector = Collector::new(total, progress);
        let stop = AtomicBool::new(false);

        let run_one = |path: &PathBuf| -> UploadResult {
            if stop_on_error && stop.load(Ordering::SeqCst) {
                return UploadResult::skipped(path);
            }
            let result = self.upload_safe(path);
            if stop_on_error && !result.success {
                stop.store(true, Ordering::SeqCst);
            }
            result
        };

        let workers = self.options.max_workers.max(1);
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("telepress-upload-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "cannot start upload pool, uploading sequentially");
                for path in paths {
                    collector.push(run_one(path));
                }
                return collector.finish();
            }
        };

        let (tx, rx) = mpsc::channel::<UploadResult>();
        std::thread::scope(|s| {
            let run_one = &run_one;
            let pool = &pool;
            s.spawn(move || {
                pool.scope_fifo(|scope| {
                    for path in paths {
                        let tx = tx.clone();
                        scope.spawn_fifo(move |_| {
                            let _ = tx.send(run_one(path));
                        });
                    }
                });
                drop(tx);
            });
            for result in rx {
                collector.push(result);
            }
        });

        collector.finish()
    }

    /// Upload again every path that failed in `previous`.
    pub fn retry_failed(
        &self,
        previous: &BatchUploadResult,
        progress: Option<Progress<'_>>,
    ) -> BatchUploadResult {
        let failed = previous.failed_paths();
        if failed.is_empty() {
            return BatchUploadResult::default();
        }
        tracing::info!(count = failed.len(), "retrying failed uploads");
        self.upload_batch(&failed, progress, false)
    }

    fn attempt(&self, path: &Path) -> Attempted {
        let item = match UploadItem::from_path(path) {
            Ok(item) => item,
            Err(e) => {
                return Attempted {
                    result: Err(e),
                    compressed: false,
                    attempts: 0,
                };
            }
        };
        let prepared = match self.prepare(&item) {
            Ok(p) => p,
            Err(e) => {
                return Attempted {
                    result: Err(e.into()),
                    compressed: false,
                    attempts: 0,
                };
            }
        };
        let compressed = prepared.was_compressed();
        let retries = self.options.retries.max(1);
        let backoff = self.options.backoff();

        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.host.upload(prepared.path()) {
                Ok(url) => break Ok(url),
                Err(e) => {
                    let final_error = matches!(e, HostError::NotFound(_) | HostError::Config { .. });
                    if final_error || attempts >= retries {
                        break Err(UploadError::Exhausted {
                            path: path.to_path_buf(),
                            attempts,
                            source: e,
                        });
                    }
                    let wait = backoff.delay(attempts - 1);
                    tracing::warn!(
                        path = %path.display(),
                        attempt = attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "upload failed, retrying"
                    );
                    self.pause.pause(wait);
                }
            }
        };

        Attempted {
            result,
            compressed,
            attempts,
        }
    }

    fn prepare(&self, item: &UploadItem) -> Result<Compressed, ConversionError> {
        if !self.options.auto_compress || item.size <= self.options.max_size {
            return Ok(Compressed::Original(item.path.clone()));
        }
        compress(&item.path, self.options.max_size, &self.options.compress_options())
    }

    fn native_batch(&self, paths: &[PathBuf], progress: Option<Progress<'_>>) -> BatchUploadResult {
        let mut slots: Vec<Option<UploadResult>> = vec![None; paths.len()];
        let mut prepared: Vec<(usize, Compressed)> = Vec::new();

        for (i, path) in paths.iter().enumerate() {
            let item = match UploadItem::from_path(path) {
                Ok(item) => item,
                Err(err) => {
                    slots[i] = Some(UploadResult::failed(path, err.to_string(), false, 0));
                    continue;
                }
            };
            match self.prepare(&item) {
                Ok(c) => prepared.push((i, c)),
                Err(e) => {
                    let err = UploadError::from(e);
                    slots[i] = Some(UploadResult::failed(path, err.to_string(), false, 0));
                }
            }
        }

        if !prepared.is_empty() {
            let upload_paths: Vec<PathBuf> = prepared
                .iter()
                .map(|(_, c)| c.path().to_path_buf())
                .collect();
            tracing::debug!(host = self.host.name(), count = upload_paths.len(), "native batch upload");
            let urls: HashMap<PathBuf, Result<String, String>> = self
                .host
                .upload_batch(&upload_paths)
                .into_iter()
                .map(|(k, v)| (k, v.map_err(|e| e.to_string())))
                .collect();

            for (i, c) in &prepared {
                let original = &paths[*i];
                let result = match urls.get(c.path()) {
                    Some(Ok(url)) => UploadResult::succeeded(original, url.clone(), c.was_compressed(), 1),
                    Some(Err(e)) => UploadResult::failed(original, e.clone(), c.was_compressed(), 1),
                    None => UploadResult::failed(original, "host returned no result", c.was_compressed(), 1),
                };
                slots[*i] = Some(result);
            }
        }
        drop(prepared);

        let mut collector = Collector::new(paths.len(), progress);
        for (slot, path) in slots.into_iter().zip(paths) {
            collector.push(slot.unwrap_or_else(|| UploadResult::failed(path, "not uploaded", false, 0)));
        }
        collector.finish()
    }
}

/// Single-threaded aggregate of a batch, fed in completion order.
struct Collector<'a> {
    total: usize,
    results: Vec<UploadResult>,
    progress: Option<Progress<'a>>,
}

impl<'a> Collector<'a> {
    fn new(total: usize, progress: Option<Progress<'a>>) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
            progress,
        }
    }

    fn push(&mut self, result: UploadResult) {
        if !result.success {
            tracing::warn!(
                path = %result.path.display(),
                error = result.error.as_deref().unwrap_or(""),
                "upload failed"
            );
        }
        self.results.push(result);
        if let Some(cb) = self.progress {
            let completed = self.results.len();
            let latest = &self.results[completed - 1];
            if catch_unwind(AssertUnwindSafe(|| cb(completed, self.total, latest))).is_err() {
                tracing::warn!("progress callback panicked; ignoring");
            }
        }
    }

    fn finish(self) -> BatchUploadResult {
        BatchUploadResult::from_results(self.results)
    }
}
