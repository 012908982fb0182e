//! Shared test utilities for the telepress test suite.
//!
//! Recording doubles for the three seams the pipeline talks through, plus
//! image fixture generators:
//!
//! - [`MockHost`]: an [`ImageHost`] that records every upload and fails on
//!   demand, matched by file name.
//! - [`MockPublisher`]: a [`RemotePublisher`] that hands out sequential page
//!   paths, records creates and edits, and can be scripted to fail.
//! - [`RecordingPause`]: a [`Pause`] that remembers the requested waits
//!   instead of sleeping.
//!
//! All recorders use `Mutex` (not `RefCell`) so they are `Sync` and work
//! inside the rayon upload pool.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let host = MockHost::new().failing("3.jpg");
//! let publisher = MockPublisher::new().fail_creates(&["Flood control exceeded. Retry in 7 seconds"]);
//! let pause = Arc::new(RecordingPause::default());
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};

use crate::host::{BatchUrls, HostError, ImageHost};
use crate::node::Node;
use crate::retry::Pause;
use crate::telegraph::{CreatedPage, RemoteError, RemotePublisher};

// =========================================================================
// Image fixtures
// =========================================================================

/// Write a PNG of deterministic pseudo-random noise. Noise compresses badly,
/// so these files are large for their dimensions.
pub fn write_noise_png(path: &Path, width: u32, height: u32) {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xff) as u8
        };
        Rgb([next(), next(), next()])
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

/// Write an uncompressed single-color BMP.
pub fn write_solid_bmp(path: &Path, width: u32, height: u32, color: Rgb<u8>) {
    RgbImage::from_pixel(width, height, color)
        .save_with_format(path, ImageFormat::Bmp)
        .unwrap();
}

// =========================================================================
// Image host double
// =========================================================================

/// Records uploads as `(path, size at upload time)`.
#[derive(Default)]
pub struct MockHost {
    native: bool,
    fail_all: bool,
    /// Remaining failures per file name; `u32::MAX` fails forever.
    failures: Mutex<HashMap<String, u32>>,
    uploads: Mutex<Vec<(PathBuf, u64)>>,
    batches: Mutex<Vec<Vec<PathBuf>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise native batch support.
    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    /// Every upload of a file with this name fails.
    pub fn failing(self, file_name: &str) -> Self {
        self.failing_times(file_name, u32::MAX)
    }

    /// Every upload fails, whatever the file is called. Useful for temp
    /// files whose names are not known in advance.
    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// The first `times` uploads of a file with this name fail.
    pub fn failing_times(self, file_name: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(file_name.to_string(), times);
        self
    }

    pub fn uploads(&self) -> Vec<(PathBuf, u64)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<PathBuf>> {
        self.batches.lock().unwrap().clone()
    }

    fn should_fail(&self, name: &str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(name) {
            Some(0) | None => false,
            Some(n) if *n == u32::MAX => true,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

impl ImageHost for MockHost {
    fn name(&self) -> &str {
        "mock"
    }

    fn upload(&self, path: &Path) -> Result<String, HostError> {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        self.uploads.lock().unwrap().push((path.to_path_buf(), size));

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_all || self.should_fail(&name) {
            return Err(HostError::Failed {
                host: "mock",
                message: "simulated failure".into(),
            });
        }
        Ok(format!("https://img.test/{name}"))
    }

    fn supports_native_batch(&self) -> bool {
        self.native
    }

    fn upload_batch(&self, paths: &[PathBuf]) -> BatchUrls {
        self.batches.lock().unwrap().push(paths.to_vec());
        paths.iter().map(|p| (p.clone(), self.upload(p))).collect()
    }
}

// =========================================================================
// Remote publisher double
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEdit {
    pub path: String,
    pub title: String,
    pub content: Vec<Node>,
}

/// Hands out pages `page-1`, `page-2`, ... at `https://telegra.ph/page-N`.
#[derive(Default)]
pub struct MockPublisher {
    create_failures: Mutex<VecDeque<String>>,
    edit_failures: Mutex<HashMap<String, VecDeque<String>>>,
    create_calls: Mutex<usize>,
    created: Mutex<Vec<(String, Vec<Node>)>>,
    edits: Mutex<Vec<RecordedEdit>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next create calls fail with these messages, in order.
    pub fn fail_creates(self, messages: &[&str]) -> Self {
        self.create_failures
            .lock()
            .unwrap()
            .extend(messages.iter().map(|m| m.to_string()));
        self
    }

    /// The next edits of `path` fail with these messages, in order.
    pub fn fail_edits(self, path: &str, messages: &[&str]) -> Self {
        self.edit_failures
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .extend(messages.iter().map(|m| m.to_string()));
        self
    }

    /// Successful creations as `(title, content)`.
    pub fn created(&self) -> Vec<(String, Vec<Node>)> {
        self.created.lock().unwrap().clone()
    }

    /// Create calls including failed ones.
    pub fn create_calls(&self) -> usize {
        *self.create_calls.lock().unwrap()
    }

    /// Successful edits.
    pub fn edits(&self) -> Vec<RecordedEdit> {
        self.edits.lock().unwrap().clone()
    }
}

impl RemotePublisher for MockPublisher {
    fn create_page(&self, title: &str, content: &[Node]) -> Result<CreatedPage, RemoteError> {
        *self.create_calls.lock().unwrap() += 1;
        if let Some(message) = self.create_failures.lock().unwrap().pop_front() {
            return Err(RemoteError::Api(message));
        }
        let mut created = self.created.lock().unwrap();
        created.push((title.to_string(), content.to_vec()));
        let path = format!("page-{}", created.len());
        Ok(CreatedPage {
            url: format!("https://telegra.ph/{path}"),
            path,
        })
    }

    fn edit_page(&self, path: &str, title: &str, content: &[Node]) -> Result<(), RemoteError> {
        if let Some(queue) = self.edit_failures.lock().unwrap().get_mut(path)
            && let Some(message) = queue.pop_front()
        {
            return Err(RemoteError::Api(message));
        }
        self.edits.lock().unwrap().push(RecordedEdit {
            path: path.to_string(),
            title: title.to_string(),
            content: content.to_vec(),
        });
        Ok(())
    }
}

// =========================================================================
// Pause double
// =========================================================================

#[derive(Default)]
pub struct RecordingPause {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}
