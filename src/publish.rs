//! Publishing entry points.
//!
//! [`Publisher`] routes a file to the right pipeline and owns the pieces
//! each pipeline needs:
//!
//! ```text
//! publish(path)
//!   ├── .zip          → publish_gallery   extract → collect → upload per page ─┐
//!   ├── image ext     → publish_image     upload → one page                     ├→ PublishSession
//!   └── text ext      → publish_markdown_file → publish_text                   │   (create, then link)
//!                          cache lookup → chunk → convert ─────────────────────┘
//! ```
//!
//! Only whole text documents go through the fingerprint cache. Progress and
//! non-fatal problems (failed uploads, missing navigation) are reported to a
//! [`PublishObserver`]; the library itself never prints.

use crate::archive::{self, ArchiveError, IMAGE_EXTENSIONS};
use crate::cache::{PublishCacheStore, fingerprint};
use crate::chunk::chunk;
use crate::convert::{Converter, MarkdownConverter};
use crate::config::{ConfigError, TelepressConfig};
use crate::host::{HostError, ImageHost, NoHost};
use crate::imaging::ConversionError;
use crate::node::Node;
use crate::session::{LinkReport, PublishSession, SessionError};
use crate::telegraph::{RemoteError, RemotePublisher, TelegraphClient};
use crate::upload::{UploadError, UploadResult, Uploader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Text file extensions (lowercase, no dot).
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "rst", "text"];
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];
/// Upper bound on any input file.
pub const MAX_FILE_SIZE: u64 = 2048 * 1024 * 1024;
/// Text bytes per page. Converted nodes roughly double in size and the
/// service caps a page near 64KB.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_IMAGES_PER_PAGE: usize = 100;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("{0}")]
    Validation(String),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Image conversion failed: {0}")]
    Conversion(ConversionError),
    #[error("Upload failed: {0}")]
    Upload(UploadError),
    #[error("Security error: {0}")]
    Security(String),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for PublishError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::NotFound(path) => PublishError::NotFound(path),
            UploadError::Conversion(c) => PublishError::Conversion(c),
            other => PublishError::Upload(other),
        }
    }
}

impl From<ArchiveError> for PublishError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Security(name) => {
                PublishError::Security(format!("Zip Slip attempt detected: {name}"))
            }
            ArchiveError::Invalid(_) => PublishError::Validation("Invalid zip file".to_string()),
            ArchiveError::Io(io) => PublishError::Io(io),
        }
    }
}

/// Hooks for progress and non-fatal problems. Every method defaults to a
/// no-op.
pub trait PublishObserver {
    /// A gallery page's uploads are starting.
    fn part_started(&self, _part: usize, _total: usize, _images: usize) {}

    fn upload_progress(&self, _completed: usize, _total: usize) {}

    /// Uploads that failed and were left out of the page, as `(path, error)`.
    fn upload_failures(&self, _failures: &[(PathBuf, String)]) {}

    fn duplicate(&self, _url: &str) {}

    fn links_done(&self, _report: &LinkReport) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PublishObserver for NoopObserver {}

impl<T: PublishObserver + ?Sized> PublishObserver for Arc<T> {
    fn part_started(&self, part: usize, total: usize, images: usize) {
        (**self).part_started(part, total, images)
    }

    fn upload_progress(&self, completed: usize, total: usize) {
        (**self).upload_progress(completed, total)
    }

    fn upload_failures(&self, failures: &[(PathBuf, String)]) {
        (**self).upload_failures(failures)
    }

    fn duplicate(&self, url: &str) {
        (**self).duplicate(url)
    }

    fn links_done(&self, report: &LinkReport) {
        (**self).links_done(report)
    }
}

pub struct Publisher<H: ImageHost, P: RemotePublisher> {
    uploader: Uploader<H>,
    session: PublishSession<P>,
    converter: Box<dyn Converter>,
    /// `Some` enables duplicate detection.
    cache: Option<Box<dyn PublishCacheStore>>,
    observer: Box<dyn PublishObserver>,
    chunk_size: usize,
    images_per_page: usize,
}

impl<H: ImageHost, P: RemotePublisher> Publisher<H, P> {
    pub fn new(uploader: Uploader<H>, session: PublishSession<P>) -> Self {
        Self {
            uploader,
            session,
            converter: Box::new(MarkdownConverter),
            cache: None,
            observer: Box::new(NoopObserver),
            chunk_size: DEFAULT_CHUNK_SIZE,
            images_per_page: DEFAULT_IMAGES_PER_PAGE,
        }
    }

    pub fn with_converter(mut self, converter: Box<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    /// Enable duplicate detection backed by `store`.
    pub fn with_cache(mut self, store: Box<dyn PublishCacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn PublishObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn with_images_per_page(mut self, count: usize) -> Self {
        self.images_per_page = count.max(1);
        self
    }

    pub fn uploader(&self) -> &Uploader<H> {
        &self.uploader
    }

    pub fn session(&self) -> &PublishSession<P> {
        &self.session
    }

    /// Publish a file, choosing the pipeline by extension. `title` defaults
    /// to the file stem.
    pub fn publish(&self, path: &Path, title: Option<&str>) -> Result<String, PublishError> {
        if !path.exists() {
            return Err(PublishError::NotFound(path.to_path_buf()));
        }
        validate_size(std::fs::metadata(path)?.len(), MAX_FILE_SIZE)?;

        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
            self.publish_gallery(path, &title)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            self.publish_image(path, &title)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            self.publish_markdown_file(path, &title)
        } else {
            Err(PublishError::Validation(format!(
                "Unsupported file type: '.{ext}'. Supported formats: {}",
                supported_extensions().join(", ")
            )))
        }
    }

    /// Publish a text file. The file must be UTF-8.
    pub fn publish_markdown_file(&self, path: &Path, title: &str) -> Result<String, PublishError> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|_| {
            PublishError::Validation(
                "Cannot read file as text. File may be binary (PDF, DOCX, etc.). \
                 Only plain text files (.txt, .md) are supported."
                    .to_string(),
            )
        })?;
        self.publish_text(&content, title)
    }

    /// Publish Markdown or plain text, split across as many pages as needed.
    pub fn publish_text(&self, content: &str, title: &str) -> Result<String, PublishError> {
        if content.trim().is_empty() {
            return Err(PublishError::Validation(
                "File is empty or contains only whitespace".to_string(),
            ));
        }

        let key = fingerprint(content, title);
        let mut cache = None;
        if let Some(store) = &self.cache {
            let loaded = store.load();
            if let Some(url) = loaded.lookup(&key) {
                tracing::info!(url, "skipping duplicate content");
                self.observer.duplicate(url);
                return Ok(url.to_string());
            }
            cache = Some(loaded);
        }

        let chunks = chunk(content, self.chunk_size);
        if chunks.len() > 1 {
            tracing::info!(bytes = content.len(), parts = chunks.len(), "splitting text");
        }
        let parts = chunks
            .iter()
            .map(|c| self.converter.convert(&c.text))
            .collect();
        let outcome = self.session.publish_parts(title, parts)?;
        self.observer.links_done(&outcome.links);

        if let (Some(store), Some(mut cache)) = (&self.cache, cache) {
            cache.store(key, outcome.url.clone());
            if let Err(e) = store.save(&cache) {
                tracing::warn!(error = %e, "could not save publish cache");
            }
        }
        Ok(outcome.url)
    }

    /// Upload one image and publish a page showing it.
    pub fn publish_image(&self, path: &Path, title: &str) -> Result<String, PublishError> {
        let url = self.uploader.upload(path)?;
        let outcome = self
            .session
            .publish_parts(title, vec![vec![Node::image(&url)]])?;
        Ok(outcome.url)
    }

    /// Publish every image in a zip as a paged gallery.
    pub fn publish_gallery(&self, zip_path: &Path, title: &str) -> Result<String, PublishError> {
        let staging = tempfile::Builder::new()
            .prefix("telepress-gallery-")
            .tempdir()?;
        archive::extract_zip(zip_path, staging.path())?;

        let images = archive::collect_images(staging.path());
        if images.is_empty() {
            return Err(PublishError::Validation(
                "No images found in zip file".to_string(),
            ));
        }

        let groups: Vec<&[PathBuf]> = images.chunks(self.images_per_page).collect();
        let total = groups.len();
        if total > 1 {
            tracing::info!(images = images.len(), pages = total, "splitting gallery");
        }

        let progress = |done: usize, all: usize, _: &UploadResult| {
            self.observer.upload_progress(done, all);
        };
        let mut parts = Vec::with_capacity(total);
        for (i, group) in groups.iter().enumerate() {
            self.observer.part_started(i + 1, total, group.len());
            let batch = self.uploader.upload_batch(group, Some(&progress), false);

            let failures: Vec<(PathBuf, String)> = batch
                .results
                .iter()
                .filter(|r| !r.success)
                .map(|r| {
                    let error = r.error.clone().unwrap_or_else(|| "Unknown error".to_string());
                    (r.path.clone(), error)
                })
                .collect();
            if !failures.is_empty() {
                self.observer.upload_failures(&failures);
            }

            let urls = batch.url_map();
            let content: Vec<Node> = group
                .iter()
                .filter_map(|p| urls.get(p))
                .map(|u| Node::image(u))
                .collect();
            if content.is_empty() {
                tracing::warn!(part = i + 1, "gallery page has no uploaded images");
            }
            parts.push(content);
        }

        let outcome = self.session.publish_parts(title, parts)?;
        self.observer.links_done(&outcome.links);
        Ok(outcome.url)
    }

    /// Publish a gallery of already-hosted images.
    pub fn publish_image_urls(&self, urls: &[String], title: &str) -> Result<String, PublishError> {
        if urls.is_empty() {
            return Err(PublishError::Validation("No image URLs provided".to_string()));
        }
        let parts = urls
            .chunks(self.images_per_page)
            .map(|group| group.iter().map(|u| Node::image(u)).collect())
            .collect();
        let outcome = self.session.publish_parts(title, parts)?;
        self.observer.links_done(&outcome.links);
        Ok(outcome.url)
    }
}

/// Errors assembling a [`Publisher`] from configuration.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("cannot create Telegraph client: {0}")]
    Client(#[from] RemoteError),
}

/// A publisher wired to a real Telegraph account and configured host.
pub type ConfiguredPublisher = Publisher<Box<dyn ImageHost>, TelegraphClient>;

impl ConfiguredPublisher {
    /// Build a publisher from `config`.
    ///
    /// `token` overrides the configured access token. The image host is only
    /// built when `with_images` is set; text publishing runs against
    /// [`NoHost`] and needs no `[image_host]` section. Duplicate detection
    /// follows `publish.skip_duplicate` unless `dedup` is false.
    pub fn from_config(
        config: &TelepressConfig,
        token: Option<&str>,
        with_images: bool,
        dedup: bool,
    ) -> Result<Self, SetupError> {
        let host: Box<dyn ImageHost> = if with_images {
            Box::new(config.image_host()?.build()?)
        } else {
            Box::new(NoHost)
        };
        let token = match token {
            Some(t) => t,
            None => config.access_token()?,
        };
        let client = TelegraphClient::new(token, config.telegraph.author_name.as_deref())?;
        let uploader = Uploader::new(host, config.upload.to_options());
        let mut publisher = Publisher::new(uploader, PublishSession::new(client))
            .with_chunk_size(config.publish.chunk_size)
            .with_images_per_page(config.publish.images_per_page);
        if dedup && let Some(store) = config.publish.cache_store() {
            tracing::debug!(path = %store.path().display(), "duplicate detection enabled");
            publisher = publisher.with_cache(Box::new(store));
        }
        Ok(publisher)
    }
}

/// Whether publishing `path` uploads images, judging by its extension.
pub fn uses_images(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS.contains(&ext.as_str()) || ARCHIVE_EXTENSIONS.contains(&ext.as_str())
        })
}

fn validate_size(size: u64, max: u64) -> Result<(), PublishError> {
    if size > max {
        let mb = |b: u64| b as f64 / 1024.0 / 1024.0;
        return Err(PublishError::Validation(format!(
            "File too large (Size: {:.2}MB, Max: {:.0}MB)",
            mb(size),
            mb(max)
        )));
    }
    Ok(())
}

/// Every accepted extension, dotted and sorted.
pub fn supported_extensions() -> Vec<String> {
    let mut all: Vec<String> = TEXT_EXTENSIONS
        .iter()
        .chain(IMAGE_EXTENSIONS)
        .chain(ARCHIVE_EXTENSIONS)
        .map(|e| format!(".{e}"))
        .collect();
    all.sort();
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::test_helpers::{MockHost, MockPublisher, RecordingPause};
    use crate::upload::UploadOptions;
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    #[derive(Default)]
    struct RecordingObserver {
        failures: Mutex<Vec<(PathBuf, String)>>,
        duplicates: Mutex<Vec<String>>,
        parts: Mutex<Vec<(usize, usize, usize)>>,
        last_progress: Mutex<Option<(usize, usize)>>,
    }

    impl PublishObserver for RecordingObserver {
        fn part_started(&self, part: usize, total: usize, images: usize) {
            self.parts.lock().unwrap().push((part, total, images));
        }
        fn upload_progress(&self, completed: usize, total: usize) {
            *self.last_progress.lock().unwrap() = Some((completed, total));
        }
        fn upload_failures(&self, failures: &[(PathBuf, String)]) {
            self.failures.lock().unwrap().extend_from_slice(failures);
        }
        fn duplicate(&self, url: &str) {
            self.duplicates.lock().unwrap().push(url.to_string());
        }
    }

    fn publisher(host: MockHost, remote: &MockPublisher) -> Publisher<MockHost, &MockPublisher> {
        let pause = Arc::new(RecordingPause::default());
        let uploader =
            Uploader::new(host, UploadOptions::default()).with_pause(Box::new(pause.clone()));
        let session = PublishSession::new(remote).with_pause(Box::new(pause));
        Publisher::new(uploader, session)
    }

    fn make_zip(path: &Path, names: &[&str]) {
        let mut w = zip::ZipWriter::new(File::create(path).unwrap());
        for name in names {
            w.start_file(*name, SimpleFileOptions::default()).unwrap();
            w.write_all(b"image bytes").unwrap();
        }
        w.finish().unwrap();
    }

    fn srcs(content: &[Node]) -> Vec<String> {
        content
            .iter()
            .filter_map(|n| n.attr("src"))
            .map(|s| s.rsplit('/').next().unwrap().to_string())
            .collect()
    }

    // =========================================================================
    // Text publishing
    // =========================================================================

    #[test]
    fn identical_publish_is_served_from_cache() {
        let remote = MockPublisher::new();
        let store = Arc::new(MemoryCacheStore::new());
        let p = publisher(MockHost::new(), &remote).with_cache(Box::new(store.clone()));

        let first = p.publish_text("# Hello\n\nWorld", "Greeting").unwrap();
        let second = p.publish_text("# Hello\n\nWorld", "Greeting").unwrap();

        assert_eq!(first, second);
        assert_eq!(remote.create_calls(), 1);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn observer_hears_about_duplicates() {
        let remote = MockPublisher::new();
        let observer = Arc::new(RecordingObserver::default());
        let p = publisher(MockHost::new(), &remote)
            .with_cache(Box::new(MemoryCacheStore::new()))
            .with_observer(Box::new(observer.clone()));

        let url = p.publish_text("text", "T").unwrap();
        p.publish_text("text", "T").unwrap();
        assert_eq!(*observer.duplicates.lock().unwrap(), vec![url]);
    }

    #[test]
    fn without_cache_every_publish_creates_pages() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);
        p.publish_text("same", "T").unwrap();
        p.publish_text("same", "T").unwrap();
        assert_eq!(remote.create_calls(), 2);
    }

    #[test]
    fn same_text_new_title_is_new_document() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote).with_cache(Box::new(MemoryCacheStore::new()));
        p.publish_text("same", "One").unwrap();
        p.publish_text("same", "Two").unwrap();
        assert_eq!(remote.create_calls(), 2);
    }

    #[test]
    fn single_chunk_is_not_linked() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);
        p.publish_text("short text", "T").unwrap();
        assert_eq!(remote.created().len(), 1);
        assert!(remote.edits().is_empty());
    }

    #[test]
    fn two_chunks_link_each_other() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote).with_chunk_size(20);
        p.publish_text("first line is here\nsecond line here\n", "T")
            .unwrap();

        let edits = remote.edits();
        assert_eq!(edits.len(), 2);
        assert!(crate::node::hrefs(&edits[0].content).contains(&"https://telegra.ph/page-2"));
        assert!(crate::node::hrefs(&edits[1].content).contains(&"https://telegra.ph/page-1"));
    }

    #[test]
    fn long_text_becomes_thirteen_linked_pages() {
        let line = format!("{}\n", "x".repeat(99));
        let text = line.repeat(2500);
        assert_eq!(text.len(), 250_000);

        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote).with_chunk_size(20_000);
        let url = p.publish_text(&text, "Novel").unwrap();

        assert_eq!(url, "https://telegra.ph/page-1");
        let titles: Vec<String> = remote.created().into_iter().map(|(t, _)| t).collect();
        assert_eq!(titles.len(), 13);
        for (k, t) in titles.iter().enumerate() {
            assert_eq!(t, &format!("Novel ({}/13)", k + 1));
        }
        assert_eq!(remote.edits().len(), 13);
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);
        let err = p.publish_text("  \n\t ", "T").unwrap_err();
        assert!(matches!(err, PublishError::Validation(_)));
        assert_eq!(remote.create_calls(), 0);
    }

    #[test]
    fn failed_publish_is_not_cached() {
        let remote = MockPublisher::new().fail_creates(&["x"; 5]);
        let store = Arc::new(MemoryCacheStore::new());
        let p = publisher(MockHost::new(), &remote).with_cache(Box::new(store.clone()));

        assert!(matches!(
            p.publish_text("text", "T"),
            Err(PublishError::Session(_))
        ));
        assert_eq!(store.saves(), 0);
    }

    /// Loads empty and refuses every save.
    #[derive(Default)]
    struct ReadOnlyStore {
        save_attempts: Mutex<usize>,
    }

    impl PublishCacheStore for ReadOnlyStore {
        fn load(&self) -> crate::cache::PublishCache {
            crate::cache::PublishCache::default()
        }

        fn save(&self, _: &crate::cache::PublishCache) -> std::io::Result<()> {
            *self.save_attempts.lock().unwrap() += 1;
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only cache",
            ))
        }
    }

    #[test]
    fn cache_save_failure_does_not_fail_publish() {
        let remote = MockPublisher::new();
        let store = Arc::new(ReadOnlyStore::default());
        let p = publisher(MockHost::new(), &remote).with_cache(Box::new(store.clone()));

        let url = p.publish_text("Some text", "T").unwrap();
        assert_eq!(url, "https://telegra.ph/page-1");
        assert_eq!(*store.save_attempts.lock().unwrap(), 1);

        // Nothing was remembered, so the same text publishes again.
        p.publish_text("Some text", "T").unwrap();
        assert_eq!(remote.create_calls(), 2);
    }

    // =========================================================================
    // Configured publisher
    // =========================================================================

    #[test]
    fn from_config_requires_a_token() {
        let config = TelepressConfig::default();
        let err = ConfiguredPublisher::from_config(&config, None, false, false)
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::Config(_)));
        assert!(err.to_string().contains("TELEPRESS_TOKEN"), "{err}");
    }

    #[test]
    fn from_config_token_override_and_text_needs_no_host() {
        let config = TelepressConfig::default();
        let p = ConfiguredPublisher::from_config(&config, Some("request-token"), false, false)
            .unwrap();
        assert_eq!(p.uploader().host().name(), "none");
    }

    #[test]
    fn from_config_images_need_a_host() {
        let mut config = TelepressConfig::default();
        config.telegraph.access_token = Some("t".into());
        let err = ConfiguredPublisher::from_config(&config, None, true, false)
            .err()
            .unwrap();
        assert!(err.to_string().contains("directory | rclone | custom"), "{err}");
    }

    // =========================================================================
    // File routing
    // =========================================================================

    #[test]
    fn missing_file() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);
        let err = p.publish(Path::new("/no/such/file.md"), None).unwrap_err();
        assert!(matches!(err, PublishError::NotFound(_)));
    }

    #[test]
    fn unsupported_extension_lists_formats() {
        let tmp = TempDir::new().unwrap();
        let pdf = tmp.path().join("doc.pdf");
        fs::write(&pdf, b"%PDF").unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        let msg = p.publish(&pdf, None).unwrap_err().to_string();
        assert!(msg.starts_with("Unsupported file type: '.pdf'"), "{msg}");
        assert!(msg.contains(".md") && msg.contains(".zip") && msg.contains(".webp"));
    }

    #[test]
    fn text_file_title_defaults_to_stem() {
        let tmp = TempDir::new().unwrap();
        let md = tmp.path().join("My Notes.MD");
        fs::write(&md, "hello").unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        p.publish(&md, None).unwrap();
        assert_eq!(remote.created()[0].0, "My Notes");
    }

    #[test]
    fn explicit_title_wins() {
        let tmp = TempDir::new().unwrap();
        let txt = tmp.path().join("a.txt");
        fs::write(&txt, "hello").unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        p.publish(&txt, Some("Chosen")).unwrap();
        assert_eq!(remote.created()[0].0, "Chosen");
    }

    #[test]
    fn binary_text_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let txt = tmp.path().join("a.txt");
        fs::write(&txt, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        let msg = p.publish(&txt, None).unwrap_err().to_string();
        assert!(msg.starts_with("Cannot read file as text"));
    }

    #[test]
    fn image_and_zip_inputs_use_images() {
        assert!(uses_images(Path::new("a.JPG")));
        assert!(uses_images(Path::new("album.zip")));
        assert!(!uses_images(Path::new("notes.md")));
        assert!(!uses_images(Path::new("README")));
    }

    #[test]
    fn size_limit() {
        assert!(validate_size(10, 10).is_ok());
        let msg = validate_size(3 * 1024 * 1024, 2 * 1024 * 1024)
            .unwrap_err()
            .to_string();
        assert_eq!(msg, "File too large (Size: 3.00MB, Max: 2MB)");
    }

    // =========================================================================
    // Images and galleries
    // =========================================================================

    #[test]
    fn image_becomes_single_page() {
        let tmp = TempDir::new().unwrap();
        let img = tmp.path().join("cat.jpg");
        fs::write(&img, b"jpeg").unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        let url = p.publish(&img, None).unwrap();
        assert_eq!(url, "https://telegra.ph/page-1");
        let (title, content) = &remote.created()[0];
        assert_eq!(title, "cat");
        assert_eq!(content, &vec![Node::image("https://img.test/cat.jpg")]);
    }

    #[test]
    fn failed_image_upload_is_an_upload_error() {
        let tmp = TempDir::new().unwrap();
        let img = tmp.path().join("cat.jpg");
        fs::write(&img, b"jpeg").unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new().failing("cat.jpg"), &remote);

        assert!(matches!(
            p.publish(&img, None),
            Err(PublishError::Upload(UploadError::Exhausted { .. }))
        ));
        assert_eq!(remote.create_calls(), 0);
    }

    #[test]
    fn gallery_skips_failed_uploads_and_keeps_order() {
        let tmp = TempDir::new().unwrap();
        let zip = tmp.path().join("album.zip");
        make_zip(&zip, &["5.jpg", "1.jpg", "3.jpg", "10.jpg", "2.jpg"]);
        let remote = MockPublisher::new();
        let observer = Arc::new(RecordingObserver::default());
        let p = publisher(MockHost::new().failing("3.jpg"), &remote)
            .with_observer(Box::new(observer.clone()));

        p.publish(&zip, None).unwrap();

        let (title, content) = &remote.created()[0];
        assert_eq!(title, "album");
        assert_eq!(srcs(content), vec!["1.jpg", "2.jpg", "5.jpg", "10.jpg"]);

        let failures = observer.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].0.ends_with("3.jpg"));
        assert_eq!(*observer.last_progress.lock().unwrap(), Some((5, 5)));
    }

    #[test]
    fn gallery_is_paged_and_linked() {
        let tmp = TempDir::new().unwrap();
        let zip = tmp.path().join("album.zip");
        make_zip(&zip, &["1.png", "2.png", "3.png", "4.png", "5.png"]);
        let remote = MockPublisher::new();
        let observer = Arc::new(RecordingObserver::default());
        let p = publisher(MockHost::new(), &remote)
            .with_images_per_page(2)
            .with_observer(Box::new(observer.clone()));

        p.publish_gallery(&zip, "Trip").unwrap();

        let created = remote.created();
        assert_eq!(created.len(), 3);
        assert_eq!(created[2].0, "Trip (3/3)");
        assert_eq!(srcs(&created[2].1), vec!["5.png"]);
        assert_eq!(remote.edits().len(), 3);
        assert_eq!(
            *observer.parts.lock().unwrap(),
            vec![(1, 3, 2), (2, 3, 2), (3, 3, 1)]
        );
    }

    #[test]
    fn gallery_without_images() {
        let tmp = TempDir::new().unwrap();
        let zip = tmp.path().join("docs.zip");
        make_zip(&zip, &["readme.txt"]);
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        let msg = p.publish(&zip, None).unwrap_err().to_string();
        assert_eq!(msg, "No images found in zip file");
    }

    #[test]
    fn gallery_zip_slip_is_security_error() {
        let tmp = TempDir::new().unwrap();
        let zip = tmp.path().join("evil.zip");
        make_zip(&zip, &["../../etc/evil.jpg"]);
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        assert!(matches!(p.publish(&zip, None), Err(PublishError::Security(_))));
        assert_eq!(remote.create_calls(), 0);
    }

    #[test]
    fn broken_zip_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        let zip = tmp.path().join("broken.zip");
        fs::write(&zip, b"nope").unwrap();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        let msg = p.publish(&zip, None).unwrap_err().to_string();
        assert_eq!(msg, "Invalid zip file");
    }

    #[test]
    fn image_urls_are_paged() {
        let urls: Vec<String> = (1..=250).map(|i| format!("https://img.test/{i}.jpg")).collect();
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);

        p.publish_image_urls(&urls, "Set").unwrap();
        let created = remote.created();
        assert_eq!(created.len(), 3);
        assert_eq!(created[0].1.len(), 100);
        assert_eq!(created[2].1.len(), 50);
        assert!(p.uploader().host().uploads().is_empty());
    }

    #[test]
    fn empty_image_urls_rejected() {
        let remote = MockPublisher::new();
        let p = publisher(MockHost::new(), &remote);
        assert!(matches!(
            p.publish_image_urls(&[], "Set"),
            Err(PublishError::Validation(_))
        ));
    }
}
