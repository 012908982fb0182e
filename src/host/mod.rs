//! Image hosting backends.
//!
//! Telegraph pages reference images by URL, so every local image has to be
//! put somewhere public first. The [`ImageHost`] trait is the only thing the
//! upload orchestrator knows about a backend: a stable name, a single-file
//! `upload`, and an optional native bulk upload.
//!
//! Concrete backends are a closed set selected at runtime from configuration:
//!
//! | `type` | Backend | Native batch |
//! |---|---|---|
//! | `directory` | [`DirectoryHost`]: copy into a directory served at a public URL | no |
//! | `rclone` | [`RcloneHost`]: one `rclone copy` per batch | yes |
//! | `custom` | [`CustomHost`]: multipart POST to any JSON-answering endpoint | no |
//!
//! [`HostConfig`] is the serialized form (the `[image_host]` config table) and
//! [`HostConfig::build`] turns it into an [`AnyHost`]. Adding a backend means
//! adding a variant to both; the orchestrator is generic over the trait and
//! never changes.

pub mod custom;
pub mod directory;
pub mod rclone;

pub use custom::{CustomConfig, CustomHost};
pub use directory::{DirectoryConfig, DirectoryHost};
pub use rclone::{RcloneConfig, RcloneHost};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{host} upload failed: {message}")]
    Failed { host: &'static str, message: String },
    #[error("invalid {host} configuration: {message}")]
    Config { host: &'static str, message: String },
}

/// Per-path outcome of a bulk upload, keyed by the path that was handed in.
pub type BatchUrls = HashMap<PathBuf, Result<String, HostError>>;

/// A place images can be uploaded to, yielding a public URL.
pub trait ImageHost: Send + Sync {
    /// Stable backend name (`"rclone"`, `"directory"`, ...).
    fn name(&self) -> &str;

    /// Upload one file and return its public URL.
    fn upload(&self, path: &Path) -> Result<String, HostError>;

    /// Whether [`upload_batch`](Self::upload_batch) is cheaper than N uploads.
    fn supports_native_batch(&self) -> bool {
        false
    }

    /// Upload many files. The default loops over [`upload`](Self::upload).
    fn upload_batch(&self, paths: &[PathBuf]) -> BatchUrls {
        paths
            .iter()
            .map(|p| (p.clone(), self.upload(p)))
            .collect()
    }
}

impl<T: ImageHost + ?Sized> ImageHost for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn upload(&self, path: &Path) -> Result<String, HostError> {
        (**self).upload(path)
    }

    fn supports_native_batch(&self) -> bool {
        (**self).supports_native_batch()
    }

    fn upload_batch(&self, paths: &[PathBuf]) -> BatchUrls {
        (**self).upload_batch(paths)
    }
}

/// Serialized backend selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostConfig {
    Directory(DirectoryConfig),
    Rclone(RcloneConfig),
    Custom(CustomConfig),
}

impl HostConfig {
    /// Registered backend names, in documentation order.
    pub const NAMES: &'static [&'static str] = &["directory", "rclone", "custom"];

    /// Validate the configuration and construct the backend.
    pub fn build(&self) -> Result<AnyHost, HostError> {
        Ok(match self {
            HostConfig::Directory(c) => AnyHost::Directory(DirectoryHost::new(c)?),
            HostConfig::Rclone(c) => AnyHost::Rclone(RcloneHost::new(c)?),
            HostConfig::Custom(c) => AnyHost::Custom(CustomHost::new(c)?),
        })
    }
}

/// Any registered backend.
pub enum AnyHost {
    Directory(DirectoryHost),
    Rclone(RcloneHost),
    Custom(CustomHost),
}

impl AnyHost {
    fn inner(&self) -> &dyn ImageHost {
        match self {
            AnyHost::Directory(h) => h,
            AnyHost::Rclone(h) => h,
            AnyHost::Custom(h) => h,
        }
    }
}

impl ImageHost for AnyHost {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn upload(&self, path: &Path) -> Result<String, HostError> {
        self.inner().upload(path)
    }

    fn supports_native_batch(&self) -> bool {
        self.inner().supports_native_batch()
    }

    fn upload_batch(&self, paths: &[PathBuf]) -> BatchUrls {
        self.inner().upload_batch(paths)
    }
}

/// Stands in when no host is configured. Every upload fails with a
/// configuration error, so text publishing works without an `[image_host]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl ImageHost for NoHost {
    fn name(&self) -> &str {
        "none"
    }

    fn upload(&self, _path: &Path) -> Result<String, HostError> {
        Err(HostError::Config {
            host: "none",
            message: format!(
                "no image host configured; add an [image_host] section with type = {}",
                HostConfig::NAMES.join(" | ")
            ),
        })
    }
}

/// Content-addressed remote name: the first 16 hex chars of the SHA-256
/// of `bytes`, plus the lowercased extension of `path`.
pub(crate) fn content_name(path: &Path, bytes: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", &digest[..16], ext.to_ascii_lowercase()),
        None => digest[..16].to_string(),
    }
}

/// Join a public URL prefix and a file name with exactly one slash.
pub(crate) fn public_url_for(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), name)
}
