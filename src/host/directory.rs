//! Local directory backend.
//!
//! Copies each image into a directory that some web server already exposes
//! (a static bucket mount, an nginx root, a synced folder) and returns the
//! matching public URL.
//!
//! Stored names are content-addressed: the first 16 hex chars of the file's
//! SHA-256 plus the original extension. Re-uploading the same bytes is a
//! no-op that yields the same URL.

use super::{HostError, ImageHost, content_name, public_url_for};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory images are copied into. Created if missing.
    pub path: PathBuf,
    /// URL prefix under which `path` is served.
    pub public_url: String,
}

pub struct DirectoryHost {
    dir: PathBuf,
    public_url: String,
}

impl DirectoryHost {
    pub fn new(config: &DirectoryConfig) -> Result<Self, HostError> {
        if config.public_url.trim().is_empty() {
            return Err(HostError::Config {
                host: "directory",
                message: "public_url is required".into(),
            });
        }
        fs::create_dir_all(&config.path)?;
        Ok(Self {
            dir: config.path.clone(),
            public_url: config.public_url.clone(),
        })
    }
}

impl ImageHost for DirectoryHost {
    fn name(&self) -> &str {
        "directory"
    }

    fn upload(&self, path: &Path) -> Result<String, HostError> {
        if !path.is_file() {
            return Err(HostError::NotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let name = content_name(path, &bytes);
        let target = self.dir.join(&name);
        if !target.exists() {
            fs::write(&target, &bytes)?;
        }
        Ok(public_url_for(&self.public_url, &name))
    }
}
