//! rclone backend.
//!
//! Stages every file of a batch into one temporary directory and runs a
//! single `rclone copy <staging> <remote_path>`. A single upload is a batch
//! of one.
//!
//! Remote names are content-addressed like the directory host's, so files
//! from different batches never overwrite each other and identical bytes
//! share one URL.

use super::{BatchUrls, HostError, ImageHost, content_name, public_url_for};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcloneConfig {
    /// rclone destination, e.g. `r2:bucket/images`.
    pub remote_path: String,
    /// URL prefix under which `remote_path` is served.
    pub public_url: String,
    /// Executable to run. Defaults to `rclone` looked up on `PATH`.
    #[serde(default = "default_binary")]
    pub binary: String,
}

fn default_binary() -> String {
    "rclone".to_string()
}

pub struct RcloneHost {
    remote_path: String,
    public_url: String,
    binary: PathBuf,
}

impl RcloneHost {
    pub fn new(config: &RcloneConfig) -> Result<Self, HostError> {
        let missing = |field: &str| HostError::Config {
            host: "rclone",
            message: format!("{field} is required"),
        };
        if config.remote_path.trim().is_empty() {
            return Err(missing("remote_path"));
        }
        if config.public_url.trim().is_empty() {
            return Err(missing("public_url"));
        }
        let binary = find_executable(&config.binary).ok_or_else(|| HostError::Config {
            host: "rclone",
            message: format!("executable '{}' not found", config.binary),
        })?;
        Ok(Self {
            remote_path: config.remote_path.clone(),
            public_url: config.public_url.clone(),
            binary,
        })
    }

    /// Copy the existing files into `staging` under content-addressed names.
    ///
    /// Returns `(source, staged name)` pairs; missing or unreadable sources
    /// are reported in `urls` directly.
    fn stage(
        &self,
        paths: &[PathBuf],
        staging: &Path,
        urls: &mut BatchUrls,
    ) -> Vec<(PathBuf, String)> {
        let mut staged = Vec::new();
        for path in paths {
            if !path.is_file() {
                urls.insert(path.clone(), Err(HostError::NotFound(path.clone())));
                continue;
            }
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    urls.insert(path.clone(), Err(HostError::Io(e)));
                    continue;
                }
            };
            let name = content_name(path, &bytes);
            let target = staging.join(&name);
            if !target.exists()
                && let Err(e) = fs::write(&target, &bytes)
            {
                urls.insert(path.clone(), Err(HostError::Io(e)));
                continue;
            }
            staged.push((path.clone(), name));
        }
        staged
    }
}

impl ImageHost for RcloneHost {
    fn name(&self) -> &str {
        "rclone"
    }

    fn upload(&self, path: &Path) -> Result<String, HostError> {
        let key = path.to_path_buf();
        let mut urls = self.upload_batch(std::slice::from_ref(&key));
        urls.remove(&key).unwrap_or_else(|| {
            Err(HostError::Failed {
                host: "rclone",
                message: "no result for file".into(),
            })
        })
    }

    fn supports_native_batch(&self) -> bool {
        true
    }

    fn upload_batch(&self, paths: &[PathBuf]) -> BatchUrls {
        let mut urls = BatchUrls::new();
        let staging = match tempfile::Builder::new().prefix("telepress-rclone-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                let message = format!("cannot create staging directory: {e}");
                return fail_all(paths, &message);
            }
        };

        let staged = self.stage(paths, staging.path(), &mut urls);
        if staged.is_empty() {
            return urls;
        }

        tracing::debug!(count = staged.len(), remote = %self.remote_path, "rclone copy");
        let output = Command::new(&self.binary)
            .arg("copy")
            .arg(staging.path())
            .arg(&self.remote_path)
            .output();

        let failure = match output {
            Ok(out) if out.status.success() => None,
            Ok(out) => Some(format!(
                "rclone exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )),
            Err(e) => Some(format!("failed to run rclone: {e}")),
        };

        for (source, name) in staged {
            let result = match &failure {
                None => Ok(public_url_for(&self.public_url, &name)),
                Some(message) => Err(HostError::Failed {
                    host: "rclone",
                    message: message.clone(),
                }),
            };
            urls.insert(source, result);
        }
        urls
    }
}

fn fail_all(paths: &[PathBuf], message: &str) -> BatchUrls {
    paths
        .iter()
        .map(|p| {
            (
                p.clone(),
                Err(HostError::Failed {
                    host: "rclone",
                    message: message.to_string(),
                }),
            )
        })
        .collect()
}

/// Resolve `name` to an executable path. Names containing a separator are
/// taken as paths; bare names are searched on `PATH`.
fn find_executable(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
