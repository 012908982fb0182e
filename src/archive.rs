//! Zip gallery intake.
//!
//! A gallery arrives as a zip of images. Extraction refuses any entry whose
//! normalized path would land outside the destination directory (zip slip),
//! and checks every entry before writing any of them. Images are then
//! collected recursively and put in natural filename order.

use crate::naming::natural_key;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Image extensions a gallery may contain (lowercase, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid zip file: {0}")]
    Invalid(String),
    #[error("Zip Slip attempt detected: {0}")]
    Security(String),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => ArchiveError::Io(io),
            other => ArchiveError::Invalid(other.to_string()),
        }
    }
}

/// Extract `zip_path` into `dest`, returning the number of files written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut targets = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::Security(entry.name().to_string()))?;
        targets.push((relative, entry.is_dir()));
    }

    fs::create_dir_all(dest)?;
    let mut written = 0;
    for (i, (relative, is_dir)) in targets.into_iter().enumerate() {
        let out = dest.join(&relative);
        if is_dir {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entry = archive.by_index(i)?;
        let mut target = File::create(&out)?;
        io::copy(&mut entry, &mut target)?;
        written += 1;
    }
    tracing::debug!(archive = %zip_path.display(), files = written, "extracted zip");
    Ok(written)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// All images under `dir`, recursively, in natural file-name order.
pub fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image(path))
        .collect();
    images.sort_by_cached_key(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        natural_key(&name)
    });
    images
}
