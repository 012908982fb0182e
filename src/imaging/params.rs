//! Parameter types for image compression.
//!
//! These structs describe *what* the compressor should aim for, not how it
//! gets there. The engine in [`compress`](super::compress) walks the quality
//! and scale ladders built from them by [`calculations`](super::calculations).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`OutputCodec`]: Encoding used for compressed output (JPEG or WebP).
//! - [`CompressOptions`]: Codec plus the floors the ladders stop at.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(30)
    }
}

/// Encoding for compressed output.
///
/// JPEG honours the quality ladder. The `image` crate only ships a lossless
/// WebP encoder, so for WebP every quality step produces the same bytes and
/// only the scale ladder reduces size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCodec {
    #[default]
    Jpeg,
    #[serde(rename = "webp")]
    WebP,
}

impl OutputCodec {
    /// File suffix for temp files written in this codec.
    pub fn suffix(self) -> &'static str {
        match self {
            OutputCodec::Jpeg => ".jpg",
            OutputCodec::WebP => ".webp",
        }
    }

    /// Whether re-encoding at a lower quality can shrink the output.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputCodec::Jpeg)
    }
}

/// How far the compressor may degrade an image before giving up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    pub codec: OutputCodec,
    /// Lowest quality either ladder will try.
    pub min_quality: Quality,
    /// Smallest scale factor (fraction of original dimensions) to try.
    pub min_scale: f32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            codec: OutputCodec::Jpeg,
            min_quality: Quality::new(30),
            min_scale: 0.3,
        }
    }
}
