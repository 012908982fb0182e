//! Fit an oversized image under a byte budget.
//!
//! Image hosts cap uploads (Telegraph-era hosts commonly at 5MB). Rather than
//! failing, the uploader re-encodes large images until they fit:
//!
//! 1. **Quality ladder** at full size: 95 → `min_quality`, step 5.
//! 2. **Scale ladder**: 0.9 → `min_scale`, step 0.1; at each scale a shorter
//!    quality ladder 85 → `min_quality`, step 10 (Lanczos3 resampling).
//!
//! The first encoding that fits wins. Transparency is never preserved: alpha
//! and palette images are composited onto white before encoding, since the
//! output codecs are used as opaque RGB.
//!
//! GIF input is refused outright. A GIF may be animated and there is no
//! re-encode path that keeps its frames.
//!
//! The result owns its temp file. Dropping [`Compressed`] deletes it, which is
//! how the uploader guarantees cleanup on every exit path.

use super::calculations::{quality_ladder, scale_ladder, scaled_dimensions};
use super::params::{CompressOptions, OutputCodec};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "cannot auto-compress {format} files (may be animated); size {}, max {}",
        mb(.size),
        mb(.max)
    )]
    Animated { format: String, size: u64, max: u64 },
    #[error("failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },
    #[error("encode failed: {0}")]
    Encode(String),
    #[error(
        "unable to compress image under {}; original {}, dimensions {width}x{height}",
        mb(.max),
        mb(.size)
    )]
    DoesNotFit {
        size: u64,
        max: u64,
        width: u32,
        height: u32,
    },
}

fn mb(bytes: &u64) -> String {
    format!("{:.2}MB", *bytes as f64 / 1024.0 / 1024.0)
}

/// Output of [`compress`]: either the untouched input or an owned temp file.
#[derive(Debug)]
pub enum Compressed {
    Original(PathBuf),
    Temp(TempPath),
}

impl Compressed {
    /// Path to upload.
    pub fn path(&self) -> &Path {
        match self {
            Compressed::Original(p) => p.as_path(),
            Compressed::Temp(t) => &**t,
        }
    }

    pub fn was_compressed(&self) -> bool {
        matches!(self, Compressed::Temp(_))
    }
}

/// Compress `path` to at most `max_bytes`, or return it unchanged if it
/// already fits.
pub fn compress(
    path: &Path,
    max_bytes: u64,
    options: &CompressOptions,
) -> Result<Compressed, ConversionError> {
    let size = std::fs::metadata(path)?.len();
    if size <= max_bytes {
        return Ok(Compressed::Original(path.to_path_buf()));
    }

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if is_gif(path) || reader.format() == Some(ImageFormat::Gif) {
        return Err(ConversionError::Animated {
            format: "GIF".to_string(),
            size,
            max: max_bytes,
        });
    }

    let decoded = reader.decode().map_err(|e| ConversionError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let rgb = flatten_to_rgb(decoded);
    let (width, height) = rgb.dimensions();

    let bytes = fit(rgb, max_bytes, options)?.ok_or(ConversionError::DoesNotFit {
        size,
        max: max_bytes,
        width,
        height,
    })?;

    tracing::debug!(
        path = %path.display(),
        from = size,
        to = bytes.len(),
        "compressed image"
    );
    write_temp(&bytes, options.codec).map(Compressed::Temp)
}

fn is_gif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
}

/// Walk both ladders; `None` if nothing fits.
fn fit(
    rgb: RgbImage,
    max_bytes: u64,
    options: &CompressOptions,
) -> Result<Option<Vec<u8>>, ConversionError> {
    let floor = options.min_quality.value();
    let original = DynamicImage::ImageRgb8(rgb);

    for quality in ladder(options.codec, 95, floor, 5) {
        let bytes = encode(&original, options.codec, quality)?;
        if bytes.len() as u64 <= max_bytes {
            return Ok(Some(bytes));
        }
    }

    let dims = (original.width(), original.height());
    for scale in scale_ladder(options.min_scale) {
        let (w, h) = scaled_dimensions(dims, scale);
        let scaled = original.resize_exact(w, h, FilterType::Lanczos3);
        for quality in ladder(options.codec, 85, floor, 10) {
            let bytes = encode(&scaled, options.codec, quality)?;
            if bytes.len() as u64 <= max_bytes {
                return Ok(Some(bytes));
            }
        }
    }

    Ok(None)
}

/// Lossless codecs ignore quality, so one rung is enough.
fn ladder(codec: OutputCodec, start: u32, floor: u32, step: u32) -> Vec<u32> {
    let levels = quality_ladder(start, floor, step);
    if codec.is_lossy() {
        levels
    } else {
        levels.into_iter().take(1).collect()
    }
}

fn encode(img: &DynamicImage, codec: OutputCodec, quality: u32) -> Result<Vec<u8>, ConversionError> {
    let mut buf = Vec::new();
    let result = match codec {
        OutputCodec::Jpeg => {
            let q = quality.clamp(1, 100) as u8;
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q))
        }
        OutputCodec::WebP => img.write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
    };
    result.map_err(|e| ConversionError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Convert to RGB, compositing any alpha channel onto a white background.
pub fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u32;
        let over_white = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([over_white(r), over_white(g), over_white(b)]));
    }
    out
}

fn write_temp(bytes: &[u8], codec: OutputCodec) -> Result<TempPath, ConversionError> {
    let mut file = tempfile::Builder::new()
        .prefix("telepress-")
        .suffix(codec.suffix())
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file.into_temp_path())
}
