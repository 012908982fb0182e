//! Image compression: pure Rust, zero external tools.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format guessed from content) |
//! | **Flatten alpha** | manual composite over white |
//! | **Resize** | `DynamicImage::resize_exact` with `Lanczos3` |
//! | **Encode → JPEG** | `image::codecs::jpeg::JpegEncoder` |
//! | **Encode → WebP** | `image::codecs::webp::WebPEncoder` (lossless) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for the quality and scale ladders (unit testable)
//! - **Parameters**: Data structures describing how far compression may go
//! - **Compress**: The engine that walks the ladders and writes the temp file

mod calculations;
pub mod compress;
mod params;

pub use calculations::{quality_ladder, scale_ladder, scaled_dimensions};
pub use compress::{Compressed, ConversionError, compress};
pub use params::{CompressOptions, OutputCodec, Quality};
