//! Encoding the rendered bitmap back to the input's media type.
//!
//! This module uses the `image` crate's encoders:
//! - JPEG with a configurable quality; alpha is dropped
//! - PNG, lossless with alpha
//! - WebP, lossless with alpha

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{check_pixel_len, CompositeError};
use crate::source::{Bitmap, MediaType};

/// Encode `bitmap` as `media_type`.
///
/// # Arguments
///
/// * `bitmap` - RGBA pixels to encode
/// * `media_type` - Output format
/// * `quality` - JPEG quality (1-100); clamped, and ignored by lossless formats
///
/// # Quality Guidelines
///
/// * 90-100: High quality, suitable for avatars and logos shown large
/// * 80-90: Good quality, recommended for most uses
/// * Below 60: Low quality, visible artifacts
pub fn encode_bitmap(
    bitmap: &Bitmap,
    media_type: MediaType,
    quality: u8,
) -> Result<Vec<u8>, CompositeError> {
    let (width, height) = (bitmap.width, bitmap.height);
    if width == 0 || height == 0 {
        return Err(CompositeError::DegenerateRegion {
            width: width as f64,
            height: height as f64,
        });
    }

    check_pixel_len(bitmap)?;

    let mut buffer = Cursor::new(Vec::new());
    let result = match media_type {
        MediaType::Jpeg => {
            let rgb = strip_alpha(&bitmap.pixels);
            JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        MediaType::Png => PngEncoder::new(&mut buffer).write_image(
            &bitmap.pixels,
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        MediaType::WebP => WebPEncoder::new_lossless(&mut buffer).write_image(
            &bitmap.pixels,
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| CompositeError::Encode(e.to_string()))?;

    Ok(buffer.into_inner())
}

fn strip_alpha(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(Bitmap::CHANNELS)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}
