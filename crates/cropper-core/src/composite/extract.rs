//! Pixel-rectangle extraction and resampling.

use crate::geometry::Rect;
use crate::source::{Bitmap, FilterType};

use super::{check_pixel_len, CompositeError};

/// A rectangle in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Round a fractional rectangle to pixel edges inside a `width x height`
    /// bitmap. Both edges are rounded independently; the result is at least
    /// one pixel on each axis.
    pub fn snap(rect: &Rect, width: u32, height: u32) -> PixelRect {
        let left = (rect.x.round().max(0.0) as u32).min(width.saturating_sub(1));
        let top = (rect.y.round().max(0.0) as u32).min(height.saturating_sub(1));
        let right = (rect.right().round().max(0.0) as u32).min(width);
        let bottom = (rect.bottom().round().max(0.0) as u32).min(height);

        PixelRect {
            x: left,
            y: top,
            width: right.saturating_sub(left).max(1),
            height: bottom.saturating_sub(top).max(1),
        }
    }
}

/// Copy the pixels of `region` out of `bitmap`.
///
/// `region` must lie inside the bitmap; use [`PixelRect::snap`] to build one.
pub fn extract_region(bitmap: &Bitmap, region: PixelRect) -> Result<Bitmap, CompositeError> {
    check_pixel_len(bitmap)?;
    let fits_x = region.x.checked_add(region.width).is_some_and(|r| r <= bitmap.width);
    let fits_y = region.y.checked_add(region.height).is_some_and(|b| b <= bitmap.height);
    if !fits_x || !fits_y {
        return Err(CompositeError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            bitmap_width: bitmap.width,
            bitmap_height: bitmap.height,
        });
    }

    // Fast path: full region returns a clone
    if region.x == 0
        && region.y == 0
        && region.width == bitmap.width
        && region.height == bitmap.height
    {
        return Ok(bitmap.clone());
    }

    const C: usize = Bitmap::CHANNELS;
    let row_bytes = region.width as usize * C;
    let mut output = Vec::with_capacity(row_bytes * region.height as usize);

    // Copy pixel data row by row
    for y in region.y..region.y + region.height {
        let start = (y as usize * bitmap.width as usize + region.x as usize) * C;
        output.extend_from_slice(&bitmap.pixels[start..start + row_bytes]);
    }

    Ok(Bitmap::new(region.width, region.height, output))
}

/// Resample `bitmap` to exactly `width x height`.
pub fn resample(
    bitmap: &Bitmap,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<Bitmap, CompositeError> {
    if width == 0 || height == 0 {
        return Err(CompositeError::DegenerateRegion {
            width: width as f64,
            height: height as f64,
        });
    }

    // Fast path: if dimensions match, just clone
    if bitmap.width == width && bitmap.height == height {
        return Ok(bitmap.clone());
    }

    let view = bitmap.as_view().ok_or(CompositeError::InvalidPixelData {
        expected: bitmap.width as usize * bitmap.height as usize * Bitmap::CHANNELS,
        actual: bitmap.pixels.len(),
    })?;
    let resized = image::imageops::resize(&view, width, height, filter.to_image_filter());

    Ok(Bitmap::from_rgba_image(resized))
}

/// Output dimensions whose long side is `long_side` and whose ratio is `aspect`
/// (width / height), rounding the short side to the nearest pixel.
pub fn output_dimensions(aspect: f64, long_side: u32) -> (u32, u32) {
    if !(aspect.is_finite() && aspect > 0.0) || long_side == 0 {
        return (0, 0);
    }

    if aspect >= 1.0 {
        // Landscape or square: constrain by width
        let height = (long_side as f64 / aspect).round() as u32;
        (long_side, height.max(1))
    } else {
        // Portrait: constrain by height
        let width = (long_side as f64 * aspect).round() as u32;
        (width.max(1), long_side)
    }
}
