//! Producing the final cropped raster.
//!
//! # Pipeline
//!
//! 1. Scale the crop rectangle from display space into the coordinates of
//!    the image as shown (rotated bitmap coordinates)
//! 2. Map that into unrotated source coordinates and clamp it to the
//!    bitmap, shrinking rather than shifting
//! 3. Rotate a copy of the bitmap and remap the rectangle into it
//! 4. Allocate an output whose long side is `output_long_side` at the
//!    crop's aspect ratio
//! 5. Extract and resample the rectangle into it
//! 6. Encode to the input's media type
//!
//! A rectangle that is degenerate after clamping aborts the render with
//! [`CompositeError::DegenerateRegion`].

mod encode;
mod extract;
mod rotation;

pub use encode::encode_bitmap;
pub use extract::{extract_region, output_dimensions, resample, PixelRect};
pub use rotation::{remap_rect, rotate_bitmap, unmap_rect};

use std::borrow::Cow;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CropperConfig;
use crate::geometry::{Rect, Size};
use crate::source::{Bitmap, FilterType, ImageSource, MediaType};
use crate::viewport::{Quadrant, ViewportTransform};

/// Errors that can occur while compositing the output.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// The crop mapped to an empty rectangle in source space.
    #[error("Degenerate crop region: {width} x {height}")]
    DegenerateRegion { width: f64, height: f64 },

    /// Pixel buffer length doesn't match the bitmap's dimensions.
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// A pixel region reaches past the bitmap's edge.
    #[error("Region {x},{y} {width}x{height} exceeds {bitmap_width}x{bitmap_height} bitmap")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bitmap_width: u32,
        bitmap_height: u32,
    },

    /// The encoder failed.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Reject a bitmap whose buffer doesn't hold `width * height` RGBA pixels.
pub(crate) fn check_pixel_len(bitmap: &Bitmap) -> Result<(), CompositeError> {
    let expected = bitmap.width as usize * bitmap.height as usize * Bitmap::CHANNELS;
    if bitmap.pixels.len() != expected {
        return Err(CompositeError::InvalidPixelData {
            expected,
            actual: bitmap.pixels.len(),
        });
    }
    Ok(())
}

/// The rendered crop, handed to the host once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub media_type: MediaType,
}

/// Output settings for a render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub output_long_side: u32,
    pub quality: u8,
    pub filter: FilterType,
}

impl From<&CropperConfig> for RenderOptions {
    fn from(config: &CropperConfig) -> Self {
        Self {
            output_long_side: config.output_long_side,
            quality: config.quality,
            filter: config.filter,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&CropperConfig::default())
    }
}

/// Map the display-space `crop` to a rectangle in unrotated source pixels,
/// clamped to the bitmap.
///
/// Clamping moves an out-of-range edge onto the bitmap edge and shrinks the
/// size accordingly; the opposite edge never moves.
pub fn source_rect(
    source: &ImageSource,
    viewport: &ViewportTransform,
    container: Size,
    crop: &Rect,
) -> Result<Rect, CompositeError> {
    let intrinsic = source.intrinsic_size();
    let quadrant = viewport.quadrant();
    let display = viewport.display_rect(container, intrinsic);
    let shown = if quadrant.swaps_dimensions() {
        intrinsic.transposed()
    } else {
        intrinsic
    };

    // Display-to-source scale at the current zoom
    let scale_x = shown.width / display.width;
    let scale_y = shown.height / display.height;

    let rel_x = crop.x - display.x;
    let rel_y = crop.y - display.y;
    let in_shown = Rect::new(
        rel_x * scale_x,
        rel_y * scale_y,
        crop.width * scale_x,
        crop.height * scale_y,
    );

    let unrotated = unmap_rect(in_shown, quadrant, intrinsic);
    let clamped = clamp_to_bitmap(unrotated, intrinsic);
    if clamped.is_degenerate() {
        return Err(CompositeError::DegenerateRegion {
            width: clamped.width,
            height: clamped.height,
        });
    }
    Ok(clamped)
}

fn clamp_to_bitmap(rect: Rect, intrinsic: Size) -> Rect {
    let left = rect.x.max(0.0);
    let top = rect.y.max(0.0);
    let right = rect.right().min(intrinsic.width);
    let bottom = rect.bottom().min(intrinsic.height);
    Rect::new(left, top, right - left, bottom - top)
}

/// Render the pixels under `crop` into an encoded [`Output`].
#[instrument(skip_all, fields(
    quadrant = viewport.quadrant().index(),
    long_side = options.output_long_side,
))]
pub fn render(
    source: &ImageSource,
    viewport: &ViewportTransform,
    container: Size,
    crop: &Rect,
    options: &RenderOptions,
) -> Result<Output, CompositeError> {
    let intrinsic = source.intrinsic_size();
    let quadrant = viewport.quadrant();

    let unrotated = source_rect(source, viewport, container, crop)?;
    let rotated_rect = remap_rect(unrotated, quadrant, intrinsic);

    let bitmap: Cow<'_, Bitmap> = match quadrant {
        Quadrant::Deg0 => Cow::Borrowed(source.bitmap()),
        _ => Cow::Owned(rotate_bitmap(source.bitmap(), quadrant)?),
    };

    let region = PixelRect::snap(&rotated_rect, bitmap.width, bitmap.height);
    let (width, height) = output_dimensions(rotated_rect.aspect(), options.output_long_side);
    if width == 0 || height == 0 {
        return Err(CompositeError::DegenerateRegion {
            width: rotated_rect.width,
            height: rotated_rect.height,
        });
    }

    let extracted = extract_region(&bitmap, region)?;
    let resampled = resample(&extracted, width, height, options.filter)?;
    let bytes = encode_bitmap(&resampled, source.media_type(), options.quality)?;

    debug!(
        src_x = region.x,
        src_y = region.y,
        src_w = region.width,
        src_h = region.height,
        width,
        height,
        bytes = bytes.len(),
        "crop rendered"
    );

    Ok(Output {
        bytes,
        width,
        height,
        media_type: source.media_type(),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::viewport::ViewLimits;
    use proptest::prelude::*;

    fn solid_source(width: u32, height: u32) -> ImageSource {
        ImageSource::new(
            Bitmap::new(width, height, vec![90u8; (width * height * 4) as usize]),
            MediaType::Png,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Property: the output's ratio matches the crop's within a pixel of rounding.
        #[test]
        fn prop_output_ratio_matches_crop(
            (w, h) in (20u32..120, 20u32..120),
            quadrant in 0u8..4,
            (fx, fy, fw, fh) in (0.0f64..0.5, 0.0f64..0.5, 0.2f64..0.5, 0.2f64..0.5),
        ) {
            let container = Size::new(800.0, 500.0);
            let source = solid_source(w, h);
            let intrinsic = source.intrinsic_size();
            let mut viewport = ViewportTransform::new(container, intrinsic, ViewLimits::default());
            while viewport.quadrant() != Quadrant::from_index(quadrant) {
                viewport.rotate(container, intrinsic);
            }
            let d = viewport.display_rect(container, intrinsic);
            let crop = Rect::new(
                d.x + d.width * fx,
                d.y + d.height * fy,
                d.width * fw,
                d.height * fh,
            );
            let options = RenderOptions { output_long_side: 200, ..RenderOptions::default() };

            let output = render(&source, &viewport, container, &crop, &options).unwrap();

            prop_assert_eq!(output.width.max(output.height), 200);
            let ratio = crop.width / crop.height;
            if ratio >= 1.0 {
                prop_assert!((output.width as f64 / ratio - output.height as f64).abs() <= 1.0);
            } else {
                prop_assert!((output.height as f64 * ratio - output.width as f64).abs() <= 1.0);
            }
        }
    }
}
