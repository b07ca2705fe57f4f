//! Quadrant rotation of bitmaps and of rectangles in bitmap coordinates.
//!
//! Rotation is counter-clockwise. For a source of size `W x H`:
//!
//! ```text
//!  90°: (x, y) -> (y, W - x)          size H x W
//! 180°: (x, y) -> (W - x, H - y)      size W x H
//! 270°: (x, y) -> (H - y, x)          size H x W
//! ```

use super::{check_pixel_len, CompositeError};
use crate::geometry::{Rect, Size};
use crate::source::Bitmap;
use crate::viewport::Quadrant;

/// Rotate a bitmap by `quadrant`, returning a new bitmap.
///
/// Lossless: every source pixel lands on exactly one output pixel.
pub fn rotate_bitmap(bitmap: &Bitmap, quadrant: Quadrant) -> Result<Bitmap, CompositeError> {
    check_pixel_len(bitmap)?;
    if quadrant == Quadrant::Deg0 {
        return Ok(bitmap.clone());
    }

    let (src_w, src_h) = (bitmap.width as usize, bitmap.height as usize);
    let (dst_w, dst_h) = if quadrant.swaps_dimensions() {
        (src_h, src_w)
    } else {
        (src_w, src_h)
    };
    const C: usize = Bitmap::CHANNELS;

    let mut output = vec![0u8; dst_w * dst_h * C];

    for src_y in 0..src_h {
        let src_row = src_y * src_w * C;
        for src_x in 0..src_w {
            let (dst_x, dst_y) = match quadrant {
                Quadrant::Deg0 => (src_x, src_y),
                Quadrant::Deg90 => (src_y, src_w - 1 - src_x),
                Quadrant::Deg180 => (src_w - 1 - src_x, src_h - 1 - src_y),
                Quadrant::Deg270 => (src_h - 1 - src_y, src_x),
            };
            let src_idx = src_row + src_x * C;
            let dst_idx = (dst_y * dst_w + dst_x) * C;
            output[dst_idx..dst_idx + C].copy_from_slice(&bitmap.pixels[src_idx..src_idx + C]);
        }
    }

    Ok(Bitmap::new(dst_w as u32, dst_h as u32, output))
}

/// Map a rectangle in unrotated source coordinates into the coordinates of
/// the source rotated by `quadrant`. `intrinsic` is the unrotated size.
pub fn remap_rect(rect: Rect, quadrant: Quadrant, intrinsic: Size) -> Rect {
    let (iw, ih) = (intrinsic.width, intrinsic.height);
    match quadrant {
        Quadrant::Deg0 => rect,
        Quadrant::Deg90 => Rect::new(rect.y, iw - rect.x - rect.width, rect.height, rect.width),
        Quadrant::Deg180 => Rect::new(
            iw - rect.x - rect.width,
            ih - rect.y - rect.height,
            rect.width,
            rect.height,
        ),
        Quadrant::Deg270 => Rect::new(ih - rect.y - rect.height, rect.x, rect.height, rect.width),
    }
}

/// Inverse of [`remap_rect`]: map a rectangle in rotated coordinates back to
/// unrotated source coordinates.
pub fn unmap_rect(rect: Rect, quadrant: Quadrant, intrinsic: Size) -> Rect {
    let (iw, ih) = (intrinsic.width, intrinsic.height);
    match quadrant {
        Quadrant::Deg0 => rect,
        Quadrant::Deg90 => Rect::new(iw - rect.y - rect.height, rect.x, rect.height, rect.width),
        Quadrant::Deg180 => Rect::new(
            iw - rect.x - rect.width,
            ih - rect.y - rect.height,
            rect.width,
            rect.height,
        ),
        Quadrant::Deg270 => Rect::new(rect.y, ih - rect.x - rect.width, rect.height, rect.width),
    }
}
