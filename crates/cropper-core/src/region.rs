//! The crop rectangle and its constraints.
//!
//! The rectangle lives in display space. Every mutation takes the current
//! displayed image rectangle (`bounds`) and leaves the crop:
//!
//! - fully inside `bounds`
//! - at least `min_size` on both edges, whenever `bounds` has room for it
//! - at exactly `aspect_ratio` (width / height) when one is set
//!
//! Mutations are total: bad input (NaN pointers, a crop left outside the
//! image by a zoom) is absorbed rather than reported.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::{clamp_span, Point, Rect, Size};

/// One of the four corner handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "se")]
    SouthEast,
}

impl Handle {
    /// Hit-test order.
    pub const ALL: [Handle; 4] = [
        Handle::NorthWest,
        Handle::NorthEast,
        Handle::SouthWest,
        Handle::SouthEast,
    ];

    /// Whether dragging this handle moves the rectangle's left edge.
    pub fn moves_left(self) -> bool {
        matches!(self, Handle::NorthWest | Handle::SouthWest)
    }

    /// Whether dragging this handle moves the rectangle's top edge.
    pub fn moves_top(self) -> bool {
        matches!(self, Handle::NorthWest | Handle::NorthEast)
    }

    /// The corner of `rect` this handle sits on.
    pub fn position(self, rect: &Rect) -> Point {
        Point::new(
            if self.moves_left() { rect.x } else { rect.right() },
            if self.moves_top() { rect.y } else { rect.bottom() },
        )
    }

    /// The opposite corner, which stays fixed while this handle is dragged.
    pub fn anchor(self, rect: &Rect) -> Point {
        Point::new(
            if self.moves_left() { rect.right() } else { rect.x },
            if self.moves_top() { rect.bottom() } else { rect.y },
        )
    }
}

/// Keep only usable aspect ratios.
pub fn normalize_aspect(aspect_ratio: Option<f64>) -> Option<f64> {
    aspect_ratio.filter(|r| r.is_finite() && *r > 0.0)
}

/// The crop rectangle in display space.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRegion {
    rect: Rect,
    aspect_ratio: Option<f64>,
    min_size: f64,
}

impl CropRegion {
    /// Place a centered crop on the displayed image.
    ///
    /// The long edge of the crop is `initial_ratio` of the image's smaller
    /// displayed edge; with an aspect ratio the short edge is derived from it.
    pub fn initialize(
        bounds: Rect,
        aspect_ratio: Option<f64>,
        min_size: f64,
        initial_ratio: f64,
    ) -> Self {
        let aspect_ratio = normalize_aspect(aspect_ratio);
        let side = (bounds.width.min(bounds.height) * initial_ratio).max(min_size);
        let size = match aspect_ratio {
            Some(ratio) if ratio >= 1.0 => Size::new(side, side / ratio),
            Some(ratio) => Size::new(side * ratio, side),
            None => Size::new(side, side),
        };

        let mut region = Self {
            rect: Rect::centered_in(size, bounds),
            aspect_ratio,
            min_size,
        };
        region.floor_to_min_size();
        region.constrain_to(bounds);
        region
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    /// The handle whose corner lies within `radius` of `point`, if any.
    ///
    /// The test is a square box around each corner, checked in
    /// [`Handle::ALL`] order.
    pub fn handle_at(&self, point: Point, radius: f64) -> Option<Handle> {
        Handle::ALL.into_iter().find(|handle| {
            let corner = handle.position(&self.rect);
            (point.x - corner.x).abs() <= radius && (point.y - corner.y).abs() <= radius
        })
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rect.contains_point(point)
    }

    /// Translate by `delta`, then clamp the origin into `bounds`.
    pub fn move_by(&mut self, delta: Point, bounds: Rect) {
        if !delta.is_finite() {
            return;
        }
        self.constrain_to(bounds);
        self.rect.x = clamp_span(
            self.rect.x + delta.x,
            bounds.x,
            bounds.right() - self.rect.width,
        );
        self.rect.y = clamp_span(
            self.rect.y + delta.y,
            bounds.y,
            bounds.bottom() - self.rect.height,
        );
        trace!(x = self.rect.x, y = self.rect.y, "crop moved");
    }

    /// Drag `handle` to `pointer`, keeping the opposite corner fixed.
    ///
    /// With an aspect ratio, the axis whose size changed more drives the
    /// other one (width wins ties). Sizes are then floored to `min_size` and
    /// finally shrunk so the rectangle stays inside `bounds`.
    pub fn resize_corner(&mut self, handle: Handle, pointer: Point, bounds: Rect) {
        if !pointer.is_finite() {
            return;
        }
        self.constrain_to(bounds);

        let old = self.rect;
        let anchor = handle.anchor(&old);
        let mut width = if handle.moves_left() {
            anchor.x - pointer.x
        } else {
            pointer.x - anchor.x
        };
        let mut height = if handle.moves_top() {
            anchor.y - pointer.y
        } else {
            pointer.y - anchor.y
        };

        if let Some(ratio) = self.aspect_ratio {
            if (width - old.width).abs() >= (height - old.height).abs() {
                height = width / ratio;
            } else {
                width = height * ratio;
            }
        }

        match self.aspect_ratio {
            Some(ratio) => {
                width = width.max(self.min_size).max(self.min_size * ratio);
                height = width / ratio;
            }
            None => {
                width = width.max(self.min_size);
                height = height.max(self.min_size);
            }
        }

        let max_width = if handle.moves_left() {
            anchor.x - bounds.x
        } else {
            bounds.right() - anchor.x
        };
        let max_height = if handle.moves_top() {
            anchor.y - bounds.y
        } else {
            bounds.bottom() - anchor.y
        };
        let size = self.shrink_to(Size::new(width, height), Size::new(max_width, max_height));

        self.rect = Rect::new(
            if handle.moves_left() {
                anchor.x - size.width
            } else {
                anchor.x
            },
            if handle.moves_top() {
                anchor.y - size.height
            } else {
                anchor.y
            },
            size.width,
            size.height,
        );
        trace!(?handle, width = size.width, height = size.height, "crop resized");
    }

    /// Bring the rectangle back inside `bounds`.
    ///
    /// The rectangle is shrunk (keeping its aspect ratio) only if it is larger
    /// than `bounds`, then translated the shortest distance needed.
    pub fn constrain_to(&mut self, bounds: Rect) {
        let size = self.shrink_to(self.rect.size(), bounds.size());
        self.rect = Rect::new(
            clamp_span(self.rect.x, bounds.x, bounds.right() - size.width),
            clamp_span(self.rect.y, bounds.y, bounds.bottom() - size.height),
            size.width,
            size.height,
        );
    }

    fn shrink_to(&self, size: Size, max: Size) -> Size {
        let (mut width, mut height) = (size.width, size.height);
        if width > max.width {
            width = max.width;
            if let Some(ratio) = self.aspect_ratio {
                height = width / ratio;
            }
        }
        if height > max.height {
            height = max.height;
            if let Some(ratio) = self.aspect_ratio {
                width = height * ratio;
            }
        }
        Size::new(width, height)
    }

    fn floor_to_min_size(&mut self) {
        let center = self.rect.center();
        let size = match self.aspect_ratio {
            Some(ratio) => {
                let width = self.rect.width.max(self.min_size).max(self.min_size * ratio);
                Size::new(width, width / ratio)
            }
            None => Size::new(
                self.rect.width.max(self.min_size),
                self.rect.height.max(self.min_size),
            ),
        };
        self.rect = Rect::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        );
    }
}
