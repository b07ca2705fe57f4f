//! Plain geometry types shared by the viewport, crop region and compositor.
//!
//! All coordinates are `f64` display pixels unless a function says otherwise.
//! Origin is the top-left corner of the container, y grows downward.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing rectangle edges.
pub const EPSILON: f64 = 1e-6;

/// A point in display space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both edges are finite and strictly positive.
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// The same size with width and height exchanged.
    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Largest size with this aspect ratio that fits inside `bounds`.
    pub fn fit_within(self, bounds: Size) -> Self {
        let width = bounds.width;
        let height = width / self.aspect();
        if height > bounds.height {
            Self::new(bounds.height * self.aspect(), bounds.height)
        } else {
            Self::new(width, height)
        }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle of `size` centered inside `outer`.
    pub fn centered_in(size: Size, outer: Rect) -> Self {
        Self::new(
            outer.x + (outer.width - size.width) / 2.0,
            outer.y + (outer.height - size.height) / 2.0,
            size.width,
            size.height,
        )
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Whether `width` or `height` is not strictly positive.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Whether `inner` lies inside this rectangle, allowing [`EPSILON`] slack.
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        inner.x >= self.x - EPSILON
            && inner.y >= self.y - EPSILON
            && inner.right() <= self.right() + EPSILON
            && inner.bottom() <= self.bottom() + EPSILON
    }
}

/// Clamp `value` into `[lo, hi]`, preferring `lo` when the range is empty.
///
/// `f64::clamp` panics on an inverted range; geometry code calls this where
/// an inverted range only means "no room".
pub fn clamp_span(value: f64, lo: f64, hi: f64) -> f64 {
    value.min(hi).max(lo)
}
