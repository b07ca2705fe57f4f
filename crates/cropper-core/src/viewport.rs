//! Pan, zoom and quadrant rotation of the displayed image.
//!
//! # Coordinate System
//!
//! - The container's top-left corner is the display-space origin
//! - `pan` is the top-left corner of the displayed image rectangle
//! - Rotation is in 90° steps, positive = counter-clockwise
//!
//! The displayed rectangle is the bounding box of the image *as shown*, so
//! for odd quadrants its aspect ratio is the inverse of the bitmap's. All
//! display geometry goes through [`compute_display_rect`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CropperConfig;
use crate::geometry::{clamp_span, Point, Rect, Size};

/// Rotation in 90° counter-clockwise steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Quadrant {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Quadrant {
    /// Quadrant index in `0..4`.
    pub fn index(self) -> u8 {
        match self {
            Quadrant::Deg0 => 0,
            Quadrant::Deg90 => 1,
            Quadrant::Deg180 => 2,
            Quadrant::Deg270 => 3,
        }
    }

    /// Quadrant for any index, wrapping modulo 4.
    pub fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Quadrant::Deg0,
            1 => Quadrant::Deg90,
            2 => Quadrant::Deg180,
            _ => Quadrant::Deg270,
        }
    }

    /// The next quadrant, wrapping from 270° to 0°.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn degrees(self) -> u16 {
        self.index() as u16 * 90
    }

    /// Whether width and height trade places at this rotation.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Quadrant::Deg90 | Quadrant::Deg270)
    }
}

impl From<Quadrant> for u8 {
    fn from(quadrant: Quadrant) -> Self {
        quadrant.index()
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < 4 {
            Ok(Self::from_index(value))
        } else {
            Err(format!("rotation quadrant must be 0..=3, got {value}"))
        }
    }
}

/// Limits the transform enforces, taken from [`CropperConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLimits {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_step: f64,
    pub fit_ratio: f64,
    pub pan_limit_ratio: f64,
}

impl From<&CropperConfig> for ViewLimits {
    fn from(config: &CropperConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_step: config.zoom_step,
            fit_ratio: config.fit_ratio,
            pan_limit_ratio: config.pan_limit_ratio,
        }
    }
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self::from(&CropperConfig::default())
    }
}

/// Scale, pan and rotation of the displayed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTransform {
    scale: f64,
    pan: Point,
    quadrant: Quadrant,
    limits: ViewLimits,
}

/// Size of the displayed image at `scale`.
///
/// The oriented intrinsic size is fitted into `fit_ratio` of the container
/// (width first, then height if the width fit overflows), then multiplied by
/// `scale`.
pub fn display_size(
    scale: f64,
    quadrant: Quadrant,
    fit_ratio: f64,
    container: Size,
    intrinsic: Size,
) -> Size {
    let oriented = if quadrant.swaps_dimensions() {
        intrinsic.transposed()
    } else {
        intrinsic
    };
    let available = Size::new(container.width * fit_ratio, container.height * fit_ratio);
    let base = oriented.fit_within(available);
    Size::new(base.width * scale, base.height * scale)
}

/// The displayed image rectangle, in display space.
pub fn compute_display_rect(
    transform: &ViewportTransform,
    container: Size,
    intrinsic: Size,
) -> Rect {
    let size = display_size(
        transform.scale,
        transform.quadrant,
        transform.limits.fit_ratio,
        container,
        intrinsic,
    );
    Rect::new(transform.pan.x, transform.pan.y, size.width, size.height)
}

impl ViewportTransform {
    /// Create a transform at scale 1.0, no rotation, centered in `container`.
    pub fn new(container: Size, intrinsic: Size, limits: ViewLimits) -> Self {
        let mut transform = Self {
            scale: clamp_span(1.0, limits.min_scale, limits.max_scale),
            pan: Point::default(),
            quadrant: Quadrant::Deg0,
            limits,
        };
        transform.recenter(container, intrinsic);
        transform
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn quadrant(&self) -> Quadrant {
        self.quadrant
    }

    pub fn limits(&self) -> &ViewLimits {
        &self.limits
    }

    /// See [`compute_display_rect`].
    pub fn display_rect(&self, container: Size, intrinsic: Size) -> Rect {
        compute_display_rect(self, container, intrinsic)
    }

    /// Move the displayed image so it is centered in `container`.
    pub fn recenter(&mut self, container: Size, intrinsic: Size) {
        self.pan = self.centered_pan(container, intrinsic);
    }

    /// Step the scale up by one zoom step and re-center. Returns whether the
    /// scale changed.
    pub fn zoom_in(&mut self, container: Size, intrinsic: Size) -> bool {
        self.zoom_by(self.limits.zoom_step, container, intrinsic)
    }

    /// Step the scale down by one zoom step and re-center. Returns whether the
    /// scale changed.
    pub fn zoom_out(&mut self, container: Size, intrinsic: Size) -> bool {
        self.zoom_by(-self.limits.zoom_step, container, intrinsic)
    }

    fn zoom_by(&mut self, delta: f64, container: Size, intrinsic: Size) -> bool {
        // Round so repeated steps do not accumulate float drift
        let target = ((self.scale + delta) * 1e6).round() / 1e6;
        let next = clamp_span(target, self.limits.min_scale, self.limits.max_scale);
        let changed = (next - self.scale).abs() > f64::EPSILON;
        self.scale = next;
        self.recenter(container, intrinsic);
        if changed {
            debug!(scale = self.scale, "zoomed");
        }
        changed
    }

    /// Rotate one quadrant counter-clockwise and re-center.
    pub fn rotate(&mut self, container: Size, intrinsic: Size) {
        self.quadrant = self.quadrant.next();
        self.recenter(container, intrinsic);
        debug!(degrees = self.quadrant.degrees(), "rotated");
    }

    /// Shift the image by `delta`, then constrain the pan.
    ///
    /// The offset from the centered position is limited to `pan_limit_ratio`
    /// of the container edge; in addition an image larger than the container
    /// must keep covering it, and a smaller one must stay inside it.
    pub fn pan_by(&mut self, delta: Point, container: Size, intrinsic: Size) {
        if !delta.is_finite() {
            return;
        }
        let size = self.display_size(container, intrinsic);
        let centered = self.centered_pan(container, intrinsic);
        let limit_x = container.width * self.limits.pan_limit_ratio;
        let limit_y = container.height * self.limits.pan_limit_ratio;

        let x = clamp_span(self.pan.x + delta.x, centered.x - limit_x, centered.x + limit_x);
        let y = clamp_span(self.pan.y + delta.y, centered.y - limit_y, centered.y + limit_y);

        let slack_x = container.width - size.width;
        let slack_y = container.height - size.height;
        self.pan = Point::new(
            clamp_span(x, slack_x.min(0.0), slack_x.max(0.0)),
            clamp_span(y, slack_y.min(0.0), slack_y.max(0.0)),
        );
    }

    fn display_size(&self, container: Size, intrinsic: Size) -> Size {
        display_size(
            self.scale,
            self.quadrant,
            self.limits.fit_ratio,
            container,
            intrinsic,
        )
    }

    fn centered_pan(&self, container: Size, intrinsic: Size) -> Point {
        let size = self.display_size(container, intrinsic);
        Rect::centered_in(size, Rect::new(0.0, 0.0, container.width, container.height)).origin()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum ViewOp {
        ZoomIn,
        ZoomOut,
        Rotate,
        Pan(f64, f64),
    }

    fn op_strategy() -> impl Strategy<Value = ViewOp> {
        prop_oneof![
            Just(ViewOp::ZoomIn),
            Just(ViewOp::ZoomOut),
            Just(ViewOp::Rotate),
            (-400.0f64..400.0, -400.0f64..400.0).prop_map(|(x, y)| ViewOp::Pan(x, y)),
        ]
    }

    proptest! {
        /// Property: scale never leaves the configured bounds.
        #[test]
        fn prop_scale_within_bounds(ops in prop::collection::vec(op_strategy(), 0..80)) {
            let container = Size::new(800.0, 500.0);
            let intrinsic = Size::new(1600.0, 1200.0);
            let mut t = ViewportTransform::new(container, intrinsic, ViewLimits::default());

            for op in ops {
                match op {
                    ViewOp::ZoomIn => { t.zoom_in(container, intrinsic); }
                    ViewOp::ZoomOut => { t.zoom_out(container, intrinsic); }
                    ViewOp::Rotate => t.rotate(container, intrinsic),
                    ViewOp::Pan(x, y) => t.pan_by(Point::new(x, y), container, intrinsic),
                }
                prop_assert!(t.scale() >= 0.5 && t.scale() <= 3.0);
            }
        }

        /// Property: four rotations restore the quadrant and centered rectangle.
        #[test]
        fn prop_rotation_closure(
            (w, h) in (10.0f64..5000.0, 10.0f64..5000.0),
            zooms in 0usize..30,
        ) {
            let container = Size::new(800.0, 500.0);
            let intrinsic = Size::new(w, h);
            let mut t = ViewportTransform::new(container, intrinsic, ViewLimits::default());
            for _ in 0..zooms {
                t.zoom_in(container, intrinsic);
            }
            let start = t.display_rect(container, intrinsic);
            let quadrant = t.quadrant();

            for _ in 0..4 {
                t.rotate(container, intrinsic);
            }

            let end = t.display_rect(container, intrinsic);
            prop_assert_eq!(t.quadrant(), quadrant);
            prop_assert!((end.x - start.x).abs() < 1e-9);
            prop_assert!((end.y - start.y).abs() < 1e-9);
            prop_assert!((end.width - start.width).abs() < 1e-9);
        }
    }
}
