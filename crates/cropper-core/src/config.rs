//! Tunable constants for a cropping session.
//!
//! Every value has a default matching the editor's stock behavior, so a host
//! only needs to supply the fields it wants to change. Field names are
//! camelCase on the wire because the usual source of a config is a JS object.

use serde::{Deserialize, Serialize};

use crate::geometry::Size;
use crate::source::FilterType;

/// Smallest allowed crop edge, in display pixels.
pub const MIN_CROP_SIZE: f64 = 50.0;
/// Distance from a corner within which a pointer grabs the resize handle.
pub const HANDLE_HIT_RADIUS: f64 = 12.0;
/// Scale change per zoom step.
pub const ZOOM_STEP: f64 = 0.1;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
/// Share of the container the image occupies at scale 1.0.
pub const FIT_RATIO: f64 = 0.8;
/// Share of the displayed image's smaller edge used for the initial crop.
pub const INITIAL_CROP_RATIO: f64 = 0.8;
/// Maximum pan away from center, as a share of the container edge.
pub const PAN_LIMIT_RATIO: f64 = 0.3;
/// Long edge of the rendered output, in pixels.
pub const OUTPUT_LONG_SIDE: u32 = 800;
/// Encoder quality (1-100) for lossy output.
pub const DEFAULT_QUALITY: u8 = 90;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropperConfig {
    pub min_crop_size: f64,
    pub handle_hit_radius: f64,
    pub zoom_step: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub fit_ratio: f64,
    pub initial_crop_ratio: f64,
    pub pan_limit_ratio: f64,
    pub output_long_side: u32,
    /// Lossy encoder quality (1-100). Ignored for lossless output formats.
    pub quality: u8,
    /// Container size used while the real one cannot be measured.
    pub fallback_container: Size,
    /// Whether a new session starts with crop editing enabled.
    pub crop_mode_on_open: bool,
    /// Resampling filter for the final render.
    pub filter: FilterType,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            min_crop_size: MIN_CROP_SIZE,
            handle_hit_radius: HANDLE_HIT_RADIUS,
            zoom_step: ZOOM_STEP,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            fit_ratio: FIT_RATIO,
            initial_crop_ratio: INITIAL_CROP_RATIO,
            pan_limit_ratio: PAN_LIMIT_RATIO,
            output_long_side: OUTPUT_LONG_SIDE,
            quality: DEFAULT_QUALITY,
            fallback_container: Size::new(800.0, 600.0),
            crop_mode_on_open: true,
            filter: FilterType::Lanczos3,
        }
    }
}

impl CropperConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repair values that would break the session's invariants.
    ///
    /// Non-finite or non-positive values fall back to their defaults, swapped
    /// scale bounds are reordered, and ratios are clamped to `(0, 1]`.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.min_crop_size = positive_or(self.min_crop_size, defaults.min_crop_size);
        self.handle_hit_radius = positive_or(self.handle_hit_radius, defaults.handle_hit_radius);
        self.zoom_step = positive_or(self.zoom_step, defaults.zoom_step);
        self.min_scale = positive_or(self.min_scale, defaults.min_scale);
        self.max_scale = positive_or(self.max_scale, defaults.max_scale);
        if self.min_scale > self.max_scale {
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
        self.fit_ratio = positive_or(self.fit_ratio, defaults.fit_ratio).min(1.0);
        self.initial_crop_ratio =
            positive_or(self.initial_crop_ratio, defaults.initial_crop_ratio).min(1.0);
        self.pan_limit_ratio = if self.pan_limit_ratio.is_finite() {
            self.pan_limit_ratio.clamp(0.0, 1.0)
        } else {
            defaults.pan_limit_ratio
        };
        if self.output_long_side == 0 {
            self.output_long_side = defaults.output_long_side;
        }
        self.quality = self.quality.clamp(1, 100);
        if !self.fallback_container.is_measurable() {
            self.fallback_container = defaults.fallback_container;
        }
        self
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
