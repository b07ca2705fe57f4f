//! Pointer-driven drag state machine.
//!
//! A pointer-down picks the drag mode by hit-testing, first match wins:
//!
//! 1. crop mode on and within `handle_hit_radius` of a corner: resize
//! 2. crop mode on and inside the crop rectangle: move the crop
//! 3. anything else: pan the image
//!
//! Pointer-move dispatches to the active mode; pointer-up and pointer-leave
//! return to [`InteractionState::Idle`]. All state lives in the tagged
//! [`InteractionState`]; [`InteractionController::handle`] is the single
//! update function.

use serde::Serialize;
use tracing::trace;

use crate::geometry::{Point, Size};
use crate::region::{CropRegion, Handle};
use crate::viewport::ViewportTransform;

/// A pointer event in display space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

/// What a pointer-down at a given point would grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "handle", rename_all = "camelCase")]
pub enum HitTarget {
    Handle(Handle),
    Crop,
    Image,
}

/// Drag mode without its payload, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DragMode {
    Idle,
    PanningImage,
    MovingCrop,
    ResizingCrop,
}

/// The transient drag state. `last` is the pointer position of the previous
/// event, used to turn absolute positions into deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    PanningImage { last: Point },
    MovingCrop { last: Point },
    ResizingCrop { handle: Handle, last: Point },
}

impl InteractionState {
    pub fn mode(&self) -> DragMode {
        match self {
            InteractionState::Idle => DragMode::Idle,
            InteractionState::PanningImage { .. } => DragMode::PanningImage,
            InteractionState::MovingCrop { .. } => DragMode::MovingCrop,
            InteractionState::ResizingCrop { .. } => DragMode::ResizingCrop,
        }
    }

    pub fn active_handle(&self) -> Option<Handle> {
        match self {
            InteractionState::ResizingCrop { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self, InteractionState::Idle)
    }
}

/// Everything a pointer event may read or mutate.
pub struct Scene<'a> {
    pub viewport: &'a mut ViewportTransform,
    pub crop: &'a mut CropRegion,
    pub container: Size,
    pub intrinsic: Size,
}

/// Owns the drag state and the crop-mode toggle.
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    crop_mode: bool,
    handle_hit_radius: f64,
}

impl InteractionController {
    pub fn new(crop_mode: bool, handle_hit_radius: f64) -> Self {
        Self {
            state: InteractionState::Idle,
            crop_mode,
            handle_hit_radius,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn crop_mode(&self) -> bool {
        self.crop_mode
    }

    /// Turn crop editing on or off. Does not interrupt a drag in progress.
    pub fn set_crop_mode(&mut self, enabled: bool) {
        self.crop_mode = enabled;
    }

    /// What a pointer-down at `point` would grab.
    pub fn hit_test(&self, point: Point, crop: &CropRegion) -> HitTarget {
        if self.crop_mode {
            if let Some(handle) = crop.handle_at(point, self.handle_hit_radius) {
                return HitTarget::Handle(handle);
            }
            if crop.contains(point) {
                return HitTarget::Crop;
            }
        }
        HitTarget::Image
    }

    /// Feed one pointer event through the state machine. Returns whether the
    /// viewport or crop changed.
    pub fn handle(&mut self, event: PointerEvent, scene: &mut Scene<'_>) -> bool {
        match event {
            PointerEvent::Down(point) => {
                if !point.is_finite() {
                    return false;
                }
                self.state = match self.hit_test(point, scene.crop) {
                    HitTarget::Handle(handle) => InteractionState::ResizingCrop {
                        handle,
                        last: point,
                    },
                    HitTarget::Crop => InteractionState::MovingCrop { last: point },
                    HitTarget::Image => InteractionState::PanningImage { last: point },
                };
                trace!(mode = ?self.state.mode(), "drag started");
                false
            }
            PointerEvent::Move(point) => {
                if !point.is_finite() {
                    return false;
                }
                self.drag_to(point, scene)
            }
            PointerEvent::Up | PointerEvent::Leave => {
                self.state = InteractionState::Idle;
                false
            }
        }
    }

    fn drag_to(&mut self, point: Point, scene: &mut Scene<'_>) -> bool {
        match self.state {
            InteractionState::Idle => false,
            InteractionState::PanningImage { last } => {
                let delta = Point::new(point.x - last.x, point.y - last.y);
                scene.viewport.pan_by(delta, scene.container, scene.intrinsic);
                let bounds = scene.viewport.display_rect(scene.container, scene.intrinsic);
                scene.crop.constrain_to(bounds);
                self.state = InteractionState::PanningImage { last: point };
                true
            }
            InteractionState::MovingCrop { last } => {
                let delta = Point::new(point.x - last.x, point.y - last.y);
                let bounds = scene.viewport.display_rect(scene.container, scene.intrinsic);
                scene.crop.move_by(delta, bounds);
                self.state = InteractionState::MovingCrop { last: point };
                true
            }
            InteractionState::ResizingCrop { handle, .. } => {
                let bounds = scene.viewport.display_rect(scene.container, scene.intrinsic);
                scene.crop.resize_corner(handle, point, bounds);
                self.state = InteractionState::ResizingCrop {
                    handle,
                    last: point,
                };
                true
            }
        }
    }
}
