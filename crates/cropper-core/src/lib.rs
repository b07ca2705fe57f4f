//! Cropper Core - interactive image cropping engine
//!
//! This crate holds everything between a decoded image and the cropped file:
//! display geometry for pan, zoom and quadrant rotation, the crop rectangle
//! and its constraints, the pointer-driven drag state machine, and the
//! compositor that turns the on-screen crop into encoded output pixels.
//!
//! [`CropSession`] ties the pieces together for one editing session. The
//! lower-level modules are public for hosts that want their own orchestration.

pub mod composite;
pub mod config;
pub mod geometry;
pub mod interaction;
pub mod keyboard;
pub mod region;
pub mod session;
pub mod source;
pub mod viewport;

pub use composite::{render, CompositeError, Output, RenderOptions};
pub use config::CropperConfig;
pub use geometry::{Point, Rect, Size};
pub use interaction::{DragMode, HitTarget, InteractionController, InteractionState, PointerEvent};
pub use keyboard::{Key, KeyCommand, KeyEvent, KeyboardSubscription, Modifiers};
pub use region::{CropRegion, Handle};
pub use session::{
    CompletedRender, CropHost, CropSession, RenderJob, SessionError, SessionSnapshot,
    SessionStatus,
};
pub use source::{Bitmap, DecodeError, FilterType, ImageSource, MediaType};
pub use viewport::{compute_display_rect, Quadrant, ViewLimits, ViewportTransform};
