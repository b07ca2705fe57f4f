//! The editing session: one image, one crop, one result.
//!
//! A [`CropSession`] owns the decoded image, the viewport, the crop region,
//! the drag state machine and the keyboard subscription. Input handlers are
//! total and never fail; only opening (decode) and applying (render/encode)
//! return errors.
//!
//! # Lifecycle
//!
//! ```text
//! open ──> Active ──apply──> Applied
//!            │
//!            └──cancel──> Cancelled
//! ```
//!
//! Closing either way releases the decoded bitmap and the keyboard
//! subscription before the host callback runs. After that every input is
//! ignored.
//!
//! # Background Rendering
//!
//! [`CropSession::begin_render`] snapshots the current state into a
//! [`RenderJob`], which is `Send` and can run on a worker. Its
//! [`CompletedRender`] goes back through [`CropSession::finish_render`]. Only
//! one job may be in flight; a result that arrives after cancel is dropped.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::composite::{self, CompositeError, Output, RenderOptions};
use crate::config::CropperConfig;
use crate::geometry::{Point, Rect, Size};
use crate::interaction::{DragMode, HitTarget, InteractionController, PointerEvent, Scene};
use crate::keyboard::{KeyCommand, KeyEvent, KeyboardSubscription};
use crate::region::{CropRegion, Handle};
use crate::source::{DecodeError, ImageSource, MediaType};
use crate::viewport::{Quadrant, ViewLimits, ViewportTransform};

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,

    #[error("A render is already in flight")]
    RenderInFlight,

    #[error("Crop mode is not active")]
    CropModeInactive,

    #[error("Render result does not match the job in flight")]
    StaleRender,

    #[error(transparent)]
    Composite(#[from] CompositeError),
}

/// Receives the session's result. Exactly one of the two is called, once.
pub trait CropHost {
    fn on_crop(&mut self, output: Output);
    fn on_cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Applied,
    Cancelled,
}

/// A render detached from the session.
#[derive(Debug, Clone)]
pub struct RenderJob {
    id: u64,
    source: Arc<ImageSource>,
    viewport: ViewportTransform,
    container: Size,
    crop: Rect,
    options: RenderOptions,
}

impl RenderJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Run the render. May be called on any thread.
    pub fn run(self) -> CompletedRender {
        let result = composite::render(
            &self.source,
            &self.viewport,
            self.container,
            &self.crop,
            &self.options,
        );
        CompletedRender {
            id: self.id,
            result,
        }
    }
}

/// The outcome of a [`RenderJob`].
#[derive(Debug)]
pub struct CompletedRender {
    id: u64,
    result: Result<Output, CompositeError>,
}

impl CompletedRender {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn result(&self) -> &Result<Output, CompositeError> {
        &self.result
    }
}

/// Position of one corner handle, for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandlePosition {
    pub handle: Handle,
    pub position: Point,
}

/// Everything a host needs to draw the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub container: Size,
    pub intrinsic: Size,
    pub display_rect: Rect,
    pub crop_rect: Rect,
    pub handles: Vec<HandlePosition>,
    pub aspect_ratio: Option<f64>,
    pub scale: f64,
    pub quadrant: Quadrant,
    pub rotation_degrees: u16,
    pub mode: DragMode,
    pub active_handle: Option<Handle>,
    pub crop_mode: bool,
    pub render_in_flight: bool,
}

/// An interactive cropping session over one decoded image.
#[derive(Debug)]
pub struct CropSession {
    source: Option<Arc<ImageSource>>,
    media_type: MediaType,
    intrinsic: Size,
    container: Size,
    viewport: ViewportTransform,
    crop: CropRegion,
    controller: InteractionController,
    keyboard: Option<KeyboardSubscription>,
    config: CropperConfig,
    status: SessionStatus,
    render_in_flight: Option<u64>,
    next_render_id: u64,
}

impl CropSession {
    /// Decode `bytes` and open a session on the result.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Encoded image file
    /// * `media_type` - Declared type; also the output encoding
    /// * `aspect_ratio` - Optional width / height lock for the crop
    /// * `container` - Size of the editing surface; replaced by
    ///   `config.fallback_container` if not measurable
    /// * `config` - Tunables; sanitized before use
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] if the bytes cannot be decoded. No session
    /// exists in that case.
    pub fn open(
        bytes: &[u8],
        media_type: MediaType,
        aspect_ratio: Option<f64>,
        container: Size,
        config: CropperConfig,
    ) -> Result<Self, DecodeError> {
        let source = ImageSource::load(bytes, media_type)?;
        Ok(Self::from_source(source, aspect_ratio, container, config))
    }

    /// [`CropSession::open`] with the media type given as a MIME string.
    pub fn open_mime(
        bytes: &[u8],
        mime: &str,
        aspect_ratio: Option<f64>,
        container: Size,
        config: CropperConfig,
    ) -> Result<Self, DecodeError> {
        Self::open(bytes, MediaType::parse(mime)?, aspect_ratio, container, config)
    }

    /// Open a session on an already decoded image.
    pub fn from_source(
        source: ImageSource,
        aspect_ratio: Option<f64>,
        container: Size,
        config: CropperConfig,
    ) -> Self {
        let config = config.sanitized();
        let container = measure(container, config.fallback_container);
        let intrinsic = source.intrinsic_size();
        let viewport = ViewportTransform::new(container, intrinsic, ViewLimits::from(&config));
        let crop = CropRegion::initialize(
            viewport.display_rect(container, intrinsic),
            aspect_ratio,
            config.min_crop_size,
            config.initial_crop_ratio,
        );

        info!(
            width = source.intrinsic_width(),
            height = source.intrinsic_height(),
            media_type = %source.media_type(),
            aspect_ratio = ?crop.aspect_ratio(),
            "crop session opened"
        );

        Self {
            media_type: source.media_type(),
            source: Some(Arc::new(source)),
            intrinsic,
            container,
            viewport,
            crop,
            controller: InteractionController::new(
                config.crop_mode_on_open,
                config.handle_hit_radius,
            ),
            keyboard: Some(KeyboardSubscription::with_default_bindings()),
            config,
            status: SessionStatus::Active,
            render_in_flight: None,
            next_render_id: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_closed(&self) -> bool {
        self.status != SessionStatus::Active
    }

    /// The decoded image, until the session closes.
    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_deref()
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn config(&self) -> &CropperConfig {
        &self.config
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn crop(&self) -> &CropRegion {
        &self.crop
    }

    pub fn display_rect(&self) -> Rect {
        self.viewport.display_rect(self.container, self.intrinsic)
    }

    pub fn crop_mode(&self) -> bool {
        self.controller.crop_mode()
    }

    pub fn is_render_in_flight(&self) -> bool {
        self.render_in_flight.is_some()
    }

    /// The keyboard table, for rebinding. `None` once closed.
    pub fn keyboard_mut(&mut self) -> Option<&mut KeyboardSubscription> {
        self.keyboard.as_mut()
    }

    /// What a pointer-down at `point` would grab.
    pub fn hit_test(&self, point: Point) -> HitTarget {
        self.controller.hit_test(point, &self.crop)
    }

    pub fn pointer_down(&mut self, point: Point) -> bool {
        self.pointer(PointerEvent::Down(point))
    }

    pub fn pointer_move(&mut self, point: Point) -> bool {
        self.pointer(PointerEvent::Move(point))
    }

    pub fn pointer_up(&mut self) -> bool {
        self.pointer(PointerEvent::Up)
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.pointer(PointerEvent::Leave)
    }

    /// Feed a pointer event to the drag state machine. Returns whether the
    /// viewport or crop changed.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        let mut scene = Scene {
            viewport: &mut self.viewport,
            crop: &mut self.crop,
            container: self.container,
            intrinsic: self.intrinsic,
        };
        self.controller.handle(event, &mut scene)
    }

    /// A wheel gesture: one zoom step per event. Negative `delta_y` (scrolling
    /// up) zooms in.
    pub fn wheel(&mut self, delta_y: f64) -> bool {
        if delta_y < 0.0 {
            self.zoom_in()
        } else if delta_y > 0.0 {
            self.zoom_out()
        } else {
            false
        }
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        let changed = self.viewport.zoom_in(self.container, self.intrinsic);
        self.reconcile_crop();
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        let changed = self.viewport.zoom_out(self.container, self.intrinsic);
        self.reconcile_crop();
        changed
    }

    /// Rotate 90° counter-clockwise.
    pub fn rotate(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.viewport.rotate(self.container, self.intrinsic);
        self.reconcile_crop();
        true
    }

    pub fn set_crop_mode(&mut self, enabled: bool) {
        if self.is_closed() {
            return;
        }
        self.controller.set_crop_mode(enabled);
        debug!(enabled, "crop mode");
    }

    pub fn toggle_crop_mode(&mut self) -> bool {
        let enabled = !self.controller.crop_mode();
        self.set_crop_mode(enabled);
        self.controller.crop_mode()
    }

    /// The editing surface changed size. Re-centers the image and keeps the
    /// crop inside it.
    pub fn resize_viewport(&mut self, container: Size) {
        if self.is_closed() {
            return;
        }
        self.container = measure(container, self.config.fallback_container);
        self.viewport.recenter(self.container, self.intrinsic);
        self.reconcile_crop();
        debug!(
            width = self.container.width,
            height = self.container.height,
            "viewport resized"
        );
    }

    /// Dispatch a key press. Returns the command it triggered, if any.
    ///
    /// # Errors
    ///
    /// Only `Confirm` can fail, with the errors of [`CropSession::apply`].
    pub fn handle_key<H: CropHost>(
        &mut self,
        event: &KeyEvent,
        host: &mut H,
    ) -> Result<Option<KeyCommand>, SessionError> {
        let Some(command) = self.keyboard.as_ref().and_then(|keys| keys.resolve(event)) else {
            return Ok(None);
        };

        match command {
            KeyCommand::Rotate => {
                self.rotate();
            }
            KeyCommand::ZoomIn => {
                self.zoom_in();
            }
            KeyCommand::ZoomOut => {
                self.zoom_out();
            }
            KeyCommand::ToggleCropMode => {
                self.toggle_crop_mode();
            }
            KeyCommand::Cancel => {
                self.cancel(host);
            }
            KeyCommand::Confirm => self.apply(host)?,
        }
        Ok(Some(command))
    }

    /// Render the crop and hand it to `host`, closing the session.
    ///
    /// # Errors
    ///
    /// - `Closed` if the session already ended
    /// - `RenderInFlight` if a background render is pending
    /// - `CropModeInactive` if crop editing is off
    /// - `Composite` if rendering or encoding failed; the session stays
    ///   active so the host can retry or cancel
    pub fn apply<H: CropHost>(&mut self, host: &mut H) -> Result<(), SessionError> {
        let job = self.prepare_render()?;
        let completed = job.run();
        self.deliver(completed, host)
    }

    /// Start a background render of the current crop.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`CropSession::apply`].
    pub fn begin_render(&mut self) -> Result<RenderJob, SessionError> {
        let job = self.prepare_render()?;
        self.render_in_flight = Some(job.id);
        debug!(id = job.id, "render started");
        Ok(job)
    }

    /// Accept the result of a [`RenderJob`].
    ///
    /// Returns `Ok(false)` if the session was closed meanwhile and the result
    /// was discarded, `Ok(true)` once the output reached `host`.
    ///
    /// # Errors
    ///
    /// - `StaleRender` if `completed` is not the job in flight
    /// - `Composite` if the render failed; the session stays active
    pub fn finish_render<H: CropHost>(
        &mut self,
        completed: CompletedRender,
        host: &mut H,
    ) -> Result<bool, SessionError> {
        if self.is_closed() {
            debug!(id = completed.id, "discarding render for closed session");
            return Ok(false);
        }
        if self.render_in_flight != Some(completed.id) {
            return Err(SessionError::StaleRender);
        }
        self.render_in_flight = None;
        self.deliver(completed, host)?;
        Ok(true)
    }

    /// Abort the session. Resources are released before `host.on_cancel`
    /// runs. Returns `false` if the session was already closed.
    pub fn cancel<H: CropHost>(&mut self, host: &mut H) -> bool {
        if self.is_closed() {
            return false;
        }
        if let Some(id) = self.render_in_flight {
            debug!(id, "cancelling with render in flight");
        }
        self.close(SessionStatus::Cancelled);
        host.on_cancel();
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let crop_rect = self.crop.rect();
        let state = self.controller.state();
        let quadrant = self.viewport.quadrant();
        SessionSnapshot {
            status: self.status,
            container: self.container,
            intrinsic: self.intrinsic,
            display_rect: self.display_rect(),
            crop_rect,
            handles: Handle::ALL
                .into_iter()
                .map(|handle| HandlePosition {
                    handle,
                    position: handle.position(&crop_rect),
                })
                .collect(),
            aspect_ratio: self.crop.aspect_ratio(),
            scale: self.viewport.scale(),
            quadrant,
            rotation_degrees: quadrant.degrees(),
            mode: state.mode(),
            active_handle: state.active_handle(),
            crop_mode: self.controller.crop_mode(),
            render_in_flight: self.is_render_in_flight(),
        }
    }

    fn prepare_render(&mut self) -> Result<RenderJob, SessionError> {
        let source = match (&self.source, self.status) {
            (Some(source), SessionStatus::Active) => Arc::clone(source),
            _ => return Err(SessionError::Closed),
        };
        if self.render_in_flight.is_some() {
            return Err(SessionError::RenderInFlight);
        }
        if !self.controller.crop_mode() {
            return Err(SessionError::CropModeInactive);
        }

        let id = self.next_render_id;
        self.next_render_id += 1;
        Ok(RenderJob {
            id,
            source,
            viewport: self.viewport.clone(),
            container: self.container,
            crop: self.crop.rect(),
            options: RenderOptions::from(&self.config),
        })
    }

    #[instrument(skip_all, fields(id = completed.id))]
    fn deliver<H: CropHost>(
        &mut self,
        completed: CompletedRender,
        host: &mut H,
    ) -> Result<(), SessionError> {
        let output = completed.result.map_err(|e| {
            warn!(error = %e, "render failed");
            SessionError::from(e)
        })?;
        info!(
            width = output.width,
            height = output.height,
            bytes = output.bytes.len(),
            "crop applied"
        );
        self.close(SessionStatus::Applied);
        host.on_crop(output);
        Ok(())
    }

    fn reconcile_crop(&mut self) {
        let bounds = self.display_rect();
        self.crop.constrain_to(bounds);
    }

    fn close(&mut self, status: SessionStatus) {
        self.status = status;
        self.source = None;
        self.keyboard = None;
        self.render_in_flight = None;
        self.controller = InteractionController::new(false, self.config.handle_hit_radius);
        debug!(?status, "crop session closed");
    }
}

/// The container size to lay out against: `container` if it is measurable,
/// otherwise `fallback`.
fn measure(container: Size, fallback: Size) -> Size {
    if container.is_measurable() {
        container
    } else {
        warn!(
            width = container.width,
            height = container.height,
            "container not measurable, using fallback size"
        );
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::encode_bitmap;
    use crate::keyboard::{Key, Modifiers};
    use crate::source::Bitmap;

    const CONTAINER: Size = Size {
        width: 800.0,
        height: 500.0,
    };

    #[derive(Default)]
    struct RecordingHost {
        outputs: Vec<Output>,
        cancels: usize,
    }

    impl CropHost for RecordingHost {
        fn on_crop(&mut self, output: Output) {
            self.outputs.push(output);
        }

        fn on_cancel(&mut self) {
            self.cancels += 1;
        }
    }

    fn gradient(width: u32, height: u32) -> Bitmap {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 128, 255]);
            }
        }
        Bitmap::new(width, height, pixels)
    }

    fn session(aspect_ratio: Option<f64>) -> CropSession {
        let source = ImageSource::new(gradient(1600, 1200), MediaType::Png);
        CropSession::from_source(source, aspect_ratio, CONTAINER, CropperConfig::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_open_from_bytes() {
        let png = encode_bitmap(&gradient(64, 32), MediaType::Png, 90).unwrap();
        let session = CropSession::open_mime(
            &png,
            "image/png",
            None,
            CONTAINER,
            CropperConfig::default(),
        )
        .unwrap();

        let source = session.source().unwrap();
        assert_eq!((source.intrinsic_width(), source.intrinsic_height()), (64, 32));
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(session.crop_mode());
    }

    #[test]
    fn test_open_corrupt_bytes_fails() {
        let png = encode_bitmap(&gradient(64, 32), MediaType::Png, 90).unwrap();
        let result = CropSession::open(
            &png[..png.len() / 2],
            MediaType::Png,
            None,
            CONTAINER,
            CropperConfig::default(),
        );
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
    }

    #[test]
    fn test_open_unknown_mime_fails() {
        let result =
            CropSession::open_mime(&[1, 2, 3], "image/gif", None, CONTAINER, CropperConfig::default());
        assert!(matches!(result, Err(DecodeError::UnsupportedMediaType(_))));
    }

    #[test]
    fn test_unmeasurable_container_uses_fallback() {
        let source = ImageSource::new(gradient(100, 100), MediaType::Png);
        let session = CropSession::from_source(
            source,
            None,
            Size::new(0.0, 0.0),
            CropperConfig::default(),
        );
        assert_eq!(session.container(), Size::new(800.0, 600.0));
    }

    #[test]
    fn test_initial_layout_matches_scenario() {
        let session = session(Some(1.0));
        let display = session.display_rect();
        let crop = session.crop().rect();

        assert!(approx(display.width, 1600.0 / 3.0));
        assert!(approx(display.height, 400.0));
        assert!(approx(crop.width, 320.0));
        assert!(approx(crop.height, 320.0));
        assert!(approx(crop.center().x, 400.0));
        assert!(approx(crop.center().y, 250.0));
    }

    #[test]
    fn test_apply_delivers_800_square_and_closes() {
        let mut session = session(Some(1.0));
        let mut host = RecordingHost::default();

        session.apply(&mut host).unwrap();

        assert_eq!(host.outputs.len(), 1);
        let output = &host.outputs[0];
        assert_eq!((output.width, output.height), (800, 800));
        assert_eq!(output.media_type, MediaType::Png);
        assert_eq!(session.status(), SessionStatus::Applied);
        assert!(session.source().is_none());
        assert!(matches!(session.apply(&mut host), Err(SessionError::Closed)));
        assert_eq!(host.outputs.len(), 1);
    }

    #[test]
    fn test_apply_requires_crop_mode() {
        let mut session = session(None);
        let mut host = RecordingHost::default();
        session.set_crop_mode(false);

        assert!(matches!(
            session.apply(&mut host),
            Err(SessionError::CropModeInactive)
        ));
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn test_cancel_releases_and_notifies() {
        let mut session = session(None);
        let mut host = RecordingHost::default();

        assert!(session.cancel(&mut host));
        assert_eq!(host.cancels, 1);
        assert!(session.source().is_none());
        assert!(session.keyboard_mut().is_none());

        // Everything afterwards is ignored
        assert!(!session.cancel(&mut host));
        assert!(!session.rotate());
        assert!(!session.pointer_down(Point::new(400.0, 250.0)));
        assert_eq!(host.cancels, 1);
    }

    #[test]
    fn test_drag_crop_and_pan_image() {
        let mut session = session(Some(1.0));
        let before = session.crop().rect();

        session.pointer_down(before.center());
        assert_eq!(session.snapshot().mode, DragMode::MovingCrop);
        session.pointer_move(Point::new(before.center().x + 30.0, before.center().y));
        session.pointer_up();
        assert!(approx(session.crop().rect().x, before.x + 30.0));
        assert_eq!(session.snapshot().mode, DragMode::Idle);

        session.set_crop_mode(false);
        let pan = session.viewport().pan();
        session.pointer_down(before.center());
        assert_eq!(session.snapshot().mode, DragMode::PanningImage);
        session.pointer_move(Point::new(before.center().x, before.center().y + 20.0));
        session.pointer_leave();
        assert!(approx(session.viewport().pan().y, pan.y + 20.0));
        assert!(session.display_rect().contains_rect(&session.crop().rect()));
    }

    #[test]
    fn test_resize_to_tiny_snaps_to_min() {
        let mut session = session(Some(1.0));
        let rect = session.crop().rect();

        session.pointer_down(Point::new(rect.right(), rect.bottom()));
        assert_eq!(session.snapshot().active_handle, Some(Handle::SouthEast));
        session.pointer_move(Point::new(rect.x + 10.0, rect.y + 10.0));
        session.pointer_up();

        let resized = session.crop().rect();
        assert!(approx(resized.width, 50.0));
        assert!(approx(resized.height, 50.0));
    }

    #[test]
    fn test_wheel_zooms_in_steps() {
        let mut session = session(None);

        assert!(session.wheel(-120.0));
        assert!(approx(session.viewport().scale(), 1.1));
        assert!(session.wheel(53.0));
        assert!(approx(session.viewport().scale(), 1.0));
        assert!(!session.wheel(0.0));

        for _ in 0..20 {
            session.wheel(1.0);
        }
        assert!(approx(session.viewport().scale(), 0.5));
        assert!(session.display_rect().contains_rect(&session.crop().rect()));
    }

    #[test]
    fn test_rotate_keeps_crop_contained() {
        let mut session = session(Some(1.0));
        for _ in 0..4 {
            session.rotate();
            assert!(session.display_rect().contains_rect(&session.crop().rect()));
            assert!(approx(session.crop().rect().aspect(), 1.0));
        }
        assert_eq!(session.viewport().quadrant(), Quadrant::Deg0);
    }

    #[test]
    fn test_resize_viewport_reconciles_crop() {
        let mut session = session(None);
        session.resize_viewport(Size::new(300.0, 200.0));

        assert_eq!(session.container(), Size::new(300.0, 200.0));
        assert!(session.display_rect().contains_rect(&session.crop().rect()));

        session.resize_viewport(Size::new(f64::NAN, 10.0));
        assert_eq!(session.container(), Size::new(800.0, 600.0));
    }

    #[test]
    fn test_keyboard_commands() {
        let mut session = session(None);
        let mut host = RecordingHost::default();

        let rotated = session
            .handle_key(&KeyEvent::plain(Key::parse("r")), &mut host)
            .unwrap();
        assert_eq!(rotated, Some(KeyCommand::Rotate));
        assert_eq!(session.viewport().quadrant(), Quadrant::Deg90);

        session
            .handle_key(&KeyEvent::plain(Key::parse("c")), &mut host)
            .unwrap();
        assert!(!session.crop_mode());

        let ignored = session
            .handle_key(&KeyEvent::plain(Key::parse("x")), &mut host)
            .unwrap();
        assert_eq!(ignored, None);

        let confirm = KeyEvent::new(
            Key::Enter,
            Modifiers {
                meta: true,
                ..Modifiers::default()
            },
        );
        assert!(matches!(
            session.handle_key(&confirm, &mut host),
            Err(SessionError::CropModeInactive)
        ));

        session.set_crop_mode(true);
        session.handle_key(&confirm, &mut host).unwrap();
        assert_eq!(host.outputs.len(), 1);

        // Subscription is gone with the session
        let after = session
            .handle_key(&KeyEvent::plain(Key::Escape), &mut host)
            .unwrap();
        assert_eq!(after, None);
        assert_eq!(host.cancels, 0);
    }

    #[test]
    fn test_escape_cancels() {
        let mut session = session(None);
        let mut host = RecordingHost::default();

        session
            .handle_key(&KeyEvent::plain(Key::Escape), &mut host)
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert_eq!(host.cancels, 1);
    }

    #[test]
    fn test_background_render_round_trip() {
        let mut session = session(Some(2.0));
        let mut host = RecordingHost::default();

        let job = session.begin_render().unwrap();
        assert!(session.is_render_in_flight());
        assert!(matches!(
            session.begin_render(),
            Err(SessionError::RenderInFlight)
        ));
        assert!(matches!(
            session.apply(&mut host),
            Err(SessionError::RenderInFlight)
        ));

        let completed = std::thread::spawn(move || job.run()).join().unwrap();
        assert!(session.finish_render(completed, &mut host).unwrap());

        assert_eq!(host.outputs.len(), 1);
        assert_eq!((host.outputs[0].width, host.outputs[0].height), (800, 400));
        assert_eq!(session.status(), SessionStatus::Applied);
    }

    #[test]
    fn test_cancel_with_render_in_flight_discards_result() {
        let mut session = session(None);
        let mut host = RecordingHost::default();

        let job = session.begin_render().unwrap();
        session.cancel(&mut host);
        assert!(session.source().is_none());

        // The job still holds the bitmap and can finish
        let completed = job.run();
        assert!(completed.result().is_ok());
        assert!(!session.finish_render(completed, &mut host).unwrap());
        assert!(host.outputs.is_empty());
        assert_eq!(host.cancels, 1);
    }

    #[test]
    fn test_stale_render_rejected() {
        let mut session = session(None);
        let mut host = RecordingHost::default();

        let stale = session.begin_render().unwrap();
        let stale_id = stale.id();
        let completed = stale.run();
        // Simulate a job from an earlier round
        let forged = CompletedRender {
            id: stale_id + 7,
            result: completed.result,
        };
        assert!(matches!(
            session.finish_render(forged, &mut host),
            Err(SessionError::StaleRender)
        ));
        assert!(session.is_render_in_flight());
    }

    #[test]
    fn test_failed_render_keeps_session_active() {
        let mut session = session(None);
        let mut host = RecordingHost::default();

        let job = session.begin_render().unwrap();
        let failed = CompletedRender {
            id: job.id(),
            result: Err(CompositeError::Encode("disk full".to_string())),
        };
        assert!(matches!(
            session.finish_render(failed, &mut host),
            Err(SessionError::Composite(CompositeError::Encode(_)))
        ));
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(!session.is_render_in_flight());

        // Retry works
        session.apply(&mut host).unwrap();
        assert_eq!(host.outputs.len(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut session = session(Some(1.0));
        session.rotate();
        let snapshot = session.snapshot();

        assert_eq!(snapshot.handles.len(), 4);
        assert_eq!(snapshot.rotation_degrees, 90);
        assert_eq!(
            snapshot.handles[0].position,
            snapshot.crop_rect.origin()
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["quadrant"], 1);
        assert_eq!(json["mode"], "idle");
        assert_eq!(json["cropMode"], true);
        assert_eq!(json["handles"][3]["handle"], "se");
        assert!(json["cropRect"]["width"].is_number());
    }
}
