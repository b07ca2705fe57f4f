//! WASM bindings for an interactive crop session.
//!
//! [`JsCropSession`] wraps the core session for a browser host. The host
//! forwards pointer, wheel, key and resize events, draws the overlay from
//! `snapshot()`, and receives the result through the `onCrop` / `onCancel`
//! callbacks it passes to `apply`, `cancel` and `handleKey`.
//!
//! # Example
//!
//! ```typescript
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const session = new JsCropSession(bytes, file.type, 1.0, el.clientWidth, el.clientHeight);
//!
//! el.onpointerdown = (e) => session.pointerDown(e.offsetX, e.offsetY) && redraw();
//! el.onwheel = (e) => session.wheel(e.deltaY) && redraw();
//!
//! saveButton.onclick = () => session.apply((out) => upload(out.bytes, out.mediaType));
//! ```

use cropper_core::{CropHost, CropSession, CropperConfig, DecodeError, Output, Point, Size};
use js_sys::Function;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

use crate::types::{command_name, key_event, JsCropOutput};

/// Forwards core callbacks to JavaScript functions.
///
/// A throwing callback cannot unwind through the core session, so the first
/// error is kept and returned once the core call finishes.
struct CallbackHost<'a> {
    on_crop: Option<&'a Function>,
    on_cancel: Option<&'a Function>,
    error: Option<JsValue>,
}

impl<'a> CallbackHost<'a> {
    fn new(on_crop: Option<&'a Function>, on_cancel: Option<&'a Function>) -> Self {
        Self {
            on_crop,
            on_cancel,
            error: None,
        }
    }

    fn finish(self) -> Result<(), JsValue> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl CropHost for CallbackHost<'_> {
    fn on_crop(&mut self, output: Output) {
        if let Some(callback) = self.on_crop {
            let value = JsValue::from(JsCropOutput::from(output));
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                warn!("onCrop callback threw");
                self.error = Some(e);
            }
        }
    }

    fn on_cancel(&mut self) {
        if let Some(callback) = self.on_cancel {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                warn!("onCancel callback threw");
                self.error = Some(e);
            }
        }
    }
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Open a core session from constructor arguments.
fn open_session(
    bytes: &[u8],
    mime: &str,
    aspect_ratio: Option<f64>,
    container_width: f64,
    container_height: f64,
    config: CropperConfig,
) -> Result<CropSession, DecodeError> {
    CropSession::open_mime(
        bytes,
        mime,
        aspect_ratio,
        Size::new(container_width, container_height),
        config,
    )
}

/// An interactive cropping session for one image.
///
/// All coordinates are CSS pixels relative to the editing surface. Methods
/// returning `bool` report whether anything visible changed.
#[wasm_bindgen]
pub struct JsCropSession {
    inner: CropSession,
}

#[wasm_bindgen]
impl JsCropSession {
    /// Decode `bytes` and open a session.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The image file as a `Uint8Array`
    /// * `mime` - Declared media type (`image/jpeg`, `image/png`, `image/webp`)
    /// * `aspect_ratio` - Optional width / height lock for the crop
    /// * `container_width`, `container_height` - Size of the editing surface
    /// * `config` - Optional partial config object (camelCase keys)
    ///
    /// # Errors
    ///
    /// Throws if the media type is unsupported, the bytes don't decode, or
    /// `config` has the wrong shape.
    #[wasm_bindgen(constructor)]
    pub fn new(
        bytes: &[u8],
        mime: &str,
        aspect_ratio: Option<f64>,
        container_width: f64,
        container_height: f64,
        config: JsValue,
    ) -> Result<JsCropSession, JsValue> {
        let config: CropperConfig = if config.is_undefined() || config.is_null() {
            CropperConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid cropper config: {}", e)))?
        };

        let inner = open_session(
            bytes,
            mime,
            aspect_ratio,
            container_width,
            container_height,
            config,
        )
        .map_err(to_js_error)?;
        debug!("js crop session created");
        Ok(Self { inner })
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.inner.pointer_down(Point::new(x, y))
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.inner.pointer_move(Point::new(x, y))
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> bool {
        self.inner.pointer_up()
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) -> bool {
        self.inner.pointer_leave()
    }

    /// One zoom step per wheel event; negative `delta_y` zooms in.
    pub fn wheel(&mut self, delta_y: f64) -> bool {
        self.inner.wheel(delta_y)
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> bool {
        self.inner.zoom_in()
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> bool {
        self.inner.zoom_out()
    }

    /// Rotate 90° counter-clockwise.
    pub fn rotate(&mut self) -> bool {
        self.inner.rotate()
    }

    #[wasm_bindgen(js_name = setCropMode)]
    pub fn set_crop_mode(&mut self, enabled: bool) {
        self.inner.set_crop_mode(enabled);
    }

    /// Flip crop editing mode. Returns the new state.
    #[wasm_bindgen(js_name = toggleCropMode)]
    pub fn toggle_crop_mode(&mut self) -> bool {
        self.inner.toggle_crop_mode()
    }

    #[wasm_bindgen(getter, js_name = cropMode)]
    pub fn crop_mode(&self) -> bool {
        self.inner.crop_mode()
    }

    /// Call when the editing surface changes size.
    #[wasm_bindgen(js_name = resizeViewport)]
    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        self.inner.resize_viewport(Size::new(width, height));
    }

    /// What a pointer-down at `(x, y)` would grab, as
    /// `{ kind: "handle", handle: "nw" }`, `{ kind: "crop" }` or
    /// `{ kind: "image" }`. Useful for choosing a cursor.
    #[wasm_bindgen(js_name = hitTest)]
    pub fn hit_test(&self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.hit_test(Point::new(x, y))).map_err(to_js_error)
    }

    /// Current geometry and state for drawing the overlay.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.snapshot()).map_err(to_js_error)
    }

    /// Dispatch a `KeyboardEvent`. Returns the triggered command's name
    /// (`"rotate"`, `"confirm"`, ...) or `undefined`.
    ///
    /// # Errors
    ///
    /// Throws if a confirm fails or a callback throws.
    #[wasm_bindgen(js_name = handleKey)]
    #[allow(clippy::too_many_arguments)]
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        meta: bool,
        shift: bool,
        alt: bool,
        on_crop: &Function,
        on_cancel: &Function,
    ) -> Result<Option<String>, JsValue> {
        let event = key_event(key, ctrl, meta, shift, alt);
        let mut host = CallbackHost::new(Some(on_crop), Some(on_cancel));
        let command = self
            .inner
            .handle_key(&event, &mut host)
            .map_err(to_js_error)?;
        host.finish()?;
        Ok(command.map(|c| command_name(c).to_string()))
    }

    /// Render the crop and pass `{ bytes, mediaType, width, height }` to
    /// `on_crop`. The session closes on success.
    ///
    /// # Errors
    ///
    /// Throws if the session is closed, crop mode is off, or encoding fails.
    /// After an encoding failure the session stays open for a retry.
    pub fn apply(&mut self, on_crop: &Function) -> Result<(), JsValue> {
        let mut host = CallbackHost::new(Some(on_crop), None);
        self.inner.apply(&mut host).map_err(to_js_error)?;
        host.finish()
    }

    /// Abort the session, releasing the decoded image, then call `on_cancel`.
    /// Returns `false` if the session had already closed.
    pub fn cancel(&mut self, on_cancel: &Function) -> Result<bool, JsValue> {
        let mut host = CallbackHost::new(None, Some(on_cancel));
        let cancelled = self.inner.cancel(&mut host);
        host.finish()?;
        Ok(cancelled)
    }

    #[wasm_bindgen(getter, js_name = isClosed)]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}


/// WASM-specific tests that require JsValue.
///
/// These tests exercise the JavaScript-facing constructor and callbacks and
/// can only run on wasm32 targets. Use `wasm-pack test` to run these.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use cropper_core::composite::encode_bitmap;
    use cropper_core::{Bitmap, MediaType};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let bitmap = Bitmap::new(width, height, vec![64u8; (width * height * 4) as usize]);
        encode_bitmap(&bitmap, MediaType::Png, 90).unwrap()
    }

    fn session(config: JsValue) -> JsCropSession {
        JsCropSession::new(&png_bytes(160, 120), "image/png", Some(1.0), 800.0, 500.0, config)
            .unwrap()
    }

    fn read(value: &JsValue, key: &str) -> JsValue {
        js_sys::Reflect::get(value, &JsValue::from_str(key)).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_constructor_default_config() {
        let session = session(JsValue::UNDEFINED);
        assert!(session.crop_mode());
        assert!(!session.is_closed());
    }

    #[wasm_bindgen_test]
    fn test_constructor_partial_config() {
        let config = js_sys::Object::new();
        js_sys::Reflect::set(&config, &"cropModeOnOpen".into(), &JsValue::FALSE).unwrap();
        js_sys::Reflect::set(&config, &"outputLongSide".into(), &JsValue::from(256)).unwrap();

        let session = session(config.into());
        assert!(!session.crop_mode());
    }

    #[wasm_bindgen_test]
    fn test_constructor_rejects_bad_config() {
        let result = JsCropSession::new(
            &png_bytes(16, 16),
            "image/png",
            None,
            800.0,
            500.0,
            JsValue::from_str("nope"),
        );
        assert!(result.is_err());
    }

    #[wasm_bindgen_test]
    fn test_constructor_rejects_corrupt_bytes() {
        let result =
            JsCropSession::new(&[1, 2, 3, 4], "image/png", None, 800.0, 500.0, JsValue::NULL);
        assert!(result.is_err());
    }

    #[wasm_bindgen_test]
    fn test_snapshot_shape() {
        let mut session = session(JsValue::NULL);
        session.rotate();
        let snapshot = session.snapshot().unwrap();

        assert_eq!(read(&snapshot, "rotationDegrees").as_f64(), Some(90.0));
        assert_eq!(read(&snapshot, "cropMode").as_bool(), Some(true));
        let crop = read(&snapshot, "cropRect");
        assert!(read(&crop, "width").as_f64().unwrap() > 0.0);
    }

    #[wasm_bindgen_test]
    fn test_apply_invokes_callback() {
        let mut session = session(JsValue::NULL);
        let on_crop = Function::new_with_args("out", "globalThis.__cropOut = out;");

        session.apply(&on_crop).unwrap();

        let out = read(&js_sys::global().into(), "__cropOut");
        assert_eq!(read(&out, "width").as_f64(), Some(800.0));
        assert_eq!(read(&out, "mediaType").as_string().as_deref(), Some("image/png"));
        assert!(session.is_closed());
    }

    #[wasm_bindgen_test]
    fn test_cancel_invokes_callback_once() {
        let mut session = session(JsValue::NULL);
        let on_cancel = Function::new_no_args("globalThis.__cancels = (globalThis.__cancels || 0) + 1;");

        assert!(session.cancel(&on_cancel).unwrap());
        assert!(!session.cancel(&on_cancel).unwrap());

        let count = read(&js_sys::global().into(), "__cancels");
        assert_eq!(count.as_f64(), Some(1.0));
    }

    #[wasm_bindgen_test]
    fn test_throwing_callback_surfaces_error() {
        let mut session = session(JsValue::NULL);
        let on_crop = Function::new_with_args("out", "throw new Error('upload failed');");

        assert!(session.apply(&on_crop).is_err());
    }

    #[wasm_bindgen_test]
    fn test_handle_key_rotate() {
        let mut session = session(JsValue::NULL);
        let noop = Function::new_no_args("");

        let command = session
            .handle_key("r", false, false, false, false, &noop, &noop)
            .unwrap();
        assert_eq!(command.as_deref(), Some("rotate"));

        let none = session
            .handle_key("q", false, false, false, false, &noop, &noop)
            .unwrap();
        assert_eq!(none, None);
    }
}
