//! WASM-compatible wrapper types for crop results and input events.
//!
//! This module provides JavaScript-friendly types that wrap the core cropper
//! types, handling the conversion between Rust and JavaScript data
//! representations.

use cropper_core::{Key, KeyCommand, KeyEvent, Modifiers, Output};
use wasm_bindgen::prelude::*;

/// The cropped file handed to the `onCrop` callback.
///
/// Shaped like `{ bytes, mediaType, width, height }` on the JavaScript side.
///
/// # Memory Management
///
/// The encoded bytes live in WASM memory. `bytes` copies them into a
/// `Uint8Array`; read it once and keep the JavaScript copy.
#[wasm_bindgen]
pub struct JsCropOutput {
    bytes: Vec<u8>,
    media_type: String,
    width: u32,
    height: u32,
}

#[wasm_bindgen]
impl JsCropOutput {
    /// Encoded file bytes as Uint8Array (copied).
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// MIME type of `bytes`, same as the input's.
    #[wasm_bindgen(getter, js_name = mediaType)]
    pub fn media_type(&self) -> String {
        self.media_type.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the number of encoded bytes
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

impl From<Output> for JsCropOutput {
    fn from(output: Output) -> Self {
        Self {
            media_type: output.media_type.as_mime().to_string(),
            width: output.width,
            height: output.height,
            bytes: output.bytes,
        }
    }
}

/// Build a core key event from `KeyboardEvent` fields.
pub(crate) fn key_event(key: &str, ctrl: bool, meta: bool, shift: bool, alt: bool) -> KeyEvent {
    KeyEvent::new(
        Key::parse(key),
        Modifiers {
            ctrl,
            meta,
            shift,
            alt,
        },
    )
}

/// Name a command the way the JavaScript side spells it.
pub(crate) fn command_name(command: KeyCommand) -> &'static str {
    match command {
        KeyCommand::Rotate => "rotate",
        KeyCommand::Cancel => "cancel",
        KeyCommand::Confirm => "confirm",
        KeyCommand::ZoomIn => "zoomIn",
        KeyCommand::ZoomOut => "zoomOut",
        KeyCommand::ToggleCropMode => "toggleCropMode",
    }
}
