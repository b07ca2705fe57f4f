//! Cropper WASM - WebAssembly bindings for the cropper engine
//!
//! This crate exposes cropper-core's interactive crop session to
//! JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `session` - The interactive crop session (pointer, wheel, keys, apply/cancel)
//! - `types` - WASM-compatible wrapper types for crop results and key events
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsCropSession } from '@cropper/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const session = new JsCropSession(bytes, file.type, 1.0, 800, 500);
//! session.rotate();
//! session.apply(({ bytes, mediaType, width, height }) => {
//!   console.log(`Cropped ${width}x${height} ${mediaType}`);
//! });
//! ```

use wasm_bindgen::prelude::*;

mod session;
mod types;

// Re-export public types
pub use session::JsCropSession;
pub use types::JsCropOutput;

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Media types a session accepts, as MIME strings.
#[wasm_bindgen(js_name = supportedMediaTypes)]
pub fn supported_media_types() -> Vec<String> {
    use cropper_core::MediaType;
    [MediaType::Jpeg, MediaType::Png, MediaType::WebP]
        .iter()
        .map(|m| m.as_mime().to_string())
        .collect()
}
