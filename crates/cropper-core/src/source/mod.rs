//! The decoded input image.
//!
//! This module provides:
//! - Media type parsing for the formats the engine can round-trip
//! - Decoding input bytes into an RGBA [`Bitmap`]
//! - EXIF orientation correction for JPEG input
//!
//! An [`ImageSource`] is immutable once decoded. Sessions hold it behind an
//! `Arc` so a background render can keep it alive after the session closes.

mod load;
mod types;

pub use types::{Bitmap, DecodeError, FilterType, ImageSource, MediaType, Orientation};
