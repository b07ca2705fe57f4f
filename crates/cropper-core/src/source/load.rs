//! Decoding input bytes into an [`ImageSource`], with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};
use tracing::{debug, instrument, warn};

use super::{Bitmap, DecodeError, ImageSource, MediaType, Orientation};

impl ImageSource {
    /// Decode `bytes` into a bitmap, remembering `media_type` for the output.
    ///
    /// The content is sniffed rather than trusted, so a PNG labelled
    /// `image/jpeg` still decodes; the declared type only selects the output
    /// encoder. JPEG input is rotated upright according to its EXIF tag.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::CorruptedFile` if the bytes are not a valid or
    /// complete raster image, and `DecodeError::EmptyImage` if the image has
    /// no pixels. Nothing is constructed on failure.
    #[instrument(skip_all, fields(len = bytes.len(), media_type = %media_type))]
    pub fn load(bytes: &[u8], media_type: MediaType) -> Result<ImageSource, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::CorruptedFile("empty input".to_string()));
        }

        let orientation = match media_type {
            MediaType::Jpeg => extract_orientation(bytes),
            _ => Orientation::Normal,
        };

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

        if reader.format().is_none() {
            return Err(DecodeError::CorruptedFile(
                "unrecognized image signature".to_string(),
            ));
        }

        let img = reader.decode().map_err(|e| {
            warn!(error = %e, "decode failed");
            DecodeError::CorruptedFile(e.to_string())
        })?;

        let oriented = apply_orientation(img, orientation);
        let bitmap = Bitmap::from_rgba_image(oriented.into_rgba8());
        if bitmap.is_empty() {
            return Err(DecodeError::EmptyImage);
        }

        debug!(
            width = bitmap.width,
            height = bitmap.height,
            ?orientation,
            "image decoded"
        );
        Ok(ImageSource::new(bitmap, media_type))
    }

    /// Parse `mime` and decode `bytes`. See [`ImageSource::load`].
    pub fn load_mime(bytes: &[u8], mime: &str) -> Result<ImageSource, DecodeError> {
        let media_type = MediaType::parse(mime)?;
        Self::load(bytes, media_type)
    }
}

/// Extract EXIF orientation from JPEG bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
