//! Image decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};

use super::{ImageInput, InputError};

/// A decoded input image with RGBA pixel data.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Image width in pixels (after orientation correction).
    pub width: u32,
    /// Image height in pixels (after orientation correction).
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    fn from_dynamic(img: DynamicImage) -> Self {
        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: rgba.into_raw(),
        }
    }

    /// Drop the alpha channel, producing RGB pixel data.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }

    /// Convert to an `image::DynamicImage` for resampling.
    pub fn to_dynamic(&self) -> Option<DynamicImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .map(DynamicImage::ImageRgba8)
    }
}

/// Decode an image input of either encoding.
///
/// The format is sniffed from the bytes, so the declared MIME type is only
/// used to filter inputs, not to pick a decoder. EXIF orientation is applied.
///
/// # Errors
///
/// Returns `InputError::Empty` for empty inputs, data URL errors for
/// malformed URLs and `InputError::Decode` if the bytes are not an image.
pub fn decode_image(input: &ImageInput) -> Result<DecodedImage, InputError> {
    let bytes = input.to_bytes()?;
    if bytes.is_empty() {
        return Err(InputError::Empty);
    }

    let orientation = read_orientation(&bytes);

    let img = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| InputError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| InputError::Decode(e.to_string()))?;

    Ok(DecodedImage::from_dynamic(apply_orientation(img, orientation)))
}

/// Read the EXIF orientation tag (1-8), defaulting to 1 (normal).
fn read_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1)
}

/// Apply an EXIF orientation value to an image.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
