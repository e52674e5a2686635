//! PNG encoding for downloads.

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{check_rgba, EncodeError};

/// Encode RGBA pixel data to PNG bytes.
///
/// # Arguments
///
/// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Example
///
/// ```
/// use retouch_core::encode::encode_png;
///
/// let pixels = vec![0u8; 8 * 8 * 4]; // Fully transparent
/// let png = encode_png(&pixels, 8, 8).unwrap();
/// assert_eq!(&png[1..4], b"PNG");
/// ```
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    check_rgba(pixels, width, height)?;

    let mut buffer = Cursor::new(Vec::new());
    PngEncoder::new(&mut buffer)
        .write_image(pixels, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: "PNG",
            reason: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}
