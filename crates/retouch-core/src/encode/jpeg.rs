//! JPEG encoding for downloads.
//!
//! JPEG has no alpha channel, so transparent pixels are composited onto a
//! white background before encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{check_rgba, EncodeError};

/// Composite RGBA pixels onto a white background, producing RGB.
///
/// Fully opaque pixels keep their color; fully transparent pixels become white.
pub fn flatten_alpha(pixels: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
    for px in pixels.chunks_exact(4) {
        let alpha = px[3] as u32;
        for &c in &px[..3] {
            // c * a + 255 * (1 - a), rounded
            let blended = (c as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

/// Encode RGBA pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100, where 100 is highest quality)
///
/// # Returns
///
/// JPEG-encoded bytes on success, or an error if encoding fails.
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    check_rgba(pixels, width, height)?;

    let quality = quality.clamp(1, 100);
    let rgb = flatten_alpha(pixels);

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: "JPEG",
            reason: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}
