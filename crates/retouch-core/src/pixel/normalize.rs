//! RGB to RGBA normalization.

use super::{PixelError, PixelFormat, PixelResult, RgbaImage};

/// Alpha value inserted when expanding RGB to RGBA.
pub const OPAQUE_ALPHA: u8 = 255;

/// Expand RGB pixel data to RGBA with a fully opaque alpha channel.
///
/// Every 3 source bytes become 4 output bytes, channel order preserved.
///
/// # Arguments
/// * `data` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Errors
/// Returns `PixelError::LengthMismatch` if `data` is not exactly
/// `width * height * 3` bytes. The buffer is never silently truncated.
///
/// # Example
/// ```
/// use retouch_core::pixel::expand_rgb_to_rgba;
///
/// let rgba = expand_rgb_to_rgba(&[255, 0, 0, 0, 255, 0], 2, 1).unwrap();
/// assert_eq!(rgba, vec![255, 0, 0, 255, 0, 255, 0, 255]);
/// ```
pub fn expand_rgb_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PixelError> {
    let pixel_count = (width as usize) * (height as usize);
    let expected = pixel_count * 3;
    if data.len() != expected {
        return Err(PixelError::LengthMismatch {
            format: PixelFormat::Rgb,
            expected,
            actual: data.len(),
        });
    }

    let mut rgba = Vec::with_capacity(pixel_count * 4);
    for rgb in data.chunks_exact(3) {
        rgba.extend_from_slice(rgb);
        rgba.push(OPAQUE_ALPHA);
    }
    Ok(rgba)
}

/// Convert a pipeline result into a displayable RGBA image.
///
/// RGBA results are passed through unchanged; RGB results are expanded
/// with [`expand_rgb_to_rgba`]. Both paths validate the buffer first.
pub fn normalize_to_rgba(result: PixelResult) -> Result<RgbaImage, PixelError> {
    result.validate()?;

    let PixelResult {
        width,
        height,
        format,
        data,
    } = result;

    let pixels = match format {
        PixelFormat::Rgba => data,
        PixelFormat::Rgb => expand_rgb_to_rgba(&data, width, height)?,
    };

    Ok(RgbaImage {
        width,
        height,
        pixels,
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================
