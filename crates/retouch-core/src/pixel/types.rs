//! Core types for pipeline output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for pixel buffer handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PixelError {
    /// Width or height is zero.
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Buffer length doesn't match `width * height * channels`.
    #[error("Invalid {format} pixel data: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },

    /// No format given and the buffer length fits neither layout.
    #[error("Cannot infer pixel format of a {width}x{height} image from {len} bytes")]
    UnknownLayout { width: u32, height: u32, len: usize },
}

/// Channel layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 3 bytes per pixel, no alpha.
    Rgb,
    /// 4 bytes per pixel, straight alpha.
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// Infer the layout from a buffer length, preferring RGBA when both fit.
    ///
    /// Returns `None` if the length matches neither layout.
    pub fn infer(width: u32, height: u32, len: usize) -> Option<Self> {
        let pixels = (width as usize) * (height as usize);
        if pixels == 0 {
            return None;
        }
        if len == pixels * 4 {
            Some(PixelFormat::Rgba)
        } else if len == pixels * 3 {
            Some(PixelFormat::Rgb)
        } else {
            None
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Rgb => f.write_str("RGB"),
            PixelFormat::Rgba => f.write_str("RGBA"),
        }
    }
}

/// Raw output of a successful Job, as emitted by a pipeline.
///
/// Deserializing accepts a missing `format`, as posted by workers that only
/// send `{data, width, height}`; the layout is then inferred from the length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WirePixelResult")]
pub struct PixelResult {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Layout of `data`; a property of the pipeline, not of the user.
    pub format: PixelFormat,
    /// Pixel data in row-major order.
    pub data: Vec<u8>,
}

impl PixelResult {
    /// Create an RGB result.
    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgb,
            data,
        }
    }

    /// Create an RGBA result.
    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba,
            data,
        }
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Buffer length implied by the dimensions and format.
    pub fn expected_len(&self) -> usize {
        self.pixel_count() * self.format.channels()
    }

    /// Check dimensions and buffer length.
    pub fn validate(&self) -> Result<(), PixelError> {
        check_buffer(self.format, self.width, self.height, self.data.len())
    }
}

#[derive(Deserialize)]
struct WirePixelResult {
    width: u32,
    height: u32,
    #[serde(default)]
    format: Option<PixelFormat>,
    data: Vec<u8>,
}

impl TryFrom<WirePixelResult> for PixelResult {
    type Error = PixelError;

    fn try_from(wire: WirePixelResult) -> Result<Self, Self::Error> {
        let format = match wire.format {
            Some(format) => format,
            None => PixelFormat::infer(wire.width, wire.height, wire.data.len()).ok_or(
                PixelError::UnknownLayout {
                    width: wire.width,
                    height: wire.height,
                    len: wire.data.len(),
                },
            )?,
        };
        Ok(PixelResult {
            width: wire.width,
            height: wire.height,
            format,
            data: wire.data,
        })
    }
}

/// Check that a `width` x `height` buffer of `format` is exactly `len` bytes.
pub fn check_buffer(format: PixelFormat, width: u32, height: u32, len: usize) -> Result<(), PixelError> {
    if width == 0 || height == 0 {
        return Err(PixelError::InvalidDimensions { width, height });
    }
    let expected = (width as usize) * (height as usize) * format.channels();
    if len != expected {
        return Err(PixelError::LengthMismatch {
            format,
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// An RGBA image ready for display or encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    pub pixels: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels() {
        assert_eq!(PixelFormat::Rgb.channels(), 3);
        assert_eq!(PixelFormat::Rgba.channels(), 4);
    }

    #[test]
    fn test_infer_format() {
        assert_eq!(PixelFormat::infer(2, 2, 12), Some(PixelFormat::Rgb));
        assert_eq!(PixelFormat::infer(2, 2, 16), Some(PixelFormat::Rgba));
        assert_eq!(PixelFormat::infer(2, 2, 13), None);
        assert_eq!(PixelFormat::infer(0, 2, 0), None);
    }

    #[test]
    fn test_validate_ok() {
        let result = PixelResult::rgb(100, 100, vec![0u8; 30_000]);
        assert_eq!(result.expected_len(), 30_000);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let result = PixelResult::rgba(10, 10, vec![0u8; 300]);
        assert_eq!(
            result.validate(),
            Err(PixelError::LengthMismatch {
                format: PixelFormat::Rgba,
                expected: 400,
                actual: 300,
            })
        );
    }

    #[test]
    fn test_validate_zero_dimensions() {
        let result = PixelResult::rgb(0, 10, vec![]);
        assert!(matches!(
            result.validate(),
            Err(PixelError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_format_serde_names() {
        assert_eq!(serde_json::to_string(&PixelFormat::Rgb).unwrap(), "\"rgb\"");
        assert_eq!(serde_json::to_string(&PixelFormat::Rgba).unwrap(), "\"rgba\"");
    }

    #[test]
    fn test_missing_format_inferred() {
        let rgb: PixelResult =
            serde_json::from_str(r#"{"width":2,"height":1,"data":[1,2,3,4,5,6]}"#).unwrap();
        assert_eq!(rgb.format, PixelFormat::Rgb);

        let rgba: PixelResult =
            serde_json::from_str(r#"{"width":1,"height":1,"data":[1,2,3,4]}"#).unwrap();
        assert_eq!(rgba.format, PixelFormat::Rgba);
    }

    #[test]
    fn test_explicit_format_kept() {
        // 4 bytes would infer RGBA; the declared format wins and validation catches it
        let result: PixelResult =
            serde_json::from_str(r#"{"width":1,"height":1,"format":"rgb","data":[1,2,3,4]}"#)
                .unwrap();
        assert_eq!(result.format, PixelFormat::Rgb);
        assert!(result.validate().is_err());
    }

    #[test]
    fn test_missing_format_unknown_layout_rejected() {
        let err = serde_json::from_str::<PixelResult>(r#"{"width":2,"height":2,"data":[1,2,3]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Cannot infer pixel format"), "{}", err);
    }

    #[test]
    fn test_check_buffer() {
        assert!(check_buffer(PixelFormat::Rgba, 2, 2, 16).is_ok());
        assert_eq!(
            check_buffer(PixelFormat::Rgba, 4, 4, 8),
            Err(PixelError::LengthMismatch {
                format: PixelFormat::Rgba,
                expected: 64,
                actual: 8,
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = PixelError::LengthMismatch {
            format: PixelFormat::Rgb,
            expected: 12,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "Invalid RGB pixel data: expected 12 bytes, got 10"
        );
    }
}
