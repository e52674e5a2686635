//! Artifact encoding for finished Jobs.
//!
//! This module provides functionality for:
//! - Encoding RGBA images to PNG (lossless, keeps transparency)
//! - Encoding RGBA images to JPEG (alpha flattened onto white)
//! - Packaging the result as a downloadable [`Artifact`]
//!
//! # Examples
//!
//! ```ignore
//! use retouch_core::encode::encode_png;
//!
//! let pixels = vec![128u8; 100 * 100 * 4]; // Gray, half-transparent
//! let png_bytes = encode_png(&pixels, 100, 100).unwrap();
//! println!("Encoded {} bytes", png_bytes.len());
//! ```

mod artifact;
mod jpeg;
mod png;

pub use artifact::{Artifact, ArtifactFormat};
pub use jpeg::{encode_jpeg, flatten_alpha};
pub use png::encode_png;

use thiserror::Error;

/// Errors that can occur while encoding an artifact.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The underlying encoder failed
    #[error("{format} encoding failed: {reason}")]
    EncodingFailed {
        format: &'static str,
        reason: String,
    },
}

/// Validate an RGBA buffer against its dimensions.
fn check_rgba(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 4;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}
