//! Downloadable results.

use serde::{Deserialize, Serialize};

use super::{encode_jpeg, encode_png, EncodeError};
use crate::input::data_url;
use crate::pixel::RgbaImage;

/// Raster format used for the downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Lossless, keeps transparency.
    #[default]
    Png,
    /// Lossy; transparent areas are flattened onto white.
    Jpeg {
        /// Quality 1-100 (clamped).
        quality: u8,
    },
}

impl ArtifactFormat {
    /// MIME type of the encoded bytes.
    pub fn mime(self) -> &'static str {
        match self {
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// The finished result of a Job: display pixels plus the encoded download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    width: u32,
    height: u32,
    format: ArtifactFormat,
    pixels: Vec<u8>,
    bytes: Vec<u8>,
}

impl Artifact {
    /// Encode a normalized image into an artifact.
    pub fn encode(image: RgbaImage, format: ArtifactFormat) -> Result<Self, EncodeError> {
        let bytes = match format {
            ArtifactFormat::Png => encode_png(&image.pixels, image.width, image.height)?,
            ArtifactFormat::Jpeg { quality } => {
                encode_jpeg(&image.pixels, image.width, image.height, quality)?
            }
        };

        Ok(Self {
            width: image.width,
            height: image.height,
            format,
            pixels: image.pixels,
            bytes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    /// RGBA display pixels (4 bytes per pixel).
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Encoded file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Encoded bytes as a `data:` URL, suitable for an `<img>` or download link.
    pub fn to_data_url(&self) -> String {
        data_url::encode(self.format.mime(), &self.bytes)
    }

    /// Suggested download name, e.g. `upscaled-image.png`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}
