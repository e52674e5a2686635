//! Input types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::data_url;

/// Error types for image inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The supplied file is not an image.
    #[error("Not an image: {0}")]
    NotAnImage(String),

    /// The input contains no bytes.
    #[error("Image input is empty")]
    Empty,

    /// The string is not a base64 `data:` URL.
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// The data URL payload is not valid base64.
    #[error("Invalid base64 payload: {0}")]
    Base64(String),

    /// The image bytes could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// How a tool expects its input to be delivered to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEncoding {
    /// The raw file contents.
    RawBytes,
    /// A base64 `data:` URL string.
    DataUrl,
}

/// An image supplied by the user, in one of the two wire encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageInput {
    /// Raw file bytes together with the file's MIME type.
    Bytes { mime: String, data: Vec<u8> },
    /// A `data:<mime>;base64,<payload>` string.
    DataUrl { url: String },
}

impl ImageInput {
    /// Wrap raw file contents.
    pub fn from_file(mime: impl Into<String>, data: Vec<u8>) -> Self {
        ImageInput::Bytes {
            mime: mime.into(),
            data,
        }
    }

    /// Wrap a data URL string.
    pub fn from_data_url(url: impl Into<String>) -> Self {
        ImageInput::DataUrl { url: url.into() }
    }

    /// The encoding this input is currently in.
    pub fn encoding(&self) -> InputEncoding {
        match self {
            ImageInput::Bytes { .. } => InputEncoding::RawBytes,
            ImageInput::DataUrl { .. } => InputEncoding::DataUrl,
        }
    }

    /// The declared MIME type, if it can be read without decoding the payload.
    pub fn mime(&self) -> Option<&str> {
        match self {
            ImageInput::Bytes { mime, .. } => Some(mime.as_str()),
            ImageInput::DataUrl { url } => data_url::mime_of(url),
        }
    }

    /// Reject inputs that are empty or not declared as images.
    pub fn check_image(&self) -> Result<(), InputError> {
        let empty = match self {
            ImageInput::Bytes { data, .. } => data.is_empty(),
            ImageInput::DataUrl { url } => url.is_empty(),
        };
        if empty {
            return Err(InputError::Empty);
        }

        match self.mime() {
            Some(mime) if is_image_mime(mime) => Ok(()),
            Some(mime) => Err(InputError::NotAnImage(mime.to_string())),
            None => Err(InputError::MalformedDataUrl(
                "missing data: header".to_string(),
            )),
        }
    }

    /// Convert into the encoding a tool requires.
    pub fn encode_for(self, encoding: InputEncoding) -> Result<Self, InputError> {
        match (self, encoding) {
            (input @ ImageInput::Bytes { .. }, InputEncoding::RawBytes) => Ok(input),
            (input @ ImageInput::DataUrl { .. }, InputEncoding::DataUrl) => Ok(input),
            (ImageInput::Bytes { mime, data }, InputEncoding::DataUrl) => Ok(ImageInput::DataUrl {
                url: data_url::encode(&mime, &data),
            }),
            (ImageInput::DataUrl { url }, InputEncoding::RawBytes) => {
                let (mime, data) = data_url::decode(&url)?;
                Ok(ImageInput::Bytes { mime, data })
            }
        }
    }

    /// Resolve the input to raw bytes, decoding a data URL if needed.
    pub fn to_bytes(&self) -> Result<Vec<u8>, InputError> {
        match self {
            ImageInput::Bytes { data, .. } => Ok(data.clone()),
            ImageInput::DataUrl { url } => data_url::decode(url).map(|(_, data)| data),
        }
    }
}

/// Returns true if `mime` names an image type (`image/*`).
///
/// Mirrors the drop filter of the upload area: anything else is ignored.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("IMAGE/JPEG"));
        assert!(is_image_mime(" image/webp "));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime(""));
    }

    #[test]
    fn test_encoding() {
        assert_eq!(
            ImageInput::from_file("image/png", vec![1]).encoding(),
            InputEncoding::RawBytes
        );
        assert_eq!(
            ImageInput::from_data_url("data:image/png;base64,AQ==").encoding(),
            InputEncoding::DataUrl
        );
    }

    #[test]
    fn test_encode_for_data_url_and_back() {
        let input = ImageInput::from_file("image/png", vec![1, 2, 3]);

        let url = input.clone().encode_for(InputEncoding::DataUrl).unwrap();
        assert_eq!(url, ImageInput::from_data_url("data:image/png;base64,AQID"));

        let back = url.encode_for(InputEncoding::RawBytes).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_check_image_rejects_text() {
        let input = ImageInput::from_file("text/plain", vec![1, 2, 3]);
        assert_eq!(
            input.check_image(),
            Err(InputError::NotAnImage("text/plain".to_string()))
        );
    }

    #[test]
    fn test_check_image_rejects_empty() {
        assert_eq!(
            ImageInput::from_file("image/png", vec![]).check_image(),
            Err(InputError::Empty)
        );
    }

    #[test]
    fn test_check_image_data_url() {
        assert!(ImageInput::from_data_url("data:image/jpeg;base64,AA==")
            .check_image()
            .is_ok());
        assert!(matches!(
            ImageInput::from_data_url("not a url").check_image(),
            Err(InputError::MalformedDataUrl(_))
        ));
    }

    #[test]
    fn test_to_bytes() {
        let input = ImageInput::from_data_url("data:image/png;base64,AQID");
        assert_eq!(input.to_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&ImageInput::from_data_url("data:,")).unwrap();
        assert_eq!(json, r#"{"kind":"data_url","url":"data:,"}"#);
    }
}
