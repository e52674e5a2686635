//! Base64 `data:` URL encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::InputError;

const PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("{}{}{},{}", PREFIX, mime, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Decode a base64 data URL into its MIME type and bytes.
///
/// Only base64 payloads are accepted; percent-encoded URLs are rejected.
/// Media type parameters (e.g. `;name=photo.png`) are dropped.
pub fn decode(url: &str) -> Result<(String, Vec<u8>), InputError> {
    let (header, payload) = split(url)?;

    let Some(media_type) = header.strip_suffix(BASE64_MARKER) else {
        return Err(InputError::MalformedDataUrl(
            "payload is not base64 encoded".to_string(),
        ));
    };

    let mime = media_type.split(';').next().unwrap_or_default().trim();
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| InputError::Base64(e.to_string()))?;

    Ok((mime.to_string(), bytes))
}

/// Read the MIME type from a data URL header without decoding the payload.
pub fn mime_of(url: &str) -> Option<&str> {
    let (header, _) = split(url).ok()?;
    header.split(';').next().map(str::trim)
}

fn split(url: &str) -> Result<(&str, &str), InputError> {
    let rest = url
        .strip_prefix(PREFIX)
        .ok_or_else(|| InputError::MalformedDataUrl("missing data: prefix".to_string()))?;
    rest.split_once(',')
        .ok_or_else(|| InputError::MalformedDataUrl("missing ',' separator".to_string()))
}
