//! Pixel normalization and encoding WASM bindings.
//!
//! # Functions
//!
//! - [`expand_rgb_to_rgba`] - Expand RGB pixels to opaque RGBA (for `ImageData`)
//! - [`normalize_result`] - Normalize a `JsPixelResult` to RGBA
//! - [`encode_png`] - Encode RGBA pixels to PNG bytes
//! - [`is_image_mime`] - Drop-zone filter for `File.type`
//! - [`to_data_url`] - Encode file bytes as a data URL
//!
//! # Example
//!
//! ```typescript
//! import { expand_rgb_to_rgba, encode_png } from '@retouch/wasm';
//!
//! const rgba = expand_rgb_to_rgba(output.data, output.width, output.height);
//! ctx.putImageData(new ImageData(new Uint8ClampedArray(rgba), output.width, output.height), 0, 0);
//! const png = encode_png(rgba, output.width, output.height);
//! ```

use crate::types::JsPixelResult;
use retouch_core::{encode, input, pixel};
use wasm_bindgen::prelude::*;

/// Expand RGB pixel data to RGBA with alpha 255.
///
/// # Errors
///
/// Returns an error if `pixels` is not exactly `width * height * 3` bytes.
#[wasm_bindgen]
pub fn expand_rgb_to_rgba(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, JsValue> {
    pixel::expand_rgb_to_rgba(pixels, width, height).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Normalize a pipeline result to RGBA pixel data.
///
/// RGBA results are returned unchanged; RGB results are expanded.
#[wasm_bindgen]
pub fn normalize_result(result: &JsPixelResult) -> Result<Vec<u8>, JsValue> {
    pixel::normalize_to_rgba(result.to_core())
        .map(|image| image.pixels)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Encode RGBA pixel data to PNG bytes.
#[wasm_bindgen]
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, JsValue> {
    encode::encode_png(pixels, width, height).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Returns true if a MIME type names an image (`image/*`).
#[wasm_bindgen]
pub fn is_image_mime(mime: &str) -> bool {
    input::is_image_mime(mime)
}

/// Encode bytes as a base64 data URL.
#[wasm_bindgen]
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    input::data_url::encode(mime, bytes)
}

/// Tests for pixel bindings.
///
/// Functions returning `Result<T, JsValue>` only work on wasm32 targets, so
/// the native tests call the infallible bindings and the core directly.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/png"));
        assert!(!is_image_mime("video/mp4"));
    }

    #[test]
    fn test_to_data_url() {
        assert_eq!(to_data_url("image/png", &[1, 2, 3]), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_normalize_core_path() {
        let result = JsPixelResult::new(2, 1, vec![1, 2, 3, 4, 5, 6], false);
        let image = pixel::normalize_to_rgba(result.to_core()).unwrap();
        assert_eq!(image.pixels, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }
}
