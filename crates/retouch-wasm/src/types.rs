//! WASM-compatible wrapper types and conversions.
//!
//! This module provides JavaScript-friendly wrappers around core pixel types,
//! plus the helpers every binding uses to read tools and configs from
//! JavaScript values.

use retouch_core::pixel::{PixelFormat, PixelResult};
use retouch_core::tool::{Tool, ToolConfig};
use wasm_bindgen::prelude::*;

/// A pipeline result wrapper for JavaScript.
///
/// Holds the raw width, height and pixel buffer of a finished Job, in the
/// layout the pipeline produced (RGB or RGBA).
#[wasm_bindgen]
pub struct JsPixelResult {
    width: u32,
    height: u32,
    rgba: bool,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsPixelResult {
    /// Create a new JsPixelResult.
    ///
    /// # Arguments
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `pixels` - Pixel data, 3 (RGB) or 4 (RGBA) bytes per pixel
    /// * `rgba` - Whether `pixels` carries an alpha channel
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, rgba: bool) -> JsPixelResult {
        JsPixelResult {
            width,
            height,
            rgba,
            pixels,
        }
    }

    /// Get the image width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the image height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the buffer is RGBA (otherwise RGB)
    #[wasm_bindgen(getter)]
    pub fn is_rgba(&self) -> bool {
        self.rgba
    }

    /// Get the number of bytes in the pixel buffer
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns the pixel data as Uint8Array (copied).
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }
}

impl JsPixelResult {
    pub(crate) fn to_core(&self) -> PixelResult {
        PixelResult {
            width: self.width,
            height: self.height,
            format: if self.rgba {
                PixelFormat::Rgba
            } else {
                PixelFormat::Rgb
            },
            data: self.pixels.clone(),
        }
    }
}

/// Parse a tool name such as `"upscale"` or `"background-removal"`.
pub(crate) fn parse_tool(name: &str) -> Result<Tool, JsValue> {
    name.parse::<Tool>()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Read a `ToolConfig` from a JavaScript object; `undefined`/`null` give the defaults.
pub(crate) fn parse_config(config: JsValue) -> Result<ToolConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(ToolConfig::default());
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid tool configuration: {}", e)))
}
