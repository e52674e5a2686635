//! Retouch WASM - WebAssembly bindings for Retouch
//!
//! This crate exposes the retouch-core Job protocol to the browser. The page
//! owns a [`JsJobController`] per tool; each tool's Web Worker owns a
//! [`JsWorker`] that keeps its pipeline loaded between Jobs.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper types for pixel results
//! - `pixels` - Normalization and encoding helpers
//! - `worker` - Worker-side pipeline bindings
//! - `controller` - Page-side Job state bindings
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsJobController } from '@retouch/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const controller = new JsJobController('background-removal');
//! controller.begin();
//! worker.postMessage(bytes);
//! worker.onmessage = (event) => controller.handle_message(event.data);
//! ```

use wasm_bindgen::prelude::*;

mod controller;
mod pixels;
mod types;
mod worker;

// Re-export public types
pub use controller::JsJobController;
pub use pixels::{encode_png, expand_rgb_to_rgba, is_image_mime, normalize_result, to_data_url};
pub use types::JsPixelResult;
pub use worker::JsWorker;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "retouch wasm loaded");
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Tool names accepted by the constructors.
#[wasm_bindgen]
pub fn tools() -> Vec<String> {
    retouch_core::Tool::ALL
        .iter()
        .map(|tool| tool.slug().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_tools_parse_back() {
        let names = tools();
        assert_eq!(names.len(), 2);
        for name in names {
            assert!(name.parse::<retouch_core::Tool>().is_ok(), "{}", name);
        }
    }
}
