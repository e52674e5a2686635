//! Worker-side WASM bindings.
//!
//! [`JsWorker`] runs inside a Web Worker. It keeps the tool's pipeline loaded
//! between Jobs and reports each protocol message through a callback, which
//! the worker script forwards with `postMessage`.
//!
//! # Example
//!
//! A pipeline panic is only turned into an `error` message where panics
//! unwind. wasm32 builds abort on panic by default, so in the browser a
//! panicking pipeline kills the Web Worker instead; the page sees the
//! worker's `error` event and no protocol message.
//!
//! ```typescript
//! // upscale-worker.ts
//! import init, { JsWorker } from '@retouch/wasm';
//!
//! await init();
//! const worker = new JsWorker('upscale', { upscale_factor: 2 });
//!
//! self.onmessage = (event) => {
//!   worker.process_data_url(event.data, (msg) => self.postMessage(msg));
//! };
//! ```

use crate::types::{parse_config, parse_tool};
use retouch_core::input::ImageInput;
use retouch_core::job::WorkerMessage;
use retouch_core::pipeline::{PipelineSlot, ProcessingError};
use retouch_core::tool::{BuiltinPipeline, Tool};
use wasm_bindgen::prelude::*;

type BuiltinLoader = Box<dyn FnMut() -> Result<BuiltinPipeline, ProcessingError> + Send>;

/// The isolated execution context of one tool.
#[wasm_bindgen]
pub struct JsWorker {
    tool: Tool,
    slot: PipelineSlot<BuiltinLoader>,
}

#[wasm_bindgen]
impl JsWorker {
    /// Create a worker for `tool` (`"background-removal"` or `"upscale"`).
    ///
    /// `config` is an optional `ToolConfig` object. The pipeline is loaded
    /// lazily by the first Job.
    #[wasm_bindgen(constructor)]
    pub fn new(tool: &str, config: JsValue) -> Result<JsWorker, JsValue> {
        let tool = parse_tool(tool)?;
        let config = parse_config(config)?;
        Ok(Self::with_config(tool, config))
    }

    /// Canonical name of the tool this worker serves.
    #[wasm_bindgen(getter)]
    pub fn tool(&self) -> String {
        self.tool.slug().to_string()
    }

    /// Model the tool is designed around, e.g. `"briaai/RMBG-1.4"`.
    #[wasm_bindgen(getter)]
    pub fn model_id(&self) -> String {
        self.tool.model_id().to_string()
    }

    /// Whether the pipeline has been loaded.
    #[wasm_bindgen(getter)]
    pub fn is_loaded(&self) -> bool {
        self.slot.is_loaded()
    }

    /// Process raw file bytes, posting every message through `post`.
    pub fn process_bytes(&mut self, bytes: Vec<u8>, mime: &str, post: &js_sys::Function) -> Result<(), JsValue> {
        self.process(ImageInput::from_file(mime, bytes), post)
    }

    /// Process a data URL string, posting every message through `post`.
    pub fn process_data_url(&mut self, url: String, post: &js_sys::Function) -> Result<(), JsValue> {
        self.process(ImageInput::from_data_url(url), post)
    }
}

impl JsWorker {
    pub(crate) fn with_config(tool: Tool, config: retouch_core::ToolConfig) -> Self {
        let loader: BuiltinLoader = Box::new(move || BuiltinPipeline::for_tool(tool, &config));
        Self {
            tool,
            slot: PipelineSlot::new(loader),
        }
    }

    /// Run one Job and collect its messages.
    pub(crate) fn run(&mut self, input: &ImageInput) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        self.slot.run_job(input, |message| messages.push(message));
        messages
    }

    fn process(&mut self, input: ImageInput, post: &js_sys::Function) -> Result<(), JsValue> {
        for message in self.run(&input) {
            let value = serde_wasm_bindgen::to_value(&message)?;
            post.call1(&JsValue::NULL, &value)?;
        }
        Ok(())
    }
}
