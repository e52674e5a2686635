//! Page-side WASM bindings.
//!
//! [`JsJobController`] holds the Job state for one tool on the page. The page
//! calls `begin()` before posting an image to its Web Worker and feeds every
//! message the worker posts back into `handle_message()`.
//!
//! # Example
//!
//! ```typescript
//! const controller = new JsJobController('upscale');
//! const worker = new Worker(new URL('./upscale-worker', import.meta.url));
//!
//! worker.onmessage = (event) => {
//!   controller.handle_message(event.data);
//!   render(controller.state, controller.progress, controller.stage_label);
//! };
//!
//! function start(file: File) {
//!   controller.begin();
//!   worker.postMessage(dataUrl);
//! }
//! ```

use crate::types::{parse_config, parse_tool};
use retouch_core::job::{JobMachine, Transition, WorkerEvent, WorkerMessage};
use retouch_core::tool::{format_file_size, Tool};
use wasm_bindgen::prelude::*;

/// Job state of one tool instance on the page.
#[wasm_bindgen]
pub struct JsJobController {
    tool: Tool,
    machine: JobMachine,
}

#[wasm_bindgen]
impl JsJobController {
    /// Create a controller for `tool` with an optional `ToolConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(tool: &str, config: JsValue) -> Result<JsJobController, JsValue> {
        let tool = parse_tool(tool)?;
        let config = parse_config(config)?;
        Ok(Self {
            tool,
            machine: JobMachine::new(tool.job_settings(&config)),
        })
    }

    /// Enter `running`, clearing any previous result or error.
    ///
    /// Fails while a Job is already running.
    pub fn begin(&mut self) -> Result<(), JsValue> {
        self.machine
            .begin()
            .map(|_| ())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Apply a message posted by the worker.
    ///
    /// Returns `"ignored"`, `"progressed"`, `"succeeded"` or `"failed"`.
    pub fn handle_message(&mut self, message: JsValue) -> Result<String, JsValue> {
        let message: WorkerMessage = serde_wasm_bindgen::from_value(message)
            .map_err(|e| JsValue::from_str(&format!("Invalid worker message: {}", e)))?;
        Ok(self.apply(message).to_string())
    }

    /// Return to `idle`. Fails while a Job is running.
    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.machine
            .reset()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// `"idle"`, `"running"`, `"succeeded"` or `"failed"`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.machine.state().name().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn is_busy(&self) -> bool {
        self.machine.is_busy()
    }

    /// Current stage name while running.
    #[wasm_bindgen(getter)]
    pub fn stage(&self) -> Option<String> {
        self.machine.stage().map(|stage| stage.as_str().to_string())
    }

    /// Busy-indicator text while running.
    #[wasm_bindgen(getter)]
    pub fn stage_label(&self) -> Option<String> {
        self.machine
            .stage()
            .map(|stage| self.tool.stage_label(stage).to_string())
    }

    /// Progress percentage (0-100).
    #[wasm_bindgen(getter)]
    pub fn progress(&self) -> u8 {
        self.machine.progress().percent()
    }

    /// Error text after a failed Job.
    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.machine.error().map(str::to_string)
    }

    #[wasm_bindgen(getter)]
    pub fn artifact_width(&self) -> Option<u32> {
        self.machine.artifact().map(|a| a.width())
    }

    #[wasm_bindgen(getter)]
    pub fn artifact_height(&self) -> Option<u32> {
        self.machine.artifact().map(|a| a.height())
    }

    /// RGBA pixels of the result, for `ImageData`.
    pub fn artifact_pixels(&self) -> Option<Vec<u8>> {
        self.machine.artifact().map(|a| a.pixels().to_vec())
    }

    /// Encoded result file.
    pub fn artifact_bytes(&self) -> Option<Vec<u8>> {
        self.machine.artifact().map(|a| a.bytes().to_vec())
    }

    /// Encoded result as a data URL, for `<img src>` and download links.
    pub fn artifact_data_url(&self) -> Option<String> {
        self.machine.artifact().map(|a| a.to_data_url())
    }

    /// Encoded result size, e.g. `"12.3 KB"`.
    #[wasm_bindgen(getter)]
    pub fn artifact_size(&self) -> Option<String> {
        self.machine
            .artifact()
            .map(|a| format_file_size(a.byte_len() as u64))
    }

    /// Suggested download file name.
    pub fn artifact_file_name(&self) -> Option<String> {
        self.machine
            .artifact()
            .map(|a| a.file_name(self.tool.artifact_stem()))
    }
}

impl JsJobController {
    /// Apply a message to the Job in flight.
    ///
    /// Web Worker messages carry no Job id: with one Job in flight per
    /// worker, every message belongs to the current Job.
    pub(crate) fn apply(&mut self, message: WorkerMessage) -> TransitionName {
        let Some(job) = self.machine.current_job() else {
            return TransitionName(Transition::Ignored);
        };

        if let WorkerMessage::Error { error } = &message {
            report_error(error);
        }
        TransitionName(self.machine.apply(WorkerEvent { job, message }))
    }
}

/// Display wrapper for transitions returned to JavaScript.
pub(crate) struct TransitionName(pub(crate) Transition);

impl std::fmt::Display for TransitionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self.0 {
            Transition::Ignored => "ignored",
            Transition::Progressed { .. } => "progressed",
            Transition::Succeeded => "succeeded",
            Transition::Failed => "failed",
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn report_error(error: &str) {
    web_sys::console::error_1(&JsValue::from_str(error));
}

#[cfg(not(target_arch = "wasm32"))]
fn report_error(error: &str) {
    tracing::error!(%error, "worker reported an error");
}
