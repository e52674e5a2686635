//! Lazily loaded, single-slot pipeline cache.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{PipelineLoader, ProcessingError, ProcessingPipeline};
use crate::input::ImageInput;
use crate::job::{Stage, WorkerMessage};
use crate::pixel::PixelResult;

/// Holds at most one pipeline, loaded on the first Job and reused afterwards.
///
/// The slot is keyed by nothing: one pipeline per worker, never evicted except
/// after a panic, dropped together with the worker.
pub struct PipelineSlot<L: PipelineLoader> {
    loader: L,
    pipeline: Option<L::Pipeline>,
}

impl<L: PipelineLoader> PipelineSlot<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            pipeline: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Get the cached pipeline, loading it if needed.
    ///
    /// A failed load is not cached; the next call tries again.
    pub fn get(&mut self) -> Result<&mut L::Pipeline, ProcessingError> {
        if self.pipeline.is_none() {
            let started = Instant::now();
            let pipeline = self.loader.load()?;
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "pipeline loaded");
            self.pipeline = Some(pipeline);
        }

        self.pipeline
            .as_mut()
            .ok_or_else(|| ProcessingError::new("pipeline unavailable"))
    }

    /// Run one Job, reporting every protocol message through `emit`.
    ///
    /// On success `emit` sees `initializing`, `processing`, `finalizing`,
    /// then `complete`. On failure the last message is a single `error`.
    /// A panic inside the loader or pipeline is reported as an error too.
    pub fn run_job(&mut self, input: &ImageInput, mut emit: impl FnMut(WorkerMessage)) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(input, &mut emit)));

        match outcome {
            Ok(Ok(output)) => {
                emit(WorkerMessage::progress(Stage::Finalizing));
                emit(WorkerMessage::Complete { output });
            }
            Ok(Err(error)) => {
                warn!(reason = %error, "pipeline failed");
                emit(WorkerMessage::error(error.reason));
            }
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                warn!(%reason, "pipeline panicked, evicting it");
                self.pipeline = None;
                emit(WorkerMessage::error(reason));
            }
        }
    }

    fn process(
        &mut self,
        input: &ImageInput,
        emit: &mut impl FnMut(WorkerMessage),
    ) -> Result<PixelResult, ProcessingError> {
        emit(WorkerMessage::progress(Stage::Initializing));
        let pipeline = self.get()?;

        emit(WorkerMessage::progress(Stage::Processing));
        let started = Instant::now();
        let output = pipeline.transform(input)?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            width = output.width,
            height = output.height,
            format = %output.format,
            "pipeline finished"
        );
        Ok(output)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
