//! The processing pipeline seam.
//!
//! A pipeline is an opaque, possibly slow, possibly failing transformation
//! `transform(image) -> PixelResult`. Model-backed pipelines live outside this
//! crate and plug in through [`ProcessingPipeline`] and [`PipelineLoader`].
//! Two model-free pipelines are provided for offline use:
//!
//! - [`ResampleUpscaler`] - resampling upscaler, emits RGB
//! - [`BorderKeyMatte`] - background matte keyed on the border color, emits RGBA

mod matte;
mod slot;
mod upscale;

pub use matte::{smootherstep, BorderKeyMatte};
pub use slot::PipelineSlot;
pub use upscale::{ResampleFilter, ResampleUpscaler};

use thiserror::Error;

use crate::input::{ImageInput, InputError};
use crate::pixel::PixelResult;

/// Failure of a pipeline, whether while loading or while running.
///
/// Both kinds are reported to the user the same way, so only the reason is kept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ProcessingError {
    pub reason: String,
}

impl ProcessingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<InputError> for ProcessingError {
    fn from(error: InputError) -> Self {
        ProcessingError::new(error.to_string())
    }
}

/// A loaded transformation.
pub trait ProcessingPipeline: Send {
    /// Transform one image.
    fn transform(&mut self, input: &ImageInput) -> Result<PixelResult, ProcessingError>;
}

impl<P: ProcessingPipeline + ?Sized> ProcessingPipeline for Box<P> {
    fn transform(&mut self, input: &ImageInput) -> Result<PixelResult, ProcessingError> {
        (**self).transform(input)
    }
}

/// Produces a pipeline on first use. Runs on the worker thread.
pub trait PipelineLoader: Send + 'static {
    type Pipeline: ProcessingPipeline;

    fn load(&mut self) -> Result<Self::Pipeline, ProcessingError>;
}

impl<F, P> PipelineLoader for F
where
    F: FnMut() -> Result<P, ProcessingError> + Send + 'static,
    P: ProcessingPipeline,
{
    type Pipeline = P;

    fn load(&mut self) -> Result<P, ProcessingError> {
        self()
    }
}

/// Build a [`PipelineLoader`] from a closure.
///
/// ```ignore
/// let slot = PipelineSlot::new(pipeline::from_fn(|| Ok(ResampleUpscaler::default())));
/// ```
pub fn from_fn<F, P>(load: F) -> F
where
    F: FnMut() -> Result<P, ProcessingError> + Send + 'static,
    P: ProcessingPipeline,
{
    load
}
