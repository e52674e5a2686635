//! Retouch Core - job protocol and pixel handling for image tools
//!
//! This crate provides the machinery shared by the background removal and
//! upscaling tools: the asynchronous job protocol between a controller and
//! its worker, pixel format normalization, input decoding, and artifact
//! encoding. The pipelines that do the actual transformation plug in through
//! [`pipeline::ProcessingPipeline`].
//!
//! # Module Structure
//!
//! - `job` - Stages, protocol messages and the controller state machine
//! - `worker` - Background thread serving one Job at a time
//! - `controller` - State machine plus worker, the UI-facing handle
//! - `pipeline` - Pipeline traits, lazy single-slot cache, built-in pipelines
//! - `pixel` - RGB/RGBA results and normalization to RGBA
//! - `input` - Raw-bytes and data-URL inputs, decoding
//! - `encode` - PNG/JPEG artifacts
//! - `tool` - Per-tool behavior and configuration

pub mod controller;
pub mod encode;
pub mod input;
pub mod job;
pub mod pipeline;
pub mod pixel;
pub mod tool;
pub mod worker;

pub use controller::{Controller, ControllerError};
pub use encode::{Artifact, ArtifactFormat};
pub use input::{ImageInput, InputEncoding};
pub use job::{JobId, JobMachine, JobState, Progress, Stage, WorkerMessage};
pub use pipeline::{PipelineLoader, ProcessingError, ProcessingPipeline};
pub use pixel::{PixelFormat, PixelResult, RgbaImage};
pub use tool::{Tool, ToolConfig};
pub use worker::WorkerChannel;
