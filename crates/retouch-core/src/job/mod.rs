//! The asynchronous job protocol.
//!
//! A Job is one image transformation request. The controller side drives a
//! [`JobMachine`]; the worker side emits [`WorkerMessage`]s:
//!
//! ```text
//! Idle ──begin──▶ Running ──complete──▶ Succeeded ──reset──▶ Idle
//!                    │
//!                    └──────error─────▶ Failed ────reset──▶ Idle
//! ```
//!
//! A successful Job reports `initializing` (40), `processing` (70) and
//! `finalizing` (90) before `complete`. A failed Job ends with a single
//! `error`. Progress never decreases within a Job.

mod machine;
mod message;
mod stage;

pub use machine::{JobMachine, JobSettings, JobState, Transition};
pub use message::{JobId, WorkerEvent, WorkerMessage};
pub use stage::{Progress, Stage};

use thiserror::Error;

/// Errors raised by the controller side of the protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    /// A Job is already in flight; it cannot be replaced or cancelled.
    #[error("Job {0} is still running")]
    Busy(JobId),

    /// A stage name received over the wire is not recognized.
    #[error("Unknown stage: {0}")]
    UnknownStage(String),
}
