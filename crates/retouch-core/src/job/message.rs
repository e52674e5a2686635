//! Messages exchanged between controller and worker.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Progress, Stage};
use crate::pixel::PixelResult;

/// Identifier of one Job within a controller's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// The id following this one.
    pub fn next(self) -> JobId {
        JobId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A status message emitted by the worker for the Job in flight.
///
/// Serialized with a `type` tag, matching the messages posted by a Web Worker:
///
/// ```text
/// {"type":"progress","stage":"processing","progress":70}
/// {"type":"complete","output":{"width":..,"height":..,"format":"rgb","data":[..]}}
/// {"type":"error","error":"OOM"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Progress { stage: Stage, progress: Progress },
    Complete { output: PixelResult },
    Error { error: String },
}

impl WorkerMessage {
    /// Progress message at the nominal value for `stage`.
    pub fn progress(stage: Stage) -> Self {
        WorkerMessage::Progress {
            stage,
            progress: stage.nominal_progress(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        WorkerMessage::Error {
            error: reason.into(),
        }
    }

    /// True for `complete` and `error`; nothing follows a terminal message.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Progress { .. })
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Progress { .. } => "progress",
            WorkerMessage::Complete { .. } => "complete",
            WorkerMessage::Error { .. } => "error",
        }
    }
}

/// A worker message addressed to a specific Job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEvent {
    pub job: JobId,
    pub message: WorkerMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_wire_format() {
        let json = serde_json::to_string(&WorkerMessage::progress(Stage::Processing)).unwrap();
        assert_eq!(json, r#"{"type":"progress","stage":"processing","progress":70}"#);
    }

    #[test]
    fn test_error_wire_format() {
        let msg: WorkerMessage = serde_json::from_str(r#"{"type":"error","error":"OOM"}"#).unwrap();
        assert_eq!(msg, WorkerMessage::error("OOM"));
        assert!(msg.is_terminal());
    }

    #[test]
    fn test_complete_wire_format() {
        let json = r#"{"type":"complete","output":{"width":1,"height":1,"format":"rgb","data":[1,2,3]}}"#;
        let msg: WorkerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            WorkerMessage::Complete {
                output: PixelResult::rgb(1, 1, vec![1, 2, 3])
            }
        );
        assert_eq!(msg.kind(), "complete");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = serde_json::from_str::<WorkerMessage>(r#"{"type":"cancelled"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_progress_not_terminal() {
        assert!(!WorkerMessage::progress(Stage::Initializing).is_terminal());
    }

    #[test]
    fn test_job_id_next() {
        assert_eq!(JobId(1).next(), JobId(2));
        assert_eq!(JobId(7).to_string(), "#7");
    }
}
