//! Progress stages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::JobError;

/// Coarse progress bucket of a running Job.
///
/// Stages are ordered; a Job only ever moves forward through them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// The image is being handed to the worker.
    #[default]
    Uploading,
    /// The worker is loading its pipeline.
    Initializing,
    /// The pipeline is running.
    Processing,
    /// The result is being sent back.
    Finalizing,
}

impl Stage {
    /// All stages in order.
    pub const ALL: [Stage; 4] = [
        Stage::Uploading,
        Stage::Initializing,
        Stage::Processing,
        Stage::Finalizing,
    ];

    /// Progress reported when the stage is entered.
    pub fn nominal_progress(self) -> Progress {
        match self {
            Stage::Uploading => Progress::new(10),
            Stage::Initializing => Progress::new(40),
            Stage::Processing => Progress::new(70),
            Stage::Finalizing => Progress::new(90),
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Uploading => "uploading",
            Stage::Initializing => "initializing",
            Stage::Processing => "processing",
            Stage::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| JobError::UnknownStage(s.to_string()))
    }
}

/// Percentage of a Job, always within `0..=100`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "u8", into = "u8")]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const DONE: Progress = Progress(100);

    /// Create a progress value, clamping to 100.
    pub const fn new(percent: u8) -> Self {
        if percent > 100 {
            Progress(100)
        } else {
            Progress(percent)
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl From<u8> for Progress {
    fn from(percent: u8) -> Self {
        Progress::new(percent)
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}
