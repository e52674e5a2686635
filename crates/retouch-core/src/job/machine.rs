//! Controller-side state machine.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{JobError, JobId, Progress, Stage, WorkerEvent, WorkerMessage};
use crate::encode::{Artifact, ArtifactFormat};
use crate::pixel::{normalize_to_rgba, PixelResult};

/// Per-tool knobs of the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Progress shown as soon as a Job starts, before the worker replies.
    pub initial_progress: Progress,
    /// Prepended to worker error reasons.
    pub error_prefix: String,
    /// Format of the downloadable artifact.
    pub artifact_format: ArtifactFormat,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            initial_progress: Stage::Uploading.nominal_progress(),
            error_prefix: "Processing error: ".to_string(),
            artifact_format: ArtifactFormat::Png,
        }
    }
}

/// State of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    /// No image selected.
    #[default]
    Idle,
    /// A Job is in flight.
    Running {
        job: JobId,
        stage: Stage,
        progress: Progress,
    },
    /// The last Job produced an artifact.
    Succeeded { job: JobId, artifact: Artifact },
    /// The last Job failed.
    Failed { job: JobId, reason: String },
}

impl JobState {
    /// Short name for logging and for JavaScript.
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running { .. } => "running",
            JobState::Succeeded { .. } => "succeeded",
            JobState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
    }
}

/// Effect of applying a worker event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event did not change the state (stale Job, regression, not running).
    Ignored,
    /// Stage or progress advanced.
    Progressed { stage: Stage, progress: Progress },
    /// The Job finished with an artifact.
    Succeeded,
    /// The Job failed.
    Failed,
}

/// The pure Job state machine shared by every tool.
///
/// It performs no I/O: the caller sends the request for the returned
/// [`JobId`] and feeds every worker event back through [`JobMachine::apply`].
#[derive(Debug, Default)]
pub struct JobMachine {
    settings: JobSettings,
    state: JobState,
    last_job: Option<JobId>,
}

impl JobMachine {
    pub fn new(settings: JobSettings) -> Self {
        Self {
            settings,
            state: JobState::Idle,
            last_job: None,
        }
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Start a new Job.
    ///
    /// Any previous artifact or error is discarded first, so nothing from an
    /// earlier Job is visible while the new one runs.
    ///
    /// # Errors
    /// Returns `JobError::Busy` if a Job is already running.
    pub fn begin(&mut self) -> Result<JobId, JobError> {
        if let JobState::Running { job, .. } = self.state {
            return Err(JobError::Busy(job));
        }

        let job = self.last_job.map_or(JobId(1), JobId::next);
        self.last_job = Some(job);
        self.state = JobState::Running {
            job,
            stage: Stage::Uploading,
            progress: self.settings.initial_progress,
        };
        info!(%job, "job started");
        Ok(job)
    }

    /// Apply one worker event.
    pub fn apply(&mut self, event: WorkerEvent) -> Transition {
        let (job, stage, progress) = match self.state {
            JobState::Running {
                job,
                stage,
                progress,
            } => (job, stage, progress),
            _ => {
                debug!(job = %event.job, kind = event.message.kind(), state = self.state.name(), "ignoring message outside a running job");
                return Transition::Ignored;
            }
        };

        if job != event.job {
            debug!(job = %event.job, current = %job, kind = event.message.kind(), "ignoring message for another job");
            return Transition::Ignored;
        }

        match event.message {
            WorkerMessage::Progress {
                stage: next_stage,
                progress: next_progress,
            } => {
                if next_stage < stage {
                    warn!(%job, from = %stage, to = %next_stage, "ignoring backwards stage");
                    return Transition::Ignored;
                }
                // A stage advance is kept even when its percentage is below
                // the current one; the bar itself never moves back.
                let next_progress = next_progress.max(progress);
                if next_stage == stage && next_progress == progress {
                    return Transition::Ignored;
                }
                self.state = JobState::Running {
                    job,
                    stage: next_stage,
                    progress: next_progress,
                };
                debug!(%job, stage = %next_stage, progress = next_progress.percent(), "job progressed");
                Transition::Progressed {
                    stage: next_stage,
                    progress: next_progress,
                }
            }
            WorkerMessage::Complete { output } => match self.finish(output) {
                Ok(artifact) => {
                    info!(%job, width = artifact.width(), height = artifact.height(), bytes = artifact.byte_len(), "job succeeded");
                    self.state = JobState::Succeeded { job, artifact };
                    Transition::Succeeded
                }
                Err(reason) => self.fail(job, reason),
            },
            WorkerMessage::Error { error } => self.fail(job, error),
        }
    }

    /// Return to `Idle`, dropping any artifact or error.
    ///
    /// # Errors
    /// Returns `JobError::Busy` while a Job is running; there is no cancellation.
    pub fn reset(&mut self) -> Result<(), JobError> {
        if let JobState::Running { job, .. } = self.state {
            return Err(JobError::Busy(job));
        }
        if self.state != JobState::Idle {
            debug!(from = self.state.name(), "reset to idle");
        }
        self.state = JobState::Idle;
        Ok(())
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, JobState::Running { .. })
    }

    /// The Job in flight, if any.
    pub fn current_job(&self) -> Option<JobId> {
        match self.state {
            JobState::Running { job, .. } => Some(job),
            _ => None,
        }
    }

    /// Current stage; `None` unless running.
    pub fn stage(&self) -> Option<Stage> {
        match self.state {
            JobState::Running { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// 0 when idle or failed, 100 when succeeded.
    pub fn progress(&self) -> Progress {
        match self.state {
            JobState::Idle | JobState::Failed { .. } => Progress::ZERO,
            JobState::Running { progress, .. } => progress,
            JobState::Succeeded { .. } => Progress::DONE,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            JobState::Succeeded { artifact, .. } => Some(artifact),
            _ => None,
        }
    }

    fn finish(&self, output: PixelResult) -> Result<Artifact, String> {
        let image = normalize_to_rgba(output).map_err(|e| e.to_string())?;
        Artifact::encode(image, self.settings.artifact_format).map_err(|e| e.to_string())
    }

    fn fail(&mut self, job: JobId, reason: String) -> Transition {
        let reason = format!("{}{}", self.settings.error_prefix, reason);
        warn!(%job, %reason, "job failed");
        self.state = JobState::Failed { job, reason };
        Transition::Failed
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
