//! Controller: the UI-facing side of one tool instance.
//!
//! A controller owns the Job state machine and one worker channel for its
//! whole lifetime. It never blocks unless asked to via [`Controller::wait`]
//! or [`Controller::wait_timeout`]; UIs call [`Controller::poll`] from their
//! event loop instead.
//!
//! ```ignore
//! let mut controller = Controller::mount_builtin(Tool::Upscale, &ToolConfig::default())?;
//! controller.submit(ImageInput::from_file("image/png", bytes))?;
//! match controller.wait() {
//!     JobState::Succeeded { artifact, .. } => std::fs::write("upscaled-image.png", artifact.bytes())?,
//!     JobState::Failed { reason, .. } => eprintln!("{reason}"),
//!     _ => unreachable!(),
//! }
//! ```

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

use crate::encode::Artifact;
use crate::input::{ImageInput, InputError};
use crate::job::{
    JobError, JobId, JobMachine, JobState, Progress, Stage, Transition, WorkerEvent, WorkerMessage,
};
use crate::pipeline::PipelineLoader;
use crate::tool::{format_file_size, Tool, ToolConfig};
use crate::worker::{WorkerChannel, WorkerError};

/// Errors returned to the UI by a controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// One tool instance: state machine plus worker.
#[derive(Debug)]
pub struct Controller {
    tool: Tool,
    machine: JobMachine,
    channel: WorkerChannel,
}

impl Controller {
    /// Create the controller and its worker.
    pub fn mount<L: PipelineLoader>(
        tool: Tool,
        config: &ToolConfig,
        loader: L,
    ) -> Result<Self, ControllerError> {
        let name = config
            .worker_name
            .clone()
            .unwrap_or_else(|| tool.worker_name().to_string());
        let channel = WorkerChannel::spawn(name, loader)?;

        Ok(Self {
            tool,
            machine: JobMachine::new(tool.job_settings(config)),
            channel,
        })
    }

    /// Create the controller with the tool's built-in pipeline.
    pub fn mount_builtin(tool: Tool, config: &ToolConfig) -> Result<Self, ControllerError> {
        Self::mount(tool, config, tool.builtin_loader(config))
    }

    /// Start a Job for a user-supplied image.
    ///
    /// The input is converted to the encoding the tool's worker expects. Any
    /// previous artifact or error is cleared before the request is sent.
    ///
    /// # Errors
    /// - `JobError::Busy` if a Job is already running
    /// - `InputError` if the input is empty, not an image, or cannot be re-encoded
    /// - `WorkerError` if the worker is gone; the Job is then marked failed
    pub fn submit(&mut self, input: ImageInput) -> Result<JobId, ControllerError> {
        if let Some(job) = self.machine.current_job() {
            return Err(JobError::Busy(job).into());
        }

        input.check_image()?;
        let input = input.encode_for(self.tool.input_encoding())?;

        let job = self.machine.begin()?;
        if let Err(error) = self.channel.post(job, input) {
            self.fail_current(error.to_string());
            return Err(error.into());
        }
        Ok(job)
    }

    /// Apply every message that has already arrived.
    ///
    /// Returns the number of messages that changed the state.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.channel.try_recv() {
                Ok(Some(event)) => {
                    if self.apply(event) != Transition::Ignored {
                        applied += 1;
                    }
                }
                Ok(None) => return applied,
                Err(error) => {
                    if self.fail_current(error.to_string()) {
                        applied += 1;
                    }
                    return applied;
                }
            }
        }
    }

    /// Block until the running Job reaches a terminal state.
    pub fn wait(&mut self) -> &JobState {
        while self.machine.is_busy() {
            match self.channel.recv() {
                Ok(event) => {
                    self.apply(event);
                }
                Err(error) => {
                    self.fail_current(error.to_string());
                }
            }
        }
        self.machine.state()
    }

    /// Like [`Controller::wait`], but gives up after `timeout`.
    ///
    /// Giving up does not cancel the Job: it keeps running and a later
    /// `poll` or `wait` picks up its result.
    pub fn wait_timeout(&mut self, timeout: Duration) -> &JobState {
        let deadline = Instant::now() + timeout;
        while self.machine.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.channel.recv_timeout(remaining) {
                Ok(Some(event)) => {
                    self.apply(event);
                }
                Ok(None) => break,
                Err(error) => {
                    self.fail_current(error.to_string());
                }
            }
        }
        self.machine.state()
    }

    /// Return to `Idle`.
    ///
    /// # Errors
    /// Returns `JobError::Busy` while a Job is running.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        Ok(self.machine.reset()?)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn state(&self) -> &JobState {
        self.machine.state()
    }

    pub fn is_busy(&self) -> bool {
        self.machine.is_busy()
    }

    pub fn stage(&self) -> Option<Stage> {
        self.machine.stage()
    }

    /// Busy-indicator text, if running.
    pub fn stage_label(&self) -> Option<&'static str> {
        self.machine.stage().map(|stage| self.tool.stage_label(stage))
    }

    pub fn progress(&self) -> Progress {
        self.machine.progress()
    }

    pub fn error(&self) -> Option<&str> {
        self.machine.error()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.machine.artifact()
    }

    /// Download name for the current artifact.
    pub fn artifact_file_name(&self) -> Option<String> {
        self.machine
            .artifact()
            .map(|artifact| artifact.file_name(self.tool.artifact_stem()))
    }

    /// Human-readable size of the encoded artifact.
    pub fn artifact_size(&self) -> Option<String> {
        self.machine
            .artifact()
            .map(|artifact| format_file_size(artifact.byte_len() as u64))
    }

    fn apply(&mut self, event: WorkerEvent) -> Transition {
        if let WorkerMessage::Complete { output } = &event.message {
            let expected = self.tool.output_format();
            if output.format != expected {
                warn!(tool = ?self.tool, %expected, actual = %output.format, "unexpected pipeline output format");
            }
        }
        self.machine.apply(event)
    }

    /// Fail the running Job with `reason`; returns false if nothing was running.
    fn fail_current(&mut self, reason: String) -> bool {
        match self.machine.current_job() {
            Some(job) => {
                warn!(tool = ?self.tool, %job, %reason, "worker unavailable");
                self.machine.apply(WorkerEvent {
                    job,
                    message: WorkerMessage::error(reason),
                });
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_png;
    use crate::input::InputEncoding;
    use crate::pipeline::{from_fn, ProcessingError, ProcessingPipeline};
    use crate::pixel::PixelResult;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    /// Returns a fixed result and records the encoding of every input it sees.
    struct Scripted {
        output: Result<PixelResult, ProcessingError>,
        seen: Arc<Mutex<Vec<InputEncoding>>>,
    }

    impl ProcessingPipeline for Scripted {
        fn transform(&mut self, input: &ImageInput) -> Result<PixelResult, ProcessingError> {
            self.seen.lock().unwrap().push(input.encoding());
            self.output.clone()
        }
    }

    fn scripted(
        tool: Tool,
        output: Result<PixelResult, ProcessingError>,
    ) -> (Controller, Arc<Mutex<Vec<InputEncoding>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let loader = from_fn(move || {
            Ok(Scripted {
                output: output.clone(),
                seen: Arc::clone(&recorder),
            })
        });
        let controller = Controller::mount(tool, &ToolConfig::default(), loader).unwrap();
        (controller, seen)
    }

    fn png_file(width: u32, height: u32) -> ImageInput {
        let pixels = vec![90u8; (width * height * 4) as usize];
        ImageInput::from_file("image/png", encode_png(&pixels, width, height).unwrap())
    }

    #[test]
    fn test_rgb_100x100_succeeds() {
        let (mut controller, _) = scripted(
            Tool::Upscale,
            Ok(PixelResult::rgb(100, 100, vec![3u8; 30_000])),
        );
        controller.submit(png_file(100, 100)).unwrap();

        assert_eq!(controller.wait().name(), "succeeded");
        let artifact = controller.artifact().unwrap();
        assert_eq!(artifact.pixels().len(), 40_000);
        assert!(artifact.pixels().chunks_exact(4).all(|px| px[3] == 255));
        assert_eq!(controller.progress(), Progress::DONE);
        assert_eq!(
            controller.artifact_file_name().as_deref(),
            Some("upscaled-image.png")
        );
        assert!(controller.artifact_size().unwrap().ends_with(" KB"));
    }

    #[test]
    fn test_unexpected_output_format_still_normalized() {
        // Upscaling normally yields RGB; an RGBA result passes through unchanged
        let data: Vec<u8> = (0..16).collect();
        let (mut controller, _) =
            scripted(Tool::Upscale, Ok(PixelResult::rgba(2, 2, data.clone())));
        controller.submit(png_file(2, 2)).unwrap();

        assert_eq!(controller.wait().name(), "succeeded");
        assert_eq!(controller.artifact().unwrap().pixels(), data.as_slice());
    }

    #[test]
    fn test_oom_fails_with_reason() {
        let (mut controller, _) = scripted(Tool::Upscale, Err(ProcessingError::new("OOM")));
        controller.submit(png_file(4, 4)).unwrap();

        assert_eq!(controller.wait().name(), "failed");
        assert!(controller.error().unwrap().contains("OOM"));
        assert_eq!(controller.progress(), Progress::ZERO);
        assert!(controller.artifact().is_none());
    }

    #[test]
    fn test_second_job_hides_first_artifact() {
        let (mut controller, _) = scripted(
            Tool::BackgroundRemoval,
            Ok(PixelResult::rgba(2, 2, vec![1u8; 16])),
        );
        controller.submit(png_file(2, 2)).unwrap();
        controller.wait();
        assert!(controller.artifact().is_some());

        controller.submit(png_file(2, 2)).unwrap();
        assert!(controller.is_busy());
        assert!(controller.artifact().is_none());
        assert!(controller.error().is_none());
        assert_eq!(controller.progress().percent(), 20);

        controller.wait();
        assert!(controller.artifact().is_some());
    }

    #[test]
    fn test_submit_while_running_is_busy() {
        // Pipeline blocks until the test releases it
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));

        struct Gated(Arc<Mutex<mpsc::Receiver<()>>>);
        impl ProcessingPipeline for Gated {
            fn transform(&mut self, _input: &ImageInput) -> Result<PixelResult, ProcessingError> {
                let _ = self.0.lock().unwrap().recv();
                Ok(PixelResult::rgb(1, 1, vec![0, 0, 0]))
            }
        }

        let gate = Arc::clone(&release_rx);
        let mut controller = Controller::mount(
            Tool::Upscale,
            &ToolConfig::default(),
            from_fn(move || Ok(Gated(Arc::clone(&gate)))),
        )
        .unwrap();

        let job = controller.submit(png_file(1, 1)).unwrap();
        assert_eq!(
            controller.submit(png_file(1, 1)),
            Err(ControllerError::Job(JobError::Busy(job)))
        );
        assert_eq!(
            controller.reset(),
            Err(ControllerError::Job(JobError::Busy(job)))
        );

        release_tx.send(()).unwrap();
        assert_eq!(controller.wait().name(), "succeeded");
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let (mut controller, _) = scripted(Tool::Upscale, Err(ProcessingError::new("boom")));
        controller.submit(png_file(1, 1)).unwrap();
        controller.wait();

        controller.reset().unwrap();
        assert_eq!(controller.state(), &JobState::Idle);
        assert_eq!(controller.progress(), Progress::ZERO);
        assert!(controller.error().is_none());
        assert!(controller.stage().is_none());
    }

    #[test]
    fn test_input_encoding_per_tool() {
        let (mut upscale, seen_upscale) =
            scripted(Tool::Upscale, Ok(PixelResult::rgb(1, 1, vec![0, 0, 0])));
        upscale.submit(png_file(1, 1)).unwrap();
        upscale.wait();
        assert_eq!(*seen_upscale.lock().unwrap(), vec![InputEncoding::DataUrl]);

        let (mut remove_bg, seen_remove_bg) = scripted(
            Tool::BackgroundRemoval,
            Ok(PixelResult::rgba(1, 1, vec![0, 0, 0, 0])),
        );
        remove_bg.submit(png_file(1, 1)).unwrap();
        remove_bg.wait();
        assert_eq!(*seen_remove_bg.lock().unwrap(), vec![InputEncoding::RawBytes]);
    }

    #[test]
    fn test_non_image_rejected_without_starting() {
        let (mut controller, seen) =
            scripted(Tool::Upscale, Ok(PixelResult::rgb(1, 1, vec![0, 0, 0])));
        let result = controller.submit(ImageInput::from_file("application/pdf", vec![1, 2, 3]));

        assert!(matches!(
            result,
            Err(ControllerError::Input(InputError::NotAnImage(_)))
        ));
        assert_eq!(controller.state(), &JobState::Idle);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_poll_reaches_terminal_state() {
        let (mut controller, _) = scripted(Tool::Upscale, Ok(PixelResult::rgb(1, 1, vec![5, 5, 5])));
        controller.submit(png_file(1, 1)).unwrap();

        let mut last = controller.progress();
        let deadline = Instant::now() + Duration::from_secs(10);
        while controller.is_busy() && Instant::now() < deadline {
            controller.poll();
            if controller.is_busy() {
                assert!(controller.progress() >= last);
                last = controller.progress();
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(controller.state().name(), "succeeded");
    }

    #[test]
    fn test_wait_timeout_does_not_cancel() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));

        struct Gated(Arc<Mutex<mpsc::Receiver<()>>>);
        impl ProcessingPipeline for Gated {
            fn transform(&mut self, _input: &ImageInput) -> Result<PixelResult, ProcessingError> {
                let _ = self.0.lock().unwrap().recv();
                Err(ProcessingError::new("late failure"))
            }
        }

        let gate = Arc::clone(&release_rx);
        let mut controller = Controller::mount(
            Tool::BackgroundRemoval,
            &ToolConfig::default(),
            from_fn(move || Ok(Gated(Arc::clone(&gate)))),
        )
        .unwrap();
        controller.submit(png_file(1, 1)).unwrap();

        assert_eq!(controller.wait_timeout(Duration::from_millis(50)).name(), "running");

        release_tx.send(()).unwrap();
        controller.wait();
        assert_eq!(controller.error(), Some("Error processing: late failure"));
    }

    #[test]
    fn test_builtin_upscale_end_to_end() {
        let mut controller = Controller::mount_builtin(Tool::Upscale, &ToolConfig::default()).unwrap();
        controller.submit(png_file(8, 6)).unwrap();
        controller.wait();

        let artifact = controller.artifact().expect("upscaled");
        assert_eq!((artifact.width(), artifact.height()), (16, 12));
        assert_eq!(artifact.pixels().len(), 16 * 12 * 4);
    }

    #[test]
    fn test_builtin_background_removal_end_to_end() {
        let mut controller =
            Controller::mount_builtin(Tool::BackgroundRemoval, &ToolConfig::default()).unwrap();
        controller.submit(png_file(5, 5)).unwrap();
        controller.wait();

        // A uniform image is all background
        let artifact = controller.artifact().expect("matte");
        assert!(artifact.pixels().chunks_exact(4).all(|px| px[3] == 0));
        assert_eq!(
            controller.artifact_file_name().as_deref(),
            Some("background-removed.png")
        );
    }
}
