//! Worker channel: one background thread per controller.
//!
//! The controller posts exactly one request per Job and reads back the
//! Job's messages in the order they were sent. The worker owns the pipeline
//! slot, so the pipeline is loaded on the worker thread and never crosses it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::ImageInput;
use crate::job::{JobId, WorkerEvent};
use crate::pipeline::{PipelineLoader, PipelineSlot};

/// Errors of the worker transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("Failed to start worker {name}: {reason}")]
    Spawn { name: String, reason: String },

    /// The worker thread has exited.
    #[error("Worker {0} is no longer running")]
    Disconnected(String),
}

struct WorkerRequest {
    job: JobId,
    input: ImageInput,
}

/// Handle to a running worker thread.
pub struct WorkerChannel {
    name: String,
    requests: Option<Sender<WorkerRequest>>,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerChannel")
            .field("name", &self.name)
            .field("open", &self.requests.is_some())
            .finish()
    }
}

impl WorkerChannel {
    /// Start a worker thread that serves Jobs with pipelines from `loader`.
    ///
    /// The pipeline itself is not loaded until the first Job arrives.
    pub fn spawn<L: PipelineLoader>(name: impl Into<String>, loader: L) -> Result<Self, WorkerError> {
        let name = name.into();
        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();

        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&thread_name, request_rx, event_tx, loader))
            .map_err(|e| WorkerError::Spawn {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        info!(worker = %name, "worker started");
        Ok(Self {
            name,
            requests: Some(request_tx),
            events: event_rx,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send the single request of a Job.
    pub fn post(&self, job: JobId, input: ImageInput) -> Result<(), WorkerError> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| self.disconnected())?;
        requests
            .send(WorkerRequest { job, input })
            .map_err(|_| self.disconnected())
    }

    /// Block until the next message arrives.
    pub fn recv(&self) -> Result<WorkerEvent, WorkerError> {
        self.events.recv().map_err(|_| self.disconnected())
    }

    /// Take the next message if one is ready.
    pub fn try_recv(&self) -> Result<Option<WorkerEvent>, WorkerError> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.disconnected()),
        }
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerEvent>, WorkerError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(self.disconnected()),
        }
    }

    /// Close the request queue and wait for the worker to finish its current Job.
    pub fn shutdown(mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = %self.name, "worker thread panicked");
            }
        }
    }

    fn disconnected(&self) -> WorkerError {
        WorkerError::Disconnected(self.name.clone())
    }
}

impl Drop for WorkerChannel {
    /// Closes the request queue without blocking. A Job still in flight runs
    /// to completion; its messages are discarded and the thread then exits.
    fn drop(&mut self) {
        if self.requests.take().is_some() {
            debug!(worker = %self.name, "worker channel closed");
        }
    }
}

fn worker_loop<L: PipelineLoader>(
    name: &str,
    requests: Receiver<WorkerRequest>,
    events: Sender<WorkerEvent>,
    loader: L,
) {
    let mut slot = PipelineSlot::new(loader);

    while let Ok(WorkerRequest { job, input }) = requests.recv() {
        debug!(worker = %name, %job, "job received");

        let mut receiver_gone = false;
        slot.run_job(&input, |message| {
            if events.send(WorkerEvent { job, message }).is_err() {
                receiver_gone = true;
            }
        });

        if receiver_gone {
            break;
        }
    }

    info!(worker = %name, "worker stopped");
}
