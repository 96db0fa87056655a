//! Serial execution lanes.
//!
//! Each lane is one worker thread draining a FIFO channel, so at most one
//! job runs at a time within a lane. Callers block until their job finishes.

use crate::{Error, Result};
use std::fmt;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};

use crate::storage::sqlite::acquire_lock;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// One of the gateway's two serial execution contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Lane used by the gateway's own methods.
    Foreground,
    /// Lane for work that should not queue behind foreground calls.
    Background,
}

impl Lane {
    /// Returns the lane name used in logs, metrics and thread names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A FIFO queue drained by a dedicated worker thread.
pub(crate) struct SerialQueue {
    lane: Lane,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl SerialQueue {
    /// Starts the worker thread for `lane`.
    pub(crate) fn spawn(lane: Lane) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name(format!("sqlaccess-{lane}"))
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .map_err(|e| {
                tracing::error!(lane = %lane, error = %e, "Failed to start execution lane");
                Error::Unavailable {
                    lane: lane.to_string(),
                }
            })?;

        Ok(Self {
            lane,
            worker_id: worker.thread().id(),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Runs `job` on the worker thread and waits for its result.
    ///
    /// A job submitted from the worker thread itself runs inline, since
    /// queueing it would wait on the job currently running.
    pub(crate) fn run<R, F>(&self, job: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if thread::current().id() == self.worker_id {
            return Ok(job());
        }

        let sender = acquire_lock(&self.sender).clone();
        let Some(sender) = sender else {
            return Err(self.unavailable());
        };

        let (reply, result) = mpsc::sync_channel(1);
        let wrapped: Job = Box::new(move || {
            // The caller may have stopped waiting; nothing to do then.
            let _ = reply.send(job());
        });
        if sender.send(wrapped).is_err() {
            return Err(self.unavailable());
        }
        result.recv().map_err(|_| self.unavailable())
    }

    /// Stops accepting jobs and waits for queued jobs to drain.
    pub(crate) fn shutdown(&self) {
        acquire_lock(&self.sender).take();
        let worker = acquire_lock(&self.worker).take();
        if let Some(worker) = worker {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::error!(lane = %self.lane, "Execution lane worker panicked");
            }
        }
    }

    fn unavailable(&self) -> Error {
        tracing::error!(lane = %self.lane, "Execution lane is unavailable");
        Error::Unavailable {
            lane: self.lane.to_string(),
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
