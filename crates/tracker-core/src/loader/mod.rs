//! Background refresh loader.
//!
//! Producers call [`RefreshLoader::queue`], which never blocks: it either
//! enqueues the uid or fails with [`QueueError::QueueFull`]. One worker per
//! Running period dequeues in FIFO order and loads each uid twice, cached
//! then live, publishing every successful result to the sink.
//!
//! `start` and `shutdown` only do bookkeeping under the lifecycle lock and
//! must be called from within a tokio runtime.

pub mod errors;
mod worker;

pub use errors::QueueError;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracker_protocol::Uid;

use crate::collaborators::Collaborators;
use crate::config::{DEFAULT_QUEUE_CAPACITY, LoaderConfig};
use worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Stopped,
    Running,
}

enum Lifecycle {
    Stopped,
    Running {
        worker: JoinHandle<()>,
        /// Scope shared by every fetch the worker performs.
        cancel: CancellationToken,
        /// Tells the worker loop to exit.
        stop: CancellationToken,
    },
}

pub struct RefreshLoader {
    collaborators: Collaborators,
    capacity: usize,
    queue_tx: mpsc::Sender<Uid>,
    queue_rx: Arc<AsyncMutex<mpsc::Receiver<Uid>>>,
    lifecycle: Mutex<Lifecycle>,
    /// Running periods started so far. An exiting worker only discards the
    /// queue while its own period is still the latest.
    generation: Arc<Mutex<u64>>,
}

impl RefreshLoader {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_capacity(collaborators, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn from_config(collaborators: Collaborators, config: &LoaderConfig) -> Self {
        Self::with_capacity(collaborators, config.queue_capacity)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(collaborators: Collaborators, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (queue_tx, queue_rx) = mpsc::channel(capacity);
        Self {
            collaborators,
            capacity,
            queue_tx,
            queue_rx: Arc::new(AsyncMutex::new(queue_rx)),
            lifecycle: Mutex::new(Lifecycle::Stopped),
            generation: Arc::new(Mutex::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of requests waiting in the queue.
    pub fn pending(&self) -> usize {
        self.capacity - self.queue_tx.capacity()
    }

    pub fn state(&self) -> LoaderState {
        match *self.lock_lifecycle() {
            Lifecycle::Stopped => LoaderState::Stopped,
            Lifecycle::Running { .. } => LoaderState::Running,
        }
    }

    /// Launch the worker. No-op while already running.
    ///
    /// In-flight fetches are cancelled when `parent` is cancelled or when
    /// [`shutdown`](Self::shutdown) is called.
    pub fn start(&self, parent: &CancellationToken) {
        let mut lifecycle = self.lock_lifecycle();
        if let Lifecycle::Running { .. } = *lifecycle {
            debug!(event = "core.loader.start_skipped", reason = "already_running");
            return;
        }

        let period = {
            let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *generation += 1;
            *generation
        };

        let stop = CancellationToken::new();
        let cancel = parent.child_token();
        let worker = Worker::new(
            self.collaborators.clone(),
            self.queue_rx.clone(),
            stop.clone(),
            cancel.clone(),
            self.generation.clone(),
            period,
        );
        let worker = tokio::spawn(worker.run());

        *lifecycle = Lifecycle::Running {
            worker,
            cancel,
            stop,
        };
        info!(
            event = "core.loader.start_completed",
            capacity = self.capacity,
            period = period,
        );
    }

    /// Stop the worker without waiting for it.
    ///
    /// Cancels in-flight fetches and signals the worker loop. The returned
    /// future resolves once the worker has exited; it is already resolved
    /// when the loader was not running. Requests still queued when the worker
    /// exits are dropped, unless `start` was called again in the meantime.
    pub fn shutdown(&self) -> ShutdownComplete {
        let mut lifecycle = self.lock_lifecycle();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => {
                debug!(event = "core.loader.shutdown_skipped", reason = "not_running");
                ShutdownComplete::completed()
            }
            Lifecycle::Running {
                worker,
                cancel,
                stop,
            } => {
                info!(event = "core.loader.shutdown_started");
                cancel.cancel();
                stop.cancel();

                let (done_tx, done_rx) = oneshot::channel();
                tokio::spawn(async move {
                    if let Err(e) = worker.await {
                        error!(event = "core.loader.worker_failed", error = %e);
                    }
                    info!(event = "core.loader.shutdown_completed");
                    let _ = done_tx.send(());
                });
                ShutdownComplete { done: done_rx }
            }
        }
    }

    /// Enqueue `uid` for a refresh without waiting.
    pub fn queue(&self, uid: Uid) -> Result<(), QueueError> {
        match self.queue_tx.try_send(uid) {
            Ok(()) => Ok(()),
            // The receiver lives as long as the loader, so only capacity can fail a send.
            Err(e) => {
                warn!(
                    event = "core.loader.queue_full",
                    uid = %e.into_inner(),
                    capacity = self.capacity,
                );
                Err(QueueError::QueueFull {
                    capacity: self.capacity,
                })
            }
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshLoader {
    fn drop(&mut self) {
        let lifecycle = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Lifecycle::Running { cancel, stop, .. } = lifecycle {
            cancel.cancel();
            stop.cancel();
        }
    }
}

impl std::fmt::Debug for RefreshLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshLoader")
            .field("capacity", &self.capacity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Resolves once the worker stopped by [`RefreshLoader::shutdown`] has exited.
#[must_use = "await the signal to wait for the worker to exit"]
#[derive(Debug)]
pub struct ShutdownComplete {
    done: oneshot::Receiver<()>,
}

impl ShutdownComplete {
    fn completed() -> Self {
        let (done_tx, done) = oneshot::channel();
        let _ = done_tx.send(());
        Self { done }
    }
}

impl Future for ShutdownComplete {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender also means the waiting task is gone.
        Pin::new(&mut self.done).poll(cx).map(|_| ())
    }
}
