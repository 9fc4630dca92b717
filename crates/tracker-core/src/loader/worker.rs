//! The single consumer of the refresh queue.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracker_protocol::{LoadTarget, SyncMode, Uid};

use crate::collaborators::Collaborators;
use crate::errors::TrackerError;
use crate::logging::elapsed_ms;
use crate::sync::{RelationshipSyncTask, run_task};

/// The single consumer of the refresh queue for one Running period.
pub(super) struct Worker {
    collaborators: Collaborators,
    queue: Arc<AsyncMutex<mpsc::Receiver<Uid>>>,
    stop: CancellationToken,
    cancel: CancellationToken,
    generation: Arc<Mutex<u64>>,
    period: u64,
}

impl Worker {
    pub(super) fn new(
        collaborators: Collaborators,
        queue: Arc<AsyncMutex<mpsc::Receiver<Uid>>>,
        stop: CancellationToken,
        cancel: CancellationToken,
        generation: Arc<Mutex<u64>>,
        period: u64,
    ) -> Self {
        Self {
            collaborators,
            queue,
            stop,
            cancel,
            generation,
            period,
        }
    }

    pub(super) async fn run(self) {
        // The previous period's worker holds the receiver until it has exited.
        let mut queue = tokio::select! {
            biased;
            _ = self.stop.cancelled() => {
                debug!(event = "core.loader.worker_stopped_before_start");
                return;
            }
            queue = self.queue.lock() => queue,
        };

        info!(event = "core.loader.worker_started");

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                next = queue.recv() => match next {
                    Some(uid) => self.process(uid).await,
                    None => break,
                },
            }
        }

        // Holding the generation lock keeps a concurrent start from slipping
        // in between the check and the drain.
        let dropped = {
            let generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            if *generation == self.period {
                discard_pending(&mut queue)
            } else {
                0
            }
        };
        info!(
            event = "core.loader.worker_stopped",
            period = self.period,
            dropped = dropped,
        );
    }

    /// Cached phase, then live phase. Each successful phase publishes its own
    /// result; a failed phase is logged and never stops the other.
    async fn process(&self, uid: Uid) {
        info!(event = "core.loader.request_started", uid = %uid);
        let started = Instant::now();
        let mut published = 0usize;

        for mode in SyncMode::PHASES {
            let task = RelationshipSyncTask::new(LoadTarget::for_uid(uid.clone()), mode);
            match run_task(&task, &self.collaborators, &self.cancel).await {
                Ok(result) => {
                    self.collaborators.sink.publish(result);
                    published += 1;
                }
                Err(e) if mode == SyncMode::Cached => {
                    debug!(
                        event = "core.loader.phase_failed",
                        uid = %uid,
                        mode = %mode,
                        error_code = e.error_code(),
                        error = %e,
                    );
                }
                Err(e) => {
                    warn!(
                        event = "core.loader.phase_failed",
                        uid = %uid,
                        mode = %mode,
                        error_code = e.error_code(),
                        error = %e,
                    );
                }
            }
        }

        info!(
            event = "core.loader.request_completed",
            uid = %uid,
            published = published,
            elapsed_ms = elapsed_ms(started),
        );
    }
}

/// Drop whatever is still queued so a later start sees only new requests.
fn discard_pending(queue: &mut mpsc::Receiver<Uid>) -> usize {
    let mut dropped = 0;
    while queue.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}
