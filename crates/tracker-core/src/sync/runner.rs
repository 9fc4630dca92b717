use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracker_protocol::RelationshipResult;

use crate::collaborators::Collaborators;
use crate::logging::elapsed_ms;
use crate::sync::errors::LoadError;
use crate::sync::task::RelationshipSyncTask;

/// Check a task's prerequisites, then run it.
///
/// A task that needs a session fails with [`LoadError::NoActiveSession`]
/// before any fetch when nobody is logged in.
pub async fn run_task(
    task: &RelationshipSyncTask,
    collaborators: &Collaborators,
    cancel: &CancellationToken,
) -> Result<RelationshipResult, LoadError> {
    let prereqs = task.prereqs();
    if prereqs.session
        && !collaborators
            .session
            .current_uid()
            .is_some_and(|uid| uid.exists())
    {
        debug!(
            event = "core.runner.prereqs_failed",
            task = task.name(),
            reason = "no_session",
        );
        return Err(LoadError::NoActiveSession);
    }

    debug!(
        event = "core.runner.run_started",
        task = task.name(),
        mode = %task.mode(),
        uis = ?task.required_uis(),
    );

    let started = Instant::now();
    let result = task.load(collaborators, cancel).await;

    info!(
        event = "core.runner.run_completed",
        task = task.name(),
        mode = %task.mode(),
        success = result.is_ok(),
        elapsed_ms = elapsed_ms(started),
    );
    result
}
