use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracker_protocol::{LoadTarget, RelationshipResult, SyncMode};

use crate::collaborators::Collaborators;
use crate::sync::errors::{FollowDirection, LoadError};
use crate::sync::resolver::IdentifierResolver;

/// UI surfaces a task may need from its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiKind {
    Log,
}

/// Conditions a task runner checks before invoking a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prereqs {
    /// A logged-in session is required.
    pub session: bool,
}

/// Loads both relationship sets for one target in one mode.
///
/// Either fetch failing fails the whole attempt; nothing partial is returned.
#[derive(Debug, Clone)]
pub struct RelationshipSyncTask {
    target: LoadTarget,
    mode: SyncMode,
}

impl RelationshipSyncTask {
    pub fn new(target: LoadTarget, mode: SyncMode) -> Self {
        Self { target, mode }
    }

    pub fn name(&self) -> &'static str {
        "RelationshipSyncTask"
    }

    pub fn target(&self) -> &LoadTarget {
        &self.target
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Only a target that falls back to the current session needs one.
    pub fn prereqs(&self) -> Prereqs {
        Prereqs {
            session: self.target.needs_session(),
        }
    }

    pub fn required_uis(&self) -> &'static [UiKind] {
        &[UiKind::Log]
    }

    pub async fn load(
        &self,
        collaborators: &Collaborators,
        cancel: &CancellationToken,
    ) -> Result<RelationshipResult, LoadError> {
        let uid = IdentifierResolver::new(collaborators)
            .resolve(&self.target, self.mode.is_live(), cancel)
            .await?;

        let followees = collaborators
            .sync
            .fetch_followees(&uid, self.mode, cancel)
            .await
            .map_err(|source| LoadError::SyncFailed {
                mode: self.mode,
                direction: FollowDirection::Followees,
                source,
            })?;

        let followers = collaborators
            .sync
            .fetch_unverified_followers(&uid, self.mode, cancel)
            .await
            .map_err(|source| LoadError::SyncFailed {
                mode: self.mode,
                direction: FollowDirection::Followers,
                source,
            })?;

        debug!(
            event = "core.sync.load_completed",
            uid = %uid,
            mode = %self.mode,
            followees = followees.len(),
            followers = followers.len(),
        );

        Ok(RelationshipResult {
            uid,
            followees,
            followers,
        })
    }
}
