use tracker_protocol::SyncMode;

use crate::collaborators::RemoteError;
use crate::errors::TrackerError;

/// Which relationship set a fetch was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    Followees,
    Followers,
}

impl std::fmt::Display for FollowDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FollowDirection::Followees => write!(f, "followees"),
            FollowDirection::Followers => write!(f, "followers"),
        }
    }
}

/// Why one load attempt produced no result.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no active session: log in or pass an explicit uid or assertion")]
    NoActiveSession,

    #[error("cannot resolve '{assertion}' from cache; a network lookup is required")]
    ResolutionUnavailable { assertion: String },

    #[error("failed to resolve '{assertion}': {source}")]
    ResolutionFailed {
        assertion: String,
        #[source]
        source: RemoteError,
    },

    #[error("{mode} {direction} sync failed: {source}")]
    SyncFailed {
        mode: SyncMode,
        direction: FollowDirection,
        #[source]
        source: RemoteError,
    },
}

impl TrackerError for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            LoadError::NoActiveSession => "NO_ACTIVE_SESSION",
            LoadError::ResolutionUnavailable { .. } => "RESOLUTION_UNAVAILABLE",
            LoadError::ResolutionFailed { .. } => "RESOLUTION_FAILED",
            LoadError::SyncFailed { .. } => "SYNC_FAILED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, LoadError::NoActiveSession)
    }
}
