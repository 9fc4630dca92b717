//! Trait seams for everything the loader does not own.
//!
//! The session store, the identity resolver, the sync protocol client and
//! the notification sink are all supplied by the process owner through one
//! [`Collaborators`] record. Network-calling methods take the loader's
//! [`CancellationToken`] and are expected to abort promptly once it fires.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracker_protocol::{RelationshipResult, SyncMode, Uid};

use crate::errors::TrackerError;

/// Errors reported by collaborator implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("unavailable: {message}")]
    Unavailable { message: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("cancelled")]
    Cancelled,

    #[error("{message}")]
    Other { message: String },
}

impl TrackerError for RemoteError {
    fn error_code(&self) -> &'static str {
        match self {
            RemoteError::Unavailable { .. } => "REMOTE_UNAVAILABLE",
            RemoteError::NotFound { .. } => "REMOTE_NOT_FOUND",
            RemoteError::Cancelled => "REMOTE_CANCELLED",
            RemoteError::Other { .. } => "REMOTE_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Reports who is logged in.
pub trait SessionProvider: Send + Sync {
    /// The current session's uid, or `None` when logged out.
    fn current_uid(&self) -> Option<Uid>;
}

/// Turns a human-readable assertion (`alice`, `alice@github`) into a uid.
pub trait IdentityResolver: Send + Sync {
    fn resolve_assertion<'a>(
        &'a self,
        assertion: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Uid, RemoteError>>;
}

/// Fetches relationship sets, from local state in [`SyncMode::Cached`] or
/// from the server in [`SyncMode::Live`].
pub trait SyncProtocolClient: Send + Sync {
    /// Names `uid` follows.
    fn fetch_followees<'a>(
        &'a self,
        uid: &'a Uid,
        mode: SyncMode,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<String>, RemoteError>>;

    /// Names following `uid`, as reported by the server and not verified locally.
    fn fetch_unverified_followers<'a>(
        &'a self,
        uid: &'a Uid,
        mode: SyncMode,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<String>, RemoteError>>;
}

/// Receives every successfully loaded result. Must not block.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, result: RelationshipResult);
}

/// Dependency record built once by the process owner and handed to every
/// component constructor.
#[derive(Clone)]
pub struct Collaborators {
    pub session: Arc<dyn SessionProvider>,
    pub identity: Arc<dyn IdentityResolver>,
    pub sync: Arc<dyn SyncProtocolClient>,
    pub sink: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
