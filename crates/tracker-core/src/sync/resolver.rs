use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracker_protocol::{LoadTarget, Uid};

use crate::collaborators::{Collaborators, IdentityResolver, SessionProvider};
use crate::sync::errors::LoadError;

/// Turns a [`LoadTarget`] into a canonical [`Uid`].
#[derive(Clone)]
pub struct IdentifierResolver {
    session: Arc<dyn SessionProvider>,
    identity: Arc<dyn IdentityResolver>,
}

impl IdentifierResolver {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            session: collaborators.session.clone(),
            identity: collaborators.identity.clone(),
        }
    }

    /// Resolve `target`.
    ///
    /// An explicit uid is returned as is. An assertion needs the network:
    /// with `allow_network == false` it fails with
    /// [`LoadError::ResolutionUnavailable`]. Without either, the current
    /// session's uid is used.
    pub async fn resolve(
        &self,
        target: &LoadTarget,
        allow_network: bool,
        cancel: &CancellationToken,
    ) -> Result<Uid, LoadError> {
        if let Some(uid) = target.explicit_uid() {
            return Ok(uid.clone());
        }

        if let Some(assertion) = target.assertion() {
            if !allow_network {
                debug!(
                    event = "core.resolver.assertion_skipped",
                    assertion = assertion,
                    reason = "cache_only",
                );
                return Err(LoadError::ResolutionUnavailable {
                    assertion: assertion.to_string(),
                });
            }

            let uid = self
                .identity
                .resolve_assertion(assertion, cancel)
                .await
                .map_err(|source| LoadError::ResolutionFailed {
                    assertion: assertion.to_string(),
                    source,
                })?;
            debug!(
                event = "core.resolver.assertion_resolved",
                assertion = assertion,
                uid = %uid,
            );
            return Ok(uid);
        }

        match self.session.current_uid() {
            Some(uid) if uid.exists() => Ok(uid),
            _ => Err(LoadError::NoActiveSession),
        }
    }
}
