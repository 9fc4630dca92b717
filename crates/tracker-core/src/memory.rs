//! In-memory collaborators.
//!
//! [`MemoryDirectory`] answers session, assertion and relationship queries
//! from a fixed data set and records every call it receives. The `tracker`
//! CLI deserializes one from a fixtures file; tests build them in code.
//! [`RecordingSink`] collects published results and lets a caller wait for
//! a given count.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracker_protocol::{RelationshipResult, SyncMode, Uid};

use crate::collaborators::{
    IdentityResolver, NotificationSink, RemoteError, SessionProvider, SyncProtocolClient,
};
use crate::logging::duration_ms;
use crate::sync::FollowDirection;

/// Relationship lists for one mode. A `None` list makes that fetch fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub followees: Option<Vec<String>>,
    #[serde(default)]
    pub followers: Option<Vec<String>>,
}

impl Relationships {
    pub fn new(followees: &[&str], followers: &[&str]) -> Self {
        Self {
            followees: Some(followees.iter().map(|s| s.to_string()).collect()),
            followers: Some(followers.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Both lists present, so a load in this mode succeeds.
    pub fn is_complete(&self) -> bool {
        self.followees.is_some() && self.followers.is_some()
    }

    fn list(&self, direction: FollowDirection) -> Option<&Vec<String>> {
        match direction {
            FollowDirection::Followees => self.followees.as_ref(),
            FollowDirection::Followers => self.followers.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUser {
    pub uid: Uid,
    pub username: String,
    /// Answer for [`SyncMode::Cached`]; absent means nothing is cached.
    #[serde(default)]
    pub cached: Option<Relationships>,
    /// Answer for [`SyncMode::Live`]; absent means the server is unreachable.
    #[serde(default)]
    pub live: Option<Relationships>,
}

impl MemoryUser {
    pub fn new(uid: &str, username: &str) -> Self {
        Self {
            uid: Uid::from(uid),
            username: username.to_string(),
            cached: None,
            live: None,
        }
    }

    pub fn with_cached(mut self, relationships: Relationships) -> Self {
        self.cached = Some(relationships);
        self
    }

    pub fn with_live(mut self, relationships: Relationships) -> Self {
        self.live = Some(relationships);
        self
    }

    pub fn for_mode(&self, mode: SyncMode) -> Option<&Relationships> {
        match mode {
            SyncMode::Cached => self.cached.as_ref(),
            SyncMode::Live => self.live.as_ref(),
        }
    }
}

/// One collaborator call observed by a [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentUid,
    ResolveAssertion(String),
    Fetch {
        uid: Uid,
        mode: SyncMode,
        direction: FollowDirection,
    },
}

/// Data-backed session provider, identity resolver and sync client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDirectory {
    #[serde(default)]
    pub session: Option<Uid>,
    #[serde(default)]
    pub users: Vec<MemoryUser>,
    /// Simulated network round trip for live fetches and assertion lookups.
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(skip)]
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MemoryDirectory {
    pub fn new(users: Vec<MemoryUser>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn with_session(mut self, uid: &str) -> Self {
        self.session = Some(Uid::from(uid));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = duration_ms(latency);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock_calls().clone()
    }

    /// Fetch calls received for `uid`, in order.
    pub fn fetches_for(&self, uid: &Uid) -> Vec<(SyncMode, FollowDirection)> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                Call::Fetch {
                    uid: called,
                    mode,
                    direction,
                } if called == uid => Some((*mode, *direction)),
                _ => None,
            })
            .collect()
    }

    /// How many results a refresh of `uid` will publish: one per mode whose
    /// relationships are complete.
    pub fn expected_publishes(&self, uid: &Uid) -> usize {
        self.user(uid).map_or(0, |user| {
            SyncMode::PHASES
                .iter()
                .filter(|mode| user.for_mode(**mode).is_some_and(Relationships::is_complete))
                .count()
        })
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) {
        self.lock_calls().push(call);
    }

    fn user(&self, uid: &Uid) -> Option<&MemoryUser> {
        self.users.iter().find(|u| &u.uid == uid)
    }

    /// Wait out the simulated latency unless `cancel` fires first.
    async fn round_trip(&self, cancel: &CancellationToken) -> Result<(), RemoteError> {
        if self.latency_ms == 0 {
            return if cancel.is_cancelled() {
                Err(RemoteError::Cancelled)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(RemoteError::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(self.latency_ms)) => Ok(()),
        }
    }

    async fn fetch(
        &self,
        uid: &Uid,
        mode: SyncMode,
        direction: FollowDirection,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RemoteError> {
        self.record(Call::Fetch {
            uid: uid.clone(),
            mode,
            direction,
        });
        if mode.is_live() {
            self.round_trip(cancel).await?;
        }
        let user = self.user(uid).ok_or_else(|| RemoteError::NotFound {
            what: format!("uid {}", uid),
        })?;
        user.for_mode(mode)
            .and_then(|r| r.list(direction))
            .cloned()
            .ok_or_else(|| RemoteError::Unavailable {
                message: format!("no {} {} for {}", mode, direction, uid),
            })
    }
}

impl SessionProvider for MemoryDirectory {
    fn current_uid(&self) -> Option<Uid> {
        self.record(Call::CurrentUid);
        self.session.clone()
    }
}

impl IdentityResolver for MemoryDirectory {
    fn resolve_assertion<'a>(
        &'a self,
        assertion: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Uid, RemoteError>> {
        async move {
            self.record(Call::ResolveAssertion(assertion.to_string()));
            self.round_trip(cancel).await?;
            self.users
                .iter()
                .find(|u| u.username == assertion)
                .map(|u| u.uid.clone())
                .ok_or_else(|| RemoteError::NotFound {
                    what: format!("user {}", assertion),
                })
        }
        .boxed()
    }
}

impl SyncProtocolClient for MemoryDirectory {
    fn fetch_followees<'a>(
        &'a self,
        uid: &'a Uid,
        mode: SyncMode,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<String>, RemoteError>> {
        self.fetch(uid, mode, FollowDirection::Followees, cancel)
            .boxed()
    }

    fn fetch_unverified_followers<'a>(
        &'a self,
        uid: &'a Uid,
        mode: SyncMode,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<String>, RemoteError>> {
        self.fetch(uid, mode, FollowDirection::Followers, cancel)
            .boxed()
    }
}

/// Sink that keeps every published result.
#[derive(Debug, Default)]
pub struct RecordingSink {
    results: Mutex<Vec<RelationshipResult>>,
    published: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<RelationshipResult> {
        self.lock_results().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` results have been published.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let published = self.published.notified();
                if self.len() >= count {
                    return;
                }
                published.await;
            }
        })
        .await
        .is_ok()
    }

    fn lock_results(&self) -> MutexGuard<'_, Vec<RelationshipResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, result: RelationshipResult) {
        self.lock_results().push(result);
        self.published.notify_waiters();
    }
}
