//! tracker-core: background refresh of follow relationships
//!
//! Resolves an identity and refreshes the set of names it follows and the
//! unverified set of names following it, first from local cache and then
//! from the server, publishing each result as it arrives.
//!
//! # Main Entry Points
//!
//! - [`loader`] - Bounded-queue background worker with start/shutdown lifecycle
//! - [`sync`] - Identifier resolution and the two-fetch relationship task
//! - [`collaborators`] - Trait seams for session, resolver, sync client and sink
//! - [`memory`] - In-memory collaborators for fixtures and tests
//! - [`teardown`] - Ordered shutdown hooks for the process owner
//! - [`config`] - `[loader]` configuration loading

pub mod collaborators;
pub mod config;
pub mod errors;
pub mod loader;
pub mod logging;
pub mod memory;
pub mod sync;
pub mod teardown;

pub use tracker_protocol::{LoadTarget, RelationshipResult, SyncMode, Uid};

pub use collaborators::{
    Collaborators, IdentityResolver, NotificationSink, RemoteError, SessionProvider,
    SyncProtocolClient,
};
pub use config::{ConfigError, LoaderConfig, load_loader_config};
pub use errors::TrackerError;
pub use loader::{LoaderState, QueueError, RefreshLoader, ShutdownComplete};
pub use sync::{
    FollowDirection, IdentifierResolver, LoadError, Prereqs, RelationshipSyncTask, UiKind,
    run_task,
};
pub use teardown::{ShutdownHooks, TeardownError};

pub use logging::init_logging;
