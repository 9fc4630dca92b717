//! Identifier resolution and the relationship sync task.

pub mod errors;
pub mod resolver;
pub mod runner;
pub mod task;

pub use errors::{FollowDirection, LoadError};
pub use resolver::IdentifierResolver;
pub use runner::run_task;
pub use task::{Prereqs, RelationshipSyncTask, UiKind};
