mod target;
mod types;

pub use target::LoadTarget;
pub use types::{RelationshipResult, SyncMode, Uid};
