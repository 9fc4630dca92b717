//! Fixture-backed collaborators for the CLI.
//!
//! A fixtures file is the JSON form of [`MemoryDirectory`]:
//!
//! ```json
//! { "session": "u-me", "latency_ms": 0,
//!   "users": [{ "uid": "u1", "username": "alice",
//!               "cached": { "followees": ["bob"], "followers": [] },
//!               "live":   { "followees": ["bob"], "followers": ["carol"] } }] }
//! ```

use std::path::{Path, PathBuf};

use tracker_core::memory::MemoryDirectory;
use tracker_core::{TrackerError, Uid};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixtures {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixtures {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TrackerError for FixtureError {
    fn error_code(&self) -> &'static str {
        match self {
            FixtureError::Read { .. } => "FIXTURES_READ_FAILED",
            FixtureError::Parse { .. } => "FIXTURES_INVALID",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}

/// Load a directory from `path`, replacing its session with `session` when given.
pub fn load_fixtures(path: &Path, session: Option<&str>) -> Result<MemoryDirectory, FixtureError> {
    let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut directory: MemoryDirectory =
        serde_json::from_str(&content).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(session) = session {
        directory.session = Some(Uid::from(session));
    }
    Ok(directory)
}
