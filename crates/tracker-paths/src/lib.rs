use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found; set the $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for the `~/.tracker/` directory layout.
///
/// Use `resolve()` in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct TrackerPaths {
    tracker_dir: PathBuf,
}

impl TrackerPaths {
    /// Resolve paths from the user's home directory (`~/.tracker`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            tracker_dir: home.join(".tracker"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(tracker_dir: PathBuf) -> Self {
        Self { tracker_dir }
    }

    /// Resolve from `$HOME`, falling back to `/tmp/.tracker` when no home
    /// directory is available.
    pub fn resolve_or_tmp() -> Self {
        Self::resolve().unwrap_or_else(|_| Self::from_dir(PathBuf::from("/tmp/.tracker")))
    }

    /// The base `~/.tracker` directory.
    pub fn tracker_dir(&self) -> &Path {
        &self.tracker_dir
    }

    pub fn user_config(&self) -> PathBuf {
        self.tracker_dir.join("config.toml")
    }

    /// Default fixtures file read by `tracker refresh` when `--fixtures` is omitted.
    pub fn fixtures_file(&self) -> PathBuf {
        self.tracker_dir.join("fixtures.json")
    }
}
