use serde::{Deserialize, Serialize};

/// Canonical identifier for an identity, independent of its display name.
///
/// The empty string is the nil identifier; collaborators use it to say
/// "no identity" without reaching for `Option`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// The nil identifier.
    pub fn nil() -> Self {
        Self(String::new())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when the identifier refers to an identity.
    pub fn exists(&self) -> bool {
        !self.is_nil()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(uid: &str) -> Self {
        Self::new(uid)
    }
}

impl From<String> for Uid {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

/// Whether a fetch may consult the network or must answer from local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Cached,
    Live,
}

impl SyncMode {
    pub fn is_live(self) -> bool {
        matches!(self, SyncMode::Live)
    }

    /// The loader's per-request phase order.
    pub const PHASES: [SyncMode; 2] = [SyncMode::Cached, SyncMode::Live];
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Cached => write!(f, "cached"),
            SyncMode::Live => write!(f, "live"),
        }
    }
}

/// Relationship sets produced by one successful sync attempt.
///
/// A cached-phase result and a live-phase result for the same identity are
/// two distinct values; nothing merges them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipResult {
    pub uid: Uid,
    /// Names this identity follows.
    pub followees: Vec<String>,
    /// Names following this identity, as reported by the server without
    /// local verification.
    pub followers: Vec<String>,
}
