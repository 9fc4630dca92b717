use serde::{Deserialize, Serialize};

use crate::types::Uid;

/// What a load should be resolved against.
///
/// Exactly one interpretation applies: an explicit uid wins over an
/// assertion, and an assertion wins over the current session. A nil uid or
/// an empty assertion counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
}

impl LoadTarget {
    pub fn for_uid(uid: Uid) -> Self {
        Self {
            uid: Some(uid),
            assertion: None,
        }
    }

    pub fn for_assertion(assertion: impl Into<String>) -> Self {
        Self {
            uid: None,
            assertion: Some(assertion.into()),
        }
    }

    /// Resolve against whoever is logged in.
    pub fn current_session() -> Self {
        Self::default()
    }

    /// The explicit uid, if one is set and not nil.
    pub fn explicit_uid(&self) -> Option<&Uid> {
        self.uid.as_ref().filter(|uid| uid.exists())
    }

    /// The assertion, if one is set and not empty.
    pub fn assertion(&self) -> Option<&str> {
        self.assertion.as_deref().filter(|a| !a.is_empty())
    }

    /// `true` when resolution falls through to the current session.
    pub fn needs_session(&self) -> bool {
        self.explicit_uid().is_none() && self.assertion().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_uid() {
        let target = LoadTarget::for_uid(Uid::from("u1"));
        assert_eq!(target.explicit_uid(), Some(&Uid::from("u1")));
        assert!(target.assertion().is_none());
        assert!(!target.needs_session());
    }

    #[test]
    fn test_for_assertion() {
        let target = LoadTarget::for_assertion("alice@github");
        assert!(target.explicit_uid().is_none());
        assert_eq!(target.assertion(), Some("alice@github"));
        assert!(!target.needs_session());
    }

    #[test]
    fn test_current_session() {
        assert!(LoadTarget::current_session().needs_session());
    }

    #[test]
    fn test_nil_uid_and_empty_assertion_count_as_absent() {
        let target = LoadTarget {
            uid: Some(Uid::nil()),
            assertion: Some(String::new()),
        };
        assert!(target.explicit_uid().is_none());
        assert!(target.assertion().is_none());
        assert!(target.needs_session());
    }

    #[test]
    fn test_serde_omits_absent_fields() {
        let json = serde_json::to_string(&LoadTarget::for_assertion("bob")).unwrap();
        assert_eq!(json, r#"{"assertion":"bob"}"#);
        let parsed: LoadTarget = serde_json::from_str("{}").unwrap();
        assert!(parsed.needs_session());
    }
}
