//! Type-safe identifier wrappers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, Result};

/// Generates string newtypes with the usual conversions.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique name of a registered watcher. Also the checkpoint key.
    WatcherName
);
define_id!(
    /// Identifier an external source assigns to an item (issue number, post id).
    SourceId
);
define_id!(
    /// Identifier of one delivery batch.
    BatchId
);

impl WatcherName {
    /// Parses a watcher name, rejecting anything that cannot be used as a file stem.
    ///
    /// Allowed: ASCII alphanumerics, `-`, `_` and `.` (not leading).
    pub fn parse(s: &str) -> Result<Self> {
        let name = Self(s.to_string());
        name.check()?;
        Ok(name)
    }

    /// Re-checks a name built without `parse` (`From`, deserialization).
    pub fn check(&self) -> Result<()> {
        let s = self.0.as_str();
        let valid = !s.is_empty()
            && !s.starts_with('.')
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(())
        } else {
            Err(ModelError::InvalidName(s.to_string()))
        }
    }
}

impl BatchId {
    /// Creates a new random batch ID.
    pub fn new() -> Self {
        Self(format!("batch-{}", Uuid::new_v4()))
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_prefix() {
        let id = BatchId::new();
        assert!(id.as_str().starts_with("batch-"));
        assert_ne!(id, BatchId::new());
    }

    #[test]
    fn test_watcher_name_parse() {
        assert!(WatcherName::parse("github-issues").is_ok());
        assert!(WatcherName::parse("dota_patches.v2").is_ok());
        assert!(WatcherName::parse("").is_err());
        assert!(WatcherName::parse("../etc").is_err());
        assert!(WatcherName::parse("has space").is_err());
        assert!(WatcherName::parse(".hidden").is_err());
    }

    #[test]
    fn test_id_serialization() {
        let id = SourceId::from_string("issue-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"issue-42\"");

        let parsed: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display() {
        let name = WatcherName::from_string("league-patches");
        assert_eq!(format!("{}", name), "league-patches");
    }
}
