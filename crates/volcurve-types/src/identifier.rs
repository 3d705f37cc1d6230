//! Security and field identifiers.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Opaque security identifier (e.g., "7203 JP Equity", "NKY Index").
///
/// The identifier is passed through to the gateway verbatim and used as a
/// table column label.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SecurityId(String);

impl SecurityId {
    /// Creates a new security identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SecurityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for SecurityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque field identifier (e.g., "PX_LAST", "VOLUME").
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    /// Creates a new field identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for FieldId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_display() {
        let sec = SecurityId::new("7203 JP Equity");
        assert_eq!(sec.to_string(), "7203 JP Equity");
        assert_eq!(sec.as_str(), "7203 JP Equity");
    }

    #[test]
    fn test_field_serde_transparent() {
        let field = FieldId::from("PX_LAST");
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(json, "\"PX_LAST\"");
    }
}
