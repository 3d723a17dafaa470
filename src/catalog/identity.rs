//! Identifiers shared by the catalog, rules and passes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Template identifier as stored in the catalog and in filter sets.
///
/// Opaque and case-sensitive. Construction rejects empty or blank strings so
/// rule documents with a missing `weaponTpl` fail at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidTemplateId> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InvalidTemplateId);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateId {
    type Error = InvalidTemplateId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TemplateId> for String {
    fn from(value: TemplateId) -> Self {
        value.0
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTemplateId;

impl fmt::Display for InvalidTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("template id must be a non-empty string")
    }
}

impl std::error::Error for InvalidTemplateId {}

/// Normalized caliber used as a lookup key.
///
/// Calibers compare case-insensitively; blank calibers do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaliberKey(String);

impl CaliberKey {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(raw.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, raw: &str) -> bool {
        CaliberKey::new(raw).is_some_and(|other| other == *self)
    }
}

impl fmt::Display for CaliberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_id_rejects_blank() {
        assert!(TemplateId::new("").is_err());
        assert!(TemplateId::new("   ").is_err());
        assert_eq!(TemplateId::new("5c0d5e4486f77478390952fe").unwrap().as_str(), "5c0d5e4486f77478390952fe");
    }

    #[test]
    fn template_id_deserializes_through_validation() {
        let ok: TemplateId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<TemplateId>("\"\"").is_err());
        assert!(serde_json::from_str::<TemplateId>("42").is_err());
    }

    #[test]
    fn caliber_key_is_case_insensitive() {
        let key = CaliberKey::new("Caliber9x19PARA").unwrap();
        assert!(key.matches("caliber9x19para"));
        assert!(!key.matches("Caliber545x39"));
        assert!(CaliberKey::new("  ").is_none());
    }
}
