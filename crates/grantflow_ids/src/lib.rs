//! Identifier wrappers for Grantflow.
//!
//! Freshly minted request ids look like `REQ-3F9A01C2`. Ids restored from a
//! storage collaborator are accepted as any non-blank string so that older
//! numbering schemes (`REQ-001`) survive a reload untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix carried by every generated request id.
pub const REQUEST_ID_PREFIX: &str = "REQ-";

/// Error returned when parsing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

/// Unique identifier of a permission request.
///
/// Deserialization goes through [`RequestId::parse`] and rejects blank ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Mint a new random id.
    pub fn new() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", REQUEST_ID_PREFIX, raw[..8].to_ascii_uppercase()))
    }

    /// Accept an existing id. Blank strings are rejected.
    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::new("Invalid request ID: must not be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RequestId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RequestId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_prefixed_and_distinct() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert!(a.as_str().starts_with(REQUEST_ID_PREFIX));
        assert_eq!(a.as_str().len(), REQUEST_ID_PREFIX.len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        let id: RequestId = " REQ-001 ".parse().unwrap();
        assert_eq!(id.as_str(), "REQ-001");
        assert!(RequestId::parse("   ").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = RequestId::parse("REQ-042").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"REQ-042\"");
    }

    #[test]
    fn test_deserialize_validates_like_parse() {
        let id: RequestId = serde_json::from_str("\" REQ-042 \"").unwrap();
        assert_eq!(id.as_str(), "REQ-042");

        let err = serde_json::from_str::<RequestId>("\"   \"").unwrap_err();
        assert!(err.to_string().contains("must not be blank"));
        assert!(serde_json::from_str::<RequestId>("\"\"").is_err());
    }
}
