use crate::error::{CrdtError, CrdtResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A short, globally unique, non-empty identifier chosen by a replica at
/// creation time. Never reused for the lifetime of the fleet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Validate and wrap a caller-chosen replica identifier.
    pub fn new(id: impl Into<String>) -> CrdtResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CrdtError::invalid_argument("replica id must be non-empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ReplicaId> for String {
    fn from(value: ReplicaId) -> Self {
        value.0
    }
}

/// A non-empty string identifying a logical CRDT instance. Two replicas
/// participating in the same logical object share its `CrdtId`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrdtId(String);

impl CrdtId {
    pub fn new(id: impl Into<String>) -> CrdtResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CrdtError::invalid_argument("crdt id must be non-empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CrdtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ids() {
        assert!(ReplicaId::new("").is_err());
        assert!(CrdtId::new("").is_err());
    }

    #[test]
    fn accepts_short_strings() {
        let r = ReplicaId::new("replica-a").unwrap();
        assert_eq!(r.as_str(), "replica-a");
        assert_eq!(r.to_string(), "replica-a");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = ReplicaId::new("a").unwrap();
        let b = ReplicaId::new("b").unwrap();
        assert!(a < b);
    }
}
