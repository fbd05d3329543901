use crate::ids::CrdtId;
use crate::kind::CrdtKind;

/// Errors surfaced by CRDT mutators, the registry, and the wire codecs.
///
/// Every public mutator that can fail returns a `CrdtResult`; on the `Err`
/// path the instance is guaranteed unchanged (see `CrdtError` policy in
/// the crate-level docs).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CrdtError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("kind mismatch for crdt '{id}': expected {expected}, got {actual}")]
    KindMismatch {
        id: CrdtId,
        expected: CrdtKind,
        actual: CrdtKind,
    },

    #[error("corrupt state for crdt '{id}': {reason}")]
    CorruptState { id: CrdtId, reason: String },

    #[error("unknown operation variant: {variant}")]
    UnknownOperation { variant: String },

    #[error("deserialization failed: {reason}")]
    DeserializationFailed { reason: String },
}

impl CrdtError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn corrupt_state(id: &CrdtId, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}

pub type CrdtResult<T> = Result<T, CrdtError>;
