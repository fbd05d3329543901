use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CrdtError;

/// Tags the variant a `CrdtInstance` holds. Two envelopes targeting the
/// same `CrdtId` must carry a matching kind; mismatch is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrdtKind {
    GCounter,
    PNCounter,
    GSet,
    ORSet,
    LwwRegister,
    Rga,
}

impl CrdtKind {
    /// Wire token used in `OperationRecord::crdt_type` / `StateSnapshot::crdt_type`.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            CrdtKind::GCounter => "g_counter",
            CrdtKind::PNCounter => "pn_counter",
            CrdtKind::GSet => "g_set",
            CrdtKind::ORSet => "or_set",
            CrdtKind::LwwRegister => "lww_register",
            CrdtKind::Rga => "rga",
        }
    }
}

impl fmt::Display for CrdtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

impl FromStr for CrdtKind {
    type Err = CrdtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "g_counter" => Ok(CrdtKind::GCounter),
            "pn_counter" => Ok(CrdtKind::PNCounter),
            "g_set" => Ok(CrdtKind::GSet),
            "or_set" => Ok(CrdtKind::ORSet),
            "lww_register" => Ok(CrdtKind::LwwRegister),
            "rga" => Ok(CrdtKind::Rga),
            other => Err(CrdtError::UnknownOperation {
                variant: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_tokens() {
        for kind in [
            CrdtKind::GCounter,
            CrdtKind::PNCounter,
            CrdtKind::GSet,
            CrdtKind::ORSet,
            CrdtKind::LwwRegister,
            CrdtKind::Rga,
        ] {
            let token = kind.as_wire_str();
            assert_eq!(CrdtKind::from_str(token).unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(CrdtKind::from_str("quux").is_err());
    }
}
