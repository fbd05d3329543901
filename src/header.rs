use crate::ids::{CrdtId, ReplicaId};
use crate::vector_clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shared header every concrete CRDT instance carries: identity, the
/// exclusively-owned vector clock, and the last-modified timestamp.
/// Mirrors the "common lifecycle" responsibility spec §4.2 assigns to
/// `CrdtBase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceHeader {
    pub id: CrdtId,
    pub replica_id: ReplicaId,
    pub clock: VectorClock,
    pub last_modified: DateTime<Utc>,
}

impl InstanceHeader {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            id,
            replica_id,
            clock: VectorClock::new(),
            last_modified: Utc::now(),
        }
    }

    /// Bump the header's clock for a local mutation and refresh the
    /// modification timestamp. Called exactly once per accepted local
    /// mutation, never on a rejected or no-op one.
    pub fn touch_local(&mut self) -> BTreeMap<ReplicaId, u64> {
        let replica = self.replica_id.clone();
        self.last_modified = Utc::now();
        self.clock.increment(&replica)
    }

    /// Fold in a remote clock and advance the header's own slot, per the
    /// `apply_operation`/`merge` contract ("calls vector_clock.sync(...)
    /// exactly once").
    pub fn touch_remote(&mut self, remote: &VectorClock) -> BTreeMap<ReplicaId, u64> {
        let replica = self.replica_id.clone();
        self.last_modified = Utc::now();
        self.clock.sync(remote, &replica)
    }
}

/// Outcome of a public mutator: `{success, error?, old_state?, new_state?,
/// vector_clock?}` per spec §7. `S` is the kind-specific observable state
/// (e.g. a counter value, a set snapshot, rendered text).
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome<S> {
    pub success: bool,
    pub error: Option<crate::error::CrdtError>,
    pub old_state: Option<S>,
    pub new_state: Option<S>,
    pub vector_clock: Option<BTreeMap<ReplicaId, u64>>,
}

impl<S> OperationOutcome<S> {
    pub fn accepted(old_state: S, new_state: S, vector_clock: BTreeMap<ReplicaId, u64>) -> Self {
        Self {
            success: true,
            error: None,
            old_state: Some(old_state),
            new_state: Some(new_state),
            vector_clock: Some(vector_clock),
        }
    }

    pub fn rejected(error: crate::error::CrdtError) -> Self {
        Self {
            success: false,
            error: Some(error),
            old_state: None,
            new_state: None,
            vector_clock: None,
        }
    }
}
