use crate::error::CrdtResult;
use crate::header::{InstanceHeader, OperationOutcome};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::vector_clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// A single timestamped write. Ties in `timestamp` are broken by
/// `replica`, giving a total order over concurrent writes (spec §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwEntry {
    pub value: Value,
    pub timestamp: DateTime<Utc>,
    pub replica: ReplicaId,
}

impl LwwEntry {
    /// `self` wins the race against `other` under last-writer-wins with
    /// replica-id tiebreak.
    fn wins_over(&self, other: &LwwEntry) -> bool {
        match self.timestamp.cmp(&other.timestamp) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.replica > other.replica,
        }
    }
}

/// Last-writer-wins register over an arbitrary JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwRegisterState {
    current: Option<LwwEntry>,
}

impl LwwRegisterState {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn get(&self) -> Option<&Value> {
        self.current.as_ref().map(|e| &e.value)
    }

    /// Write wins unless it is strictly dominated by the current entry.
    /// Returns `true` if this write became the new current value.
    fn write_local(&mut self, candidate: LwwEntry) -> bool {
        match &self.current {
            Some(existing) if !candidate.wins_over(existing) => false,
            _ => {
                self.current = Some(candidate);
                true
            }
        }
    }

    pub fn merge(&mut self, other: &Self) {
        if let Some(their_entry) = &other.current {
            self.write_local(their_entry.clone());
        }
    }
}

impl Default for LwwRegisterState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwRegisterOp {
    pub entry: LwwEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwRegisterInstance {
    pub header: InstanceHeader,
    pub state: LwwRegisterState,
}

impl LwwRegisterInstance {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            header: InstanceHeader::new(id, replica_id),
            state: LwwRegisterState::new(),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        CrdtKind::LwwRegister
    }

    pub fn get(&self) -> Option<&Value> {
        self.state.get()
    }

    /// Write `value` stamped with the caller-supplied timestamp (the
    /// caller, not the register, owns wall-clock access — spec §4.7
    /// leaves timestamp provenance to the embedder).
    #[instrument(skip(self, value), fields(id = %self.header.id))]
    pub fn set(
        &mut self,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> (OperationOutcome<Option<Value>>, LwwRegisterOp) {
        let old_state = self.state.get().cloned();
        let replica = self.header.replica_id.clone();
        let entry = LwwEntry {
            value,
            timestamp,
            replica,
        };
        let op = LwwRegisterOp {
            entry: entry.clone(),
        };
        let changed = self.state.write_local(entry);
        let new_state = self.state.get().cloned();
        let clock = if changed {
            self.header.touch_local()
        } else {
            self.header.clock.get()
        };
        debug!(changed, "lww_register write");
        (OperationOutcome::accepted(old_state, new_state, clock), op)
    }

    pub fn apply_operation(
        &mut self,
        op: &LwwRegisterOp,
        clock_at_emission: &VectorClock,
    ) -> CrdtResult<()> {
        self.state.write_local(op.entry.clone());
        self.header.touch_remote(clock_at_emission);
        Ok(())
    }

    pub fn merge(&mut self, other: &LwwRegisterInstance) {
        self.state.merge(&other.state);
        self.header.touch_remote(&other.header.clock);
    }

    pub fn equals(&self, other: &LwwRegisterInstance) -> bool {
        self.state == other.state
    }
}
