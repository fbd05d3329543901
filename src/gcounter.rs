use crate::error::{CrdtError, CrdtResult};
use crate::header::{InstanceHeader, OperationOutcome};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Grow-only per-replica counter payload (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GCounterState {
    counters: BTreeMap<ReplicaId, u64>,
}

impl GCounterState {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    pub fn value(&self) -> u64 {
        self.counters.values().sum()
    }

    pub fn replica_count(&self, replica: &ReplicaId) -> u64 {
        self.counters.get(replica).copied().unwrap_or(0)
    }

    /// Local increment. Returns `Ok(true)` if state changed, `Ok(false)`
    /// if `amount == 0` (a no-op that must not bump the clock). Visible to
    /// sibling counter types (PNCounter composes two GCounters).
    pub(crate) fn increment_local(&mut self, replica: &ReplicaId, amount: i64) -> CrdtResult<bool> {
        if amount < 0 {
            return Err(CrdtError::invalid_argument(
                "GCounter increment amount must be non-negative",
            ));
        }
        if amount == 0 {
            return Ok(false);
        }
        *self.counters.entry(replica.clone()).or_insert(0) += amount as u64;
        Ok(true)
    }

    /// Receive the wire form of an increment: the sender's *absolute*
    /// per-replica count, not a delta (spec §4.3). Idempotent under
    /// redelivery because it is a pure max.
    pub(crate) fn apply_absolute(&mut self, replica: &ReplicaId, absolute: u64) -> bool {
        let slot = self.counters.entry(replica.clone()).or_insert(0);
        let changed = absolute > *slot;
        *slot = (*slot).max(absolute);
        changed
    }

    pub fn merge(&mut self, other: &Self) {
        for (replica, &count) in &other.counters {
            let slot = self.counters.entry(replica.clone()).or_insert(0);
            *slot = (*slot).max(count);
        }
    }
}

impl Default for GCounterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire operation for a GCounter: the emitting replica's absolute count
/// after a local increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GCounterOp {
    pub replica: ReplicaId,
    pub count: u64,
}

/// A GCounter bound to its identity, owning replica, and vector clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GCounterInstance {
    pub header: InstanceHeader,
    pub state: GCounterState,
}

impl GCounterInstance {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            header: InstanceHeader::new(id, replica_id),
            state: GCounterState::new(),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        CrdtKind::GCounter
    }

    pub fn value(&self) -> u64 {
        self.state.value()
    }

    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn increment(&mut self, amount: i64) -> OperationOutcome<u64> {
        let old_state = self.state.value();
        let replica = self.header.replica_id.clone();
        match self.state.increment_local(&replica, amount) {
            Ok(false) => {
                debug!("g_counter no-op increment (amount=0)");
                OperationOutcome::accepted(old_state, old_state, self.header.clock.get())
            }
            Ok(true) => {
                let clock = self.header.touch_local();
                let new_state = self.state.value();
                debug!(old_state, new_state, "g_counter incremented");
                OperationOutcome::accepted(old_state, new_state, clock)
            }
            Err(err) => {
                warn!(error = %err, "g_counter rejected increment");
                OperationOutcome::rejected(err)
            }
        }
    }

    pub fn apply_operation(
        &mut self,
        op: &GCounterOp,
        clock_at_emission: &VectorClock,
    ) -> CrdtResult<()> {
        self.state.apply_absolute(&op.replica, op.count);
        self.header.touch_remote(clock_at_emission);
        Ok(())
    }

    pub fn merge(&mut self, other: &GCounterInstance) {
        self.state.merge(&other.state);
        self.header.touch_remote(&other.header.clock);
    }

    pub fn equals(&self, other: &GCounterInstance) -> bool {
        self.state == other.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(name: &str) -> ReplicaId {
        ReplicaId::new(name).unwrap()
    }

    fn instance(replica_name: &str) -> GCounterInstance {
        GCounterInstance::new(CrdtId::new("counter-1").unwrap(), replica(replica_name))
    }

    #[test]
    fn zero_increment_is_noop_and_does_not_bump_clock() {
        let mut c = instance("a");
        let before = c.header.clock.clone();
        let outcome = c.increment(0);
        assert!(outcome.success);
        assert_eq!(c.header.clock, before);
    }

    #[test]
    fn negative_increment_is_rejected() {
        let mut c = instance("a");
        let outcome = c.increment(-1);
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(CrdtError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn merge_is_elementwise_max() {
        let mut c1 = instance("a");
        c1.increment(5);
        let mut c2 = instance("b");
        c2.increment(3);

        c1.merge(&c2);
        assert_eq!(c1.value(), 8);
    }

    #[test]
    fn convergence_scenario_s1() {
        // S1: A +3, B +5, C +2; after pairwise merges every replica reports 10.
        let mut a = instance("a");
        let mut b = instance("b");
        let mut c = instance("c");
        a.increment(3);
        b.increment(5);
        c.increment(2);

        a.merge(&b);
        a.merge(&c);
        b.merge(&a);
        c.merge(&a);

        assert_eq!(a.value(), 10);
        assert_eq!(b.value(), 10);
        assert_eq!(c.value(), 10);
    }

    #[test]
    fn apply_operation_is_idempotent() {
        let mut c = instance("a");
        let op = GCounterOp {
            replica: replica("a"),
            count: 7,
        };
        let clock = VectorClock::new();
        c.apply_operation(&op, &clock).unwrap();
        c.apply_operation(&op, &clock).unwrap();
        assert_eq!(c.value(), 7);
    }
}
