use crate::error::CrdtResult;
use crate::gcounter::GCounterState;
use crate::header::{InstanceHeader, OperationOutcome};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Increment/decrement counter built from a pair of GCounters (spec §4.4).
/// Value is `increments.value() - decrements.value()` and can go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnCounterState {
    increments: GCounterState,
    decrements: GCounterState,
}

impl PnCounterState {
    pub fn new() -> Self {
        Self {
            increments: GCounterState::new(),
            decrements: GCounterState::new(),
        }
    }

    pub fn value(&self) -> i64 {
        self.increments.value() as i64 - self.decrements.value() as i64
    }

    /// Receive the wire form: a replica's absolute increments-total and
    /// absolute decrements-total (mirrors GCounter's absolute semantics).
    fn apply_absolute(
        &mut self,
        replica: &ReplicaId,
        absolute_increments: u64,
        absolute_decrements: u64,
    ) -> bool {
        let a = self.increments.apply_absolute(replica, absolute_increments);
        let b = self.decrements.apply_absolute(replica, absolute_decrements);
        a || b
    }

    pub fn merge(&mut self, other: &Self) {
        self.increments.merge(&other.increments);
        self.decrements.merge(&other.decrements);
    }
}

impl Default for PnCounterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire operation for a PNCounter: the emitting replica's absolute
/// increments/decrements totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnCounterOp {
    pub replica: ReplicaId,
    pub increments: u64,
    pub decrements: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnCounterInstance {
    pub header: InstanceHeader,
    pub state: PnCounterState,
}

impl PnCounterInstance {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            header: InstanceHeader::new(id, replica_id),
            state: PnCounterState::new(),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        CrdtKind::PNCounter
    }

    pub fn value(&self) -> i64 {
        self.state.value()
    }

    /// Increment by `amount`. Rejects a negative `amount` with
    /// `InvalidArgument` rather than reinterpreting it as a decrement;
    /// zero is a no-op that leaves the clock untouched.
    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn increment(&mut self, amount: i64) -> OperationOutcome<i64> {
        let old_state = self.state.value();
        let replica = self.header.replica_id.clone();
        match self.state.increments.increment_local(&replica, amount) {
            Ok(false) => {
                debug!("pn_counter no-op increment (amount=0)");
                OperationOutcome::accepted(old_state, old_state, self.header.clock.get())
            }
            Ok(true) => {
                let clock = self.header.touch_local();
                let new_state = self.state.value();
                debug!(old_state, new_state, "pn_counter incremented");
                OperationOutcome::accepted(old_state, new_state, clock)
            }
            Err(err) => {
                warn!(error = %err, "pn_counter rejected increment");
                OperationOutcome::rejected(err)
            }
        }
    }

    /// Decrement by `amount`. Rejects a negative `amount` with
    /// `InvalidArgument` rather than reinterpreting it as an increment;
    /// zero is a no-op that leaves the clock untouched.
    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn decrement(&mut self, amount: i64) -> OperationOutcome<i64> {
        let old_state = self.state.value();
        let replica = self.header.replica_id.clone();
        match self.state.decrements.increment_local(&replica, amount) {
            Ok(false) => {
                debug!("pn_counter no-op decrement (amount=0)");
                OperationOutcome::accepted(old_state, old_state, self.header.clock.get())
            }
            Ok(true) => {
                let clock = self.header.touch_local();
                let new_state = self.state.value();
                debug!(old_state, new_state, "pn_counter decremented");
                OperationOutcome::accepted(old_state, new_state, clock)
            }
            Err(err) => {
                warn!(error = %err, "pn_counter rejected decrement");
                OperationOutcome::rejected(err)
            }
        }
    }

    pub fn apply_operation(
        &mut self,
        op: &PnCounterOp,
        clock_at_emission: &VectorClock,
    ) -> CrdtResult<()> {
        self.state
            .apply_absolute(&op.replica, op.increments, op.decrements);
        self.header.touch_remote(clock_at_emission);
        Ok(())
    }

    pub fn merge(&mut self, other: &PnCounterInstance) {
        self.state.merge(&other.state);
        self.header.touch_remote(&other.header.clock);
    }

    pub fn equals(&self, other: &PnCounterInstance) -> bool {
        self.state == other.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(name: &str) -> ReplicaId {
        ReplicaId::new(name).unwrap()
    }

    fn instance(replica_name: &str) -> PnCounterInstance {
        PnCounterInstance::new(CrdtId::new("pnc-1").unwrap(), replica(replica_name))
    }

    #[test]
    fn value_can_go_negative() {
        let mut c = instance("a");
        c.decrement(5);
        assert_eq!(c.value(), -5);
    }

    #[test]
    fn zero_amount_is_noop_for_both_operations() {
        let mut c = instance("a");
        let before = c.header.clock.clone();
        assert!(c.increment(0).success);
        assert_eq!(c.header.clock, before);
        assert!(c.decrement(0).success);
        assert_eq!(c.header.clock, before);
    }

    #[test]
    fn negative_increment_is_rejected_rather_than_treated_as_decrement() {
        let mut c = instance("a");
        let outcome = c.increment(-5);
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(crate::error::CrdtError::InvalidArgument { .. })
        ));
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn negative_decrement_is_rejected_rather_than_treated_as_increment() {
        let mut c = instance("a");
        let outcome = c.decrement(-5);
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(crate::error::CrdtError::InvalidArgument { .. })
        ));
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn increments_and_decrements_converge() {
        let mut a = instance("a");
        let mut b = instance("b");
        a.increment(10);
        b.decrement(4);

        a.merge(&b);
        b.merge(&a);

        assert_eq!(a.value(), 6);
        assert_eq!(b.value(), 6);
    }
}
