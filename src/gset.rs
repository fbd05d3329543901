use crate::header::{InstanceHeader, OperationOutcome};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Grow-only set. Elements are only ever added; once present, an element
/// stays present forever (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GSetState {
    elements: BTreeSet<String>,
}

impl GSetState {
    pub fn new() -> Self {
        Self {
            elements: BTreeSet::new(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.elements.contains(value)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.elements.iter().cloned().collect()
    }

    /// Returns `true` if the element was newly inserted.
    fn add_local(&mut self, value: String) -> bool {
        self.elements.insert(value)
    }

    pub fn merge(&mut self, other: &Self) {
        self.elements.extend(other.elements.iter().cloned());
    }
}

impl Default for GSetState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GSetOp {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GSetInstance {
    pub header: InstanceHeader,
    pub state: GSetState,
}

impl GSetInstance {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            header: InstanceHeader::new(id, replica_id),
            state: GSetState::new(),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        CrdtKind::GSet
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.state.snapshot()
    }

    /// Add `value`. Re-adding an already-present element is a no-op and
    /// does not bump the clock.
    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn add(&mut self, value: impl Into<String>) -> OperationOutcome<Vec<String>> {
        let old_state = self.state.snapshot();
        let value = value.into();
        if self.state.add_local(value) {
            let clock = self.header.touch_local();
            let new_state = self.state.snapshot();
            debug!(count = new_state.len(), "g_set added element");
            OperationOutcome::accepted(old_state, new_state, clock)
        } else {
            debug!("g_set no-op add (already present)");
            OperationOutcome::accepted(old_state.clone(), old_state, self.header.clock.get())
        }
    }

    pub fn apply_operation(
        &mut self,
        op: &GSetOp,
        clock_at_emission: &VectorClock,
    ) -> crate::error::CrdtResult<()> {
        self.state.add_local(op.value.clone());
        self.header.touch_remote(clock_at_emission);
        Ok(())
    }

    pub fn merge(&mut self, other: &GSetInstance) {
        self.state.merge(&other.state);
        self.header.touch_remote(&other.header.clock);
    }

    pub fn equals(&self, other: &GSetInstance) -> bool {
        self.state == other.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> GSetInstance {
        GSetInstance::new(
            CrdtId::new("tags-1").unwrap(),
            ReplicaId::new("a").unwrap(),
        )
    }

    #[test]
    fn duplicate_add_is_noop() {
        let mut s = instance();
        s.add("x");
        let before = s.header.clock.clone();
        s.add("x");
        assert_eq!(s.header.clock, before);
        assert_eq!(s.snapshot(), vec!["x".to_string()]);
    }

    #[test]
    fn merge_is_union() {
        let mut a = instance();
        a.add("x");
        let mut b = GSetInstance::new(CrdtId::new("tags-1").unwrap(), ReplicaId::new("b").unwrap());
        b.add("y");

        a.merge(&b);
        assert_eq!(a.snapshot(), vec!["x".to_string(), "y".to_string()]);
    }
}
