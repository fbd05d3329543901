use crate::error::{CrdtError, CrdtResult};
use crate::ids::ReplicaId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// Result of comparing two vector clocks under the happens-before partial
/// order (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOrdering {
    Less,
    Equal,
    Greater,
    Concurrent,
}

/// Per-replica logical time. Missing keys are implicitly zero; own slot is
/// monotonically non-decreasing; `sync` never decreases any slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VectorClock {
    slots: BTreeMap<ReplicaId, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Build a clock from a raw map, rejecting negative entries. Used when
    /// decoding a deserialized wire record where the source JSON number
    /// could in principle be negative.
    pub fn from_raw(raw: BTreeMap<ReplicaId, i64>) -> CrdtResult<Self> {
        let mut slots = BTreeMap::new();
        for (replica, count) in raw {
            if count < 0 {
                return Err(CrdtError::DeserializationFailed {
                    reason: format!("negative vector clock slot for replica '{replica}'"),
                });
            }
            slots.insert(replica, count as u64);
        }
        Ok(Self { slots })
    }

    /// Copy of the current map.
    pub fn get(&self) -> BTreeMap<ReplicaId, u64> {
        self.slots.clone()
    }

    pub fn slot(&self, replica: &ReplicaId) -> u64 {
        self.slots.get(replica).copied().unwrap_or(0)
    }

    /// Own slot += 1; return a copy of the resulting map.
    #[instrument(skip(self), fields(replica = %replica))]
    pub fn increment(&mut self, replica: &ReplicaId) -> BTreeMap<ReplicaId, u64> {
        let slot = self.slots.entry(replica.clone()).or_insert(0);
        *slot += 1;
        self.get()
    }

    /// Elementwise max with `other`, then increment `own` by 1. The
    /// merging replica's emitted event therefore causally follows every
    /// event already reflected in `other`.
    #[instrument(skip(self, other), fields(own = %own))]
    pub fn sync(&mut self, other: &VectorClock, own: &ReplicaId) -> BTreeMap<ReplicaId, u64> {
        for (replica, &count) in &other.slots {
            let slot = self.slots.entry(replica.clone()).or_insert(0);
            *slot = (*slot).max(count);
        }
        self.increment(own)
    }

    pub fn compare(a: &VectorClock, b: &VectorClock) -> ClockOrdering {
        let mut a_le_b = true;
        let mut b_le_a = true;

        let replicas: std::collections::BTreeSet<&ReplicaId> =
            a.slots.keys().chain(b.slots.keys()).collect();

        for replica in replicas {
            let av = a.slot(replica);
            let bv = b.slot(replica);
            if av > bv {
                a_le_b = false;
            }
            if bv > av {
                b_le_a = false;
            }
        }

        match (a_le_b, b_le_a) {
            (true, true) => ClockOrdering::Equal,
            (true, false) => ClockOrdering::Less,
            (false, true) => ClockOrdering::Greater,
            (false, false) => ClockOrdering::Concurrent,
        }
    }

    /// Elementwise max across many clocks.
    pub fn least_upper_bound<'a>(clocks: impl IntoIterator<Item = &'a VectorClock>) -> VectorClock {
        let mut result = VectorClock::new();
        for clock in clocks {
            for (replica, &count) in &clock.slots {
                let slot = result.slots.entry(replica.clone()).or_insert(0);
                *slot = (*slot).max(count);
            }
        }
        result
    }

    pub fn is_zero(&self) -> bool {
        self.slots.values().all(|&v| v == 0)
    }

    /// Sum of all slots — used as a cheap causality-depth proxy in
    /// visualization data.
    pub fn sum(&self) -> u64 {
        self.slots.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(name: &str) -> ReplicaId {
        ReplicaId::new(name).unwrap()
    }

    #[test]
    fn increment_bumps_only_own_slot() {
        let mut vc = VectorClock::new();
        let a = replica("a");
        vc.increment(&a);
        vc.increment(&a);
        assert_eq!(vc.slot(&a), 2);
        assert_eq!(vc.slot(&replica("b")), 0);
    }

    #[test]
    fn sync_is_max_then_increment() {
        let a = replica("a");
        let b = replica("b");

        let mut vc_a = VectorClock::new();
        vc_a.increment(&a);
        vc_a.increment(&a);

        let mut vc_b = VectorClock::new();
        vc_b.increment(&b);
        vc_b.increment(&b);
        vc_b.increment(&b);

        vc_a.sync(&vc_b, &a);

        assert_eq!(vc_a.slot(&a), 3); // max(2, 0) + 1
        assert_eq!(vc_a.slot(&b), 3); // max(0, 3)
    }

    #[test]
    fn compare_detects_all_four_relations() {
        let a = replica("a");
        let b = replica("b");

        let mut vc1 = VectorClock::new();
        vc1.increment(&a);

        let vc2 = vc1.clone();
        assert_eq!(VectorClock::compare(&vc1, &vc2), ClockOrdering::Equal);

        let mut vc3 = vc1.clone();
        vc3.increment(&a);
        assert_eq!(VectorClock::compare(&vc1, &vc3), ClockOrdering::Less);
        assert_eq!(VectorClock::compare(&vc3, &vc1), ClockOrdering::Greater);

        let mut vc4 = VectorClock::new();
        vc4.increment(&b);
        assert_eq!(VectorClock::compare(&vc1, &vc4), ClockOrdering::Concurrent);
    }

    #[test]
    fn from_raw_rejects_negative_slots() {
        let mut raw = BTreeMap::new();
        raw.insert(replica("a"), -1);
        assert!(VectorClock::from_raw(raw).is_err());
    }

    #[test]
    fn least_upper_bound_is_elementwise_max() {
        let a = replica("a");
        let b = replica("b");

        let mut vc1 = VectorClock::new();
        vc1.increment(&a);

        let mut vc2 = VectorClock::new();
        vc2.increment(&b);
        vc2.increment(&b);

        let lub = VectorClock::least_upper_bound([&vc1, &vc2]);
        assert_eq!(lub.slot(&a), 1);
        assert_eq!(lub.slot(&b), 2);
    }
}
