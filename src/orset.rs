use crate::error::CrdtResult;
use crate::header::{InstanceHeader, OperationOutcome};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::tag::generate_unique_tag;
use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Observed-remove set: add-wins under concurrent add/remove of the same
/// value (spec §4.6). Every add mints a globally unique tag; a remove
/// records the set of tags it observed, so a concurrent add (whose tag
/// the remover never saw) survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrSetState {
    /// Tags currently live, grouped by value for efficient containment
    /// and snapshot queries.
    live: BTreeMap<String, BTreeSet<String>>,
    /// Tags ever removed. Retained so a late-arriving add carrying an
    /// already-removed tag (replayed, or received out of order) is not
    /// resurrected.
    tombstones: BTreeSet<String>,
    /// Monotonic per-replica counter feeding tag generation.
    next_counter: u64,
}

impl OrSetState {
    pub fn new() -> Self {
        Self {
            live: BTreeMap::new(),
            tombstones: BTreeSet::new(),
            next_counter: 0,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.live.get(value).is_some_and(|tags| !tags.is_empty())
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    pub fn add_tag_count(&self) -> usize {
        self.live.values().map(|tags| tags.len()).sum()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.live
            .iter()
            .filter(|(_, tags)| !tags.is_empty())
            .map(|(value, _)| value.clone())
            .collect()
    }

    fn tags_for(&self, value: &str) -> BTreeSet<String> {
        self.live.get(value).cloned().unwrap_or_default()
    }

    /// Mint a fresh tag for `value` and record it as live. Always a
    /// genuine state change (a new tag is, by construction, never seen
    /// before), so add never no-ops.
    fn add_local(&mut self, replica: &ReplicaId, value: String) -> String {
        let tag = generate_unique_tag(replica, self.next_counter);
        self.next_counter += 1;
        self.live.entry(value).or_default().insert(tag.clone());
        tag
    }

    /// Remove every tag currently observed for `value`. If `value` is not
    /// present there is nothing to observe, so this is a no-op: returns an
    /// empty tag set and leaves state unchanged (spec §4.6).
    fn remove_local(&mut self, value: &str) -> BTreeSet<String> {
        let tags = self.tags_for(value);
        if tags.is_empty() {
            return tags;
        }
        if let Some(slot) = self.live.get_mut(value) {
            slot.clear();
        }
        self.tombstones.extend(tags.iter().cloned());
        tags
    }

    /// Apply a remote add: the tag is only resurrected if it was never
    /// tombstoned.
    fn apply_remote_add(&mut self, value: String, tag: String) {
        if self.tombstones.contains(&tag) {
            return;
        }
        self.live.entry(value).or_default().insert(tag);
    }

    /// Apply a remote remove: tombstone exactly the observed tags,
    /// regardless of what else has been added to the value since.
    fn apply_remote_remove(&mut self, value: &str, tags: &BTreeSet<String>) {
        if let Some(slot) = self.live.get_mut(value) {
            for tag in tags {
                slot.remove(tag);
            }
        }
        self.tombstones.extend(tags.iter().cloned());
    }

    pub fn merge(&mut self, other: &Self) {
        for tag in &other.tombstones {
            self.tombstones.insert(tag.clone());
        }
        for (value, tags) in &other.live {
            let slot = self.live.entry(value.clone()).or_default();
            for tag in tags {
                if !self.tombstones.contains(tag) {
                    slot.insert(tag.clone());
                }
            }
        }
        // A tag tombstoned on either side must not survive on ours.
        for slot in self.live.values_mut() {
            slot.retain(|tag| !self.tombstones.contains(tag));
        }
        self.next_counter = self.next_counter.max(other.next_counter);
    }
}

impl Default for OrSetState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrSetOp {
    Add { value: String, tag: String },
    Remove { value: String, tags: BTreeSet<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrSetInstance {
    pub header: InstanceHeader,
    pub state: OrSetState,
}

impl OrSetInstance {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            header: InstanceHeader::new(id, replica_id),
            state: OrSetState::new(),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        CrdtKind::ORSet
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.state.snapshot()
    }

    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn add(&mut self, value: impl Into<String>) -> (OperationOutcome<Vec<String>>, OrSetOp) {
        let old_state = self.state.snapshot();
        let value = value.into();
        let replica = self.header.replica_id.clone();
        let tag = self.state.add_local(&replica, value.clone());
        let clock = self.header.touch_local();
        let new_state = self.state.snapshot();
        debug!(count = new_state.len(), "or_set added element");
        (
            OperationOutcome::accepted(old_state, new_state, clock),
            OrSetOp::Add { value, tag },
        )
    }

    /// Remove `value`. Removing an element absent from the visible set is
    /// an accepted no-op: state is unchanged and the clock is not bumped
    /// (spec §4.6: "If e is not present, no-op").
    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn remove(&mut self, value: &str) -> (OperationOutcome<Vec<String>>, Option<OrSetOp>) {
        let old_state = self.state.snapshot();
        let tags = self.state.remove_local(value);
        if tags.is_empty() {
            debug!("or_set no-op remove (element absent)");
            return (
                OperationOutcome::accepted(old_state.clone(), old_state, self.header.clock.get()),
                None,
            );
        }
        let clock = self.header.touch_local();
        let new_state = self.state.snapshot();
        debug!(count = new_state.len(), "or_set removed element");
        let op = OrSetOp::Remove {
            value: value.to_string(),
            tags,
        };
        (
            OperationOutcome::accepted(old_state, new_state, clock),
            Some(op),
        )
    }

    pub fn apply_operation(
        &mut self,
        op: &OrSetOp,
        clock_at_emission: &VectorClock,
    ) -> CrdtResult<()> {
        match op {
            OrSetOp::Add { value, tag } => {
                self.state.apply_remote_add(value.clone(), tag.clone());
            }
            OrSetOp::Remove { value, tags } => {
                self.state.apply_remote_remove(value, tags);
            }
        }
        self.header.touch_remote(clock_at_emission);
        Ok(())
    }

    pub fn merge(&mut self, other: &OrSetInstance) {
        self.state.merge(&other.state);
        self.header.touch_remote(&other.header.clock);
    }

    pub fn equals(&self, other: &OrSetInstance) -> bool {
        self.state == other.state
    }
}
