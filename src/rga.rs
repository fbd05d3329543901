use crate::error::{CrdtError, CrdtResult};
use crate::header::{InstanceHeader, OperationOutcome};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Globally unique, totally ordered identifier for one RGA element.
/// Embeds the minting replica directly, so uniqueness never depends on a
/// per-instance table being populated or synchronized before first use —
/// two replicas that have never communicated still mint disjoint ids.
/// Ordering is `(counter, replica)`: counter is the primary tiebreak
/// (insertion recency), replica breaks ties between elements inserted at
/// the same logical position by different replicas.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId {
    counter: u64,
    replica: ReplicaId,
}

/// A record's predecessor link. `Unknown` marks a tombstone that arrived
/// before the insert it deletes — its place in the sequence isn't known
/// yet, so it must not be traversed until resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Predecessor {
    Known(Option<ElementId>),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RgaRecord {
    predecessor: Predecessor,
    /// `None` once tombstoned, or while the insert for this id hasn't
    /// arrived yet.
    value: Option<char>,
}

/// Replicated growable array: an ordered sequence of characters that
/// converges under concurrent insert/delete (spec §4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgaState {
    /// JSON map keys must be strings, so a struct-keyed map is carried
    /// on the wire as an entry list (see `record_list`) and rebuilt into
    /// a `BTreeMap` on load.
    #[serde(with = "record_list")]
    records: BTreeMap<ElementId, RgaRecord>,
    /// Monotonic counter for ids this instance's own replica mints.
    /// Remote ids always carry their own minting replica, so this never
    /// needs to track counters seen from other replicas.
    next_counter: u64,
    /// Full depth-first traversal order, tombstones included. Rebuilt
    /// after every mutation.
    order: Vec<ElementId>,
}

mod record_list {
    use super::{ElementId, RgaRecord};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<ElementId, RgaRecord>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<(ElementId, RgaRecord)> =
            map.iter().map(|(id, record)| (id.clone(), record.clone())).collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ElementId, RgaRecord>, D::Error> {
        let entries = Vec::<(ElementId, RgaRecord)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl RgaState {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_counter: 0,
            order: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter_map(|record| record.value)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|record| record.value.is_some())
            .count()
    }

    pub fn tombstone_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.value.is_none() && matches!(record.predecessor, Predecessor::Known(_)))
            .count()
    }

    /// Records whose insert has not yet arrived to resolve their
    /// predecessor — delete-before-insert placeholders.
    pub fn pending_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| matches!(record.predecessor, Predecessor::Unknown))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visible (non-tombstoned) elements in sequence order.
    fn visible_ids(&self) -> Vec<ElementId> {
        self.order
            .iter()
            .cloned()
            .filter(|id| self.records.get(id).is_some_and(|r| r.value.is_some()))
            .collect()
    }

    /// Insert `value` after the element currently at visible `position`
    /// (`None` inserts at the head). Returns the new id and the
    /// predecessor it was actually placed after.
    fn insert_local(
        &mut self,
        replica: &ReplicaId,
        position: Option<usize>,
        value: char,
    ) -> CrdtResult<(ElementId, Option<ElementId>)> {
        let predecessor = match position {
            None => None,
            Some(pos) => {
                let visible = self.visible_ids();
                if pos >= visible.len() {
                    return Err(CrdtError::invalid_argument(format!(
                        "insert position {pos} out of bounds (len={})",
                        visible.len()
                    )));
                }
                Some(visible[pos].clone())
            }
        };

        let id = ElementId {
            counter: self.next_counter,
            replica: replica.clone(),
        };
        self.next_counter += 1;
        self.records.insert(
            id.clone(),
            RgaRecord {
                predecessor: Predecessor::Known(predecessor.clone()),
                value: Some(value),
            },
        );
        self.rebuild_order();
        Ok((id, predecessor))
    }

    /// Delete the element at visible `position`. A local delete can
    /// never target an already-tombstoned record, since tombstones are
    /// never visible positions.
    fn delete_local(&mut self, position: usize) -> CrdtResult<ElementId> {
        let visible = self.visible_ids();
        if position >= visible.len() {
            return Err(CrdtError::invalid_argument(format!(
                "delete position {position} out of bounds (len={})",
                visible.len()
            )));
        }
        let id = visible[position].clone();
        if let Some(record) = self.records.get_mut(&id) {
            record.value = None;
        }
        self.rebuild_order();
        Ok(id)
    }

    /// Apply a remote insert. If a tombstone placeholder for this id
    /// already exists (its delete arrived first), resolve the
    /// predecessor but keep the value tombstoned. If a record already
    /// holds a *different* value at this id, that is a genuine id
    /// collision — ids are supposed to be globally unique forever — and
    /// is reported rather than silently overwritten or dropped.
    fn apply_remote_insert(
        &mut self,
        id: ElementId,
        predecessor: Option<ElementId>,
        value: char,
    ) -> Result<(), String> {
        match self.records.get_mut(&id) {
            Some(existing) => match (&existing.predecessor, existing.value) {
                (Predecessor::Unknown, None) => {
                    existing.predecessor = Predecessor::Known(predecessor);
                }
                (Predecessor::Known(_), None) => {
                    // Already tombstoned by a delete that arrived first;
                    // a redelivered or reordered insert changes nothing.
                }
                (_, Some(existing_value)) if existing_value == value => {
                    // Duplicate delivery of the same insert.
                }
                _ => {
                    return Err(format!(
                        "element id {id:?} already holds a different value than the incoming insert"
                    ));
                }
            },
            None => {
                self.records.insert(
                    id,
                    RgaRecord {
                        predecessor: Predecessor::Known(predecessor),
                        value: Some(value),
                    },
                );
            }
        }
        self.rebuild_order();
        Ok(())
    }

    /// Apply a remote delete. If the insert for `id` hasn't arrived yet,
    /// record an unresolved tombstone placeholder so the later insert is
    /// born already deleted.
    fn apply_remote_delete(&mut self, id: ElementId) {
        match self.records.get_mut(&id) {
            Some(existing) => existing.value = None,
            None => {
                self.records.insert(
                    id,
                    RgaRecord {
                        predecessor: Predecessor::Unknown,
                        value: None,
                    },
                );
            }
        }
        self.rebuild_order();
    }

    /// Rebuild `order` by a depth-first traversal rooted at the virtual
    /// head (`None`), visiting each node's children in descending
    /// `ElementId` order. A node whose predecessor is `Unknown`, or whose
    /// ancestor chain bottoms out in one, is never reachable from the
    /// root and so never appears.
    fn rebuild_order(&mut self) {
        let mut children: BTreeMap<Option<ElementId>, Vec<ElementId>> = BTreeMap::new();
        for (id, record) in &self.records {
            if let Predecessor::Known(predecessor) = &record.predecessor {
                children.entry(predecessor.clone()).or_default().push(id.clone());
            }
        }
        for list in children.values_mut() {
            list.sort_unstable_by(|a, b| b.cmp(a));
        }

        let mut order = Vec::with_capacity(self.records.len());
        let mut stack: Vec<ElementId> = children.get(&None).cloned().unwrap_or_default();
        stack.reverse();
        while let Some(current) = stack.pop() {
            if let Some(kids) = children.get(&Some(current.clone())) {
                stack.extend(kids.iter().rev().cloned());
            }
            order.push(current);
        }
        self.order = order;
    }

    pub fn merge(&mut self, other: &Self) {
        for (id, record) in &other.records {
            match self.records.get_mut(id) {
                Some(existing) => {
                    if let Predecessor::Known(pred) = &record.predecessor {
                        if matches!(existing.predecessor, Predecessor::Unknown) {
                            existing.predecessor = Predecessor::Known(pred.clone());
                        }
                    }
                    // A tombstone is a permanent fact: once either side
                    // has deleted an id, it stays deleted everywhere.
                    if record.value.is_none() {
                        existing.value = None;
                    }
                }
                None => {
                    self.records.insert(id.clone(), record.clone());
                }
            }
        }
        self.next_counter = self.next_counter.max(other.next_counter);
        self.rebuild_order();
    }
}

impl Default for RgaState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RgaOp {
    Insert {
        id: ElementId,
        predecessor: Option<ElementId>,
        value: char,
    },
    Delete {
        id: ElementId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgaInstance {
    pub header: InstanceHeader,
    pub state: RgaState,
}

impl RgaInstance {
    pub fn new(id: CrdtId, replica_id: ReplicaId) -> Self {
        Self {
            header: InstanceHeader::new(id, replica_id),
            state: RgaState::new(),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        CrdtKind::Rga
    }

    pub fn text(&self) -> String {
        self.state.text()
    }

    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn insert(
        &mut self,
        position: Option<usize>,
        value: char,
    ) -> (OperationOutcome<String>, Option<RgaOp>) {
        let old_state = self.state.text();
        let replica = self.header.replica_id.clone();
        match self.state.insert_local(&replica, position, value) {
            Ok((id, predecessor)) => {
                let clock = self.header.touch_local();
                let new_state = self.state.text();
                debug!(len = new_state.len(), "rga inserted element");
                let op = RgaOp::Insert {
                    id,
                    predecessor,
                    value,
                };
                (
                    OperationOutcome::accepted(old_state, new_state, clock),
                    Some(op),
                )
            }
            Err(err) => {
                warn!(error = %err, "rga rejected insert");
                (OperationOutcome::rejected(err), None)
            }
        }
    }

    #[instrument(skip(self), fields(id = %self.header.id))]
    pub fn delete(&mut self, position: usize) -> (OperationOutcome<String>, Option<RgaOp>) {
        let old_state = self.state.text();
        match self.state.delete_local(position) {
            Ok(id) => {
                let clock = self.header.touch_local();
                let new_state = self.state.text();
                debug!(len = new_state.len(), "rga deleted element");
                (
                    OperationOutcome::accepted(old_state, new_state, clock),
                    Some(RgaOp::Delete { id }),
                )
            }
            Err(err) => {
                warn!(error = %err, "rga rejected delete");
                (OperationOutcome::rejected(err), None)
            }
        }
    }

    pub fn apply_operation(
        &mut self,
        op: &RgaOp,
        clock_at_emission: &VectorClock,
    ) -> CrdtResult<()> {
        match op {
            RgaOp::Insert {
                id,
                predecessor,
                value,
            } => {
                self.state
                    .apply_remote_insert(id.clone(), predecessor.clone(), *value)
                    .map_err(|reason| CrdtError::corrupt_state(&self.header.id, reason))?;
            }
            RgaOp::Delete { id } => {
                self.state.apply_remote_delete(id.clone());
            }
        }
        self.header.touch_remote(clock_at_emission);
        Ok(())
    }

    pub fn merge(&mut self, other: &RgaInstance) {
        self.state.merge(&other.state);
        self.header.touch_remote(&other.header.clock);
    }

    pub fn equals(&self, other: &RgaInstance) -> bool {
        self.state.text() == other.state.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(replica_name: &str) -> RgaInstance {
        RgaInstance::new(
            CrdtId::new("doc-body").unwrap(),
            ReplicaId::new(replica_name).unwrap(),
        )
    }

    #[test]
    fn sequential_inserts_build_text() {
        let mut r = instance("a");
        r.insert(None, 'h');
        r.insert(Some(0), 'i');
        assert_eq!(r.text(), "hi");
    }

    #[test]
    fn delete_removes_visible_char_only() {
        let mut r = instance("a");
        r.insert(None, 'a');
        r.insert(Some(0), 'b');
        r.delete(0);
        assert_eq!(r.text(), "b");
    }

    #[test]
    fn out_of_bounds_insert_is_rejected() {
        let mut r = instance("a");
        let (outcome, op) = r.insert(Some(3), 'x');
        assert!(!outcome.success);
        assert!(op.is_none());
    }

    #[test]
    fn concurrent_inserts_at_same_position_converge_deterministically() {
        let mut a = instance("a");
        let mut b = instance("b");
        let (_, op_a) = a.insert(None, 'A');
        let (_, op_b) = b.insert(None, 'B');

        let clock = VectorClock::new();
        a.apply_operation(&op_b.unwrap(), &clock).unwrap();
        b.apply_operation(&op_a.unwrap(), &clock).unwrap();

        assert_eq!(a.text(), b.text());
        assert_eq!(a.text().len(), 2);
    }

    #[test]
    fn delete_before_insert_tombstones_on_arrival() {
        let mut a = instance("a");
        let (_, op) = a.insert(None, 'x');
        let insert_op = op.unwrap();
        let (_, del) = a.delete(0);
        let delete_op = del.unwrap();

        let mut b = instance("b");
        let clock = VectorClock::new();
        // Delete arrives before the insert it targets.
        b.apply_operation(&delete_op, &clock).unwrap();
        assert_eq!(b.text(), "");
        b.apply_operation(&insert_op, &clock).unwrap();
        assert_eq!(b.text(), "");
    }

    #[test]
    fn two_untouched_replicas_mint_disjoint_ids_and_converge() {
        // Two instances that have never communicated both insert a first
        // element before any sync — each must mint a distinct id even
        // though both start from a fresh, empty counter.
        let mut a = instance("a");
        let mut b = instance("b");
        let (_, op_a) = a.insert(None, 'x');
        let (_, op_b) = b.insert(None, 'y');

        let clock = VectorClock::new();
        a.apply_operation(&op_b.unwrap(), &clock).unwrap();
        b.apply_operation(&op_a.unwrap(), &clock).unwrap();

        assert_eq!(a.text(), b.text());
        assert_eq!(a.text().len(), 2);
    }

    #[test]
    fn colliding_id_with_different_value_is_corrupt_state() {
        let mut a = instance("a");
        let clock = VectorClock::new();
        let forged_id = ElementId {
            counter: 0,
            replica: ReplicaId::new("a").unwrap(),
        };
        a.apply_operation(
            &RgaOp::Insert {
                id: forged_id.clone(),
                predecessor: None,
                value: 'x',
            },
            &clock,
        )
        .unwrap();

        let err = a
            .apply_operation(
                &RgaOp::Insert {
                    id: forged_id,
                    predecessor: None,
                    value: 'y',
                },
                &clock,
            )
            .unwrap_err();
        assert!(matches!(err, CrdtError::CorruptState { .. }));
    }
}
