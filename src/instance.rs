use crate::envelope::OperationPayload;
use crate::error::{CrdtError, CrdtResult};
use crate::gcounter::GCounterInstance;
use crate::gset::GSetInstance;
use crate::header::InstanceHeader;
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::lww::LwwRegisterInstance;
use crate::orset::OrSetInstance;
use crate::pncounter::PnCounterInstance;
use crate::rga::RgaInstance;
use crate::vector_clock::VectorClock;
use crate::visualization::{DebugInfo, VisualizationData};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Tagged union over the five concrete CRDT kinds (spec §9's guidance to
/// replace the teacher's trait-object polymorphism with a closed enum in
/// a strongly-typed language). Every method dispatches to the held
/// variant's inherent implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrdtInstance {
    GCounter(GCounterInstance),
    PNCounter(PnCounterInstance),
    GSet(GSetInstance),
    ORSet(OrSetInstance),
    LwwRegister(LwwRegisterInstance),
    Rga(RgaInstance),
}

impl CrdtInstance {
    pub fn new(kind: CrdtKind, id: CrdtId, replica_id: ReplicaId) -> Self {
        match kind {
            CrdtKind::GCounter => CrdtInstance::GCounter(GCounterInstance::new(id, replica_id)),
            CrdtKind::PNCounter => CrdtInstance::PNCounter(PnCounterInstance::new(id, replica_id)),
            CrdtKind::GSet => CrdtInstance::GSet(GSetInstance::new(id, replica_id)),
            CrdtKind::ORSet => CrdtInstance::ORSet(OrSetInstance::new(id, replica_id)),
            CrdtKind::LwwRegister => {
                CrdtInstance::LwwRegister(LwwRegisterInstance::new(id, replica_id))
            }
            CrdtKind::Rga => CrdtInstance::Rga(RgaInstance::new(id, replica_id)),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        match self {
            CrdtInstance::GCounter(i) => i.kind(),
            CrdtInstance::PNCounter(i) => i.kind(),
            CrdtInstance::GSet(i) => i.kind(),
            CrdtInstance::ORSet(i) => i.kind(),
            CrdtInstance::LwwRegister(i) => i.kind(),
            CrdtInstance::Rga(i) => i.kind(),
        }
    }

    fn header(&self) -> &InstanceHeader {
        match self {
            CrdtInstance::GCounter(i) => &i.header,
            CrdtInstance::PNCounter(i) => &i.header,
            CrdtInstance::GSet(i) => &i.header,
            CrdtInstance::ORSet(i) => &i.header,
            CrdtInstance::LwwRegister(i) => &i.header,
            CrdtInstance::Rga(i) => &i.header,
        }
    }

    pub fn id(&self) -> &CrdtId {
        &self.header().id
    }

    pub fn replica_id(&self) -> &ReplicaId {
        &self.header().replica_id
    }

    pub fn vector_clock(&self) -> &VectorClock {
        &self.header().clock
    }

    /// Apply a remote operation. Fails `KindMismatch` without touching
    /// the instance if the payload targets a different kind.
    pub fn apply_operation(
        &mut self,
        payload: &OperationPayload,
        clock_at_emission: &VectorClock,
    ) -> CrdtResult<()> {
        match (self, payload) {
            (CrdtInstance::GCounter(instance), OperationPayload::GCounter(op)) => {
                instance.apply_operation(op, clock_at_emission)
            }
            (CrdtInstance::PNCounter(instance), OperationPayload::PNCounter(op)) => {
                instance.apply_operation(op, clock_at_emission)
            }
            (CrdtInstance::GSet(instance), OperationPayload::GSet(op)) => {
                instance.apply_operation(op, clock_at_emission)
            }
            (CrdtInstance::ORSet(instance), OperationPayload::ORSet(op)) => {
                instance.apply_operation(op, clock_at_emission)
            }
            (CrdtInstance::LwwRegister(instance), OperationPayload::LwwRegister(op)) => {
                instance.apply_operation(op, clock_at_emission)
            }
            (CrdtInstance::Rga(instance), OperationPayload::Rga(op)) => {
                instance.apply_operation(op, clock_at_emission)
            }
            (instance, payload) => Err(CrdtError::KindMismatch {
                id: instance.id().clone(),
                expected: instance.kind(),
                actual: payload.kind(),
            }),
        }
    }

    /// Whole-state merge. Fails `KindMismatch` if `other` is a different
    /// kind or targets a different logical id.
    pub fn merge(&mut self, other: &CrdtInstance) -> CrdtResult<()> {
        if self.id() != other.id() {
            return Err(CrdtError::KindMismatch {
                id: self.id().clone(),
                expected: self.kind(),
                actual: other.kind(),
            });
        }
        match (self, other) {
            (CrdtInstance::GCounter(a), CrdtInstance::GCounter(b)) => {
                a.merge(b);
                Ok(())
            }
            (CrdtInstance::PNCounter(a), CrdtInstance::PNCounter(b)) => {
                a.merge(b);
                Ok(())
            }
            (CrdtInstance::GSet(a), CrdtInstance::GSet(b)) => {
                a.merge(b);
                Ok(())
            }
            (CrdtInstance::ORSet(a), CrdtInstance::ORSet(b)) => {
                a.merge(b);
                Ok(())
            }
            (CrdtInstance::LwwRegister(a), CrdtInstance::LwwRegister(b)) => {
                a.merge(b);
                Ok(())
            }
            (CrdtInstance::Rga(a), CrdtInstance::Rga(b)) => {
                a.merge(b);
                Ok(())
            }
            (a, b) => Err(CrdtError::KindMismatch {
                id: a.id().clone(),
                expected: a.kind(),
                actual: b.kind(),
            }),
        }
    }

    /// Observable-equivalence: compares value-level state only, ignoring
    /// vector clocks.
    pub fn equals(&self, other: &CrdtInstance) -> bool {
        match (self, other) {
            (CrdtInstance::GCounter(a), CrdtInstance::GCounter(b)) => a.equals(b),
            (CrdtInstance::PNCounter(a), CrdtInstance::PNCounter(b)) => a.equals(b),
            (CrdtInstance::GSet(a), CrdtInstance::GSet(b)) => a.equals(b),
            (CrdtInstance::ORSet(a), CrdtInstance::ORSet(b)) => a.equals(b),
            (CrdtInstance::LwwRegister(a), CrdtInstance::LwwRegister(b)) => a.equals(b),
            (CrdtInstance::Rga(a), CrdtInstance::Rga(b)) => a.equals(b),
            _ => false,
        }
    }

    pub fn serialize(&self) -> CrdtResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CrdtError::DeserializationFailed {
            reason: format!("failed to encode instance: {e}"),
        })
    }

    pub fn deserialize(bytes: &[u8]) -> CrdtResult<Self> {
        bincode::deserialize(bytes).map_err(|e| CrdtError::DeserializationFailed {
            reason: format!("failed to decode instance: {e}"),
        })
    }

    pub fn visualization_data(&self) -> CrdtResult<VisualizationData> {
        let id = self.id().to_string();
        let node_id = self.replica_id().clone();
        let vector_clock = self.vector_clock().get();
        let last_modified = self.header().last_modified;
        let crdt_type = self.kind().as_wire_str();

        let state = match self {
            CrdtInstance::GCounter(i) => json!({ "value": i.value() }),
            CrdtInstance::PNCounter(i) => json!({ "value": i.value() }),
            CrdtInstance::GSet(i) => json!({ "elements": i.snapshot() }),
            CrdtInstance::ORSet(i) => json!({ "elements": i.snapshot() }),
            CrdtInstance::LwwRegister(i) => json!({ "value": i.get() }),
            CrdtInstance::Rga(i) => json!({ "text": i.text() }),
        };

        VisualizationData::new(id, crdt_type, &node_id, vector_clock, &state, last_modified)
    }

    /// Superset of `visualization_data` with implementation-facing
    /// counters (tombstones, add-tags, pending RGA records).
    pub fn debug_info(&self) -> CrdtResult<DebugInfo> {
        let visualization = self.visualization_data()?;
        let (tombstone_count, add_tag_count, pending_count) = match self {
            CrdtInstance::ORSet(i) => (
                i.state.tombstone_count() as u64,
                i.state.add_tag_count() as u64,
                0,
            ),
            CrdtInstance::Rga(i) => (
                i.state.tombstone_count() as u64,
                0,
                i.state.pending_count() as u64,
            ),
            _ => (0, 0, 0),
        };
        Ok(DebugInfo::new(visualization).with_counters(tombstone_count, add_tag_count, pending_count))
    }

    /// Content hash over the serialized state, for dedup checks when
    /// bootstrapping a replica from `snapshot_all` (mirrors the teacher's
    /// `CRDT::content_hash`).
    pub fn content_hash(&self) -> CrdtResult<blake3::Hash> {
        let bytes = self.serialize()?;
        Ok(blake3::hash(&bytes))
    }
}
