use crate::error::{CrdtError, CrdtResult};
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire form of an operation before transport (spec §6). `operation_data`
/// and `vector_clock` are themselves JSON-encoded strings, matching the
/// literal double-encoded shape the spec mandates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub node_id: String,
    pub crdt_type: String,
    pub crdt_id: String,
    pub operation_type: String,
    pub operation_data: String,
    pub vector_clock: String,
    pub timestamp: String,
    pub applied: bool,
}

impl OperationRecord {
    pub fn new(
        id: impl Into<String>,
        node_id: &ReplicaId,
        kind: CrdtKind,
        crdt_id: &CrdtId,
        operation_type: impl Into<String>,
        operation_data: &impl Serialize,
        vector_clock: &BTreeMap<ReplicaId, u64>,
        timestamp: DateTime<Utc>,
        applied: bool,
    ) -> CrdtResult<Self> {
        Ok(Self {
            id: id.into(),
            node_id: node_id.to_string(),
            crdt_type: kind.as_wire_str().to_string(),
            crdt_id: crdt_id.to_string(),
            operation_type: operation_type.into(),
            operation_data: encode_json(operation_data)?,
            vector_clock: encode_json(vector_clock)?,
            timestamp: timestamp.to_rfc3339(),
            applied,
        })
    }

    pub fn decode_operation_data<T: for<'de> Deserialize<'de>>(&self) -> CrdtResult<T> {
        decode_json(&self.operation_data)
    }

    pub fn decode_vector_clock(&self) -> CrdtResult<BTreeMap<ReplicaId, u64>> {
        decode_json(&self.vector_clock)
    }

    pub fn parsed_kind(&self) -> CrdtResult<CrdtKind> {
        self.crdt_type.parse()
    }
}

/// Wire form of a full instance snapshot (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: String,
    pub node_id: String,
    pub crdt_type: String,
    pub crdt_id: String,
    pub state: String,
    pub vector_clock: String,
    pub updated_at: String,
}

impl StateSnapshot {
    pub fn new(
        id: impl Into<String>,
        node_id: &ReplicaId,
        kind: CrdtKind,
        crdt_id: &CrdtId,
        state: &impl Serialize,
        vector_clock: &BTreeMap<ReplicaId, u64>,
        updated_at: DateTime<Utc>,
    ) -> CrdtResult<Self> {
        Ok(Self {
            id: id.into(),
            node_id: node_id.to_string(),
            crdt_type: kind.as_wire_str().to_string(),
            crdt_id: crdt_id.to_string(),
            state: encode_json(state)?,
            vector_clock: encode_json(vector_clock)?,
            updated_at: updated_at.to_rfc3339(),
        })
    }

    pub fn decode_state<T: for<'de> Deserialize<'de>>(&self) -> CrdtResult<T> {
        decode_json(&self.state)
    }

    pub fn decode_vector_clock(&self) -> CrdtResult<BTreeMap<ReplicaId, u64>> {
        decode_json(&self.vector_clock)
    }

    pub fn parsed_kind(&self) -> CrdtResult<CrdtKind> {
        self.crdt_type.parse()
    }
}

fn encode_json(value: &impl Serialize) -> CrdtResult<String> {
    serde_json::to_string(value).map_err(|e| CrdtError::DeserializationFailed {
        reason: format!("failed to encode JSON payload: {e}"),
    })
}

fn decode_json<T: for<'de> Deserialize<'de>>(raw: &str) -> CrdtResult<T> {
    serde_json::from_str(raw).map_err(|e| CrdtError::DeserializationFailed {
        reason: format!("failed to decode JSON payload: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcounter::GCounterOp;

    #[test]
    fn operation_record_round_trips_operation_data() {
        let op = GCounterOp {
            replica: ReplicaId::new("a").unwrap(),
            count: 5,
        };
        let mut clock = BTreeMap::new();
        clock.insert(ReplicaId::new("a").unwrap(), 1);

        let record = OperationRecord::new(
            "op-1",
            &ReplicaId::new("a").unwrap(),
            CrdtKind::GCounter,
            &CrdtId::new("counter-1").unwrap(),
            "Increment",
            &op,
            &clock,
            Utc::now(),
            true,
        )
        .unwrap();

        let decoded: GCounterOp = record.decode_operation_data().unwrap();
        assert_eq!(decoded, op);
        assert_eq!(record.parsed_kind().unwrap(), CrdtKind::GCounter);
    }
}
