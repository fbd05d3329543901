use crate::error::{CrdtError, CrdtResult};
use crate::ids::ReplicaId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Stable external-facing shape consumed by UIs (spec §6). `state`
/// carries whatever per-kind fields are meaningful for that instance
/// (`elements`, `value`, `text`, `order`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationData {
    pub id: String,
    #[serde(rename = "type")]
    pub crdt_type: String,
    pub node_id: String,
    pub vector_clock: BTreeMap<ReplicaId, u64>,
    pub state: Value,
    pub last_modified: String,
    pub causality_level: u64,
}

impl VisualizationData {
    pub fn new(
        id: impl Into<String>,
        crdt_type: impl Into<String>,
        node_id: &ReplicaId,
        vector_clock: BTreeMap<ReplicaId, u64>,
        state: &impl Serialize,
        last_modified: DateTime<Utc>,
    ) -> CrdtResult<Self> {
        let causality_level = vector_clock.values().sum();
        Ok(Self {
            id: id.into(),
            crdt_type: crdt_type.into(),
            node_id: node_id.to_string(),
            vector_clock,
            state: serde_json::to_value(state).map_err(|e| CrdtError::DeserializationFailed {
                reason: format!("failed to encode visualization state: {e}"),
            })?,
            last_modified: last_modified.to_rfc3339(),
            causality_level,
        })
    }
}

/// Superset of `VisualizationData` carrying implementation-facing
/// counters not meant for end-user display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(flatten)]
    pub visualization: VisualizationData,
    pub tombstone_count: u64,
    pub add_tag_count: u64,
    pub pending_count: u64,
}

impl DebugInfo {
    pub fn new(visualization: VisualizationData) -> Self {
        Self {
            visualization,
            tombstone_count: 0,
            add_tag_count: 0,
            pending_count: 0,
        }
    }

    pub fn with_counters(mut self, tombstone_count: u64, add_tag_count: u64, pending_count: u64) -> Self {
        self.tombstone_count = tombstone_count;
        self.add_tag_count = add_tag_count;
        self.pending_count = pending_count;
        self
    }
}
