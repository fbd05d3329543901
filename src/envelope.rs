use crate::error::{CrdtError, CrdtResult};
use crate::gcounter::GCounterOp;
use crate::gset::GSetOp;
use crate::ids::{CrdtId, ReplicaId};
use crate::kind::CrdtKind;
use crate::lww::LwwRegisterOp;
use crate::orset::OrSetOp;
use crate::pncounter::PnCounterOp;
use crate::rga::RgaOp;
use crate::vector_clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind-specific payload an `OperationEnvelope` carries. Exactly one
/// variant per `CrdtKind`; the variant present must match the
/// envelope's declared kind (spec §4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationPayload {
    GCounter(GCounterOp),
    PNCounter(PnCounterOp),
    GSet(GSetOp),
    ORSet(OrSetOp),
    LwwRegister(LwwRegisterOp),
    Rga(RgaOp),
}

impl OperationPayload {
    pub fn kind(&self) -> CrdtKind {
        match self {
            OperationPayload::GCounter(_) => CrdtKind::GCounter,
            OperationPayload::PNCounter(_) => CrdtKind::PNCounter,
            OperationPayload::GSet(_) => CrdtKind::GSet,
            OperationPayload::ORSet(_) => CrdtKind::ORSet,
            OperationPayload::LwwRegister(_) => CrdtKind::LwwRegister,
            OperationPayload::Rga(_) => CrdtKind::Rga,
        }
    }
}

/// Immutable unit of replication: a single operation plus the emitting
/// replica's clock snapshot taken at emission time (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEnvelope {
    pub envelope_id: String,
    pub source_replica: ReplicaId,
    pub crdt_id: CrdtId,
    pub payload: OperationPayload,
    pub clock_at_emission: VectorClock,
    pub emitted_at: DateTime<Utc>,
}

impl OperationEnvelope {
    pub fn new(
        envelope_id: impl Into<String>,
        source_replica: ReplicaId,
        crdt_id: CrdtId,
        payload: OperationPayload,
        clock_at_emission: VectorClock,
        emitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            source_replica,
            crdt_id,
            payload,
            clock_at_emission,
            emitted_at,
        }
    }

    /// Same as `new`, but mints a fresh UUID v4 envelope id rather than
    /// requiring the caller to supply one.
    pub fn emit(
        source_replica: ReplicaId,
        crdt_id: CrdtId,
        payload: OperationPayload,
        clock_at_emission: VectorClock,
    ) -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            source_replica,
            crdt_id,
            payload,
            clock_at_emission,
            Utc::now(),
        )
    }

    pub fn kind(&self) -> CrdtKind {
        self.payload.kind()
    }

    pub fn validate(&self) -> CrdtResult<()> {
        if self.envelope_id.is_empty() {
            return Err(CrdtError::invalid_argument("envelope id must be non-empty"));
        }
        Ok(())
    }
}
