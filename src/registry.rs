use crate::envelope::OperationEnvelope;
use crate::error::{CrdtError, CrdtResult};
use crate::ids::{CrdtId, ReplicaId};
use crate::instance::CrdtInstance;
use crate::kind::CrdtKind;
use crate::wire::StateSnapshot;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

/// Owns every `CrdtInstance` a replica holds, keyed by logical id.
/// Transport-independent: it consumes and produces envelopes/snapshots
/// but never performs I/O (spec §4.9).
#[derive(Debug, Clone, Default)]
pub struct Registry {
    replica_id: Option<ReplicaId>,
    instances: BTreeMap<CrdtId, CrdtInstance>,
}

impl Registry {
    pub fn new(replica_id: ReplicaId) -> Self {
        Self {
            replica_id: Some(replica_id),
            instances: BTreeMap::new(),
        }
    }

    fn replica_id(&self) -> CrdtResult<&ReplicaId> {
        self.replica_id
            .as_ref()
            .ok_or_else(|| CrdtError::invalid_argument("registry has no owning replica id"))
    }

    /// Look up `crdt_id`, creating it as `kind` on first access. A later
    /// call with a different `kind` for the same id fails `KindMismatch`
    /// without mutating the registry.
    #[instrument(skip(self))]
    pub fn get_or_create(&mut self, kind: CrdtKind, crdt_id: &CrdtId) -> CrdtResult<&mut CrdtInstance> {
        let replica_id = self.replica_id()?.clone();
        if let Some(existing) = self.instances.get(crdt_id) {
            if existing.kind() != kind {
                error!(
                    id = %crdt_id,
                    expected = %existing.kind(),
                    actual = %kind,
                    "registry kind mismatch"
                );
                return Err(CrdtError::KindMismatch {
                    id: crdt_id.clone(),
                    expected: existing.kind(),
                    actual: kind,
                });
            }
        } else {
            self.instances
                .insert(crdt_id.clone(), CrdtInstance::new(kind, crdt_id.clone(), replica_id));
            debug!(id = %crdt_id, %kind, "registry created instance");
        }
        Ok(self.instances.get_mut(crdt_id).expect("just inserted or present"))
    }

    pub fn get(&self, crdt_id: &CrdtId) -> Option<&CrdtInstance> {
        self.instances.get(crdt_id)
    }

    /// Locate (creating if absent) the envelope's target instance and
    /// apply its operation.
    #[instrument(skip(self, envelope), fields(crdt_id = %envelope.crdt_id))]
    pub fn dispatch(&mut self, envelope: &OperationEnvelope) -> CrdtResult<()> {
        envelope.validate()?;
        let instance = self.get_or_create(envelope.kind(), &envelope.crdt_id)?;
        instance.apply_operation(&envelope.payload, &envelope.clock_at_emission)
    }

    /// Snapshot every held instance, e.g. for persistence or bootstrap of
    /// a newly joining replica.
    pub fn snapshot_all(&self) -> CrdtResult<Vec<StateSnapshot>> {
        let replica_id = self.replica_id()?;
        self.instances
            .values()
            .map(|instance| {
                StateSnapshot::new(
                    format!("{}-{}", instance.id(), instance.vector_clock().sum()),
                    replica_id,
                    instance.kind(),
                    instance.id(),
                    instance,
                    &instance.vector_clock().get(),
                    instance_last_modified(instance),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

fn instance_last_modified(instance: &CrdtInstance) -> chrono::DateTime<chrono::Utc> {
    instance
        .visualization_data()
        .ok()
        .and_then(|v| chrono::DateTime::parse_from_rfc3339(&v.last_modified).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::OperationPayload;
    use crate::gcounter::GCounterOp;
    use crate::vector_clock::VectorClock;

    fn registry() -> Registry {
        Registry::new(ReplicaId::new("node-a").unwrap())
    }

    #[test]
    fn get_or_create_is_idempotent_on_matching_kind() {
        let mut r = registry();
        let id = CrdtId::new("counter-1").unwrap();
        r.get_or_create(CrdtKind::GCounter, &id).unwrap();
        r.get_or_create(CrdtKind::GCounter, &id).unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn get_or_create_rejects_kind_change() {
        let mut r = registry();
        let id = CrdtId::new("thing-1").unwrap();
        r.get_or_create(CrdtKind::GCounter, &id).unwrap();
        let err = r.get_or_create(CrdtKind::GSet, &id).unwrap_err();
        assert!(matches!(err, CrdtError::KindMismatch { .. }));
    }

    #[test]
    fn dispatch_creates_instance_on_first_envelope() {
        let mut r = registry();
        let id = CrdtId::new("counter-1").unwrap();
        let envelope = OperationEnvelope::new(
            "env-1",
            ReplicaId::new("node-b").unwrap(),
            id.clone(),
            OperationPayload::GCounter(GCounterOp {
                replica: ReplicaId::new("node-b").unwrap(),
                count: 4,
            }),
            VectorClock::new(),
            chrono::Utc::now(),
        );
        r.dispatch(&envelope).unwrap();
        match r.get(&id).unwrap() {
            CrdtInstance::GCounter(c) => assert_eq!(c.value(), 4),
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn snapshot_all_covers_every_instance() {
        let mut r = registry();
        r.get_or_create(CrdtKind::GCounter, &CrdtId::new("a").unwrap())
            .unwrap();
        r.get_or_create(CrdtKind::GSet, &CrdtId::new("b").unwrap())
            .unwrap();
        let snapshots = r.snapshot_all().unwrap();
        assert_eq!(snapshots.len(), 2);
    }
}
