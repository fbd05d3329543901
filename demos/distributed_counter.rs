//! Simulates three replicas independently incrementing a GCounter over a
//! flaky network, then reconciling through the Registry via envelopes.

use crdt_fabric::{
    CrdtId, CrdtKind, OperationEnvelope, OperationPayload, Registry, ReplicaId, VectorClock,
};
use crdt_fabric::GCounterOp;

fn main() {
    tracing_subscriber::fmt::init();

    let counter_id = CrdtId::new("orders-fulfilled").unwrap();
    let mut registries: Vec<Registry> = ["node-a", "node-b", "node-c"]
        .iter()
        .map(|name| Registry::new(ReplicaId::new(*name).unwrap()))
        .collect();

    let local_totals = [12u64, 7, 30];
    let replica_names = ["node-a", "node-b", "node-c"];

    // Each replica locally tallies its own orders, then broadcasts its
    // absolute running total to the other two.
    let mut envelopes = Vec::new();
    for (registry, (&total, name)) in registries.iter_mut().zip(local_totals.iter().zip(replica_names)) {
        let replica = ReplicaId::new(name).unwrap();
        registry
            .get_or_create(CrdtKind::GCounter, &counter_id)
            .unwrap();
        let envelope = OperationEnvelope::emit(
            replica.clone(),
            counter_id.clone(),
            OperationPayload::GCounter(GCounterOp {
                replica,
                count: total,
            }),
            VectorClock::new(),
        );
        envelopes.push(envelope);
    }

    for registry in &mut registries {
        for envelope in &envelopes {
            registry.dispatch(envelope).unwrap();
        }
    }

    for (registry, name) in registries.iter().zip(replica_names) {
        if let Some(crdt_fabric::CrdtInstance::GCounter(counter)) = registry.get(&counter_id) {
            println!("{name} converged total: {}", counter.value());
        }
    }
}
