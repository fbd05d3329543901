//! Walks through each CRDT kind converging across two replicas.

use crdt_fabric::{
    CrdtId, GCounterInstance, GSetInstance, LwwRegisterInstance, OrSetInstance, PnCounterInstance,
    ReplicaId, RgaInstance, VectorClock,
};
use serde_json::json;

fn main() {
    tracing_subscriber::fmt::init();

    let replica_a = ReplicaId::new("node-a").unwrap();
    let replica_b = ReplicaId::new("node-b").unwrap();

    let mut page_views_a = GCounterInstance::new(CrdtId::new("page-views").unwrap(), replica_a.clone());
    let mut page_views_b = GCounterInstance::new(CrdtId::new("page-views").unwrap(), replica_b.clone());
    page_views_a.increment(7);
    page_views_b.increment(3);
    page_views_a.merge(&page_views_b);
    page_views_b.merge(&page_views_a);
    println!("gcounter converged: {}", page_views_a.value());

    let mut stock_a = PnCounterInstance::new(CrdtId::new("stock").unwrap(), replica_a.clone());
    stock_a.increment(20);
    stock_a.decrement(5);
    println!("pncounter value: {}", stock_a.value());

    let mut tags = GSetInstance::new(CrdtId::new("tags").unwrap(), replica_a.clone());
    tags.add("rust");
    tags.add("crdt");
    println!("gset: {:?}", tags.snapshot());

    let mut members_a = OrSetInstance::new(CrdtId::new("members").unwrap(), replica_a.clone());
    let (_, add_op) = members_a.add("alice");
    let mut members_b = OrSetInstance::new(CrdtId::new("members").unwrap(), replica_b.clone());
    members_b.apply_operation(&add_op, &VectorClock::new()).unwrap();
    println!("orset on b: {:?}", members_b.snapshot());

    let mut title = LwwRegisterInstance::new(CrdtId::new("title").unwrap(), replica_a.clone());
    title.set(json!("Hello"), chrono::Utc::now());
    println!("lww_register: {:?}", title.get());

    let mut doc = RgaInstance::new(CrdtId::new("doc").unwrap(), replica_a);
    doc.insert(None, 'h');
    doc.insert(Some(0), 'i');
    println!("rga text: {}", doc.text());
}
