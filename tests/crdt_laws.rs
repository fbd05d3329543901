//! Universal CRDT laws (spec §8): commutativity, idempotence, merge
//! associativity, convergence, and serialization round-trip, run across
//! every kind via property tests.

use crdt_fabric::{
    CrdtId, GCounterInstance, GSetInstance, LwwRegisterInstance, OrSetInstance, PnCounterInstance,
    ReplicaId, RgaInstance,
};
use proptest::prelude::*;

fn replica(name: &str) -> ReplicaId {
    ReplicaId::new(name).unwrap()
}

fn crdt_id(name: &str) -> CrdtId {
    CrdtId::new(name).unwrap()
}

fn gcounter_with(replica_name: &str, total: i64) -> GCounterInstance {
    let mut c = GCounterInstance::new(crdt_id("prop-counter"), replica(replica_name));
    c.increment(total);
    c
}

proptest! {
    #[test]
    fn gcounter_merge_is_commutative(a_total in 0i64..1000, b_total in 0i64..1000) {
        let a = gcounter_with("a", a_total);
        let b = gcounter_with("b", b_total);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        prop_assert!(ab.equals(&ba));
    }

    #[test]
    fn gcounter_merge_is_idempotent(total in 0i64..1000) {
        let a = gcounter_with("a", total);
        let mut merged = a.clone();
        merged.merge(&a);
        prop_assert!(merged.equals(&a));
    }

    #[test]
    fn gcounter_merge_is_associative(a_total in 0i64..500, b_total in 0i64..500, c_total in 0i64..500) {
        let a = gcounter_with("a", a_total);
        let b = gcounter_with("b", b_total);
        let c = gcounter_with("c", c_total);

        let mut ab_c = a.clone();
        ab_c.merge(&b);
        ab_c.merge(&c);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut a_bc = a.clone();
        a_bc.merge(&bc);

        prop_assert!(ab_c.equals(&a_bc));
    }

    #[test]
    fn gcounter_serialization_round_trips(total in 0i64..1000) {
        let a = gcounter_with("a", total);
        let bytes = bincode::serialize(&a).unwrap();
        let restored: GCounterInstance = bincode::deserialize(&bytes).unwrap();
        prop_assert!(a.equals(&restored));
    }

    #[test]
    fn pncounter_merge_is_commutative(
        a_incr in 0i64..500, a_decr in 0i64..500,
        b_incr in 0i64..500, b_decr in 0i64..500,
    ) {
        let mut a = PnCounterInstance::new(crdt_id("prop-pn"), replica("a"));
        a.increment(a_incr);
        a.decrement(a_decr);
        let mut b = PnCounterInstance::new(crdt_id("prop-pn"), replica("b"));
        b.increment(b_incr);
        b.decrement(b_decr);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        prop_assert!(ab.equals(&ba));
    }

    #[test]
    fn gset_merge_is_union_and_idempotent(values in prop::collection::vec("[a-z]{1,5}", 0..20)) {
        let mut a = GSetInstance::new(crdt_id("prop-set"), replica("a"));
        for v in &values {
            a.add(v.clone());
        }
        let mut merged = a.clone();
        merged.merge(&a);
        prop_assert!(merged.equals(&a));
    }

    #[test]
    fn rga_converges_under_concurrent_insert_and_delete(
        a_chars in prop::collection::vec(0u8..26, 0..12),
        b_chars in prop::collection::vec(0u8..26, 0..12),
        a_deletes in prop::collection::vec(any::<bool>(), 0..12),
        b_deletes in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        let mut a = RgaInstance::new(crdt_id("prop-rga"), replica("a"));
        let mut b = RgaInstance::new(crdt_id("prop-rga"), replica("b"));
        let clock = crdt_fabric::VectorClock::new();

        let mut a_ops = Vec::new();
        for (n, delete_first) in a_chars.iter().zip(a_deletes.iter()) {
            if *delete_first && !a.text().is_empty() {
                if let (_, Some(op)) = a.delete(0) {
                    a_ops.push(op);
                }
            }
            let ch = (b'a' + n) as char;
            if let (_, Some(op)) = a.insert(None, ch) {
                a_ops.push(op);
            }
        }

        let mut b_ops = Vec::new();
        for (n, delete_first) in b_chars.iter().zip(b_deletes.iter()) {
            if *delete_first && !b.text().is_empty() {
                if let (_, Some(op)) = b.delete(0) {
                    b_ops.push(op);
                }
            }
            let ch = (b'a' + n) as char;
            if let (_, Some(op)) = b.insert(None, ch) {
                b_ops.push(op);
            }
        }

        for op in &b_ops {
            a.apply_operation(op, &clock).unwrap();
        }
        for op in &a_ops {
            b.apply_operation(op, &clock).unwrap();
        }

        prop_assert!(a.equals(&b));
    }

    #[test]
    fn lww_register_merge_converges_on_the_same_winner(
        a_ts in 0i64..10_000, a_writer in "[a-y]{1,6}",
        b_ts in 0i64..10_000, b_writer in "[a-y]{1,6}",
    ) {
        use chrono::TimeZone;

        let mut a = LwwRegisterInstance::new(
            crdt_id("prop-lww"),
            ReplicaId::new(a_writer).unwrap(),
        );
        let mut b = LwwRegisterInstance::new(
            crdt_id("prop-lww"),
            ReplicaId::new(b_writer).unwrap(),
        );

        let a_time = chrono::Utc.timestamp_opt(a_ts, 0).unwrap();
        let b_time = chrono::Utc.timestamp_opt(b_ts, 0).unwrap();
        a.set(serde_json::json!("from-a"), a_time);
        b.set(serde_json::json!("from-b"), b_time);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        prop_assert!(ab.equals(&ba));
    }

    #[test]
    fn orset_converges_regardless_of_operation_order(values in prop::collection::vec("[a-z]{1,3}", 1..10)) {
        let mut a = OrSetInstance::new(crdt_id("prop-orset"), replica("a"));
        let mut ops = Vec::new();
        for v in &values {
            let (_, op) = a.add(v.clone());
            ops.push(op);
        }

        let mut forward = OrSetInstance::new(crdt_id("prop-orset"), replica("b"));
        let clock = crdt_fabric::VectorClock::new();
        for op in &ops {
            forward.apply_operation(op, &clock).unwrap();
        }

        let mut backward = OrSetInstance::new(crdt_id("prop-orset"), replica("c"));
        for op in ops.iter().rev() {
            backward.apply_operation(op, &clock).unwrap();
        }

        prop_assert!(forward.equals(&backward));
    }
}

#[test]
fn gcounter_zero_increment_is_noop() {
    let mut c = GCounterInstance::new(crdt_id("c"), replica("a"));
    let before = c.value();
    let outcome = c.increment(0);
    assert!(outcome.success);
    assert_eq!(c.value(), before);
}
