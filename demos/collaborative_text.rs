//! Two replicas concurrently edit the same document and converge.

use crdt_fabric::{CrdtId, ReplicaId, RgaInstance, VectorClock};

fn main() {
    tracing_subscriber::fmt::init();

    let doc_id = CrdtId::new("shared-note").unwrap();
    let mut alice = RgaInstance::new(doc_id.clone(), ReplicaId::new("alice").unwrap());
    let mut bob = RgaInstance::new(doc_id, ReplicaId::new("bob").unwrap());

    let clock = VectorClock::new();
    let mut to_bob = Vec::new();
    for ch in "hello".chars() {
        let pos = if alice.text().is_empty() {
            None
        } else {
            Some(alice.text().len() - 1)
        };
        let (_, op) = alice.insert(pos, ch);
        to_bob.push(op.unwrap());
    }
    for op in &to_bob {
        bob.apply_operation(op, &clock).unwrap();
    }
    println!("alice: {}", alice.text());
    println!("bob (after sync): {}", bob.text());

    // Concurrent edits: alice appends "!", bob deletes the first char.
    let (_, alice_op) = alice.insert(Some(alice.text().len() - 1), '!');
    let (_, bob_op) = bob.delete(0);

    alice.apply_operation(&bob_op.unwrap(), &clock).unwrap();
    bob.apply_operation(&alice_op.unwrap(), &clock).unwrap();

    println!("alice after merge: {}", alice.text());
    println!("bob after merge: {}", bob.text());
    assert_eq!(alice.text(), bob.text());
}
