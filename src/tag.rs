use crate::ids::ReplicaId;

/// Generate a tag/id that is unique across the whole fleet, forever.
///
/// Composed from the replica id, a caller-supplied per-replica monotonic
/// counter, and a random salt — uniqueness depends only on the counter
/// being genuinely monotonic per replica, never on wall-clock monotonicity
/// (spec §9's portability note for tag/id generation).
pub fn generate_unique_tag(replica: &ReplicaId, counter: u64) -> String {
    let salt: u32 = rand::random();
    format!("{replica}:{counter}:{salt:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_counters_yield_distinct_tags() {
        let replica = ReplicaId::new("r1").unwrap();
        let a = generate_unique_tag(&replica, 1);
        let b = generate_unique_tag(&replica, 2);
        assert_ne!(a, b);
    }
}
