//! Message id composition (spec §6): `(sender_rank << K) | local_counter`.
//! A message id must be globally unique across the run; composing it from
//! the sender's rank plus a per-sender monotonic counter guarantees that
//! without any cross-node coordination.

use std::sync::atomic::{AtomicU32, Ordering};

use taskmesh_types::NodeId;

/// Bits reserved for the local counter; the remaining high bits hold the
/// sender rank. 20 bits gives each sender ~1M in-flight-ever message ids
/// before wraparound; ids are not required to survive a process restart.
pub const COUNTER_BITS: u32 = 20;
const COUNTER_MASK: u32 = (1 << COUNTER_BITS) - 1;

/// Allocates globally-unique message ids for one sender (one instance per
/// node, scoped to this process's lifetime).
#[derive(Debug)]
pub struct MessageIdAllocator {
    sender_rank: NodeId,
    counter: AtomicU32,
}

impl MessageIdAllocator {
    pub fn new(sender_rank: NodeId) -> Self {
        debug_assert!(sender_rank < (1 << (32 - COUNTER_BITS)), "sender rank overflows reserved bits");
        Self { sender_rank, counter: AtomicU32::new(0) }
    }

    /// Allocates the next id for this sender. Wraps the counter rather
    /// than panicking past ~1M allocations; wraparound colliding with a
    /// still-in-flight id is a theoretical concern left to transport
    /// reliability (no internal timeouts here).
    pub fn next(&self) -> u32 {
        let local = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        ((self.sender_rank as u32) << COUNTER_BITS) | local
    }

    pub fn sender_rank_of(id: u32) -> NodeId {
        (id >> COUNTER_BITS) as NodeId
    }
}
