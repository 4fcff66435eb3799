//! Offload target selection for cluster mode (spec §4.2 "Locality policy
//! (cluster)"). Lives in the scheduler crate because it is, in the end,
//! just another hint feeding `add_ready_task`'s `cpu_hint`, except the
//! hint here targets a cluster node rather than a CPU.

use std::sync::atomic::{AtomicUsize, Ordering};

use taskmesh_numa::{DsmDirectory, NumaDirectory};
use taskmesh_types::{MemoryRegion, NodeId};

/// Outcome of running the locality policy over a task's access set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalityDecision {
    /// At least one access touches memory outside cluster-managed DSM;
    /// the task cannot be migrated and stays local (spec §4.2).
    PinnedLocal,
    /// Offload to this node.
    Node(NodeId),
}

/// Default first-touch deficit threshold: if untouched bytes exceed this
/// multiple of the winning node's byte count, prefer spreading first-touch
/// cost over chasing a thin locality win.
pub const DEFAULT_FIRST_TOUCH_DEFICIT_MULTIPLE: f64 = 1.0;

/// Decides, for a task's declared accesses, whether it can be offloaded
/// and to which node (spec §4.2, §8 "Locality policy" testable property).
pub struct LocalityPolicy<'a> {
    directory: &'a NumaDirectory,
    dsm: &'a dyn DsmDirectory,
    first_touch_deficit_multiple: f64,
    round_robin: AtomicUsize,
}

impl<'a> LocalityPolicy<'a> {
    pub fn new(directory: &'a NumaDirectory, dsm: &'a dyn DsmDirectory) -> Self {
        Self {
            directory,
            dsm,
            first_touch_deficit_multiple: DEFAULT_FIRST_TOUCH_DEFICIT_MULTIPLE,
            round_robin: AtomicUsize::new(0),
        }
    }

    pub fn with_first_touch_deficit_multiple(mut self, multiple: f64) -> Self {
        self.first_touch_deficit_multiple = multiple;
        self
    }

    fn next_round_robin(&self, node_count: usize) -> NodeId {
        debug_assert!(node_count > 0);
        let slot = self.round_robin.fetch_add(1, Ordering::Relaxed) % node_count;
        slot as NodeId
    }

    /// Runs the policy over `accesses`. `node_count` is the number of
    /// cluster nodes eligible for round-robin tie-breaking.
    pub fn decide(&self, accesses: &[MemoryRegion], node_count: usize) -> LocalityDecision {
        if node_count == 0 {
            return LocalityDecision::PinnedLocal;
        }

        for access in accesses {
            if !self.dsm.is_dsm_address(access.start) {
                return LocalityDecision::PinnedLocal;
            }
        }

        let mut per_node: std::collections::HashMap<NodeId, usize> = std::collections::HashMap::new();
        let mut deficit = 0usize;
        for access in accesses {
            let (node_bytes, region_deficit) = self.directory.bytes_by_node(access.start, access.size);
            for (node, bytes) in node_bytes {
                *per_node.entry(node).or_insert(0) += bytes;
            }
            deficit += region_deficit;
        }

        let winner = per_node.iter().max_by_key(|(_, &bytes)| bytes).map(|(&node, &bytes)| (node, bytes));

        match winner {
            None => LocalityDecision::Node(self.next_round_robin(node_count)),
            Some((node, max_bytes)) => {
                if (deficit as f64) > self.first_touch_deficit_multiple * (max_bytes as f64) {
                    LocalityDecision::Node(self.next_round_robin(node_count))
                } else {
                    // Tie detection: more than one node shares the max,
                    // round-robin among the tied set rather than always
                    // picking the lowest id, so node 0 is not a hot spot.
                    let tied: Vec<NodeId> = per_node
                        .iter()
                        .filter(|&(_, &bytes)| bytes == max_bytes)
                        .map(|(&node, _)| node)
                        .collect();
                    if tied.len() > 1 {
                        let slot = self.round_robin.fetch_add(1, Ordering::Relaxed) % tied.len();
                        LocalityDecision::Node(tied[slot])
                    } else {
                        LocalityDecision::Node(node)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmesh_numa::NoDsm;

    struct AllDsm;
    impl DsmDirectory for AllDsm {
        fn is_dsm_address(&self, _addr: usize) -> bool {
            true
        }
        fn home_node_of(&self, _addr: usize) -> Option<NodeId> {
            None
        }
        fn block_size(&self) -> usize {
            64
        }
        fn acquire(&self) {}
        fn selective_acquire(&self, _addr: usize, _size: usize) {}
        fn release(&self) {}
    }

    #[test]
    fn non_dsm_access_pins_local() {
        let dir = NumaDirectory::new(64);
        let dsm = NoDsm;
        let policy = LocalityPolicy::new(&dir, &dsm);
        let decision = policy.decide(&[MemoryRegion::new(0, 64)], 2);
        assert_eq!(decision, LocalityDecision::PinnedLocal);
    }

    #[test]
    fn unique_max_node_wins() {
        let dir = NumaDirectory::new(64);
        dir.record_first_touch(0, 0);
        dir.record_first_touch(64, 1);
        dir.record_first_touch(128, 1);
        let dsm = AllDsm;
        let policy = LocalityPolicy::new(&dir, &dsm);
        let decision = policy.decide(&[MemoryRegion::new(0, 192)], 2);
        assert_eq!(decision, LocalityDecision::Node(1));
    }

    #[test]
    fn high_first_touch_deficit_falls_back_to_round_robin() {
        let dir = NumaDirectory::new(64);
        dir.record_first_touch(0, 0);
        let dsm = AllDsm;
        let policy = LocalityPolicy::new(&dir, &dsm).with_first_touch_deficit_multiple(0.5);
        // 64 bytes homed to node 0, but 1000x more untouched -> deficit wins.
        let decision = policy.decide(&[MemoryRegion::new(0, 64 * 1000)], 3);
        assert!(matches!(decision, LocalityDecision::Node(_)));
    }
}
