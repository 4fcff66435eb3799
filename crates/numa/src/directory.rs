//! Address-to-home-node directory (spec §3/§4.2). Topology discovery itself
//! (NUMA distance, cache layout) is out of scope per spec §1, this crate
//! only needs the CPU list and per-CPU NUMA id a topology provider hands us,
//! plus a first-touch record of which node actually populated each block.

use std::collections::HashMap;

use parking_lot::RwLock;

use taskmesh_types::NodeId;

/// A CPU identifier as handed to us by the (out-of-scope) topology
/// discovery layer.
pub type CpuId = usize;

/// The CPU list, per-CPU NUMA node and page size a topology provider is
/// assumed to supply (spec §1: "assumed to provide a CPU list, per-CPU
/// NUMA id, page size"). Immutable for the lifetime of the runtime.
#[derive(Debug, Clone)]
pub struct Topology {
    cpus: Vec<CpuId>,
    cpu_node: HashMap<CpuId, NodeId>,
    page_size: usize,
}

impl Topology {
    pub fn new(cpus: Vec<CpuId>, cpu_node: HashMap<CpuId, NodeId>, page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two(), "page size must be a power of two");
        Self { cpus, cpu_node, page_size }
    }

    /// A single-node topology covering `cpu_count` CPUs, useful for tests
    /// and non-clustered single-node runs.
    pub fn single_node(cpu_count: usize, page_size: usize) -> Self {
        let cpus: Vec<CpuId> = (0..cpu_count).collect();
        let cpu_node = cpus.iter().map(|&c| (c, 0)).collect();
        Self::new(cpus, cpu_node, page_size)
    }

    pub fn cpus(&self) -> &[CpuId] {
        &self.cpus
    }

    pub fn node_of_cpu(&self, cpu: CpuId) -> Option<NodeId> {
        self.cpu_node.get(&cpu).copied()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Distinct NUMA node ids present among the configured CPUs.
    pub fn node_count(&self) -> usize {
        self.cpu_node
            .values()
            .collect::<std::collections::HashSet<_>>()
            .len()
            .max(1)
    }
}

/// Page-aligned block key the directory tracks first-touch for. Tracking at
/// block (not byte) granularity keeps the directory small; the scheduler's
/// locality policy (§4.2) only needs "which node touched most bytes", not
/// byte-exact ownership.
type BlockKey = usize;

/// Address→home-node mapping (spec §3, "NUMA directory"). A block with no
/// recorded home returns `None`, matching the DSM contract's "-1 means not
/// first-touched yet" (spec §6).
#[derive(Debug)]
pub struct NumaDirectory {
    block_size: usize,
    homes: RwLock<HashMap<BlockKey, NodeId>>,
}

impl NumaDirectory {
    pub fn new(block_size: usize) -> Self {
        debug_assert!(block_size.is_power_of_two(), "block size must be a power of two");
        Self { block_size, homes: RwLock::new(HashMap::new()) }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_of(&self, addr: usize) -> BlockKey {
        addr / self.block_size
    }

    /// Home node of the block containing `addr`, or `None` if nobody has
    /// first-touched it yet.
    pub fn home_node_of(&self, addr: usize) -> Option<NodeId> {
        self.homes.read().get(&self.block_of(addr)).copied()
    }

    /// Records `node` as the first-touch home of the block containing
    /// `addr`, unless a home is already recorded, first-touch is sticky,
    /// not overwritten by later writers from other nodes.
    pub fn record_first_touch(&self, addr: usize, node: NodeId) {
        let block = self.block_of(addr);
        let mut homes = self.homes.write();
        homes.entry(block).or_insert(node);
    }

    /// Sums, per node, the bytes of `[start, start+size)` whose containing
    /// blocks are already homed to that node. Blocks with no recorded home
    /// are reported separately as the "first-touch deficit" the locality
    /// policy needs (spec §4.2).
    pub fn bytes_by_node(&self, start: usize, size: usize) -> (HashMap<NodeId, usize>, usize) {
        let mut per_node: HashMap<NodeId, usize> = HashMap::new();
        let mut deficit = 0usize;
        if size == 0 {
            return (per_node, deficit);
        }

        let homes = self.homes.read();
        let end = start + size;
        let mut cursor = start - (start % self.block_size);
        while cursor < end {
            let block_end = (cursor + self.block_size).min(end);
            let covered = block_end - cursor.max(start);
            match homes.get(&self.block_of(cursor)) {
                Some(&node) => *per_node.entry(node).or_insert(0) += covered,
                None => deficit += covered,
            }
            cursor += self.block_size;
        }
        (per_node, deficit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_block_has_no_home() {
        let dir = NumaDirectory::new(4096);
        assert_eq!(dir.home_node_of(0), None);
    }

    #[test]
    fn first_touch_is_sticky() {
        let dir = NumaDirectory::new(4096);
        dir.record_first_touch(100, 2);
        dir.record_first_touch(100, 5);
        assert_eq!(dir.home_node_of(100), Some(2));
    }

    #[test]
    fn bytes_by_node_splits_across_block_boundary() {
        let dir = NumaDirectory::new(64);
        dir.record_first_touch(0, 1);
        dir.record_first_touch(64, 2);
        let (per_node, deficit) = dir.bytes_by_node(32, 64);
        assert_eq!(per_node.get(&1), Some(&32));
        assert_eq!(per_node.get(&2), Some(&32));
        assert_eq!(deficit, 0);
    }

    #[test]
    fn untouched_range_counts_as_deficit() {
        let dir = NumaDirectory::new(64);
        let (per_node, deficit) = dir.bytes_by_node(0, 64);
        assert!(per_node.is_empty());
        assert_eq!(deficit, 64);
    }

    #[test]
    fn single_node_topology_maps_every_cpu_to_node_zero() {
        let topo = Topology::single_node(4, 4096);
        assert_eq!(topo.cpus().len(), 4);
        assert_eq!(topo.node_of_cpu(2), Some(0));
        assert_eq!(topo.node_count(), 1);
    }
}
