//! The remote distributed shared-memory contract (spec §6). The DSM layer
//! itself is out of scope (spec §1); this crate only needs its interface so
//! the scheduler's locality policy and the cluster data-fetch step can ask
//! "is this address managed by DSM" and "who owns it right now" without
//! depending on a concrete DSM implementation.

use taskmesh_types::NodeId;

/// Narrow capability trait standing in for the distributed shared-memory
/// layer. A production runtime plugs in a concrete implementation;
/// single-node runs use [`NoDsm`].
pub trait DsmDirectory: Send + Sync {
    fn is_dsm_address(&self, addr: usize) -> bool;

    /// Home node of `addr`, or `None` if it has not been first-touched yet
    /// (spec §6: "-1 means not first-touched yet").
    fn home_node_of(&self, addr: usize) -> Option<NodeId>;

    fn block_size(&self) -> usize;

    fn acquire(&self);

    fn selective_acquire(&self, addr: usize, size: usize);

    fn release(&self);
}

/// A `DsmDirectory` for runs with no distributed shared memory at all:
/// every address is local, nothing needs acquiring. Used as the default
/// when cluster mode is disabled.
#[derive(Debug, Default)]
pub struct NoDsm;

impl DsmDirectory for NoDsm {
    fn is_dsm_address(&self, _addr: usize) -> bool {
        false
    }

    fn home_node_of(&self, _addr: usize) -> Option<NodeId> {
        None
    }

    fn block_size(&self) -> usize {
        4096
    }

    fn acquire(&self) {}

    fn selective_acquire(&self, _addr: usize, _size: usize) {}

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_dsm_reports_everything_as_local() {
        let dsm = NoDsm;
        assert!(!dsm.is_dsm_address(0x1000));
        assert_eq!(dsm.home_node_of(0x1000), None);
    }
}
