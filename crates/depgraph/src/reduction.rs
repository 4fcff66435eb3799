//! Coordinates a shared reduction access across many contributing tasks:
//! the first contributor allocates the access (chained behind whatever
//! true predecessor existed for the region), every later contributor
//! reuses the same access and claims its own slot, and the combine step
//! runs exactly once, when the last contributor unregisters.

use std::collections::HashMap;
use std::sync::Mutex;

use taskmesh_types::{AccessHandle, MemoryRegion};

use crate::region_map::ScopeId;

#[derive(Hash, PartialEq, Eq, Clone)]
struct ReductionKey {
    scope: ScopeId,
    region: MemoryRegion,
    operator: u32,
}

struct ActiveReduction {
    head: AccessHandle,
    pending: usize,
}

#[derive(Default)]
pub struct ReductionCoordinator {
    active: Mutex<HashMap<ReductionKey, ActiveReduction>>,
}

/// Outcome of registering a reduction contribution.
pub enum Contribution {
    /// This call created the shared head access; the caller must still
    /// link it into the region map via the normal chaining path.
    First(AccessHandle),
    /// A head already existed; reuse this handle, no further chaining
    /// needed.
    Joined(AccessHandle),
}

impl ReductionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more contributor to the reduction at `(scope, region,
    /// operator)`. `make_head` is invoked (and its result stored) only the
    /// first time this key is seen.
    pub fn contribute(
        &self,
        scope: ScopeId,
        region: MemoryRegion,
        operator: u32,
        make_head: impl FnOnce() -> AccessHandle,
    ) -> Contribution {
        let key = ReductionKey { scope, region, operator };
        let mut active = self.active.lock().unwrap();
        match active.get_mut(&key) {
            Some(entry) => {
                entry.pending += 1;
                Contribution::Joined(entry.head)
            }
            None => {
                let head = make_head();
                active.insert(key, ActiveReduction { head, pending: 1 });
                Contribution::First(head)
            }
        }
    }

    /// Marks one contributor as finished. Returns the head access handle
    /// and `true` exactly when this was the last outstanding contributor,
    /// the trigger to run the combine step and unregister the head.
    pub fn finish(&self, scope: ScopeId, region: MemoryRegion, operator: u32) -> Option<(AccessHandle, bool)> {
        let key = ReductionKey { scope, region, operator };
        let mut active = self.active.lock().unwrap();
        let done = {
            let entry = active.get_mut(&key)?;
            entry.pending -= 1;
            entry.pending == 0
        };
        if done {
            let entry = active.remove(&key).unwrap();
            Some((entry.head, true))
        } else {
            Some((active.get(&key).unwrap().head, false))
        }
    }
}
