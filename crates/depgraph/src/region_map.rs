//! Per-scope "bottom map": for each memory region currently tracked inside
//! a scope, which access handle currently sits at the bottom (most recent)
//! of that region's dependency chain. Registering a new access against a
//! region that partially overlaps existing chains fragments both sides so
//! every byte ends up governed by exactly one predecessor edge (spec §4.1).

use std::collections::HashMap;
use std::sync::Mutex;

use taskmesh_types::{AccessType, DataAccess, MemoryRegion, TaskHandle};

use crate::arena::AccessArena;

/// Scopes group accesses that may alias each other: `None` is the
/// top-level/global scope, `Some(parent)` is a nested task scope. Regions
/// in different scopes never fragment against each other.
pub type ScopeId = Option<TaskHandle>;

#[derive(Default)]
struct ScopeChains {
    /// Non-overlapping `(region, handle)` pairs, the current bottom of each
    /// region's chain within this scope.
    entries: Vec<(MemoryRegion, taskmesh_types::AccessHandle)>,
}

#[derive(Default)]
pub struct RegionMap {
    chains: Mutex<HashMap<ScopeId, ScopeChains>>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new access of `kind` against `region` within `scope`,
    /// fragmenting it (and any overlapping predecessor) as needed. Returns
    /// the handles of the fragments created for *this* request, each
    /// chained behind whichever predecessor access (if any) previously
    /// owned that sub-range.
    pub fn register(
        &self,
        arena: &AccessArena,
        scope: ScopeId,
        owner: TaskHandle,
        region: MemoryRegion,
        kind: AccessType,
        weak: bool,
    ) -> Vec<taskmesh_types::AccessHandle> {
        let mut chains = self.chains.lock().unwrap();
        let chain = chains.entry(scope).or_default();

        let old_entries = std::mem::take(&mut chain.entries);
        let mut remaining = vec![region];
        let mut fresh_handles = Vec::new();
        let mut kept_entries = Vec::new();

        for (old_region, old_handle) in old_entries {
            let mut old_leftover = vec![old_region];
            let mut still_remaining = Vec::new();

            for req in remaining {
                match req.intersection(&old_region) {
                    None => still_remaining.push(req),
                    Some(overlap) => {
                        let (before, after) = req.split_around(&overlap);
                        if let Some(b) = before {
                            still_remaining.push(b);
                        }
                        if let Some(a) = after {
                            still_remaining.push(a);
                        }

                        let mut next_old_leftover = Vec::new();
                        for piece in old_leftover {
                            match piece.intersection(&overlap) {
                                None => next_old_leftover.push(piece),
                                Some(consumed) => {
                                    let (pb, pa) = piece.split_around(&consumed);
                                    if let Some(b) = pb {
                                        next_old_leftover.push(b);
                                    }
                                    if let Some(a) = pa {
                                        next_old_leftover.push(a);
                                    }
                                    let new_access =
                                        DataAccess::new(consumed, kind, weak, owner);
                                    let new_handle = arena.insert(new_access);
                                    arena.with(old_handle, |old| old.set_successor(new_handle));
                                    fresh_handles.push((consumed, new_handle));
                                }
                            }
                        }
                        old_leftover = next_old_leftover;
                    }
                }
            }

            remaining = still_remaining;
            for leftover in old_leftover {
                kept_entries.push((leftover, old_handle));
            }
        }

        // Whatever is left had no predecessor in this scope: nothing to
        // wait on, so it starts out fully satisfied (first touch).
        for req in remaining {
            let access = DataAccess::new(req, kind, weak, owner);
            access.sat.mark_read_satisfied();
            access.sat.mark_write_satisfied();
            access.sat.mark_concurrent_satisfied();
            access.sat.mark_commutative_satisfied();
            let handle = arena.insert(access);
            fresh_handles.push((req, handle));
        }

        kept_entries.extend(fresh_handles.iter().copied());
        chain.entries = kept_entries;

        fresh_handles.into_iter().map(|(_, h)| h).collect()
    }

    #[cfg(test)]
    pub fn entry_count(&self, scope: ScopeId) -> usize {
        self.chains
            .lock()
            .unwrap()
            .get(&scope)
            .map(|c| c.entries.len())
            .unwrap_or(0)
    }
}
