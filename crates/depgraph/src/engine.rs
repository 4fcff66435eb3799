//! Ties the access arena, region chains, commutative scoreboard and
//! reduction coordinator into the engine contract from spec §4.1:
//! `register_accesses`, `unregister_accesses`, `propagate`.

use taskmesh_types::{AccessHandle, AccessType, DataAccess, MemoryRegion, ReductionInfo, TaskHandle};

use crate::arena::AccessArena;
use crate::batch::CpuDependencyData;
use crate::commutative::CommutativeScoreboard;
use crate::error::DependencyError;
use crate::reduction::{Contribution, ReductionCoordinator};
use crate::region_map::{RegionMap, ScopeId};

/// A single declared access, as requested by `register_data_access`
/// (spec §6) before fragmentation.
pub struct AccessRequest {
    pub region: MemoryRegion,
    pub kind: AccessType,
    pub weak: bool,
    /// Present only for `AccessType::Reduction`: identifies which
    /// reduction variable this contributes to.
    pub reduction_operator: Option<u32>,
}

impl AccessRequest {
    pub fn new(region: MemoryRegion, kind: AccessType, weak: bool) -> Self {
        Self { region, kind, weak, reduction_operator: None }
    }

    pub fn reduction(region: MemoryRegion, operator: u32) -> Self {
        Self { region, kind: AccessType::Reduction, weak: false, reduction_operator: Some(operator) }
    }
}

/// The maximum number of concurrently contributing reducers a single
/// reduction head supports. Chosen to match the slot bitmap width; see
/// `ReductionInfo`.
const MAX_REDUCTION_SLOTS: u8 = 64;

#[derive(Default)]
pub struct DependencyEngine {
    arena: AccessArena,
    regions: RegionMap,
    commutative: CommutativeScoreboard,
    reductions: ReductionCoordinator,
}

impl DependencyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &AccessArena {
        &self.arena
    }

    /// Registers every declared access of a newly created task. Returns the
    /// handle(s) produced for each request, in request order (a request can
    /// yield more than one handle if it was fragmented against concurrent
    /// predecessor chains, in practice always one, since each request
    /// covers a single contiguous region).
    pub fn register_accesses(
        &self,
        scope: ScopeId,
        owner: TaskHandle,
        requests: &[AccessRequest],
    ) -> Vec<Vec<AccessHandle>> {
        requests
            .iter()
            .map(|req| match req.kind {
                AccessType::Commutative => vec![self.register_commutative(req.region, owner)],
                AccessType::Reduction => {
                    vec![self.register_reduction(scope, owner, req)]
                }
                _ => self.regions.register(&self.arena, scope, owner, req.region, req.kind, req.weak),
            })
            .collect()
    }

    fn register_commutative(&self, region: MemoryRegion, owner: TaskHandle) -> AccessHandle {
        let access = DataAccess::new(region, AccessType::Commutative, false, owner);
        let handle = self.arena.insert(access);
        if self.commutative.acquire(region, handle) {
            self.arena.with(handle, |a| a.sat.mark_commutative_satisfied());
        }
        handle
    }

    fn register_reduction(&self, scope: ScopeId, owner: TaskHandle, req: &AccessRequest) -> AccessHandle {
        let operator = req.reduction_operator.expect("reduction request without operator");
        let region = req.region;
        let arena = &self.arena;
        let regions = &self.regions;

        let contribution = self.reductions.contribute(scope, region, operator, || {
            let mut handles = regions.register(arena, scope, owner, region, AccessType::Reduction, false);
            let head = handles.pop().expect("region registration always yields a handle");
            arena.with(head, |a| {
                a.install_reduction(ReductionInfo::new(operator, 0, MAX_REDUCTION_SLOTS));
            });
            head
        });

        let head = match contribution {
            Contribution::First(head) | Contribution::Joined(head) => head,
        };

        // Each contributor claims its own slot so combining never races two
        // reducers against the same accumulator slot.
        self.arena.with(head, |access| {
            if let Some(info) = access.reduction() {
                info.claim_slot();
            }
        });

        head
    }

    /// Called once per task completion, for every access the task declared.
    /// Propagates satisfiability to each access's successor and returns the
    /// side effects via `batch` rather than acting on the scheduler
    /// directly (spec §4.5 finalization batching).
    pub fn unregister_accesses(
        &self,
        scope: ScopeId,
        accesses: &[AccessHandle],
        batch: &mut CpuDependencyData,
    ) -> Result<(), DependencyError> {
        for &handle in accesses {
            self.unregister_one(scope, handle, batch)?;
        }
        Ok(())
    }

    fn unregister_one(
        &self,
        scope: ScopeId,
        handle: AccessHandle,
        batch: &mut CpuDependencyData,
    ) -> Result<(), DependencyError> {
        let (kind, region, operator) = self
            .arena
            .with(handle, |a| (a.kind, a.region, a.reduction().map(|r| r.operator)))
            .ok_or(DependencyError::UnknownTask(handle))?;

        // A reduction's access is physically one shared `DataAccess` that
        // every contributing task's access list points at, so N
        // contributors legitimately call unregister against the same
        // handle. The double-unregister guard below would misfire on
        // every contributor after the first, so reduction accounting is
        // routed through `ReductionCoordinator::finish` first and only
        // reaches the generic completion path on the one call that
        // observes the last outstanding contributor.
        if kind == AccessType::Reduction {
            let Some((head, done)) = self.reductions.finish(scope, region, operator.unwrap_or(0)) else {
                return Err(DependencyError::UnknownTask(handle));
            };
            if done {
                self.arena.with(head, |a| a.sat.mark_complete());
                let first_unregister =
                    self.arena.with(head, |a| a.sat.mark_unregistered()).unwrap_or(false);
                debug_assert!(first_unregister, "reduction head unregistered more than once");
                self.propagate_completion(head, batch);
                self.arena.remove(head);
            }
            return Ok(());
        }

        self.arena.with(handle, |a| a.sat.mark_complete());
        let first_unregister = self
            .arena
            .with(handle, |a| a.sat.mark_unregistered())
            .unwrap_or(false);
        if !first_unregister {
            return Err(DependencyError::DoubleUnregister(handle));
        }

        match kind {
            AccessType::Commutative => {
                if let Some(next) = self.commutative.release(region, handle) {
                    let owner = self.arena.with(next, |a| {
                        a.sat.mark_commutative_satisfied();
                        a.owner
                    });
                    if let Some(owner) = owner {
                        batch.mark_satisfied(owner);
                    }
                }
                self.arena.remove(handle);
            }
            _ => {
                self.propagate_completion(handle, batch);
                self.arena.remove(handle);
            }
        }

        Ok(())
    }

    /// Forwards full (read+write+concurrent+commutative) satisfiability to
    /// `handle`'s successor, the idempotent accounting the design notes
    /// call for instead of counting propagation events (spec §9).
    fn propagate_completion(&self, handle: AccessHandle, batch: &mut CpuDependencyData) {
        let successor = self.arena.with(handle, |a| a.successor()).flatten();
        let Some(successor) = successor else { return };

        let became_ready = self.arena.with(successor, |s| {
            s.sat.mark_read_satisfied();
            s.sat.mark_write_satisfied();
            s.sat.mark_concurrent_satisfied();
            s.sat.mark_commutative_satisfied();
            (s.is_ready(), s.owner)
        });

        if let Some((true, owner)) = became_ready {
            batch.mark_satisfied(owner);
        }
    }

    pub fn arena_access_count(&self) -> usize {
        self.arena.active_count()
    }

    pub const MAX_REDUCTION_SLOTS_HINT: u8 = MAX_REDUCTION_SLOTS;
}
