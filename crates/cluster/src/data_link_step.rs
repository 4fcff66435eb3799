//! Cluster data-link step (spec §4.4): at creation it knows the
//! satisfiability kinds the offloader has promised to eventually link for
//! a region; it deletes itself once every kind has been linked exactly
//! once AND the step has been started.
//!
//! Spec §9 flags a double-free bug pattern here: a region can receive
//! read satisfiability twice from two different cluster paths, and the
//! original byte-counter decremented on every message regardless. This
//! implementation resolves it by tracking *which* kinds have already been
//! linked per region and treating a repeat as a no-op (monotonic,
//! idempotent accounting) rather than counting bytes per message.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use taskmesh_types::MemoryRegion;
use taskmesh_workflow::{StepHandle, WorkflowArena};

bitflags::bitflags! {
    /// Which satisfiability kinds a cluster data-link step still has to
    /// hear about before it can release. Read and write are tracked
    /// separately, per spec §4.4 ("a region linked both read and write
    /// decrements twice").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SatKind: u8 {
        const READ        = 0b0001;
        const WRITE       = 0b0010;
        const CONCURRENT  = 0b0100;
        const COMMUTATIVE = 0b1000;
    }
}

pub struct ClusterDataLinkStep {
    step_handle: StepHandle,
    pub region: MemoryRegion,
    linked: Mutex<SatKind>,
    outstanding: AtomicUsize,
    started: AtomicBool,
}

impl ClusterDataLinkStep {
    pub fn new(step_handle: StepHandle, region: MemoryRegion, expected: SatKind) -> Self {
        Self {
            step_handle,
            region,
            linked: Mutex::new(SatKind::empty()),
            outstanding: AtomicUsize::new(expected.bits().count_ones() as usize),
            started: AtomicBool::new(false),
        }
    }

    /// Marks the step started (its predecessors, the DAG's `start` step,
    /// have already completed). Per spec §4.4 the step only deletes itself
    /// once both this and the outstanding-byte condition hold.
    pub fn start(&self, arena: &WorkflowArena) -> Vec<StepHandle> {
        self.started.store(true, Ordering::Release);
        self.maybe_complete(arena)
    }

    /// Propagates one satisfiability `kind` for this region. A repeat of
    /// a kind already linked is a no-op, the idempotent accounting fix
    /// for the double-free pattern described above.
    pub fn link(&self, kind: SatKind, arena: &WorkflowArena) -> Vec<StepHandle> {
        let first_time = {
            let mut linked = self.linked.lock().unwrap();
            if linked.contains(kind) {
                false
            } else {
                linked.insert(kind);
                true
            }
        };
        if !first_time {
            return Vec::new();
        }

        let prev = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "linked more distinct kinds than this step declared");
        if prev == 1 {
            self.maybe_complete(arena)
        } else {
            Vec::new()
        }
    }

    fn maybe_complete(&self, arena: &WorkflowArena) -> Vec<StepHandle> {
        if self.started.load(Ordering::Acquire) && self.outstanding.load(Ordering::Acquire) == 0 {
            arena.complete(self.step_handle)
        } else {
            Vec::new()
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}
