//! Hints the dependency engine / workflow layer attaches when posting a
//! task to the scheduler (spec §4.2). Hints never change correctness,
//! every ready task is eventually returned by `get_ready_task` regardless
//! of hint, they only steer *which* CPU picks it up first.

/// Why a task became ready, used by the outer scheduler to choose between
/// the immediate-successor slot and the shared per-device queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    /// No particular locality preference.
    None,
    /// This task was the unique direct successor of the task that just
    /// finished on `cpu_hint`, eligible for the immediate-successor slot.
    ImmediateSuccessor,
    /// A previously blocked task became unblocked (spec §4.3 taskwait).
    Unblocked,
    /// A child task just became ready as a side effect of its parent's
    /// progress.
    Child,
    /// The hinted CPU is known to be busy; prefer routing elsewhere when
    /// the inner scheduler supports it.
    BusyComputePlace,
}
