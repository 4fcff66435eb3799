//! Local half of the offload protocol (spec §4.6 steps 1-3): decide a
//! target via the locality policy, build the `TaskNew` payload, and
//! replace the task's `execute` step with an `offload` → `remote_completion`
//! pair.

use taskmesh_scheduler::{LocalityDecision, LocalityPolicy};
use taskmesh_types::{MemoryRegion, NodeId};
use taskmesh_workflow::{labels, Step, WorkflowArena};

use crate::message::{InitialSatisfiability, RemoteTaskId, TaskNewPayload};
use crate::message_id::MessageIdAllocator;
use crate::namespace::{valid_namespace_predecessor, ClusterTaskContext};

/// One task's declared access, in the shape the offload protocol needs:
/// the region plus whatever satisfiability is already known locally at
/// offload time (spec §4.6 step 2, "satisfiability info (initial
/// per-access)").
#[derive(Debug, Clone, Copy)]
pub struct OffloadAccess {
    pub region: MemoryRegion,
    pub read: bool,
    pub write: bool,
    pub concurrent: bool,
    pub commutative: bool,
}

impl From<OffloadAccess> for InitialSatisfiability {
    fn from(a: OffloadAccess) -> Self {
        InitialSatisfiability {
            region: a.region,
            read: a.read,
            write: a.write,
            concurrent: a.concurrent,
            commutative: a.commutative,
        }
    }
}

/// Result of a successful offload decision: the message to send, plus the
/// context to attach to the local task (spec §4.6 step 3).
pub struct Offload {
    pub target: NodeId,
    pub message: TaskNewPayload,
    pub context: ClusterTaskContext,
}

/// Runs the offload protocol's local half. Returns `None` if the locality
/// policy pinned the task local (spec §4.2), the caller keeps the task's
/// ordinary `execute` step in that case and never touches the workflow.
///
/// `execute_predecessor_count` is whatever the task's (now discarded)
/// `execute` step would have needed, the `offload` step inherits it so
/// the preceding `data-fetch` step's successor wiring still makes sense.
/// `remote_task_id` reuses the cluster message-id scheme (rank-prefixed,
/// see [`crate::message_id`]) so it is unique across the whole run without
/// a separate allocator.
#[allow(clippy::too_many_arguments)]
pub fn try_offload(
    arena: &WorkflowArena,
    locality: &LocalityPolicy,
    node_count: usize,
    message_ids: &MessageIdAllocator,
    label: &'static str,
    priority: i32,
    accesses: &[OffloadAccess],
    execute_predecessor_count: usize,
    predecessor_ctx: Option<&ClusterTaskContext>,
) -> Option<Offload> {
    let regions: Vec<MemoryRegion> = accesses.iter().map(|a| a.region).collect();
    let target = match locality.decide(&regions, node_count) {
        LocalityDecision::PinnedLocal => return None,
        LocalityDecision::Node(node) => node,
    };

    let remote_task_id: RemoteTaskId = message_ids.next() as RemoteTaskId;
    let namespace_predecessor = valid_namespace_predecessor(predecessor_ctx, target);

    let offload_step = arena.insert(Step::new(labels::OFFLOAD, execute_predecessor_count));
    let remote_completion_step = arena.insert(Step::new(labels::REMOTE_COMPLETION, 1));
    arena.link(offload_step, remote_completion_step);

    tracing::debug!(target, remote_task_id, ?namespace_predecessor, "offloading task");

    let message = TaskNewPayload {
        remote_task_id,
        label,
        priority,
        accesses: accesses.iter().copied().map(InitialSatisfiability::from).collect(),
        namespace_predecessor,
    };

    let context = ClusterTaskContext { target, remote_task_id, offload_step, remote_completion_step };

    Some(Offload { target, message, context })
}
