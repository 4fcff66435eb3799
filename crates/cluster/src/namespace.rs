//! Per-offload bookkeeping (spec §4.1, §4.6): `ClusterTaskContext` records
//! what a locally offloaded task became on the remote side, and
//! [`NodeNamespaceRegistry`] is the reverse index a target node keeps for
//! wrapper tasks it spawned on behalf of offloaders.

use std::collections::HashMap;
use std::sync::Mutex;

use taskmesh_types::{NodeId, TaskHandle};
use taskmesh_workflow::StepHandle;

use crate::message::RemoteTaskId;

/// Attached to a task once it has been offloaded (spec §4.6 step 3): its
/// `execute` workflow step is replaced by an offload step, and this
/// records where the remote copy lives so later `Satisfiability`/
/// `TaskFinished` messages know where to route.
#[derive(Debug, Clone, Copy)]
pub struct ClusterTaskContext {
    pub target: NodeId,
    pub remote_task_id: RemoteTaskId,
    /// The `offload` / `remote_completion` step pair that replaced this
    /// task's `execute` step (spec §4.4).
    pub offload_step: StepHandle,
    pub remote_completion_step: StepHandle,
}

/// Given the `ClusterTaskContext` of a task's predecessor (if it has one
/// and it was itself offloaded) and the target the new task is about to be
/// sent to, returns the predecessor's remote id iff it already lives on
/// that same target, the `namespace_predecessor` hint that lets the
/// target propagate satisfiability locally instead of waiting on a
/// `Satisfiability` round trip (spec §4.1).
pub fn valid_namespace_predecessor(
    predecessor_ctx: Option<&ClusterTaskContext>,
    target: NodeId,
) -> Option<RemoteTaskId> {
    predecessor_ctx.filter(|ctx| ctx.target == target).map(|ctx| ctx.remote_task_id)
}

/// The reverse-side registry a `node-namespace` task (spec §4.6 step 4)
/// maintains: for every wrapper task it has spawned on behalf of an
/// offloader, the local task handle that represents it on this node.
#[derive(Default)]
pub struct NodeNamespaceRegistry {
    wrappers: Mutex<HashMap<RemoteTaskId, TaskHandle>>,
}

impl NodeNamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_wrapper(&self, remote_task_id: RemoteTaskId, local: TaskHandle) {
        self.wrappers.lock().unwrap().insert(remote_task_id, local);
    }

    pub fn wrapper_for(&self, remote_task_id: RemoteTaskId) -> Option<TaskHandle> {
        self.wrappers.lock().unwrap().get(&remote_task_id).copied()
    }

    /// Drops the wrapper entry once `TaskFinished` has been sent for it.
    pub fn remove_wrapper(&self, remote_task_id: RemoteTaskId) -> Option<TaskHandle> {
        self.wrappers.lock().unwrap().remove(&remote_task_id)
    }

    pub fn wrapper_count(&self) -> usize {
        self.wrappers.lock().unwrap().len()
    }
}
