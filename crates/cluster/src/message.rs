//! Type-tagged message payloads exchanged between nodes (spec §4.6, §6).
//! `Message` is an exhaustive tagged union; decoding a wire header's type
//! byte into a `Message` variant is a compile-time-checked match, not a
//! runtime factory lookup (spec §9).

use taskmesh_types::{MemoryRegion, NodeId, WriteId};

/// Per-access initial satisfiability the offloader hands to the remote
/// wrapper task at creation time (spec §4.6 step 2/4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialSatisfiability {
    pub region: MemoryRegion,
    pub read: bool,
    pub write: bool,
    pub concurrent: bool,
    pub commutative: bool,
}

/// Remote identifier for an offloaded task: unique within the pair
/// (offloader node, target node).
pub type RemoteTaskId = u64;

/// Sent offloader → target to create the remote wrapper task (spec §4.6
/// step 2).
#[derive(Debug, Clone)]
pub struct TaskNewPayload {
    pub remote_task_id: RemoteTaskId,
    pub label: &'static str,
    pub priority: i32,
    pub accesses: Vec<InitialSatisfiability>,
    /// If this task has a dependency on another task already offloaded to
    /// the same target, its remote id, lets the target propagate
    /// satisfiability locally without a round trip (spec §4.1 "Namespace
    /// propagation").
    pub namespace_predecessor: Option<RemoteTaskId>,
}

/// Sent target → offloader once the remote wrapper task's body has run
/// (spec §4.6 step 5).
#[derive(Debug, Clone, Copy)]
pub struct TaskFinishedPayload {
    pub remote_task_id: RemoteTaskId,
}

/// Sent offloader → target as satisfiability evolves after offload (spec
/// §4.1 "Satisfiability messages"). Flags are monotonic: once set on the
/// receiving end they are never cleared (spec §4.6 "Ordering guarantees").
#[derive(Debug, Clone, Copy)]
pub struct SatisfiabilityPayload {
    pub remote_task_id: RemoteTaskId,
    pub region: MemoryRegion,
    pub read: bool,
    pub write: bool,
    pub concurrent: bool,
    pub commutative: bool,
    pub write_id: Option<WriteId>,
}

/// Sent target → offloader when the offloadee's access is released (spec
/// §4.1 "Namespace propagation").
#[derive(Debug, Clone, Copy)]
pub struct RemoteAccessReleasePayload {
    pub remote_task_id: RemoteTaskId,
    pub region: MemoryRegion,
}

/// Every message kind the cluster layer exchanges, tagged by construction
/// rather than by a runtime type byte lookup.
#[derive(Debug, Clone)]
pub enum Message {
    TaskNew(TaskNewPayload),
    TaskFinished(TaskFinishedPayload),
    Satisfiability(SatisfiabilityPayload),
    RemoteAccessRelease(RemoteAccessReleasePayload),
}

impl Message {
    pub fn wire_type(&self) -> crate::wire::WireMessageType {
        use crate::wire::WireMessageType;
        match self {
            Message::TaskNew(_) => WireMessageType::TaskNew,
            Message::TaskFinished(_) => WireMessageType::TaskFinished,
            Message::Satisfiability(_) => WireMessageType::Satisfiability,
            Message::RemoteAccessRelease(_) => WireMessageType::RemoteAccessRelease,
        }
    }
}

/// A message plus the node it is addressed to, the unit the [`crate::messenger::Messenger`]
/// interface actually transports.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub target: NodeId,
    pub message: Message,
}
