//! The wire messenger contract (spec §6). Only the interface is part of
//! this crate's scope; a concrete transport is plugged in by the
//! embedding application.

use taskmesh_types::{MemoryRegion, NodeId};

use crate::message::Message;

/// Opaque handle to an in-flight data transfer, returned by `send_data`/
/// `fetch_data` when issued non-blocking. `test_completion` reports which
/// of a batch have finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingTransfer(pub u64);

/// Narrow capability trait standing in for the transport layer (spec §1:
/// "the wire messenger transport, only the message interface"). Blocking
/// calls return once the operation is locally complete (sent/received);
/// non-blocking calls return a [`PendingTransfer`] that `test_completion`
/// later resolves.
pub trait Messenger: Send + Sync {
    fn send_message(&self, msg: &Message, target: NodeId, blocking: bool);

    fn send_data(
        &self,
        region: MemoryRegion,
        target: NodeId,
        message_id: u32,
        blocking: bool,
    ) -> Option<PendingTransfer>;

    fn fetch_data(
        &self,
        region: MemoryRegion,
        source: NodeId,
        message_id: u32,
        blocking: bool,
    ) -> Option<PendingTransfer>;

    /// Non-blocking poll for one incoming message, if any. Per spec §6,
    /// `DATA_RAW` payloads are never surfaced here, they are only
    /// observed via `fetch_data`'s completion.
    fn check_mail(&self) -> Option<Message>;

    /// Blocks until every node has called `barrier()`, used only at
    /// cluster bootstrap/shutdown, never on the task-execution hot path.
    fn barrier(&self);

    /// Marks which of `pending` have completed, in place.
    fn test_completion(&self, pending: &[PendingTransfer]) -> Vec<bool>;
}
