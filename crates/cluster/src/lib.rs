//! Cluster offload, satisfiability propagation, remote-task wrappers, the
//! messenger/DSM contracts and the wire format (spec §4.6, §6). Everything
//! here is optional: a single-node runtime never constructs a
//! [`messenger::Messenger`] and none of this crate's types are reachable.

mod data_fetch_step;
mod data_link_step;
mod message;
mod message_id;
mod messenger;
mod namespace;
mod offload;
mod pending_transfer;
mod wire;

pub use data_fetch_step::run as run_data_fetch_step;
pub use data_link_step::{ClusterDataLinkStep, SatKind};
pub use message::{
    Envelope, InitialSatisfiability, Message, RemoteAccessReleasePayload, RemoteTaskId,
    SatisfiabilityPayload, TaskFinishedPayload, TaskNewPayload,
};
pub use message_id::{MessageIdAllocator, COUNTER_BITS};
pub use messenger::{Messenger, PendingTransfer};
pub use namespace::{valid_namespace_predecessor, ClusterTaskContext, NodeNamespaceRegistry};
pub use offload::{try_offload, Offload, OffloadAccess};
pub use pending_transfer::PendingTransferTracker;
pub use wire::{WireError, WireHeader, WireMessageType, HEADER_LEN};
