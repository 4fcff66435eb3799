//! Arena handles and thread-parking primitives shared by every taskmesh
//! crate. Kept deliberately small and dependency-free: this is the one
//! crate every other crate in the workspace is allowed to depend on without
//! it creating a cycle.

mod drops;
mod entry;
mod signal;

pub use drops::{AbortIfPanic, RunOnDrop};
pub use entry::{Entry, EntryList};
pub use signal::{LockSignal, LockState};
