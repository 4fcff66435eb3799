//! NUMA directory and DSM contract (spec §3/§4.2/§6). Topology discovery
//! and the DSM implementation itself are out of scope (spec §1), this
//! crate only owns the directory that tracks first-touch home nodes and
//! the narrow interfaces the scheduler and cluster layer consume.

mod directory;
mod dsm;

pub use directory::{CpuId, NumaDirectory, Topology};
pub use dsm::{DsmDirectory, NoDsm};
