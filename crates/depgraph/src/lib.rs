//! Dependency engine (spec §4.1): region-fragmented access tracking,
//! satisfiability propagation, the commutative scoreboard and the
//! reduction slot protocol.

mod arena;
mod batch;
mod commutative;
mod engine;
mod error;
mod reduction;
mod region_map;

pub use arena::AccessArena;
pub use batch::CpuDependencyData;
pub use commutative::CommutativeScoreboard;
pub use engine::{AccessRequest, DependencyEngine};
pub use error::DependencyError;
pub use reduction::{Contribution, ReductionCoordinator};
pub use region_map::{RegionMap, ScopeId};
