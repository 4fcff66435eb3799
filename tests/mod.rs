//! Cross-crate integration tests implementing the concrete scenarios from
//! spec §8. Unit-level invariants are covered beside the code that
//! enforces them; this crate only exercises behavior that spans more than
//! one crate (the `taskmesh_core` facade driving depgraph + scheduler +
//! worker + workflow together), one file per scenario under a top-level
//! `tests/` workspace member.

pub mod chain_of_three;
pub mod cluster_offload_happy_path;
pub mod commutative_contention;
pub mod idle_race;
