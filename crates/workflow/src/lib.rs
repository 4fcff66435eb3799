//! Execution workflow (spec §4.4): the per-task step DAG that decouples
//! dependency satisfaction from actual execution. Cluster-specific step
//! kinds (data-link byte counting, data-fetch transfer dedup) live in
//! `taskmesh_cluster`, which depends on the generic [`Step`]/[`WorkflowArena`]
//! defined here.

mod step;
mod workflow;

pub use step::{Step, StepHandle, StepState};
pub use workflow::{labels, WorkflowArena};
