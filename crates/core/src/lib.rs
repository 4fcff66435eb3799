//! Public facade (spec §4.5 task lifecycle, §6 task-creation API, §7 error
//! handling, plus the ambient config/logging/wisdom stack around them).
//! Everything below this crate (`taskmesh_depgraph`, `taskmesh_scheduler`,
//! `taskmesh_worker`, `taskmesh_workflow`, `taskmesh_numa`,
//! `taskmesh_throttle`, optionally `taskmesh_cluster`) is an implementation
//! detail a caller never needs to reach directly.

mod config;
mod error;
mod lifecycle;
mod logging;
mod runtime;
mod task_arena;
mod wisdom;

pub use config::{from_path as config_from_path, ConfigError, ConfigResult, RuntimeConfig, SchedulingPolicyConfig};
pub use error::{abort_on_fatal, FatalError};
pub use lifecycle::{DataAccessRequest, TaskLifecycle};
pub use runtime::Runtime;
pub use wisdom::{TaskTypeLabel, WisdomEntry, WisdomTable};

/// Installs the process-wide `tracing` subscriber (spec §3.1).
pub fn init_logging() {
    logging::init();
}
