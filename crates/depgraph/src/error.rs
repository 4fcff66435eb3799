/// Dependency protocol violations. Per spec §7 these are fatal: the core
/// has no recovery story for a corrupted dependency graph, so the caller
/// (`taskmesh_core`) turns these into a `FatalError` and aborts.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("access {0:?} was unregistered twice")]
    DoubleUnregister(taskmesh_types::AccessHandle),

    #[error("satisfiability regressed on access {0:?}: {1}")]
    SatisfiabilityRegressed(taskmesh_types::AccessHandle, &'static str),

    #[error("task handle {0:?} has no registered accesses to unregister")]
    UnknownTask(taskmesh_types::TaskHandle),
}
