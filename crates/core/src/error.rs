//! Fatal error classes (spec §7) and the single abort path they all funnel
//! into. Internal recoverable conditions stay `bool`/`Option` returns at the
//! call site, nothing in this crate catches-and-swallows one of these.

use taskmesh_depgraph::DependencyError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("invalid API use: {0}")]
    InvalidApiUse(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("dependency protocol violation: {0}")]
    DependencyProtocolViolation(#[from] DependencyError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Logs one tagged line and aborts the process. The only place a
/// [`FatalError`] is allowed to terminate in, everywhere else it
/// propagates via `?` (spec §7: "a single error message line preceded by
/// a component tag").
pub fn abort_on_fatal(err: FatalError) -> ! {
    tracing::error!(target: "taskmesh_core", %err, "fatal error, aborting");
    std::process::abort()
}
