//! Installs the process-wide `tracing` subscriber (spec §3.1): an
//! `EnvFilter` driven by `RUST_LOG`, plus JSON or pretty formatting
//! depending on `TASKMESH_LOG_FORMAT`. Component tags named in spec §7
//! (`dependency_engine`, `scheduler`, `worker`, `cluster`, …) are the
//! `target`/span names each crate already logs under; this just wires the
//! sink.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. Safe to call more than once; later
/// calls are no-ops (mirrors `tracing::subscriber::set_global_default`'s
/// own idempotence under `try_init`).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TASKMESH_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed, skipping re-init");
    }
}
