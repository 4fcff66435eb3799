//! `RuntimeConfig`: everything a CLI/environment layer (out of scope per
//! spec §1/§6) would otherwise fill in, scheduling policy, throttle
//! threshold, worker thread count, wisdom-file path, cluster node count.
//! Loaded from TOML (`toml` + `serde`, `from_path`/`ConfigError` shape).

use std::path::{Path, PathBuf};

use derive_more::derive::From;
use serde::Deserialize;

use taskmesh_scheduler::SchedulingPolicy;

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    Io(std::io::Error),
    #[from(ignore)]
    Deserialize(toml::de::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Deserialize(value)
    }
}

impl std::error::Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// TOML-facing mirror of [`SchedulingPolicy`], kept separate so the
/// scheduler crate itself never depends on `serde`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPolicyConfig {
    #[default]
    Fifo,
    Priority,
}

impl From<SchedulingPolicyConfig> for SchedulingPolicy {
    fn from(value: SchedulingPolicyConfig) -> Self {
        match value {
            SchedulingPolicyConfig::Fifo => SchedulingPolicy::Fifo,
            SchedulingPolicyConfig::Priority => SchedulingPolicy::Priority,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub scheduling_policy: SchedulingPolicyConfig,
    pub throttle_threshold: usize,
    pub wisdom_path: Option<PathBuf>,
    pub cluster_node_count: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            scheduling_policy: SchedulingPolicyConfig::default(),
            throttle_threshold: 64,
            wisdom_path: None,
            cluster_node_count: 1,
        }
    }
}

pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<RuntimeConfig> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let config: RuntimeConfig = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: RuntimeConfig = toml::from_str("worker_threads = 8").unwrap();
        assert_eq!(config.worker_threads, 8);
        assert_eq!(config.throttle_threshold, 64);
        assert!(matches!(config.scheduling_policy, SchedulingPolicyConfig::Fifo));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = from_path("/nonexistent/taskmesh.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_toml_surfaces_deserialize_error() {
        let err: ConfigResult<RuntimeConfig> = toml::from_str("worker_threads = \"not a number\"").map_err(ConfigError::from);
        assert!(matches!(err, Err(ConfigError::Deserialize(_))));
    }
}
