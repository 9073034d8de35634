use crate::runner::DEFAULT_LIMIT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder in log group names replaced by the environment name.
pub const ENV_PLACEHOLDER: &str = "$ENV";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    /// Application name -> log groups queried for it.
    #[serde(default)]
    pub apps: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            limit: default_limit(),
            output_dir: default_output_dir(),
            env: default_env(),
            region: None,
            profile: None,
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_env() -> String {
    "dev".to_string()
}
