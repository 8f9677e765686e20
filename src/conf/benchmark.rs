use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    #[serde(default = "BenchmarkConfig::default_warmup_executions")]
    pub warmup_executions: u32,
    #[serde(default = "BenchmarkConfig::default_cache_retry_attempts")]
    pub cache_retry_attempts: u32,
    #[serde(
        with = "humantime_serde",
        default = "BenchmarkConfig::default_cache_retry_delay"
    )]
    pub cache_retry_delay: Duration,
    /// Overrides the embedded query catalog.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl BenchmarkConfig {
    fn default_warmup_executions() -> u32 {
        2
    }

    fn default_cache_retry_attempts() -> u32 {
        10
    }

    fn default_cache_retry_delay() -> Duration {
        Duration::from_secs(1)
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_executions: Self::default_warmup_executions(),
            cache_retry_attempts: Self::default_cache_retry_attempts(),
            cache_retry_delay: Self::default_cache_retry_delay(),
            catalog_path: None,
        }
    }
}
