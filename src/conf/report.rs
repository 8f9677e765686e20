use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "ReportConfig::default_interpreter")]
    pub interpreter: String,
    #[serde(default = "ReportConfig::default_script")]
    pub script: PathBuf,
    #[serde(with = "humantime_serde", default = "ReportConfig::default_timeout")]
    pub timeout: Duration,
}

impl ReportConfig {
    fn default_interpreter() -> String {
        String::from("python3")
    }

    fn default_script() -> PathBuf {
        PathBuf::from("scripts/generate_report.py")
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(60)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interpreter: Self::default_interpreter(),
            script: Self::default_script(),
            timeout: Self::default_timeout(),
        }
    }
}
