//! HTML report generation through an external script.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;

use crate::conf::ReportConfig;
use crate::core::BenchError;

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Renders a benchmark result document into an HTML page.
    async fn render(&self, benchmark_json: &str) -> Result<String, BenchError>;
}

/// Runs `interpreter script <input.json> <output.html>` and returns the output.
pub struct ScriptRenderer {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptRenderer {
    pub fn new(conf: &ReportConfig) -> Self {
        Self {
            interpreter: conf.interpreter.clone(),
            script: conf.script.clone(),
            timeout: conf.timeout,
        }
    }
}

#[async_trait]
impl ReportRenderer for ScriptRenderer {
    async fn render(&self, benchmark_json: &str) -> Result<String, BenchError> {
        let input = tempfile::Builder::new()
            .prefix("benchmark_data_")
            .suffix(".json")
            .tempfile()?;
        let output = tempfile::Builder::new()
            .prefix("benchmark_report_")
            .suffix(".html")
            .tempfile()?;
        tokio::fs::write(input.path(), benchmark_json).await?;

        info!("Generating report with {}", self.script.display());
        let child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(input.path())
            .arg(output.path())
            .kill_on_drop(true)
            .output();

        // dropping the timed-out future kills the child
        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                BenchError::ReportError(format!(
                    "report generation timed out after {} s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| BenchError::ReportError(format!("cannot start {}: {e}", self.interpreter)))?;

        debug!("report script stdout: {}", String::from_utf8_lossy(&result.stdout));
        if !result.status.success() {
            return Err(BenchError::ReportError(format!(
                "report generation failed with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let html = tokio::fs::read_to_string(output.path()).await?;
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn renderer(script_body: &str, timeout: Duration) -> (ScriptRenderer, tempfile::NamedTempFile) {
        let mut script = tempfile::Builder::new().suffix(".sh").tempfile().unwrap();
        script.write_all(script_body.as_bytes()).unwrap();
        let renderer = ScriptRenderer {
            interpreter: "sh".to_string(),
            script: script.path().to_path_buf(),
            timeout,
        };
        (renderer, script)
    }

    #[tokio::test]
    async fn test_render_reads_output_file() {
        let (renderer, _script) = renderer(
            "printf '<html>' > \"$2\"; cat \"$1\" >> \"$2\"; printf '</html>' >> \"$2\"\n",
            Duration::from_secs(10),
        );
        let html = renderer.render("{\"ok\":true}").await.unwrap();
        assert_eq!(html, "<html>{\"ok\":true}</html>");
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let (renderer, _script) = renderer("echo broken >&2; exit 3\n", Duration::from_secs(10));
        let err = renderer.render("{}").await.unwrap_err();
        assert!(matches!(err, BenchError::ReportError(msg) if msg.contains("broken")));
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        let (renderer, _script) = renderer("sleep 5\n", Duration::from_millis(200));
        let err = renderer.render("{}").await.unwrap_err();
        assert!(matches!(err, BenchError::ReportError(msg) if msg.contains("timed out")));
    }
}
