//! Per-engine benchmark execution.
//!
//! Every engine family implements [`BenchBackend`]; the orchestrator only
//! talks to this trait and never to a driver directly.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::BenchError;
use crate::model::{Backend, CacheInfo, IndexInfo, IndexSpec, Query, RunResult};
use crate::stats::LatencyStats;

pub mod couchbase;
pub mod postgres;
mod registry;

pub use registry::BackendRegistry;

/// Outcome of one timed execution as reported by a driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimedExecution {
    pub duration_ms: Option<f64>,
    pub profile: Option<Value>,
}

/// Raw measurements of one `run` call. Never outlives it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSample {
    pub latencies_ms: Vec<f64>,
    pub shared_hit_blocks: i64,
    pub shared_read_blocks: i64,
}

#[async_trait]
pub trait BenchBackend: Send + Sync {
    fn backend(&self) -> Backend;

    /// Primes caches; timings are discarded and failures only logged.
    async fn warmup(&self, query: &Query, scope: &str);

    /// Warms up, executes `executions` times and summarizes the run.
    async fn run(
        &self,
        query: &Query,
        executions: u32,
        scope: &str,
        indexes: &[IndexSpec],
    ) -> Result<RunResult, BenchError>;

    async fn create_indexes(&self, scope: &str, indexes: &[IndexSpec]) -> Result<(), BenchError>;

    async fn drop_indexes(&self, scope: &str, indexes: &[IndexSpec]) -> Result<(), BenchError>;

    /// Index metadata as observed by the engine, empty on failure.
    async fn indexes_info(&self, scope: &str) -> Vec<IndexInfo>;

    async fn cache_info(&self, sample: &RunSample, executions: u32) -> Option<CacheInfo>;
}

/// Rejects queries written for another engine.
pub(crate) fn ensure_backend(backend: Backend, query: &Query) -> Result<(), BenchError> {
    if query.backend != backend {
        return Err(BenchError::InvalidRequest(format!(
            "{} query cannot run on {}",
            query.backend, backend
        )));
    }
    Ok(())
}

pub(crate) fn build_result(
    query: &Query,
    sample: &RunSample,
    explain_plan: String,
    initial_connection_ms: u64,
    cache_info: Option<CacheInfo>,
) -> Result<RunResult, BenchError> {
    let stats = LatencyStats::from_samples(&sample.latencies_ms)
        .map_err(|_| BenchError::NoSamples(query.statement().to_string()))?;
    Ok(RunResult {
        query: query.text.clone(),
        avg_execution_time: stats.mean,
        query_per_second: stats.tps,
        explain_plan,
        initial_connection_time: initial_connection_ms,
        standard_deviation: stats.std_dev,
        variance: stats.variance,
        percentile95: stats.p95,
        cache_info,
    })
}
