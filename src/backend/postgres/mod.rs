mod client;
mod dialect;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::core::BenchError;
use crate::model::{Backend, CacheInfo, IndexInfo, IndexSpec, Query, RunResult};
use crate::plan::{parse_plan, render_plan};

use super::{BenchBackend, RunSample, build_result, ensure_backend};

pub use client::{PgClient, SqlClient};
pub use dialect::{SqlDialect, quote_ident, quote_literal};

/// PostgreSQL backend, relational or JSONB depending on the dialect.
pub struct PostgresBackend {
    backend: Backend,
    dialect: SqlDialect,
    client: Arc<dyn SqlClient>,
    warmup_executions: u32,
}

impl PostgresBackend {
    pub fn new(
        backend: Backend,
        dialect: SqlDialect,
        client: Arc<dyn SqlClient>,
        warmup_executions: u32,
    ) -> Self {
        Self {
            backend,
            dialect,
            client,
            warmup_executions,
        }
    }

    /// Runs EXPLAIN ANALYZE `executions` times. Block counters of the root
    /// plan node are summed over this call only.
    async fn execute_timed(
        &self,
        statement: &str,
        scope: &str,
        executions: u32,
    ) -> (RunSample, Option<Value>) {
        let mut sample = RunSample::default();
        let mut profile = None;

        for i in 0..executions {
            match self.client.explain_analyze(scope, statement).await {
                Ok(execution) => {
                    if let Some(ms) = execution.duration_ms {
                        sample.latencies_ms.push(ms);
                    }
                    if let Some(root) = execution.profile.as_ref().and_then(parse_plan) {
                        sample.shared_hit_blocks += root.shared_hit_blocks;
                        sample.shared_read_blocks += root.shared_read_blocks;
                    }
                    if execution.profile.is_some() {
                        profile = execution.profile;
                    }
                }
                Err(e) => warn!(
                    "Execution {} of {} failed on {}: {e}",
                    i + 1,
                    executions,
                    self.backend
                ),
            }
        }
        (sample, profile)
    }
}

/// Average blocks per execution and the hit percentage.
pub fn block_cache_info(sample: &RunSample, executions: u32) -> Option<CacheInfo> {
    if executions == 0 {
        return None;
    }
    let n = executions as i64;
    let hit = sample.shared_hit_blocks / n;
    let read = sample.shared_read_blocks / n;
    let ratio = if hit > 0 { hit * 100 / (hit + read) } else { 0 };
    Some(CacheInfo::new(hit, read, ratio as i32))
}

#[async_trait]
impl BenchBackend for PostgresBackend {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn warmup(&self, query: &Query, scope: &str) {
        info!("Warming up {} for query {}", self.backend, query.query_type);
        let (sample, _) = self
            .execute_timed(query.statement(), scope, self.warmup_executions)
            .await;
        if sample.latencies_ms.is_empty() {
            warn!("Warmup produced no timings for {}", query.query_type);
            return;
        }
        let avg = sample.latencies_ms.iter().sum::<f64>() / sample.latencies_ms.len() as f64;
        info!("Warmup completed. Average latency: {avg:.2} ms");
    }

    async fn run(
        &self,
        query: &Query,
        executions: u32,
        scope: &str,
        _indexes: &[IndexSpec],
    ) -> Result<RunResult, BenchError> {
        ensure_backend(self.backend, query)?;
        let connection_time = self.client.connect().await?;

        self.warmup(query, scope).await;

        info!(
            "Running {} query {} {executions} times in scope {scope}",
            self.backend, query.query_type
        );
        debug!("{}", query.statement());
        let (sample, profile) = self.execute_timed(query.statement(), scope, executions).await;
        if sample.latencies_ms.is_empty() {
            return Err(BenchError::NoSamples(query.statement().to_string()));
        }

        let cache_info = self.cache_info(&sample, executions).await;
        let plan = profile.as_ref().map(render_plan).unwrap_or_default();
        let result = build_result(
            query,
            &sample,
            plan,
            connection_time.as_millis() as u64,
            cache_info,
        )?;
        info!(
            "Query benchmarking completed. Average latency: {} ms",
            result.avg_execution_time
        );
        Ok(result)
    }

    async fn create_indexes(&self, scope: &str, indexes: &[IndexSpec]) -> Result<(), BenchError> {
        if indexes.is_empty() {
            info!("No indexes to create in scope {scope}");
            return Ok(());
        }
        self.client.connect().await?;

        info!("Creating {} indexes in scope {scope}", indexes.len());
        for index in indexes {
            let statement = self.dialect.create_index(index);
            debug!("{statement}");
            if let Err(e) = self.client.execute(scope, &statement).await {
                error!("Error creating index {}: {e}", index.name);
            }
        }
        Ok(())
    }

    async fn drop_indexes(&self, scope: &str, indexes: &[IndexSpec]) -> Result<(), BenchError> {
        if indexes.is_empty() {
            info!("No indexes to drop in scope {scope}");
            return Ok(());
        }
        self.client.connect().await?;

        info!("Dropping {} indexes in scope {scope}", indexes.len());
        for index in indexes {
            if let Err(e) = self.client.execute(scope, &self.dialect.drop_index(index)).await {
                error!("Error dropping index {}: {e}", index.name);
            }
        }
        Ok(())
    }

    async fn indexes_info(&self, scope: &str) -> Vec<IndexInfo> {
        match self.client.index_stats(scope).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Cannot read index stats of {scope}: {e}");
                Vec::new()
            }
        }
    }

    async fn cache_info(&self, sample: &RunSample, executions: u32) -> Option<CacheInfo> {
        block_cache_info(sample, executions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hit: i64, read: i64) -> RunSample {
        RunSample {
            latencies_ms: vec![1.0],
            shared_hit_blocks: hit,
            shared_read_blocks: read,
        }
    }

    #[test]
    fn test_block_cache_info() {
        assert_eq!(
            block_cache_info(&sample(300, 100), 10),
            Some(CacheInfo::new(30, 10, 75))
        );
        assert_eq!(
            block_cache_info(&sample(0, 50), 5),
            Some(CacheInfo::new(0, 10, 0))
        );
        assert_eq!(
            block_cache_info(&sample(0, 0), 5),
            Some(CacheInfo::new(0, 0, 0))
        );
        assert_eq!(block_cache_info(&sample(10, 10), 0), None);
    }

    #[test]
    fn test_block_counts_truncate() {
        // 29 / 10 = 2 hits, 1 / 10 = 0 reads
        assert_eq!(
            block_cache_info(&sample(29, 1), 10),
            Some(CacheInfo::new(2, 0, 100))
        );
    }
}
