mod client;
mod stats;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::{Value, json};

use crate::core::BenchError;
use crate::model::{Backend, CacheInfo, IndexInfo, IndexSpec, Query, RunResult};
use crate::plan::render_profile;
use crate::stats::CacheSmoother;

use super::{BenchBackend, RunSample, build_result, ensure_backend};

pub use client::{DocumentClient, N1qlRequest, N1qlResponse, RestClient};
pub use stats::{
    CollectionInfo, IndexStats, format_byte_size, parse_cache_stats, parse_collections,
    parse_index_name, parse_index_stats, size_ratio,
};

const COLLECTIONS_QUERY: &str = "SELECT name, size FROM system:keyspaces_info s WHERE s.`scope` = $scope";

/// Couchbase document store driven through N1QL.
pub struct CouchbaseBackend {
    client: Arc<dyn DocumentClient>,
    smoother: CacheSmoother,
    warmup_executions: u32,
    bucket: String,
}

impl CouchbaseBackend {
    pub fn new(client: Arc<dyn DocumentClient>, smoother: CacheSmoother, warmup_executions: u32) -> Self {
        Self {
            client,
            smoother,
            warmup_executions,
            bucket: String::from("yelp_reviews"),
        }
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.bucket = bucket.to_string();
        self
    }

    fn keyspace(&self, scope: &str, collection: &str) -> String {
        format!("`{}`.`{scope}`.`{collection}`", self.bucket)
    }

    pub fn create_index_statement(&self, scope: &str, index: &IndexSpec) -> String {
        format!(
            "CREATE INDEX `{}` ON {}({})",
            index.name,
            self.keyspace(scope, &index.table),
            index.fields.join(", ")
        )
    }

    pub fn drop_index_statement(&self, scope: &str, index: &IndexSpec) -> String {
        format!(
            "DROP INDEX `{}` IF EXISTS ON {}",
            index.name,
            self.keyspace(scope, &index.table)
        )
    }

    /// Executes the statement `executions` times, keeping every reported
    /// execution time and the last profile.
    async fn execute_timed(
        &self,
        statement: &str,
        scope: &str,
        executions: u32,
    ) -> (RunSample, Option<Value>) {
        let request = N1qlRequest::new(statement, scope).profiled();
        let mut sample = RunSample::default();
        let mut profile = None;

        for i in 0..executions {
            match self.client.query(&request).await {
                Ok(response) => {
                    if let Some(ms) = response.execution_time_ms {
                        sample.latencies_ms.push(ms);
                    }
                    if response.profile.is_some() {
                        profile = response.profile;
                    }
                }
                Err(e) => warn!("Execution {} of {} failed on Couchbase: {e}", i + 1, executions),
            }
        }
        (sample, profile)
    }

    async fn collections(&self, scope: &str) -> Result<Vec<CollectionInfo>, BenchError> {
        let request = N1qlRequest::new(COLLECTIONS_QUERY, scope).param("scope", json!(scope));
        let response = self.client.query(&request).await?;
        Ok(parse_collections(&response.rows))
    }
}

#[async_trait]
impl BenchBackend for CouchbaseBackend {
    fn backend(&self) -> Backend {
        Backend::Couchbase
    }

    async fn warmup(&self, query: &Query, scope: &str) {
        info!("Warming up Couchbase for query {}", query.query_type);
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
        ensure_backend(self.backend(), query)?;
        let connection_time = self.client.connect().await?;

        self.warmup(query, scope).await;

        info!(
            "Running Couchbase query {} {executions} times in scope {scope}",
            query.query_type
        );
        debug!("{}", query.statement());
        let (sample, profile) = self.execute_timed(query.statement(), scope, executions).await;
        if sample.latencies_ms.is_empty() {
            return Err(BenchError::NoSamples(query.statement().to_string()));
        }

        let cache_info = self.cache_info(&sample, executions).await;
        let plan = profile.as_ref().map(render_profile).unwrap_or_default();
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
            let statement = self.create_index_statement(scope, index);
            debug!("{statement}");
            if let Err(e) = self.client.query(&N1qlRequest::new(statement, scope)).await {
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
            let statement = self.drop_index_statement(scope, index);
            if let Err(e) = self.client.query(&N1qlRequest::new(statement, scope)).await {
                error!("Error dropping index {}: {e}", index.name);
            }
        }
        Ok(())
    }

    async fn indexes_info(&self, scope: &str) -> Vec<IndexInfo> {
        let collections = match self.collections(scope).await {
            Ok(collections) => collections,
            Err(e) => {
                warn!("Cannot list collections of scope {scope}: {e}");
                return Vec::new();
            }
        };
        let index_stats = match self.client.index_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Cannot read index stats: {e}");
                return Vec::new();
            }
        };

        index_stats
            .iter()
            .filter(|stats| stats.scope == scope)
            .filter_map(|stats| {
                let collection = collections.iter().find(|c| c.name == stats.collection)?;
                Some(IndexInfo {
                    index_name: stats.index_name.clone(),
                    table: collection.name.clone(),
                    table_size: format_byte_size(collection.size),
                    index_size: format_byte_size(stats.disk_size),
                    size_ratio: size_ratio(stats.disk_size, collection.size),
                })
            })
            .collect()
    }

    async fn cache_info(&self, sample: &RunSample, executions: u32) -> Option<CacheInfo> {
        self.smoother
            .estimate(&sample.latencies_ms, executions, || self.client.bucket_stats())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TokioSleeper;
    use std::time::Duration;

    fn backend_with(client: Arc<dyn DocumentClient>) -> CouchbaseBackend {
        let smoother = CacheSmoother::new(Arc::new(TokioSleeper), 0, Duration::ZERO);
        CouchbaseBackend::new(client, smoother, 2)
    }

    struct Unreachable;

    #[async_trait]
    impl DocumentClient for Unreachable {
        async fn connect(&self) -> Result<std::time::Duration, BenchError> {
            Err(BenchError::Connection("refused".to_string()))
        }
        async fn query(&self, _request: &N1qlRequest) -> Result<N1qlResponse, BenchError> {
            Err(BenchError::Connection("refused".to_string()))
        }
        async fn bucket_stats(&self) -> Result<crate::stats::CacheStats, BenchError> {
            Err(BenchError::Connection("refused".to_string()))
        }
        async fn index_stats(&self) -> Result<Vec<IndexStats>, BenchError> {
            Err(BenchError::Connection("refused".to_string()))
        }
    }

    #[test]
    fn test_index_statements() {
        let backend = backend_with(Arc::new(Unreachable));
        let index = IndexSpec::new("business", &["city", "stars"], "idx_city");
        assert_eq!(
            backend.create_index_statement("yelp_small", &index),
            "CREATE INDEX `idx_city` ON `yelp_reviews`.`yelp_small`.`business`(city, stars)"
        );
        assert_eq!(
            backend.drop_index_statement("yelp", &index),
            "DROP INDEX `idx_city` IF EXISTS ON `yelp_reviews`.`yelp`.`business`"
        );
    }

    #[tokio::test]
    async fn test_unreachable_engine() {
        let backend = backend_with(Arc::new(Unreachable));
        let index = IndexSpec::new("business", &["city"], "idx_city");

        assert!(backend.create_indexes("yelp", &[]).await.is_ok());
        assert!(matches!(
            backend.create_indexes("yelp", &[index]).await,
            Err(BenchError::Connection(_))
        ));
        assert!(backend.indexes_info("yelp").await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_foreign_query() {
        let backend = backend_with(Arc::new(Unreachable));
        let query = Query::custom(Backend::Postgresql, "select 1");
        assert!(matches!(
            backend.run(&query, 1, "yelp", &[]).await,
            Err(BenchError::InvalidRequest(_))
        ));
    }
}
