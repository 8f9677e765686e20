use std::collections::HashMap;
use std::sync::Arc;

use crate::conf::Config;
use crate::core::BenchError;
use crate::model::Backend;
use crate::stats::{CacheSmoother, TokioSleeper};

use super::BenchBackend;
use super::couchbase::{CouchbaseBackend, RestClient};
use super::postgres::{PgClient, PostgresBackend, SqlDialect};

/// One long-lived backend instance per engine, built once at start-up.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<Backend, Arc<dyn BenchBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Production backends. Connections are opened lazily on first use.
    pub fn from_config(config: &Config) -> Result<Self, BenchError> {
        let bench = &config.benchmark;
        let smoother = CacheSmoother::new(
            Arc::new(TokioSleeper),
            bench.cache_retry_attempts,
            bench.cache_retry_delay,
        );

        let couchbase = CouchbaseBackend::new(
            Arc::new(RestClient::new(config.couchbase.clone())?),
            smoother,
            bench.warmup_executions,
        )
        .with_bucket(&config.couchbase.bucket);
        let relational = PostgresBackend::new(
            Backend::Postgresql,
            SqlDialect::Relational,
            Arc::new(PgClient::new(config.postgres.clone())),
            bench.warmup_executions,
        );
        let jsonb = PostgresBackend::new(
            Backend::PostgresqlJsonb,
            SqlDialect::Jsonb,
            Arc::new(PgClient::new(config.jsonb.clone())),
            bench.warmup_executions,
        );

        Ok(Self::new()
            .with(Arc::new(couchbase))
            .with(Arc::new(relational))
            .with(Arc::new(jsonb)))
    }

    pub fn with(mut self, backend: Arc<dyn BenchBackend>) -> Self {
        self.backends.insert(backend.backend(), backend);
        self
    }

    pub fn get(&self, backend: Backend) -> Option<Arc<dyn BenchBackend>> {
        self.backends.get(&backend).cloned()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
