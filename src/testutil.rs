//! Test and benchmark utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backend::couchbase::{DocumentClient, IndexStats, N1qlRequest, N1qlResponse};
use crate::backend::postgres::SqlClient;
use crate::backend::{BenchBackend, RunSample, TimedExecution};
use crate::core::BenchError;
use crate::model::{
    Backend, CacheInfo, IndexInfo, IndexSpec, Query, QueryCatalog, QueryType, RunResult,
};
use crate::stats::{CacheStats, Sleeper};

/// A catalog with one trivial statement per backend and query type.
pub fn full_catalog() -> QueryCatalog {
    let mut catalog = QueryCatalog::default();
    for backend in Backend::ALL {
        for query_type in QueryType::ALL {
            catalog.insert(backend, query_type, format!("{} {}", backend.id(), query_type.id()));
        }
    }
    catalog
}

/// EXPLAIN ANALYZE document with a single root node.
pub fn explain_doc(execution_ms: f64, hit_blocks: i64, read_blocks: i64) -> Value {
    json!([{
        "Plan": {
            "Node Type": "Seq Scan",
            "Relation Name": "business",
            "Actual Total Time": execution_ms,
            "Actual Loops": 1,
            "Plan Rows": 10,
            "Actual Rows": 10,
            "Total Cost": 12.5,
            "Shared Hit Blocks": hit_blocks,
            "Shared Read Blocks": read_blocks
        },
        "Planning Time": 0.1,
        "Execution Time": execution_ms
    }])
}

/// Couchbase timings profile with one scan under an authorize operator.
pub fn profile_doc() -> Value {
    json!({
        "executionTimings": {
            "#operator": "Authorize",
            "#stats": {"execTime": "1.2µs", "servTime": "0s"},
            "~child": {
                "#operator": "Sequence",
                "~children": [
                    {
                        "#operator": "PrimaryScan3",
                        "#stats": {"execTime": "2ms", "servTime": "1.5ms", "#itemsOut": 10}
                    }
                ]
            }
        }
    })
}

/// A bucket stats snapshot where every sample of the minute carries `value`.
pub fn flat_cache_stats(ops: f64, miss_rate: f64, bg_fetched: f64) -> CacheStats {
    CacheStats {
        resident_items_rate: vec![100.0; 60],
        cache_miss_rate: vec![miss_rate; 60],
        bg_fetches: vec![bg_fetched; 60],
        ops: vec![ops; 60],
    }
}

/// What a [`MockBackend`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CreateIndexes { scope: String, names: Vec<String> },
    Run { query_type: QueryType, executions: u32, scope: String },
    IndexesInfo { scope: String },
    DropIndexes { scope: String, names: Vec<String> },
}

/// In-memory backend recording every call. Runs succeed with a fixed latency
/// unless the query type is listed as failing.
pub struct MockBackend {
    backend: Backend,
    latency_ms: f64,
    failing: Vec<QueryType>,
    fail_create: bool,
    events: Mutex<Vec<BackendEvent>>,
}

impl MockBackend {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            latency_ms: 5.0,
            failing: Vec::new(),
            fail_create: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn failing_on(mut self, query_type: QueryType) -> Self {
        self.failing.push(query_type);
        self
    }

    pub fn failing_index_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(query_type, executions)` of every run call.
    pub fn runs(&self) -> Vec<(QueryType, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::Run {
                    query_type,
                    executions,
                    ..
                } => Some((query_type, executions)),
                _ => None,
            })
            .collect()
    }

    pub fn drop_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::DropIndexes { .. }))
            .count()
    }

    fn record(&self, event: BackendEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn names(indexes: &[IndexSpec]) -> Vec<String> {
    indexes.iter().map(|i| i.name.clone()).collect()
}

#[async_trait]
impl BenchBackend for MockBackend {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn warmup(&self, _query: &Query, _scope: &str) {}

    async fn run(
        &self,
        query: &Query,
        executions: u32,
        scope: &str,
        _indexes: &[IndexSpec],
    ) -> Result<RunResult, BenchError> {
        self.record(BackendEvent::Run {
            query_type: query.query_type,
            executions,
            scope: scope.to_string(),
        });
        if self.failing.contains(&query.query_type) {
            return Err(BenchError::QueryError(format!("{} failed", query.query_type)));
        }
        Ok(RunResult {
            query: query.text.clone(),
            avg_execution_time: self.latency_ms,
            query_per_second: 1000.0 / self.latency_ms,
            explain_plan: format!("Mock Scan - {} ms\n", self.latency_ms),
            initial_connection_time: 1,
            standard_deviation: 0.0,
            variance: 0.0,
            percentile95: self.latency_ms,
            cache_info: Some(CacheInfo::new(executions as i64, 0, 100)),
        })
    }

    async fn create_indexes(&self, scope: &str, indexes: &[IndexSpec]) -> Result<(), BenchError> {
        self.record(BackendEvent::CreateIndexes {
            scope: scope.to_string(),
            names: names(indexes),
        });
        if self.fail_create {
            return Err(BenchError::Connection("engine unreachable".to_string()));
        }
        Ok(())
    }

    async fn drop_indexes(&self, scope: &str, indexes: &[IndexSpec]) -> Result<(), BenchError> {
        self.record(BackendEvent::DropIndexes {
            scope: scope.to_string(),
            names: names(indexes),
        });
        Ok(())
    }

    async fn indexes_info(&self, scope: &str) -> Vec<IndexInfo> {
        self.record(BackendEvent::IndexesInfo {
            scope: scope.to_string(),
        });
        vec![IndexInfo {
            index_name: "mock_idx".to_string(),
            table: "business".to_string(),
            table_size: "1 MB".to_string(),
            index_size: "100 KB".to_string(),
            size_ratio: 9.77,
        }]
    }

    async fn cache_info(&self, _sample: &RunSample, _executions: u32) -> Option<CacheInfo> {
        None
    }
}

/// [`SqlClient`] answering every EXPLAIN with the same document. Calls whose
/// 1-based position is listed in `failing_calls` return an error, as do
/// statements containing one of `failing_statements`.
pub struct MockSqlClient {
    explain: Value,
    failing_calls: Vec<u32>,
    failing_statements: Vec<String>,
    index_stats: Vec<IndexInfo>,
    calls: AtomicU32,
    statements: Mutex<Vec<String>>,
}

impl MockSqlClient {
    pub fn new(explain: Value) -> Self {
        Self {
            explain,
            failing_calls: Vec::new(),
            failing_statements: Vec::new(),
            index_stats: Vec::new(),
            calls: AtomicU32::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_calls(mut self, calls: &[u32]) -> Self {
        self.failing_calls = calls.to_vec();
        self
    }

    pub fn failing_statement(mut self, fragment: &str) -> Self {
        self.failing_statements.push(fragment.to_string());
        self
    }

    pub fn with_index_stats(mut self, stats: Vec<IndexInfo>) -> Self {
        self.index_stats = stats;
        self
    }

    /// Statements passed to `execute`, i.e. index DDL, failed ones included.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn explain_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlClient for MockSqlClient {
    async fn connect(&self) -> Result<Duration, BenchError> {
        Ok(Duration::from_millis(7))
    }

    async fn explain_analyze(&self, _scope: &str, _sql: &str) -> Result<TimedExecution, BenchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_calls.contains(&call) {
            return Err(BenchError::QueryError(format!("call {call} failed")));
        }
        Ok(TimedExecution {
            duration_ms: crate::plan::execution_time_ms(&self.explain),
            profile: Some(self.explain.clone()),
        })
    }

    async fn execute(&self, _scope: &str, sql: &str) -> Result<(), BenchError> {
        self.statements.lock().unwrap().push(sql.to_string());
        if self.failing_statements.iter().any(|f| sql.contains(f.as_str())) {
            return Err(BenchError::QueryError(format!("rejected: {sql}")));
        }
        Ok(())
    }

    async fn index_stats(&self, _scope: &str) -> Result<Vec<IndexInfo>, BenchError> {
        Ok(self.index_stats.clone())
    }
}

/// [`DocumentClient`] with a fixed execution time per query. Bucket stats are
/// served in order, the last snapshot repeating once the queue runs dry.
pub struct MockDocumentClient {
    execution_time: String,
    profile: Value,
    bucket_stats: Mutex<VecDeque<CacheStats>>,
    index_stats: Vec<IndexStats>,
    collections: HashMap<String, u64>,
    failing_statements: Vec<String>,
    stats_fetches: AtomicU32,
    statements: Mutex<Vec<String>>,
}

impl MockDocumentClient {
    pub fn new(execution_time: &str) -> Self {
        Self {
            execution_time: execution_time.to_string(),
            profile: profile_doc(),
            bucket_stats: Mutex::new(VecDeque::new()),
            index_stats: Vec::new(),
            collections: HashMap::new(),
            failing_statements: Vec::new(),
            stats_fetches: AtomicU32::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bucket_stats(self, snapshots: Vec<CacheStats>) -> Self {
        *self.bucket_stats.lock().unwrap() = snapshots.into();
        self
    }

    pub fn with_index(mut self, scope: &str, collection: &str, name: &str, disk_size: u64) -> Self {
        self.index_stats.push(IndexStats {
            scope: scope.to_string(),
            collection: collection.to_string(),
            index_name: name.to_string(),
            disk_size,
        });
        self
    }

    pub fn with_collection(mut self, name: &str, size: u64) -> Self {
        self.collections.insert(name.to_string(), size);
        self
    }

    /// Non-profiled statements containing `fragment` fail with a query error.
    pub fn failing_statement(mut self, fragment: &str) -> Self {
        self.failing_statements.push(fragment.to_string());
        self
    }

    pub fn stats_fetches(&self) -> u32 {
        self.stats_fetches.load(Ordering::SeqCst)
    }

    /// Statements that were not profiled benchmark executions, failed ones included.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentClient for MockDocumentClient {
    async fn connect(&self) -> Result<Duration, BenchError> {
        Ok(Duration::from_millis(12))
    }

    async fn query(&self, request: &N1qlRequest) -> Result<N1qlResponse, BenchError> {
        if request.profile {
            return N1qlResponse::from_json(json!({
                "status": "success",
                "results": [],
                "metrics": {"executionTime": self.execution_time},
                "profile": self.profile
            }));
        }

        self.statements.lock().unwrap().push(request.statement.clone());
        if self
            .failing_statements
            .iter()
            .any(|f| request.statement.contains(f.as_str()))
        {
            return Err(BenchError::QueryError(format!("rejected: {}", request.statement)));
        }
        let rows = if request.statement.contains("system:keyspaces_info") {
            self.collections
                .iter()
                .map(|(name, size)| json!({"name": name, "size": size}))
                .collect()
        } else {
            Vec::new()
        };
        Ok(N1qlResponse {
            rows,
            execution_time_ms: None,
            profile: None,
        })
    }

    async fn bucket_stats(&self) -> Result<CacheStats, BenchError> {
        self.stats_fetches.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.bucket_stats.lock().unwrap();
        let stats = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        stats.ok_or_else(|| BenchError::StatsError("no bucket stats".to_string()))
    }

    async fn index_stats(&self) -> Result<Vec<IndexStats>, BenchError> {
        Ok(self.index_stats.clone())
    }
}

/// [`Sleeper`] that returns immediately and counts its calls.
#[derive(Default)]
pub struct CountingSleeper {
    calls: AtomicU32,
}

impl CountingSleeper {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for CountingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
