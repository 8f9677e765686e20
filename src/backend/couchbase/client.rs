use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::info;
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

use crate::conf::CouchbaseConfig;
use crate::core::BenchError;
use crate::plan::normalize_to_ms;
use crate::stats::CacheStats;

use super::stats::{IndexStats, parse_cache_stats, parse_index_stats};

/// A N1QL statement run in the context of one scope of the configured bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct N1qlRequest {
    pub statement: String,
    pub scope: String,
    pub params: Vec<(String, Value)>,
    pub profile: bool,
}

impl N1qlRequest {
    pub fn new(statement: impl Into<String>, scope: &str) -> Self {
        Self {
            statement: statement.into(),
            scope: scope.to_string(),
            params: Vec::new(),
            profile: false,
        }
    }

    /// Request timings profile and metrics.
    pub fn profiled(mut self) -> Self {
        self.profile = true;
        self
    }

    /// Named parameter, referenced as `$name` in the statement.
    pub fn param(mut self, name: &str, value: Value) -> Self {
        self.params.push((name.to_string(), value));
        self
    }

    pub fn to_body(&self, bucket: &str, timeout: Duration) -> Value {
        let mut body = Map::new();
        body.insert("statement".into(), json!(self.statement));
        body.insert(
            "query_context".into(),
            json!(format!("default:`{bucket}`.`{}`", self.scope)),
        );
        body.insert("timeout".into(), json!(format!("{}s", timeout.as_secs())));
        body.insert("metrics".into(), json!(true));
        if self.profile {
            body.insert("profile".into(), json!("timings"));
        }
        for (name, value) in &self.params {
            body.insert(format!("${name}"), value.clone());
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct N1qlResponse {
    pub rows: Vec<Value>,
    pub execution_time_ms: Option<f64>,
    pub profile: Option<Value>,
}

impl N1qlResponse {
    /// Decodes a query service response, failing on any status but `success`.
    pub fn from_json(mut body: Value) -> Result<Self, BenchError> {
        let status = body.get("status").and_then(Value::as_str).unwrap_or("unknown");
        if status != "success" {
            let errors = body
                .get("errors")
                .map(Value::to_string)
                .unwrap_or_else(|| "no error details".to_string());
            return Err(BenchError::QueryError(format!("status {status}: {errors}")));
        }

        let rows = match body.get_mut("results").map(Value::take) {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        };
        let execution_time_ms = body
            .get("metrics")
            .and_then(|m| m.get("executionTime"))
            .and_then(Value::as_str)
            .map(normalize_to_ms);
        let profile = body.get_mut("profile").map(Value::take).filter(|p| !p.is_null());

        Ok(Self {
            rows,
            execution_time_ms,
            profile,
        })
    }
}

/// Document store operations needed by the benchmark.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Opens the connection once; returns the time the first connect took.
    async fn connect(&self) -> Result<Duration, BenchError>;

    async fn query(&self, request: &N1qlRequest) -> Result<N1qlResponse, BenchError>;

    async fn bucket_stats(&self) -> Result<CacheStats, BenchError>;

    async fn index_stats(&self) -> Result<Vec<IndexStats>, BenchError>;
}

/// [`DocumentClient`] over the query, management and index REST services.
pub struct RestClient {
    conf: CouchbaseConfig,
    http: reqwest::Client,
    connected: OnceCell<Duration>,
}

impl RestClient {
    pub fn new(conf: CouchbaseConfig) -> Result<Self, BenchError> {
        let http = reqwest::Client::builder()
            .timeout(conf.query_timeout)
            .build()
            .map_err(|e| BenchError::Connection(e.to_string()))?;
        Ok(Self {
            conf,
            http,
            connected: OnceCell::new(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, BenchError> {
        let body = self
            .http
            .get(url)
            .basic_auth(&self.conf.username, Some(&self.conf.password))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl DocumentClient for RestClient {
    async fn connect(&self) -> Result<Duration, BenchError> {
        let elapsed = self
            .connected
            .get_or_try_init(|| async {
                let start = Instant::now();
                self.http
                    .get(self.conf.ping_url())
                    .basic_auth(&self.conf.username, Some(&self.conf.password))
                    .send()
                    .await?
                    .error_for_status()?;
                let elapsed = start.elapsed();
                info!(
                    "Connected to Couchbase at {} in {} ms",
                    self.conf.host,
                    elapsed.as_millis()
                );
                Ok::<_, BenchError>(elapsed)
            })
            .await?;
        Ok(*elapsed)
    }

    async fn query(&self, request: &N1qlRequest) -> Result<N1qlResponse, BenchError> {
        self.connect().await?;
        let body = request.to_body(&self.conf.bucket, self.conf.query_timeout);
        // errors come back as JSON with a non-success status, decode either way
        let response = self
            .http
            .post(self.conf.query_url())
            .basic_auth(&self.conf.username, Some(&self.conf.password))
            .json(&body)
            .send()
            .await?
            .json::<Value>()
            .await?;
        N1qlResponse::from_json(response)
    }

    async fn bucket_stats(&self) -> Result<CacheStats, BenchError> {
        let body = self.get_json(&self.conf.bucket_stats_url()).await?;
        parse_cache_stats(&body)
    }

    async fn index_stats(&self) -> Result<Vec<IndexStats>, BenchError> {
        let body = self.get_json(&self.conf.index_stats_url()).await?;
        Ok(parse_index_stats(&body))
    }
}
