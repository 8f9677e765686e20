use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::backend::TimedExecution;
use crate::conf::PostgresConfig;
use crate::core::BenchError;
use crate::model::IndexInfo;
use crate::plan::execution_time_ms;

use super::dialect::quote_ident;

const INDEX_STATS_QUERY: &str = "
SELECT
    i.indexrelname::text AS index_name,
    t.relname::text AS table_name,
    pg_size_pretty(pg_relation_size(i.indexrelid)) AS index_size,
    pg_size_pretty(pg_table_size(quote_ident(t.schemaname) || '.' || quote_ident(t.relname))) AS table_size,
    ROUND((pg_relation_size(i.indexrelid)::numeric /
           NULLIF(pg_table_size(quote_ident(t.schemaname) || '.' || quote_ident(t.relname)), 0)::numeric) * 100, 2)::float8
        AS index_ratio_percent
FROM pg_stat_all_indexes i
JOIN pg_stat_all_tables t ON i.relid = t.relid
WHERE t.schemaname = $1
ORDER BY t.relname";

/// SQL operations needed by the benchmark.
#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Opens the connection once; returns the time the first connect took.
    async fn connect(&self) -> Result<Duration, BenchError>;

    /// Runs `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` for the statement.
    async fn explain_analyze(&self, scope: &str, sql: &str) -> Result<TimedExecution, BenchError>;

    async fn execute(&self, scope: &str, sql: &str) -> Result<(), BenchError>;

    async fn index_stats(&self, scope: &str) -> Result<Vec<IndexInfo>, BenchError>;
}

/// [`SqlClient`] over a single lazily opened `tokio-postgres` connection,
/// reopened when the server closes it.
pub struct PgClient {
    conf: PostgresConfig,
    conn: Mutex<Option<(Arc<Client>, Duration)>>,
}

impl PgClient {
    pub fn new(conf: PostgresConfig) -> Self {
        Self {
            conf,
            conn: Mutex::new(None),
        }
    }

    async fn client(&self) -> Result<(Arc<Client>, Duration), BenchError> {
        let mut conn = self.conn.lock().await;
        if let Some((client, elapsed)) = conn.as_ref() {
            if !client.is_closed() {
                return Ok((client.clone(), *elapsed));
            }
            warn!("PostgreSQL connection on port {} was closed, reconnecting", self.conf.port);
        }

        let opened = self.open().await?;
        *conn = Some(opened.clone());
        Ok(opened)
    }

    async fn open(&self) -> Result<(Arc<Client>, Duration), BenchError> {
        let start = Instant::now();
        let (client, connection) = self
            .conf
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| BenchError::Connection(e.to_string()))?;
        let elapsed = start.elapsed();

        let port = self.conf.port;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection on port {port} closed: {e}");
            }
        });

        if let Some(timeout) = self.conf.statement_timeout {
            client
                .batch_execute(&format!("SET statement_timeout = {}", timeout.as_millis()))
                .await?;
        }
        info!(
            "Connected to PostgreSQL at {}:{} in {} ms",
            self.conf.host,
            port,
            elapsed.as_millis()
        );
        Ok((Arc::new(client), elapsed))
    }

    /// Connection with `search_path` set to the scope.
    async fn scoped(&self, scope: &str) -> Result<Arc<Client>, BenchError> {
        let (client, _) = self.client().await?;
        client
            .batch_execute(&format!("SET search_path TO {}", quote_ident(scope)))
            .await?;
        Ok(client)
    }
}

#[async_trait]
impl SqlClient for PgClient {
    async fn connect(&self) -> Result<Duration, BenchError> {
        Ok(self.client().await?.1)
    }

    async fn explain_analyze(&self, scope: &str, sql: &str) -> Result<TimedExecution, BenchError> {
        let client = self.scoped(scope).await?;
        let messages = client
            .simple_query(&format!("EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON) {sql}"))
            .await?;

        let raw = messages
            .iter()
            .find_map(|m| match m {
                SimpleQueryMessage::Row(row) => row.get(0),
                _ => None,
            })
            .ok_or_else(|| BenchError::QueryError("EXPLAIN returned no rows".to_string()))?;
        let profile: Value = serde_json::from_str(raw)?;

        Ok(TimedExecution {
            duration_ms: execution_time_ms(&profile),
            profile: Some(profile),
        })
    }

    async fn execute(&self, scope: &str, sql: &str) -> Result<(), BenchError> {
        self.scoped(scope).await?.batch_execute(sql).await?;
        Ok(())
    }

    async fn index_stats(&self, scope: &str) -> Result<Vec<IndexInfo>, BenchError> {
        let client = self.scoped(scope).await?;
        let rows = client.query(INDEX_STATS_QUERY, &[&scope]).await?;
        rows.iter()
            .map(|row| -> Result<IndexInfo, BenchError> {
                Ok(IndexInfo {
                    index_name: row.try_get("index_name")?,
                    table: row.try_get("table_name")?,
                    index_size: row.try_get("index_size")?,
                    table_size: row.try_get("table_size")?,
                    size_ratio: row
                        .try_get::<_, Option<f64>>("index_ratio_percent")?
                        .unwrap_or(0.0),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        // nothing listens on port 1
        let mut conf = PostgresConfig::relational();
        conf.host = String::from("127.0.0.1");
        conf.port = 1;
        let client = PgClient::new(conf);

        for _ in 0..2 {
            assert!(matches!(
                client.connect().await,
                Err(BenchError::Connection(_))
            ));
        }
        assert!(client.conn.lock().await.is_none());
    }
}
