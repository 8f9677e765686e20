use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BenchError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("No query registered for {backend} / {query}")]
    UnknownQuery { backend: String, query: String },
    #[error("Unknown workload: {0}")]
    UnknownWorkload(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    QueryError(String),
    #[error("No successful executions for query: {0}")]
    NoSamples(String),
    #[error("Stats error: {0}")]
    StatsError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Report error: {0}")]
    ReportError(String),
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::IoError(err.to_string())
    }
}

impl From<tokio_postgres::Error> for BenchError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            BenchError::Connection(err.to_string())
        } else {
            BenchError::QueryError(err.to_string())
        }
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            BenchError::Connection(err.to_string())
        } else {
            BenchError::QueryError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::QueryError(format!("invalid JSON: {err}"))
    }
}
