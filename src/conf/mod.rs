mod benchmark;
mod config;
mod couchbase;
mod postgres;
mod report;
mod server;

pub use benchmark::BenchmarkConfig;
pub use config::Config;
pub use couchbase::CouchbaseConfig;
pub use postgres::PostgresConfig;
pub use report::ReportConfig;
pub use server::ServerConfig;
