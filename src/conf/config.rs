use crate::{
    conf::{BenchmarkConfig, CouchbaseConfig, PostgresConfig, ReportConfig, ServerConfig},
    core::BenchError::{self, ConfigParsingError},
};
use config::builder::DefaultState;
use config::{Config as CConfig, ConfigBuilder, Environment};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "QUERYBENCH";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub couchbase: CouchbaseConfig,
    #[serde(default = "PostgresConfig::relational")]
    pub postgres: PostgresConfig,
    #[serde(default = "PostgresConfig::jsonb")]
    pub jsonb: PostgresConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            couchbase: CouchbaseConfig::default(),
            postgres: PostgresConfig::relational(),
            jsonb: PostgresConfig::jsonb(),
            benchmark: BenchmarkConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, BenchError> {
        let config = Self::builder()?
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        return Ok(config);
    }

    /// Loads an optional TOML file, then applies `QUERYBENCH_*` environment
    /// overrides, e.g. `QUERYBENCH_POSTGRES__HOST`.
    pub fn load(path: Option<&str>) -> Result<Config, BenchError> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    fn load_with(path: Option<&str>, env: Environment) -> Result<Config, BenchError> {
        let mut builder = Self::builder()?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let config = builder
            .add_source(env)
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }

    /// The two PostgreSQL sections share one struct but not their default
    /// port, so the ports are seeded here rather than by serde.
    fn builder() -> Result<ConfigBuilder<DefaultState>, BenchError> {
        CConfig::builder()
            .set_default("postgres.port", i64::from(PostgresConfig::relational().port))
            .and_then(|b| b.set_default("jsonb.port", i64::from(PostgresConfig::jsonb().port)))
            .map_err(|e| ConfigParsingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn load_empty_toml_uses_defaults() {
        let conf = Config::from_str("").unwrap();
        assert_eq!(conf, Config::default());
    }

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [server]
        host = "127.0.0.1"
        port = 3000

        [couchbase]
        host = "cb.internal"
        bucket = "reviews"
        query_timeout = "10m"

        [jsonb]
        port = 6543
        statement_timeout = "30s"

        [benchmark]
        warmup_executions = 5
        cache_retry_delay = "250ms"
        "#;
        let conf = Config::from_str(toml).unwrap();
        assert_eq!(
            conf.server,
            ServerConfig {
                host: String::from("127.0.0.1"),
                port: 3000
            }
        );
        assert_eq!(conf.couchbase.host, "cb.internal");
        assert_eq!(conf.couchbase.bucket, "reviews");
        assert_eq!(conf.couchbase.query_timeout, Duration::from_secs(600));
        assert_eq!(conf.couchbase.query_port, 8093);
        assert_eq!(conf.postgres.port, 5433);
        assert_eq!(conf.jsonb.port, 6543);
        assert_eq!(conf.jsonb.statement_timeout, Some(Duration::from_secs(30)));
        assert_eq!(conf.benchmark.warmup_executions, 5);
        assert_eq!(conf.benchmark.cache_retry_attempts, 10);
        assert_eq!(conf.benchmark.cache_retry_delay, Duration::from_millis(250));
        assert_eq!(conf.report.timeout, Duration::from_secs(60));
    }

    #[test]
    fn partial_postgres_section_keeps_instance_port() {
        let conf = Config::from_str("[postgres]\nhost = \"db.internal\"\n\n[jsonb]\nuser = \"bench\"\n").unwrap();
        assert_eq!(conf.postgres.host, "db.internal");
        assert_eq!(conf.postgres.port, 5433);
        assert_eq!(conf.jsonb.user, "bench");
        assert_eq!(conf.jsonb.port, 5432);
        assert_eq!(conf.jsonb.host, "localhost");
    }

    #[test]
    fn environment_overrides_use_single_underscore_prefix() {
        let vars = config::Map::from([
            ("QUERYBENCH_POSTGRES__HOST".to_string(), "pg.internal".to_string()),
            ("QUERYBENCH_SERVER__PORT".to_string(), "9000".to_string()),
        ]);
        let env = Config::environment().source(Some(vars));
        let conf = Config::load_with(None, env).unwrap();
        assert_eq!(conf.postgres.host, "pg.internal");
        assert_eq!(conf.postgres.port, 5433);
        assert_eq!(conf.server.port, 9000);
        assert_eq!(conf.jsonb, PostgresConfig::jsonb());
    }

    #[test]
    fn reject_unknown_section() {
        let toml = r#"
        [mongodb]
        port = 27017
        "#;
        assert!(matches!(
            Config::from_str(toml),
            Err(BenchError::ConfigParsingError(_))
        ));
    }
}
