use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    #[serde(default = "PostgresConfig::default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "PostgresConfig::default_database")]
    pub database: String,
    #[serde(default = "PostgresConfig::default_user")]
    pub user: String,
    #[serde(default = "PostgresConfig::default_password")]
    pub password: String,
    #[serde(default, with = "humantime_serde")]
    pub statement_timeout: Option<Duration>,
}

impl PostgresConfig {
    fn default_host() -> String {
        String::from("localhost")
    }

    fn default_database() -> String {
        String::from("postgres")
    }

    fn default_user() -> String {
        String::from("postgres")
    }

    fn default_password() -> String {
        String::from("postgres")
    }

    pub fn with_port(port: u16) -> Self {
        Self {
            host: Self::default_host(),
            port,
            database: Self::default_database(),
            user: Self::default_user(),
            password: Self::default_password(),
            statement_timeout: None,
        }
    }

    /// Relational (normalized) schema instance.
    pub fn relational() -> Self {
        Self::with_port(5433)
    }

    /// JSONB document-in-table instance.
    pub fn jsonb() -> Self {
        Self::with_port(5432)
    }

    /// Driver settings built field by field, so no value needs quoting.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password);
        pg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(PostgresConfig::relational().port, 5433);
        assert_eq!(PostgresConfig::jsonb().port, 5432);
    }

    #[test]
    fn test_pg_config_keeps_raw_values() {
        let mut conf = PostgresConfig::jsonb();
        conf.password = String::from("it's a secret");
        conf.database = String::from("yelp db");
        let pg = conf.pg_config();
        assert_eq!(pg.get_ports(), &[5432]);
        assert_eq!(pg.get_user(), Some("postgres"));
        assert_eq!(pg.get_dbname(), Some("yelp db"));
        assert_eq!(pg.get_password(), Some("it's a secret".as_bytes()));
        assert_eq!(
            pg.get_hosts(),
            &[tokio_postgres::config::Host::Tcp("localhost".to_string())]
        );
    }
}
