use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the document store and its REST services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CouchbaseConfig {
    #[serde(default = "CouchbaseConfig::default_host")]
    pub host: String,
    #[serde(default = "CouchbaseConfig::default_username")]
    pub username: String,
    #[serde(default = "CouchbaseConfig::default_password")]
    pub password: String,
    #[serde(default = "CouchbaseConfig::default_bucket")]
    pub bucket: String,
    #[serde(default = "CouchbaseConfig::default_query_port")]
    pub query_port: u16,
    #[serde(default = "CouchbaseConfig::default_management_port")]
    pub management_port: u16,
    #[serde(default = "CouchbaseConfig::default_index_stats_port")]
    pub index_stats_port: u16,
    #[serde(
        with = "humantime_serde",
        default = "CouchbaseConfig::default_query_timeout"
    )]
    pub query_timeout: Duration,
}

impl CouchbaseConfig {
    fn default_host() -> String {
        String::from("127.0.0.1")
    }

    fn default_username() -> String {
        String::from("Administrator")
    }

    fn default_password() -> String {
        String::from("password")
    }

    fn default_bucket() -> String {
        String::from("yelp_reviews")
    }

    fn default_query_port() -> u16 {
        8093
    }

    fn default_management_port() -> u16 {
        8091
    }

    fn default_index_stats_port() -> u16 {
        9102
    }

    fn default_query_timeout() -> Duration {
        Duration::from_secs(180 * 60)
    }

    pub fn query_url(&self) -> String {
        format!("http://{}:{}/query/service", self.host, self.query_port)
    }

    pub fn ping_url(&self) -> String {
        format!("http://{}:{}/admin/ping", self.host, self.query_port)
    }

    pub fn bucket_stats_url(&self) -> String {
        format!(
            "http://{}:{}/pools/default/buckets/{}/stats",
            self.host, self.management_port, self.bucket
        )
    }

    pub fn index_stats_url(&self) -> String {
        format!(
            "http://{}:{}/api/v1/stats/{}",
            self.host, self.index_stats_port, self.bucket
        )
    }
}

impl Default for CouchbaseConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            username: Self::default_username(),
            password: Self::default_password(),
            bucket: Self::default_bucket(),
            query_port: Self::default_query_port(),
            management_port: Self::default_management_port(),
            index_stats_port: Self::default_index_stats_port(),
            query_timeout: Self::default_query_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let conf = CouchbaseConfig::default();
        assert_eq!(conf.query_url(), "http://127.0.0.1:8093/query/service");
        assert_eq!(
            conf.bucket_stats_url(),
            "http://127.0.0.1:8091/pools/default/buckets/yelp_reviews/stats"
        );
        assert_eq!(
            conf.index_stats_url(),
            "http://127.0.0.1:9102/api/v1/stats/yelp_reviews"
        );
    }
}
