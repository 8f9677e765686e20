use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use config::Config as CConfig;
use serde::{Deserialize, Serialize};

use crate::core::BenchError;
use crate::model::Backend;

const EMBEDDED_CATALOG: &str = include_str!("../../resources/queries.toml");

/// A named query shape, shared by all backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    FilterIsMissing,
    Filter4,
    Array,
    Nest,
    NestAgg,
    Unnest,
    UnnestGroupBy,
    Agg,
    Select,
    Filter,
    Join1,
    JoinFilter,
    Custom,
    ImbricationFilter,
}

impl QueryType {
    pub const ALL: [QueryType; 14] = [
        QueryType::FilterIsMissing,
        QueryType::Filter4,
        QueryType::Array,
        QueryType::Nest,
        QueryType::NestAgg,
        QueryType::Unnest,
        QueryType::UnnestGroupBy,
        QueryType::Agg,
        QueryType::Select,
        QueryType::Filter,
        QueryType::Join1,
        QueryType::JoinFilter,
        QueryType::Custom,
        QueryType::ImbricationFilter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QueryType::FilterIsMissing => "WHERE with IS MISSING clause",
            QueryType::Filter4 => "WHERE with 4 tests",
            QueryType::Array => "WHERE on ARRAY",
            QueryType::Nest => "NEST",
            QueryType::NestAgg => "NEST with aggregation function",
            QueryType::Unnest => "UNNEST",
            QueryType::UnnestGroupBy => "UNNEST followed by GROUP BY",
            QueryType::Agg => "Aggregation",
            QueryType::Select => "SELECT",
            QueryType::Filter => "WHERE",
            QueryType::Join1 => "JOIN",
            QueryType::JoinFilter => "JOIN with filter",
            QueryType::Custom => "Custom query",
            QueryType::ImbricationFilter => "WHERE on nested fields (3 layers deep)",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            QueryType::FilterIsMissing => "FILTER_IS_MISSING",
            QueryType::Filter4 => "FILTER4",
            QueryType::Array => "ARRAY",
            QueryType::Nest => "NEST",
            QueryType::NestAgg => "NEST_AGG",
            QueryType::Unnest => "UNNEST",
            QueryType::UnnestGroupBy => "UNNEST_GROUP_BY",
            QueryType::Agg => "AGG",
            QueryType::Select => "SELECT",
            QueryType::Filter => "FILTER",
            QueryType::Join1 => "JOIN1",
            QueryType::JoinFilter => "JOIN_FILTER",
            QueryType::Custom => "CUSTOM",
            QueryType::ImbricationFilter => "IMBRICATION_FILTER",
        }
    }

    /// Table name used in the query catalog file.
    pub fn catalog_key(&self) -> String {
        self.id().to_lowercase()
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Workload results are keyed by query type, sorted by display name.
impl Ord for QueryType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl PartialOrd for QueryType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An executable statement bound to one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub backend: Backend,
    pub query_type: QueryType,
    pub text: String,
}

impl Query {
    pub fn new(backend: Backend, query_type: QueryType, text: impl Into<String>) -> Self {
        Self {
            backend,
            query_type,
            text: text.into(),
        }
    }

    pub fn custom(backend: Backend, text: impl Into<String>) -> Self {
        Self::new(backend, QueryType::Custom, text)
    }

    /// Query text without surrounding whitespace or a trailing `;`.
    pub fn statement(&self) -> &str {
        self.text.trim().trim_end_matches(';').trim_end()
    }
}

/// Immutable (backend, query type) -> query text mapping.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    queries: HashMap<(Backend, QueryType), String>,
}

impl QueryCatalog {
    pub fn embedded() -> Result<Self, BenchError> {
        Self::from_toml(EMBEDDED_CATALOG)
    }

    pub fn from_file(path: &Path) -> Result<Self, BenchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::ConfigParsingError(format!("reading catalog {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses a catalog with one table per query type and one key per backend:
    ///
    /// ```toml
    /// [select]
    /// couchbase = "SELECT b.name FROM business b"
    /// postgresql = "select b.name from business b"
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, BenchError> {
        let raw = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| BenchError::ConfigParsingError(e.to_string()))?
            .try_deserialize::<HashMap<String, HashMap<String, String>>>()
            .map_err(|e| BenchError::ConfigParsingError(e.to_string()))?;

        let mut queries = HashMap::new();
        for (type_key, by_backend) in raw {
            let query_type = QueryType::ALL
                .into_iter()
                .find(|qt| qt.catalog_key() == type_key)
                .ok_or_else(|| {
                    BenchError::ConfigParsingError(format!("unknown query type '{type_key}'"))
                })?;
            for (backend_key, text) in by_backend {
                let backend = Backend::ALL
                    .into_iter()
                    .find(|b| b.catalog_key() == backend_key)
                    .ok_or_else(|| {
                        BenchError::ConfigParsingError(format!(
                            "unknown backend '{backend_key}' in [{type_key}]"
                        ))
                    })?;
                queries.insert((backend, query_type), text);
            }
        }

        Ok(Self { queries })
    }

    pub fn insert(&mut self, backend: Backend, query_type: QueryType, text: impl Into<String>) {
        self.queries.insert((backend, query_type), text.into());
    }

    pub fn lookup(&self, backend: Backend, query_type: QueryType) -> Result<Query, BenchError> {
        self.queries
            .get(&(backend, query_type))
            .map(|text| Query::new(backend, query_type, text.clone()))
            .ok_or_else(|| BenchError::UnknownQuery {
                backend: backend.name().to_string(),
                query: query_type.name().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_covers_every_predefined_query() {
        let catalog = QueryCatalog::embedded().unwrap();
        for query_type in QueryType::ALL {
            for backend in Backend::ALL {
                let found = catalog.lookup(backend, query_type);
                if query_type == QueryType::Custom {
                    assert!(found.is_err());
                } else {
                    let query = found.unwrap();
                    assert_eq!(query.backend, backend);
                    assert!(!query.statement().is_empty());
                }
            }
        }
        assert_eq!(catalog.len(), 13 * 3);
    }

    #[test]
    fn test_missing_combination_is_config_error() {
        let catalog = QueryCatalog::from_toml(
            r#"
            [select]
            couchbase = "SELECT b.name FROM business b"
            "#,
        )
        .unwrap();
        assert!(catalog.lookup(Backend::Couchbase, QueryType::Select).is_ok());
        assert_eq!(
            catalog.lookup(Backend::Postgresql, QueryType::Select),
            Err(BenchError::UnknownQuery {
                backend: "PostgreSQL".to_string(),
                query: "SELECT".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_backend_key_rejected() {
        let result = QueryCatalog::from_toml(
            r#"
            [select]
            mysql = "select 1"
            "#,
        );
        assert!(matches!(result, Err(BenchError::ConfigParsingError(_))));
    }

    #[test]
    fn test_statement_strips_trailing_semicolon() {
        let query = Query::custom(Backend::Postgresql, "\n  select 1;\n");
        assert_eq!(query.statement(), "select 1");
        assert_eq!(query.query_type, QueryType::Custom);
    }
}
