use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A database engine under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Backend {
    Couchbase,
    Postgresql,
    PostgresqlJsonb,
}

impl Backend {
    pub const ALL: [Backend; 3] = [
        Backend::Couchbase,
        Backend::Postgresql,
        Backend::PostgresqlJsonb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Couchbase => "Couchbase",
            Backend::Postgresql => "PostgreSQL",
            Backend::PostgresqlJsonb => "PostgreSQL JSONB",
        }
    }

    /// Stable identifier, matches the serialized form.
    pub fn id(&self) -> &'static str {
        match self {
            Backend::Couchbase => "COUCHBASE",
            Backend::Postgresql => "POSTGRESQL",
            Backend::PostgresqlJsonb => "POSTGRESQL_JSONB",
        }
    }

    /// Key used in the query catalog file.
    pub fn catalog_key(&self) -> &'static str {
        match self {
            Backend::Couchbase => "couchbase",
            Backend::Postgresql => "postgresql",
            Backend::PostgresqlJsonb => "postgresql_jsonb",
        }
    }

    /// Scope (Couchbase) or schema (PostgreSQL) holding the dataset of the given size.
    pub fn scope(&self, size: DbSize) -> &'static str {
        match (self, size) {
            (_, DbSize::Small) => "yelp_small",
            (_, DbSize::Medium) => "yelp_medium",
            (Backend::Couchbase, DbSize::Large) => "yelp",
            (Backend::Postgresql | Backend::PostgresqlJsonb, DbSize::Large) => "public",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Result maps are ordered by display name.
impl Ord for Backend {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl PartialOrd for Backend {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbSize {
    Small,
    Medium,
    Large,
}

impl DbSize {
    pub const ALL: [DbSize; 3] = [DbSize::Small, DbSize::Medium, DbSize::Large];

    pub fn name(&self) -> &'static str {
        match self {
            DbSize::Small => "Small",
            DbSize::Medium => "Medium",
            DbSize::Large => "Large",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            DbSize::Small => "SMALL",
            DbSize::Medium => "MEDIUM",
            DbSize::Large => "LARGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeMap;

    #[rstest]
    #[case(Backend::Couchbase, DbSize::Small, "yelp_small")]
    #[case(Backend::Couchbase, DbSize::Medium, "yelp_medium")]
    #[case(Backend::Couchbase, DbSize::Large, "yelp")]
    #[case(Backend::Postgresql, DbSize::Small, "yelp_small")]
    #[case(Backend::Postgresql, DbSize::Large, "public")]
    #[case(Backend::PostgresqlJsonb, DbSize::Medium, "yelp_medium")]
    #[case(Backend::PostgresqlJsonb, DbSize::Large, "public")]
    fn test_scope_lookup(#[case] backend: Backend, #[case] size: DbSize, #[case] scope: &str) {
        assert_eq!(backend.scope(size), scope);
    }

    #[test]
    fn test_map_order_follows_display_name() {
        let mut map = BTreeMap::new();
        map.insert(Backend::PostgresqlJsonb, 3);
        map.insert(Backend::Couchbase, 1);
        map.insert(Backend::Postgresql, 2);
        let order: Vec<_> = map.keys().map(|b| b.name()).collect();
        assert_eq!(order, vec!["Couchbase", "PostgreSQL", "PostgreSQL JSONB"]);
    }

    #[test]
    fn test_serialized_identity() {
        let json = serde_json::to_string(&Backend::PostgresqlJsonb).unwrap();
        assert_eq!(json, "\"POSTGRESQL_JSONB\"");
        let backend: Backend = serde_json::from_str("\"COUCHBASE\"").unwrap();
        assert_eq!(backend, Backend::Couchbase);
        for backend in Backend::ALL {
            assert_eq!(
                serde_json::to_string(&backend).unwrap(),
                format!("\"{}\"", backend.id())
            );
        }
    }
}
