use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexKind {
    Gin,
    Btree,
    Hash,
    Spgist,
    Brin,
    Gist,
}

impl IndexKind {
    pub const ALL: [IndexKind; 6] = [
        IndexKind::Gin,
        IndexKind::Btree,
        IndexKind::Hash,
        IndexKind::Spgist,
        IndexKind::Brin,
        IndexKind::Gist,
    ];

    /// Access method name as written in `USING <method>`.
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Gin => "gin",
            IndexKind::Btree => "btree",
            IndexKind::Hash => "hash",
            IndexKind::Spgist => "spgist",
            IndexKind::Brin => "brin",
            IndexKind::Gist => "gist",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            IndexKind::Gin => "GIN",
            IndexKind::Btree => "BTREE",
            IndexKind::Hash => "HASH",
            IndexKind::Spgist => "SPGIST",
            IndexKind::Brin => "BRIN",
            IndexKind::Gist => "GIST",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A secondary index requested for the duration of one benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub table: String,
    pub fields: Vec<String>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<IndexKind>,
}

impl IndexSpec {
    pub fn new(table: &str, fields: &[&str], name: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            name: name.to_string(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: IndexKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn kind(&self) -> IndexKind {
        self.kind.unwrap_or(IndexKind::Gin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults_to_gin() {
        let spec: IndexSpec = serde_json::from_str(
            r#"{"table": "business", "fields": ["city"], "name": "idx_city"}"#,
        )
        .unwrap();
        assert_eq!(spec.kind, None);
        assert_eq!(spec.kind(), IndexKind::Gin);
    }

    #[test]
    fn test_explicit_kind() {
        let spec: IndexSpec = serde_json::from_str(
            r#"{"table": "business", "fields": ["city", "stars"], "name": "idx", "type": "BTREE"}"#,
        )
        .unwrap();
        assert_eq!(spec.kind(), IndexKind::Btree);
        assert_eq!(spec.kind().to_string(), "btree");
        assert_eq!(spec.fields, vec!["city", "stars"]);
    }
}
