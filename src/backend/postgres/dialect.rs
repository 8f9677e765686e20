use crate::model::{IndexKind, IndexSpec};

/// How indexes are expressed for each PostgreSQL data layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// Normalized tables, indexes on plain columns.
    Relational,
    /// One `data jsonb` column per table, expression indexes on its keys.
    Jsonb,
}

impl SqlDialect {
    pub fn create_index(&self, index: &IndexSpec) -> String {
        let kind = index.kind();
        match self {
            SqlDialect::Relational => format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} USING {} ({})",
                index.name,
                index.table,
                kind.name(),
                index.fields.join(", ")
            ),
            SqlDialect::Jsonb => {
                // GIN indexes the jsonb value itself, other methods the text value
                let operator = if kind == IndexKind::Gin { "->" } else { "->>" };
                let expressions = index
                    .fields
                    .iter()
                    .map(|f| format!("(data {operator} {})", quote_literal(f)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} USING {} ({expressions})",
                    quote_ident(&index.name),
                    quote_ident(&index.table),
                    kind.name()
                )
            }
        }
    }

    pub fn drop_index(&self, index: &IndexSpec) -> String {
        match self {
            SqlDialect::Relational => format!("DROP INDEX IF EXISTS {}", index.name),
            SqlDialect::Jsonb => format!("DROP INDEX IF EXISTS {}", quote_ident(&index.name)),
        }
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
