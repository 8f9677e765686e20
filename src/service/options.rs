use serde::{Deserialize, Serialize};

use crate::core::BenchError;
use crate::model::{Backend, DbSize, IndexKind, QueryType, WorkloadType};

/// A selectable value and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub value: String,
    pub label: String,
}

impl OptionEntry {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Queries,
    Databases,
    Sizes,
    Indexes,
    Workloads,
}

impl std::str::FromStr for OptionKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queries" => Ok(OptionKind::Queries),
            "databases" => Ok(OptionKind::Databases),
            "sizes" => Ok(OptionKind::Sizes),
            "indexes" => Ok(OptionKind::Indexes),
            "workloads" => Ok(OptionKind::Workloads),
            other => Err(BenchError::InvalidRequest(format!("unknown option list '{other}'"))),
        }
    }
}

/// Every value of the given enumeration in declaration order.
pub fn options(kind: OptionKind) -> Vec<OptionEntry> {
    match kind {
        OptionKind::Queries => QueryType::ALL
            .iter()
            .map(|q| OptionEntry::new(q.id(), q.name()))
            .collect(),
        OptionKind::Databases => Backend::ALL
            .iter()
            .map(|b| OptionEntry::new(b.id(), b.name()))
            .collect(),
        OptionKind::Sizes => DbSize::ALL
            .iter()
            .map(|s| OptionEntry::new(s.id(), s.name()))
            .collect(),
        OptionKind::Indexes => IndexKind::ALL
            .iter()
            .map(|k| OptionEntry::new(k.id(), &k.name().to_uppercase()))
            .collect(),
        OptionKind::Workloads => WorkloadType::ALL
            .iter()
            .map(|w| OptionEntry::new(w.id(), w.name()))
            .collect(),
    }
}
