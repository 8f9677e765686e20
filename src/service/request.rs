use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::BenchError;
use crate::model::{Backend, DbSize, IndexSpec, QueryType, WorkloadQuery, WorkloadType};

/// Settings shared by every benchmark request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    pub number_of_executions: u32,
    pub selected_databases: Vec<Backend>,
    pub selected_size: DbSize,
    #[serde(default)]
    pub indexes: Option<HashMap<Backend, Vec<IndexSpec>>>,
}

impl RunSettings {
    pub fn new(backends: &[Backend], size: DbSize, executions: u32) -> Self {
        Self {
            number_of_executions: executions,
            selected_databases: backends.to_vec(),
            selected_size: size,
            indexes: None,
        }
    }

    pub fn with_indexes(mut self, backend: Backend, indexes: Vec<IndexSpec>) -> Self {
        self.indexes
            .get_or_insert_with(HashMap::new)
            .insert(backend, indexes);
        self
    }

    /// Indexes requested for the backend, empty when none.
    pub fn indexes_for(&self, backend: Backend) -> &[IndexSpec] {
        self.indexes
            .as_ref()
            .and_then(|by_backend| by_backend.get(&backend))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.number_of_executions == 0 {
            return Err(BenchError::InvalidRequest(
                "numberOfExecutions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueRequest {
    #[serde(flatten)]
    pub settings: RunSettings,
    pub selected_query: QueryType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRequest {
    #[serde(flatten)]
    pub settings: RunSettings,
    pub custom_queries: HashMap<Backend, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadRequest {
    #[serde(flatten)]
    pub settings: RunSettings,
    pub selected_workload: WorkloadType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWorkloadRequest {
    #[serde(flatten)]
    pub settings: RunSettings,
    pub custom_workload_queries: Vec<WorkloadQuery>,
}
