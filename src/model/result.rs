use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::QueryType;

/// Cache behaviour for one run, averaged per execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub hits: i64,
    pub misses: i64,
    /// Integer percentage in 0..=100.
    pub hits_ratio: i32,
}

impl CacheInfo {
    pub fn new(hits: i64, misses: i64, hits_ratio: i32) -> Self {
        Self {
            hits,
            misses,
            hits_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub index_name: String,
    pub table: String,
    pub table_size: String,
    pub index_size: String,
    pub size_ratio: f64,
}

/// Outcome of benchmarking one query on one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub query: String,
    pub avg_execution_time: f64,
    pub query_per_second: f64,
    pub explain_plan: String,
    pub initial_connection_time: u64,
    pub standard_deviation: f64,
    pub variance: f64,
    pub percentile95: f64,
    pub cache_info: Option<CacheInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleQueryResult {
    #[serde(flatten)]
    pub result: RunResult,
    pub index_info: Vec<IndexInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadResult {
    pub index_info: Vec<IndexInfo>,
    pub results: BTreeMap<QueryType, RunResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> RunResult {
        RunResult {
            query: "select 1".to_string(),
            avg_execution_time: 12.5,
            query_per_second: 80.0,
            explain_plan: "Result - 0.010 ms\n".to_string(),
            initial_connection_time: 42,
            standard_deviation: 1.2,
            variance: 1.44,
            percentile95: 14.1,
            cache_info: Some(CacheInfo::new(10, 2, 83)),
        }
    }

    #[test]
    fn test_single_result_json_shape() {
        let single = SingleQueryResult {
            result: sample_result(),
            index_info: vec![IndexInfo {
                index_name: "idx_city".to_string(),
                table: "business".to_string(),
                table_size: "12 MB".to_string(),
                index_size: "1024 kB".to_string(),
                size_ratio: 8.33,
            }],
        };
        let value = serde_json::to_value(&single).unwrap();
        assert_eq!(value["avgExecutionTime"], json!(12.5));
        assert_eq!(value["queryPerSecond"], json!(80.0));
        assert_eq!(value["percentile95"], json!(14.1));
        assert_eq!(value["cacheInfo"]["hitsRatio"], json!(83));
        assert_eq!(value["indexInfo"][0]["indexName"], json!("idx_city"));
        assert_eq!(value["indexInfo"][0]["sizeRatio"], json!(8.33));
    }

    #[test]
    fn test_workload_result_keys() {
        let mut results = BTreeMap::new();
        results.insert(QueryType::Select, sample_result());
        results.insert(QueryType::Agg, sample_result());
        let workload = WorkloadResult {
            index_info: vec![],
            results,
        };
        let value = serde_json::to_value(&workload).unwrap();
        let keys: Vec<_> = value["results"].as_object().unwrap().keys().cloned().collect();
        assert!(keys.contains(&"AGG".to_string()));
        assert!(keys.contains(&"SELECT".to_string()));
    }
}
