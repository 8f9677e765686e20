use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::BenchError;
use crate::model::QueryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadType {
    Complete,
    Filter,
    Join,
    ImbricationOperations,
    DataAnalysis,
    Custom,
}

impl WorkloadType {
    pub const ALL: [WorkloadType; 6] = [
        WorkloadType::Complete,
        WorkloadType::Filter,
        WorkloadType::Join,
        WorkloadType::ImbricationOperations,
        WorkloadType::DataAnalysis,
        WorkloadType::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorkloadType::Complete => "Complete",
            WorkloadType::Filter => "Filter",
            WorkloadType::Join => "Join",
            WorkloadType::ImbricationOperations => "Imbrication Operations",
            WorkloadType::DataAnalysis => "Data Analysis",
            WorkloadType::Custom => "Custom",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            WorkloadType::Complete => "COMPLETE",
            WorkloadType::Filter => "FILTER",
            WorkloadType::Join => "JOIN",
            WorkloadType::ImbricationOperations => "IMBRICATION_OPERATIONS",
            WorkloadType::DataAnalysis => "DATA_ANALYSIS",
            WorkloadType::Custom => "CUSTOM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadQuery {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub ratio: f64,
}

impl WorkloadQuery {
    pub fn new(query_type: QueryType, ratio: f64) -> Self {
        Self { query_type, ratio }
    }
}

/// A ratio-weighted bundle of query types executed as one benchmark unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub kind: WorkloadType,
    pub queries: Vec<WorkloadQuery>,
}

impl Workload {
    pub fn new(kind: WorkloadType, queries: Vec<WorkloadQuery>) -> Self {
        Self { kind, queries }
    }

    pub fn custom(queries: Vec<WorkloadQuery>) -> Result<Self, BenchError> {
        if queries.is_empty() {
            return Err(BenchError::InvalidRequest(
                "custom workload needs at least one query".to_string(),
            ));
        }
        if let Some(q) = queries.iter().find(|q| !q.ratio.is_finite() || q.ratio < 0.0) {
            return Err(BenchError::InvalidRequest(format!(
                "invalid ratio {} for {}",
                q.ratio,
                q.query_type.name()
            )));
        }
        Ok(Self::new(WorkloadType::Custom, queries))
    }

    pub fn query_types(&self) -> impl Iterator<Item = QueryType> + '_ {
        self.queries.iter().map(|q| q.query_type)
    }

    /// Ratio of the first entry for the query type, 0 when absent.
    pub fn ratio_for(&self, query_type: QueryType) -> f64 {
        self.queries
            .iter()
            .find(|q| q.query_type == query_type)
            .map(|q| q.ratio)
            .unwrap_or(0.0)
    }
}

/// Executions for one query type of a workload: `ceil(total * ratio)`.
///
/// The product is snapped to 1e-9 first so that `10 * 0.3` yields 3, not 4.
pub fn execution_count(total: u32, ratio: f64) -> u32 {
    if ratio <= 0.0 || total == 0 {
        return 0;
    }
    let product = total as f64 * ratio;
    let snapped = (product * 1e9).round() / 1e9;
    snapped.ceil() as u32
}

/// Predefined workloads, built once.
#[derive(Debug, Clone)]
pub struct WorkloadCatalog {
    workloads: HashMap<WorkloadType, Workload>,
}

impl WorkloadCatalog {
    pub fn predefined() -> Self {
        use QueryType::*;

        let entries = |items: &[(QueryType, f64)]| {
            items
                .iter()
                .map(|(t, r)| WorkloadQuery::new(*t, *r))
                .collect::<Vec<_>>()
        };

        let workloads = [
            Workload::new(
                WorkloadType::Filter,
                entries(&[(Filter, 0.3), (FilterIsMissing, 0.5), (Filter4, 0.2)]),
            ),
            Workload::new(
                WorkloadType::Join,
                entries(&[(Join1, 0.3), (JoinFilter, 0.7)]),
            ),
            Workload::new(
                WorkloadType::ImbricationOperations,
                entries(&[
                    (Nest, 0.3),
                    (NestAgg, 0.1),
                    (Unnest, 0.4),
                    (UnnestGroupBy, 0.4),
                ]),
            ),
            Workload::new(
                WorkloadType::DataAnalysis,
                entries(&[(Unnest, 0.4), (JoinFilter, 0.35), (Agg, 0.25)]),
            ),
            Workload::new(
                WorkloadType::Complete,
                entries(&[
                    (Filter, 1.0),
                    (FilterIsMissing, 1.0),
                    (Filter4, 1.0),
                    (Join1, 1.0),
                    (JoinFilter, 1.0),
                    (Nest, 1.0),
                    (Unnest, 1.0),
                    (UnnestGroupBy, 1.0),
                    (Agg, 1.0),
                    (Select, 1.0),
                    (Array, 1.0),
                    (ImbricationFilter, 1.0),
                ]),
            ),
        ];

        Self {
            workloads: workloads.into_iter().map(|w| (w.kind, w)).collect(),
        }
    }

    /// Custom workloads are never registered here; they come with the request.
    pub fn get(&self, kind: WorkloadType) -> Result<&Workload, BenchError> {
        self.workloads
            .get(&kind)
            .ok_or_else(|| BenchError::UnknownWorkload(kind.name().to_string()))
    }
}

impl Default for WorkloadCatalog {
    fn default() -> Self {
        Self::predefined()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 0.3, 3)]
    #[case(10, 0.5, 5)]
    #[case(10, 0.2, 2)]
    #[case(10, 0.7, 7)]
    #[case(10, 0.35, 4)]
    #[case(3, 0.1, 1)]
    #[case(10, 1.0, 10)]
    #[case(10, 0.0, 0)]
    #[case(0, 0.5, 0)]
    fn test_execution_count(#[case] total: u32, #[case] ratio: f64, #[case] expected: u32) {
        assert_eq!(execution_count(total, ratio), expected);
    }

    #[test]
    fn test_filter_workload_counts() {
        let catalog = WorkloadCatalog::predefined();
        let workload = catalog.get(WorkloadType::Filter).unwrap();
        let counts: Vec<_> = workload
            .queries
            .iter()
            .map(|q| execution_count(10, q.ratio))
            .collect();
        assert_eq!(counts, vec![3, 5, 2]);
        assert_eq!(workload.ratio_for(QueryType::FilterIsMissing), 0.5);
        assert_eq!(workload.ratio_for(QueryType::Agg), 0.0);
    }

    #[test]
    fn test_custom_is_not_predefined() {
        let catalog = WorkloadCatalog::predefined();
        assert_eq!(
            catalog.get(WorkloadType::Custom),
            Err(BenchError::UnknownWorkload("Custom".to_string()))
        );
        assert_eq!(catalog.get(WorkloadType::Complete).unwrap().queries.len(), 12);
    }

    #[test]
    fn test_custom_workload_validation() {
        assert!(Workload::custom(vec![]).is_err());
        assert!(Workload::custom(vec![WorkloadQuery::new(QueryType::Agg, -1.0)]).is_err());

        let workload: Vec<WorkloadQuery> =
            serde_json::from_str(r#"[{"type": "AGG", "ratio": 0.5}, {"type": "SELECT", "ratio": 1}]"#)
                .unwrap();
        let workload = Workload::custom(workload).unwrap();
        assert_eq!(workload.kind, WorkloadType::Custom);
        assert_eq!(
            workload.query_types().collect::<Vec<_>>(),
            vec![QueryType::Agg, QueryType::Select]
        );
    }
}
