use std::fmt::Write;

use log::warn;
use serde_json::Value;

use super::{IndentedTree, indent};

/// One node of a PostgreSQL `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub node_type: String,
    pub actual_total_time: f64,
    pub actual_loops: f64,
    pub shared_hit_blocks: i64,
    pub shared_read_blocks: i64,
    pub plan_rows: i64,
    pub actual_rows: i64,
    pub total_cost: f64,
    pub index_name: Option<String>,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn from_json(node: &Value) -> Self {
        let float = |key: &str, default: f64| node.get(key).and_then(Value::as_f64).unwrap_or(default);
        let int = |key: &str| {
            node.get(key)
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                .unwrap_or(0)
        };

        let children = match node.get("Plans") {
            Some(Value::Array(plans)) => plans.iter().map(PlanNode::from_json).collect(),
            _ => Vec::new(),
        };

        Self {
            node_type: node
                .get("Node Type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            actual_total_time: float("Actual Total Time", 0.0),
            actual_loops: float("Actual Loops", 1.0),
            shared_hit_blocks: int("Shared Hit Blocks"),
            shared_read_blocks: int("Shared Read Blocks"),
            plan_rows: int("Plan Rows"),
            actual_rows: int("Actual Rows"),
            total_cost: float("Total Cost", 0.0),
            index_name: node
                .get("Index Name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            children,
        }
    }

    /// Time spent in this node alone. Can be negative when children report
    /// more time than their parent, e.g. with parallel workers.
    pub fn exclusive_time(&self) -> f64 {
        self.actual_total_time
            - self
                .children
                .iter()
                .map(|c| c.actual_total_time)
                .sum::<f64>()
    }
}

impl IndentedTree for PlanNode {
    fn write_indented(&self, depth: usize, out: &mut String) {
        indent(out, depth);
        let _ = write!(
            out,
            "{} - {:.3} ms (exclusive: {:.3} ms) [rows: {}/{}]",
            self.node_type,
            self.actual_total_time,
            self.exclusive_time(),
            self.plan_rows,
            self.actual_rows
        );
        if self.shared_hit_blocks > 0 || self.shared_read_blocks > 0 {
            let _ = write!(
                out,
                " [blocks: hit={}, read={}]",
                self.shared_hit_blocks, self.shared_read_blocks
            );
        }
        let _ = write!(out, " [cost: {:.2}]", self.total_cost);
        if let Some(index) = &self.index_name {
            let _ = write!(out, " [index: {index}]");
        }
        out.push('\n');

        for child in &self.children {
            child.write_indented(depth + 1, out);
        }
    }
}

/// Parses the root `Plan` of an EXPLAIN document (`[{"Plan": {...}}]`).
pub fn parse_plan(root: &Value) -> Option<PlanNode> {
    root.get(0)?
        .get("Plan")
        .filter(|p| p.is_object())
        .map(PlanNode::from_json)
}

/// Rendered plan tree, empty when the document has no plan.
pub fn render_plan(root: &Value) -> String {
    match parse_plan(root) {
        Some(node) => node.to_indented_string(),
        None => {
            warn!("Cannot parse EXPLAIN output, no root plan found");
            String::new()
        }
    }
}

/// Server-side `Execution Time` of an EXPLAIN ANALYZE document, in milliseconds.
pub fn execution_time_ms(root: &Value) -> Option<f64> {
    root.get(0)?.get("Execution Time")?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn explain_doc() -> Value {
        json!([{
            "Plan": {
                "Node Type": "Hash Join",
                "Actual Total Time": 10.0,
                "Actual Loops": 1,
                "Plan Rows": 100,
                "Actual Rows": 90,
                "Total Cost": 250.456,
                "Shared Hit Blocks": 40,
                "Shared Read Blocks": 2,
                "Plans": [
                    {
                        "Node Type": "Index Scan",
                        "Index Name": "idx_city",
                        "Actual Total Time": 4.5,
                        "Plan Rows": 50,
                        "Actual Rows": 45,
                        "Total Cost": 12.0
                    },
                    {
                        "Node Type": "Seq Scan",
                        "Actual Total Time": 3.0,
                        "Plan Rows": 10,
                        "Actual Rows": 10,
                        "Total Cost": 8.0
                    }
                ]
            },
            "Planning Time": 0.2,
            "Execution Time": 10.4
        }])
    }

    #[test]
    fn test_render_plan() {
        let rendered = render_plan(&explain_doc());
        assert_eq!(
            rendered,
            "Hash Join - 10.000 ms (exclusive: 2.500 ms) [rows: 100/90] [blocks: hit=40, read=2] [cost: 250.46]\n\
             \x20 Index Scan - 4.500 ms (exclusive: 4.500 ms) [rows: 50/45] [cost: 12.00] [index: idx_city]\n\
             \x20 Seq Scan - 3.000 ms (exclusive: 3.000 ms) [rows: 10/10] [cost: 8.00]\n"
        );
    }

    #[test]
    fn test_leaf_exclusive_equals_inclusive() {
        let leaf = PlanNode::from_json(&json!({"Node Type": "Seq Scan", "Actual Total Time": 7.25}));
        assert_eq!(leaf.exclusive_time(), leaf.actual_total_time);
    }

    #[test]
    fn test_exclusive_may_be_negative() {
        let node = PlanNode::from_json(&json!({
            "Node Type": "Gather",
            "Actual Total Time": 5.0,
            "Plans": [
                {"Node Type": "Parallel Seq Scan", "Actual Total Time": 4.0},
                {"Node Type": "Parallel Seq Scan", "Actual Total Time": 4.0}
            ]
        }));
        assert_eq!(node.exclusive_time(), -3.0);
        assert!(node.to_indented_string().starts_with("Gather - 5.000 ms (exclusive: -3.000 ms)"));
    }

    #[test]
    fn test_defaults() {
        let node = PlanNode::from_json(&json!({}));
        assert_eq!(node.node_type, "Unknown");
        assert_eq!(node.actual_loops, 1.0);
        assert_eq!(node.index_name, None);
    }

    #[test]
    fn test_malformed_document() {
        assert_eq!(parse_plan(&json!({"Plan": {}})), None);
        assert_eq!(render_plan(&json!([])), "");
        assert_eq!(execution_time_ms(&explain_doc()), Some(10.4));
        assert_eq!(execution_time_ms(&json!("nope")), None);
    }
}
