use std::fmt::Write;

use log::warn;
use serde_json::Value;

use super::{IndentedTree, indent, normalize_to_ms};

/// Structural fields that may hold a nested operator outside `~child`/`~children`.
const STRUCTURAL_FIELDS: [&str; 5] = ["scan", "input", "subquery", "expr", "plan"];

/// One operator of a document-store execution profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileNode {
    pub operator: String,
    pub exec_time: Option<String>,
    pub serv_time: Option<String>,
    pub items_in: Option<i64>,
    pub items_out: Option<i64>,
    pub index: Option<String>,
    pub children: Vec<ProfileNode>,
}

impl ProfileNode {
    /// `execTime + servTime` in milliseconds.
    pub fn total_time_ms(&self) -> f64 {
        let exec = self.exec_time.as_deref().map(normalize_to_ms).unwrap_or(0.0);
        let serv = self.serv_time.as_deref().map(normalize_to_ms).unwrap_or(0.0);
        exec + serv
    }

    /// Builds the node from a JSON object carrying `#operator`, `None` otherwise.
    pub fn from_json(node: &Value) -> Option<Self> {
        let operator = node.get("#operator")?.as_str()?.to_string();
        let stats = node.get("#stats");
        let stat = |key: &str| stats.and_then(|s| s.get(key));

        let mut candidates: Vec<&Value> = Vec::new();
        if let Some(Value::Array(list)) = node.get("~children") {
            candidates.extend(list);
        }
        candidates.extend(node.get("~child"));
        for field in STRUCTURAL_FIELDS {
            candidates.extend(node.get(field).filter(|c| has_operator(c)));
        }
        if let Value::Object(fields) = node {
            candidates.extend(fields.values().filter(|c| has_operator(c)));
        }

        let mut seen: Vec<&Value> = Vec::with_capacity(candidates.len());
        let mut children = Vec::new();
        for child in candidates {
            // pointer identity, not structural equality
            if seen.iter().any(|s| std::ptr::eq(*s, child)) {
                continue;
            }
            seen.push(child);
            children.extend(ProfileNode::from_json(child));
        }

        Some(Self {
            operator,
            exec_time: stat("execTime").and_then(as_text),
            serv_time: stat("servTime").and_then(as_text),
            items_in: stat("#itemsIn").and_then(as_count),
            items_out: stat("#itemsOut").and_then(as_count),
            index: node.get("index").and_then(as_text),
            children,
        })
    }
}

impl IndentedTree for ProfileNode {
    fn write_indented(&self, depth: usize, out: &mut String) {
        // Sequence only orders its children.
        if self.operator == "Sequence" {
            for child in &self.children {
                child.write_indented(depth, out);
            }
            return;
        }

        indent(out, depth);
        let _ = write!(out, "{} - {:.3} ms", self.operator, self.total_time_ms());
        match (self.items_in, self.items_out) {
            (Some(i), Some(o)) => {
                let _ = write!(out, " [in: {i}, out: {o}]");
            }
            (Some(i), None) => {
                let _ = write!(out, " [in: {i}]");
            }
            (None, Some(o)) => {
                let _ = write!(out, " [out: {o}]");
            }
            (None, None) => {}
        }
        if let Some(index) = &self.index {
            let _ = write!(out, " [index: {index}]");
        }
        out.push('\n');

        for child in &self.children {
            child.write_indented(depth + 1, out);
        }
    }
}

/// Parses a query profile. Timings are read from `executionTimings` when
/// present, the root otherwise; a top-level `~child` becomes the main node.
pub fn parse_profile(root: &Value) -> Option<ProfileNode> {
    let timings = root.get("executionTimings").unwrap_or(root);
    let main = timings.get("~child").unwrap_or(timings);
    ProfileNode::from_json(main)
}

/// Rendered profile tree, empty when the profile cannot be parsed.
pub fn render_profile(root: &Value) -> String {
    match parse_profile(root) {
        Some(node) => node.to_indented_string(),
        None => {
            warn!("Cannot parse query profile, no #operator found");
            String::new()
        }
    }
}

fn has_operator(value: &Value) -> bool {
    value.is_object() && value.get("#operator").is_some()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn as_count(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_render_sequence() {
        let profile = json!({
            "executionTimings": {
                "#operator": "Authorize",
                "#stats": {"servTime": "1.5µs"},
                "~child": {
                    "#operator": "Sequence",
                    "~children": [
                        {
                            "#operator": "IndexScan3",
                            "index": "idx_city",
                            "#stats": {"execTime": "2ms", "servTime": "1ms", "#itemsOut": 12}
                        },
                        {
                            "#operator": "Fetch",
                            "#stats": {"execTime": "500us", "#itemsIn": 12, "#itemsOut": 12}
                        },
                        {
                            "#operator": "Stream",
                            "#stats": {"execTime": "1500ns", "#itemsIn": 12}
                        }
                    ]
                }
            }
        });

        let rendered = render_profile(&profile);
        assert_eq!(
            rendered,
            "IndexScan3 - 3.000 ms [out: 12] [index: idx_city]\n\
             Fetch - 0.500 ms [in: 12, out: 12]\n\
             Stream - 0.002 ms [in: 12]\n"
        );
    }

    #[test]
    fn test_nested_depth_and_structural_fields() {
        let profile = json!({
            "#operator": "Filter",
            "#stats": {"execTime": "1ms"},
            "input": {
                "#operator": "Fetch",
                "#stats": {"execTime": "2ms"},
                "scan": {"#operator": "PrimaryScan3", "#stats": {"execTime": "3ms"}}
            }
        });

        let node = parse_profile(&profile).unwrap();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].children.len(), 1);
        assert_eq!(
            node.to_indented_string(),
            "Filter - 1.000 ms\n  Fetch - 2.000 ms\n    PrimaryScan3 - 3.000 ms\n"
        );
    }

    #[test]
    fn test_identity_dedup() {
        let profile = json!({
            "#operator": "Join",
            "~child": {"#operator": "Scan", "#stats": {"execTime": "1ms"}},
            "plan": {"#operator": "Inner", "#stats": {"execTime": "1ms"}},
            "extra": {"#operator": "Scan", "#stats": {"execTime": "1ms"}}
        });

        // `~child` and `plan` are picked up once each even though the generic
        // scan sees them again; `extra` is structurally equal to `~child` but a
        // distinct value, so it is kept.
        let node = ProfileNode::from_json(&profile).unwrap();
        let ops: Vec<_> = node.children.iter().map(|c| c.operator.as_str()).collect();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], "Scan");
        assert_eq!(ops[1], "Inner");
        assert!(ops[2..].contains(&"Scan"));
    }

    #[test]
    fn test_missing_operator_is_empty_plan() {
        assert_eq!(parse_profile(&json!({"foo": 1})), None);
        assert_eq!(render_profile(&json!([1, 2, 3])), "");
    }

    #[test]
    fn test_unparseable_durations_are_zero() {
        let node = ProfileNode::from_json(&json!({
            "#operator": "Stream",
            "#stats": {"execTime": "soon", "servTime": "3ms"}
        }))
        .unwrap();
        assert_eq!(node.total_time_ms(), 3.0);
    }
}
