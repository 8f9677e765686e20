mod couchbase;
mod duration;
mod postgres;

use std::fmt::Write;

pub use couchbase::{ProfileNode, parse_profile, render_profile};
pub use duration::normalize_to_ms;
pub use postgres::{PlanNode, execution_time_ms, parse_plan, render_plan};

/// A node of a normalized plan tree that renders itself one line per node,
/// two spaces of indentation per depth level.
pub trait IndentedTree {
    fn write_indented(&self, depth: usize, out: &mut String);

    fn to_indented_string(&self) -> String {
        let mut out = String::new();
        self.write_indented(0, &mut out);
        out
    }
}

pub(crate) fn indent(out: &mut String, depth: usize) {
    let _ = write!(out, "{}", "  ".repeat(depth));
}
