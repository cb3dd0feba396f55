//! Human-readable plan trees.

use crate::plan::PlanNode;
use std::fmt;

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PlanNode {
    /// One line for this node, without indentation or children
    pub(crate) fn describe(&self) -> String {
        match self {
            PlanNode::UnresolvedTable { name } => format!("UnresolvedTable: {}", name),
            PlanNode::ResolvedTable { table } => format!("Table: {}", table.name()),
            PlanNode::PartitionScan { table, partition } => {
                format!("PartitionScan: {} [{}]", table.name(), partition)
            }
            PlanNode::Values { rows, .. } => format!("Values: {} rows", rows.len()),
            PlanNode::Filter { predicate, .. } => format!("Filter: {}", predicate),
            PlanNode::Project { expressions, .. } => format!("Project: {}", join(expressions)),
            PlanNode::Limit { limit, offset, .. } => {
                let limit_str = limit
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "ALL".to_string());
                let offset_str = if *offset > 0 {
                    format!(" OFFSET {}", offset)
                } else {
                    String::new()
                };
                format!("Limit: {}{}", limit_str, offset_str)
            }
            PlanNode::Sort { fields, .. } => format!("Sort: {}", join(fields)),
            PlanNode::CrossJoin { .. } => "CrossJoin".to_string(),
            PlanNode::InnerJoin { condition, .. } => format!("InnerJoin: {}", condition),
            PlanNode::GroupBy {
                grouping,
                aggregates,
                ..
            } => {
                if grouping.is_empty() {
                    format!("GroupBy: {}", join(aggregates))
                } else {
                    format!("GroupBy: {} BY {}", join(aggregates), join(grouping))
                }
            }
            PlanNode::Distinct { .. } => "Distinct".to_string(),
            PlanNode::Exchange { parallelism, .. } => format!("Exchange: parallelism={}", parallelism),
        }
    }

    /// Get a human-readable explanation of this plan, one node per line,
    /// children indented below their parent
    pub fn explain(&self, indent_level: usize) -> String {
        let indent = "  ".repeat(indent_level);
        let mut result = format!("{}{}\n", indent, self.describe());
        for child in self.children() {
            result.push_str(&child.explain(indent_level + 1));
        }
        result
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain(0))
    }
}
