//! Fluent construction of plan trees.
//!
//! Builders start from a leaf and wrap it one operator at a time, so the
//! calls read in execution order:
//!
//! ```
//! use vibequery::expression::Expression;
//! use vibequery::plan::PlanBuilder;
//!
//! let plan = PlanBuilder::scan("users")
//!     .filter(Expression::gt(Expression::col("age"), Expression::literal(18)))
//!     .project(vec![Expression::col("name")])
//!     .limit(10)
//!     .build();
//! assert_eq!(plan.children().len(), 1);
//! ```

use crate::catalog::{Schema, Table};
use crate::executor::{Aggregate, SortField};
use crate::expression::Expression;
use crate::plan::{PlanNode, TableRef};
use std::sync::Arc;

/// Builder for plan trees
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    node: PlanNode,
}

impl PlanBuilder {
    /// Start from a table that the analyzer will resolve by name
    pub fn scan(table: impl Into<String>) -> Self {
        Self::from_plan(PlanNode::UnresolvedTable { name: table.into() })
    }

    /// Start from an already resolved table
    pub fn table(table: Arc<dyn Table>) -> Self {
        Self::from_plan(PlanNode::ResolvedTable {
            table: TableRef::new(table),
        })
    }

    /// Start from literal rows
    pub fn values(schema: Schema, rows: Vec<Vec<Expression>>) -> Self {
        Self::from_plan(PlanNode::Values { schema, rows })
    }

    pub fn from_plan(node: PlanNode) -> Self {
        Self { node }
    }

    pub fn filter(self, predicate: Expression) -> Self {
        Self::from_plan(PlanNode::Filter {
            predicate,
            input: Box::new(self.node),
        })
    }

    pub fn project(self, expressions: Vec<Expression>) -> Self {
        Self::from_plan(PlanNode::Project {
            expressions,
            input: Box::new(self.node),
        })
    }

    pub fn limit(self, limit: usize) -> Self {
        self.limit_offset(Some(limit), 0)
    }

    pub fn offset(self, offset: usize) -> Self {
        self.limit_offset(None, offset)
    }

    pub fn limit_offset(self, limit: Option<usize>, offset: usize) -> Self {
        Self::from_plan(PlanNode::Limit {
            limit,
            offset,
            input: Box::new(self.node),
        })
    }

    pub fn sort(self, fields: Vec<SortField>) -> Self {
        Self::from_plan(PlanNode::Sort {
            fields,
            input: Box::new(self.node),
        })
    }

    pub fn cross_join(self, right: PlanBuilder) -> Self {
        Self::from_plan(PlanNode::CrossJoin {
            left: Box::new(self.node),
            right: Box::new(right.node),
        })
    }

    pub fn join(self, right: PlanBuilder, condition: Expression) -> Self {
        Self::from_plan(PlanNode::InnerJoin {
            left: Box::new(self.node),
            right: Box::new(right.node),
            condition,
        })
    }

    pub fn aggregate(self, grouping: Vec<Expression>, aggregates: Vec<Aggregate>) -> Self {
        Self::from_plan(PlanNode::GroupBy {
            grouping,
            aggregates,
            input: Box::new(self.node),
        })
    }

    pub fn distinct(self) -> Self {
        Self::from_plan(PlanNode::Distinct {
            input: Box::new(self.node),
        })
    }

    pub fn exchange(self, parallelism: usize) -> Self {
        Self::from_plan(PlanNode::Exchange {
            parallelism,
            input: Box::new(self.node),
        })
    }

    pub fn build(self) -> PlanNode {
        self.node
    }
}

impl From<PlanBuilder> for PlanNode {
    fn from(builder: PlanBuilder) -> Self {
        builder.build()
    }
}
