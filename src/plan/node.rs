//! Plan node definitions.

use crate::catalog::{ColumnInfo, Partition, Schema, Table};
use crate::context::Context;
use crate::executor::{
    Aggregate, AggregateExecutor, DistinctExecutor, ExchangeExecutor, FilterExecutor,
    LimitExecutor, NestedLoopJoinExecutor, ProjectionExecutor, RowIter, SortExecutor, SortField,
    TableScanExecutor, ValuesExecutor,
};
use crate::expression::{evaluate_expression, Expression};
use crate::plan::{PlanError, PlanResult};
use anyhow::Result;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Shared handle to a resolved table.
///
/// Two handles are equal when they point at the same table object.
#[derive(Clone)]
pub struct TableRef(pub Arc<dyn Table>);

impl TableRef {
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self(table)
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TableRef").field(&self.0.name()).finish()
    }
}

impl Deref for TableRef {
    type Target = dyn Table;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Node of a query plan tree
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Table referenced by name, not yet looked up in the database
    UnresolvedTable { name: String },

    /// Full scan of a table
    ResolvedTable { table: TableRef },

    /// Scan of a single partition, produced by `Exchange` workers
    PartitionScan { table: TableRef, partition: Partition },

    /// Literal rows
    Values {
        schema: Schema,
        rows: Vec<Vec<Expression>>,
    },

    /// Keep rows whose predicate is TRUE
    Filter {
        predicate: Expression,
        input: Box<PlanNode>,
    },

    /// Compute output columns
    Project {
        expressions: Vec<Expression>,
        input: Box<PlanNode>,
    },

    /// Skip `offset` rows, then return at most `limit`
    Limit {
        limit: Option<usize>,
        offset: usize,
        input: Box<PlanNode>,
    },

    Sort {
        fields: Vec<SortField>,
        input: Box<PlanNode>,
    },

    CrossJoin {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },

    InnerJoin {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        condition: Expression,
    },

    GroupBy {
        grouping: Vec<Expression>,
        aggregates: Vec<Aggregate>,
        input: Box<PlanNode>,
    },

    Distinct { input: Box<PlanNode> },

    /// Run `input` once per table partition on up to `parallelism` workers
    /// and merge the results in no particular order
    Exchange {
        parallelism: usize,
        input: Box<PlanNode>,
    },
}

impl PlanNode {
    /// Short name of the node kind
    pub fn node_name(&self) -> &'static str {
        match self {
            PlanNode::UnresolvedTable { .. } => "UnresolvedTable",
            PlanNode::ResolvedTable { .. } => "ResolvedTable",
            PlanNode::PartitionScan { .. } => "PartitionScan",
            PlanNode::Values { .. } => "Values",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Project { .. } => "Project",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Sort { .. } => "Sort",
            PlanNode::CrossJoin { .. } => "CrossJoin",
            PlanNode::InnerJoin { .. } => "InnerJoin",
            PlanNode::GroupBy { .. } => "GroupBy",
            PlanNode::Distinct { .. } => "Distinct",
            PlanNode::Exchange { .. } => "Exchange",
        }
    }

    /// Child plans, in order
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::UnresolvedTable { .. }
            | PlanNode::ResolvedTable { .. }
            | PlanNode::PartitionScan { .. }
            | PlanNode::Values { .. } => vec![],
            PlanNode::Filter { input, .. }
            | PlanNode::Project { input, .. }
            | PlanNode::Limit { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::GroupBy { input, .. }
            | PlanNode::Distinct { input }
            | PlanNode::Exchange { input, .. } => vec![input],
            PlanNode::CrossJoin { left, right } | PlanNode::InnerJoin { left, right, .. } => {
                vec![left, right]
            }
        }
    }

    /// Rebuild this node with new children. The number of children must
    /// match [`PlanNode::children`].
    pub fn with_children(&self, children: Vec<PlanNode>) -> PlanResult<PlanNode> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(PlanError::InvalidChildrenNumber {
                node: self.node_name().to_string(),
                actual: children.len(),
                expected,
            });
        }

        let mut children = children.into_iter().map(Box::new);
        let mut next = || children.next().ok_or_else(|| PlanError::InvalidChildrenNumber {
            node: self.node_name().to_string(),
            actual: 0,
            expected,
        });

        let node = match self {
            PlanNode::UnresolvedTable { .. }
            | PlanNode::ResolvedTable { .. }
            | PlanNode::PartitionScan { .. }
            | PlanNode::Values { .. } => self.clone(),
            PlanNode::Filter { predicate, .. } => PlanNode::Filter {
                predicate: predicate.clone(),
                input: next()?,
            },
            PlanNode::Project { expressions, .. } => PlanNode::Project {
                expressions: expressions.clone(),
                input: next()?,
            },
            PlanNode::Limit { limit, offset, .. } => PlanNode::Limit {
                limit: *limit,
                offset: *offset,
                input: next()?,
            },
            PlanNode::Sort { fields, .. } => PlanNode::Sort {
                fields: fields.clone(),
                input: next()?,
            },
            PlanNode::CrossJoin { .. } => PlanNode::CrossJoin {
                left: next()?,
                right: next()?,
            },
            PlanNode::InnerJoin { condition, .. } => PlanNode::InnerJoin {
                left: next()?,
                right: next()?,
                condition: condition.clone(),
            },
            PlanNode::GroupBy {
                grouping,
                aggregates,
                ..
            } => PlanNode::GroupBy {
                grouping: grouping.clone(),
                aggregates: aggregates.clone(),
                input: next()?,
            },
            PlanNode::Distinct { .. } => PlanNode::Distinct { input: next()? },
            PlanNode::Exchange { parallelism, .. } => PlanNode::Exchange {
                parallelism: *parallelism,
                input: next()?,
            },
        };
        Ok(node)
    }

    /// Expressions embedded in this node, in order.
    ///
    /// For `GroupBy` the grouping expressions come first, followed by the
    /// arguments of the aggregates that have one.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            PlanNode::Values { rows, .. } => rows.iter().flatten().collect(),
            PlanNode::Filter { predicate, .. } => vec![predicate],
            PlanNode::Project { expressions, .. } => expressions.iter().collect(),
            PlanNode::Sort { fields, .. } => fields.iter().map(|f| &f.expr).collect(),
            PlanNode::InnerJoin { condition, .. } => vec![condition],
            PlanNode::GroupBy {
                grouping,
                aggregates,
                ..
            } => grouping
                .iter()
                .chain(aggregates.iter().filter_map(|a| a.arg.as_ref()))
                .collect(),
            _ => vec![],
        }
    }

    /// Rebuild this node with new embedded expressions, in the order given
    /// by [`PlanNode::expressions`].
    pub fn with_expressions(&self, expressions: Vec<Expression>) -> PlanResult<PlanNode> {
        let expected = self.expressions().len();
        if expressions.len() != expected {
            return Err(PlanError::InvalidExpressionsNumber {
                node: self.node_name().to_string(),
                actual: expressions.len(),
                expected,
            });
        }

        let mut exprs = expressions.into_iter();
        // The count was checked above, so the iterator never runs dry
        let mut next = || exprs.next().unwrap_or_else(Expression::null);

        let node = match self {
            PlanNode::Values { schema, rows } => PlanNode::Values {
                schema: schema.clone(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|_| next()).collect())
                    .collect(),
            },
            PlanNode::Filter { input, .. } => PlanNode::Filter {
                predicate: next(),
                input: input.clone(),
            },
            PlanNode::Project { expressions, input } => PlanNode::Project {
                expressions: expressions.iter().map(|_| next()).collect(),
                input: input.clone(),
            },
            PlanNode::Sort { fields, input } => PlanNode::Sort {
                fields: fields.iter().map(|f| f.with_expr(next())).collect(),
                input: input.clone(),
            },
            PlanNode::InnerJoin { left, right, .. } => PlanNode::InnerJoin {
                left: left.clone(),
                right: right.clone(),
                condition: next(),
            },
            PlanNode::GroupBy {
                grouping,
                aggregates,
                input,
            } => {
                let grouping = grouping.iter().map(|_| next()).collect();
                let aggregates = aggregates
                    .iter()
                    .map(|a| a.with_arg(a.arg.as_ref().map(|_| next())))
                    .collect();
                PlanNode::GroupBy {
                    grouping,
                    aggregates,
                    input: input.clone(),
                }
            }
            other => other.clone(),
        };
        Ok(node)
    }

    /// Columns produced by this node
    pub fn schema(&self) -> Schema {
        match self {
            PlanNode::UnresolvedTable { .. } => Vec::new(),
            PlanNode::ResolvedTable { table } | PlanNode::PartitionScan { table, .. } => {
                table.schema().to_vec()
            }
            PlanNode::Values { schema, .. } => schema.clone(),
            PlanNode::Filter { input, .. }
            | PlanNode::Limit { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Distinct { input }
            | PlanNode::Exchange { input, .. } => input.schema(),
            PlanNode::Project { expressions, .. } => expressions.iter().map(column_info).collect(),
            PlanNode::CrossJoin { left, right } | PlanNode::InnerJoin { left, right, .. } => {
                let mut schema = left.schema();
                schema.extend(right.schema());
                schema
            }
            PlanNode::GroupBy {
                grouping,
                aggregates,
                ..
            } => {
                let mut schema: Schema = grouping.iter().map(column_info).collect();
                schema.extend(aggregates.iter().map(|a| {
                    let column = ColumnInfo::new(a.name(), a.data_type());
                    match a.function {
                        crate::executor::AggregateFunction::Count => column.not_null(),
                        _ => column,
                    }
                }));
                schema
            }
        }
    }

    /// Columns the embedded expressions are evaluated against: the
    /// concatenated schemas of the children.
    pub fn input_schema(&self) -> Schema {
        self.children()
            .into_iter()
            .flat_map(|c| c.schema())
            .collect()
    }

    /// True once every table and column in the tree has been bound.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, PlanNode::UnresolvedTable { .. })
            && self.expressions().iter().all(|e| e.is_resolved())
            && self.children().iter().all(|c| c.is_resolved())
    }

    /// Open a fresh row iterator over this plan.
    pub fn row_iter(&self, ctx: &Context) -> Result<Box<dyn RowIter>> {
        ctx.check_cancelled()?;
        let iter: Box<dyn RowIter> = match self {
            PlanNode::UnresolvedTable { name } => {
                return Err(PlanError::Unresolved(format!("table {}", name)).into());
            }
            PlanNode::ResolvedTable { table } => {
                Box::new(TableScanExecutor::new(ctx.clone(), Arc::clone(&table.0)))
            }
            PlanNode::PartitionScan { table, partition } => table.partition_rows(ctx, partition)?,
            PlanNode::Values { rows, .. } => {
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    values.push(
                        row.iter()
                            .map(|e| evaluate_expression(ctx, e, &[]))
                            .collect::<Result<Vec<_>, _>>()?,
                    );
                }
                Box::new(ValuesExecutor::new(ctx.clone(), values))
            }
            PlanNode::Filter { predicate, input } => Box::new(FilterExecutor::new(
                ctx.clone(),
                input.row_iter(ctx)?,
                predicate.clone(),
            )),
            PlanNode::Project { expressions, input } => Box::new(ProjectionExecutor::new(
                ctx.clone(),
                input.row_iter(ctx)?,
                expressions.clone(),
            )),
            PlanNode::Limit {
                limit,
                offset,
                input,
            } => Box::new(LimitExecutor::new(
                ctx.clone(),
                input.row_iter(ctx)?,
                *limit,
                *offset,
            )),
            PlanNode::Sort { fields, input } => Box::new(SortExecutor::new(
                ctx.clone(),
                input.row_iter(ctx)?,
                fields.clone(),
            )),
            PlanNode::CrossJoin { left, right } => Box::new(NestedLoopJoinExecutor::new(
                ctx.clone(),
                left.row_iter(ctx)?,
                right.row_iter(ctx)?,
                None,
            )),
            PlanNode::InnerJoin {
                left,
                right,
                condition,
            } => Box::new(NestedLoopJoinExecutor::new(
                ctx.clone(),
                left.row_iter(ctx)?,
                right.row_iter(ctx)?,
                Some(condition.clone()),
            )),
            PlanNode::GroupBy {
                grouping,
                aggregates,
                input,
            } => Box::new(AggregateExecutor::new(
                ctx.clone(),
                input.row_iter(ctx)?,
                grouping.clone(),
                aggregates.clone(),
            )),
            PlanNode::Distinct { input } => {
                Box::new(DistinctExecutor::new(ctx.clone(), input.row_iter(ctx)?))
            }
            PlanNode::Exchange { parallelism, input } => {
                Box::new(ExchangeExecutor::new(ctx, input, *parallelism)?)
            }
        };
        Ok(iter)
    }

    /// The first table scanned beneath this node, depth first.
    pub fn find_table(&self) -> Option<&TableRef> {
        match self {
            PlanNode::ResolvedTable { table } | PlanNode::PartitionScan { table, .. } => Some(table),
            other => other.children().into_iter().find_map(|c| c.find_table()),
        }
    }
}

fn column_info(expr: &Expression) -> ColumnInfo {
    ColumnInfo {
        name: expr.name(),
        data_type: expr.data_type(),
        nullable: expr.nullable(),
        source: expr.source(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{collect, AggregateFunction, SortOrder};
    use crate::expression::GetField;
    use crate::storage::MemoryTable;
    use crate::types::{DataType, Value};

    fn numbers(values: &[i64]) -> PlanNode {
        PlanNode::Values {
            schema: vec![ColumnInfo::new("n", DataType::Int64)],
            rows: values.iter().map(|v| vec![Expression::literal(*v)]).collect(),
        }
    }

    fn n() -> Expression {
        Expression::GetField(GetField::new(0, "n", DataType::Int64, true))
    }

    fn even() -> Expression {
        let remainder = Expression::sub_expr(
            n(),
            Expression::mul_expr(Expression::div_expr(n(), Expression::literal(2)), Expression::literal(2)),
        );
        Expression::eq(remainder, Expression::literal(0))
    }

    fn ints(rows: Vec<Vec<Value>>) -> Vec<i64> {
        rows.into_iter()
            .map(|r| match r[0] {
                Value::Int64(n) => n,
                ref other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    fn sample_nodes() -> Vec<PlanNode> {
        let table = TableRef::new(Arc::new(MemoryTable::new(
            "t",
            vec![ColumnInfo::new("n", DataType::Int64)],
        )));
        let leaf = || Box::new(numbers(&[1]));
        vec![
            PlanNode::UnresolvedTable { name: "t".into() },
            PlanNode::ResolvedTable { table: table.clone() },
            PlanNode::PartitionScan {
                table,
                partition: Partition::new(vec![0u8; 4]),
            },
            numbers(&[1, 2]),
            PlanNode::Filter { predicate: even(), input: leaf() },
            PlanNode::Project { expressions: vec![n()], input: leaf() },
            PlanNode::Limit { limit: Some(1), offset: 0, input: leaf() },
            PlanNode::Sort { fields: vec![SortField::asc(n())], input: leaf() },
            PlanNode::CrossJoin { left: leaf(), right: leaf() },
            PlanNode::InnerJoin { left: leaf(), right: leaf(), condition: Expression::literal(true) },
            PlanNode::GroupBy {
                grouping: vec![n()],
                aggregates: vec![Aggregate::count_star()],
                input: leaf(),
            },
            PlanNode::Distinct { input: leaf() },
            PlanNode::Exchange { parallelism: 2, input: leaf() },
        ]
    }

    #[test]
    fn test_filter_even_twice() -> Result<()> {
        let plan = PlanNode::Filter {
            predicate: even(),
            input: Box::new(numbers(&[1, 2, 3, 4])),
        };
        let ctx = Context::new();
        assert_eq!(ints(collect(plan.row_iter(&ctx)?)?), vec![2, 4]);
        // A fresh iterator reproduces the same sequence
        assert_eq!(ints(collect(plan.row_iter(&ctx)?)?), vec![2, 4]);
        Ok(())
    }

    #[test]
    fn test_with_children_wrong_count() {
        for node in sample_nodes() {
            let count = node.children().len();
            let children: Vec<PlanNode> = (0..count + 1).map(|_| numbers(&[])).collect();
            assert!(
                matches!(
                    node.with_children(children),
                    Err(PlanError::InvalidChildrenNumber { .. })
                ),
                "{}",
                node.node_name()
            );
        }
    }

    #[test]
    fn test_with_children_identity() -> Result<()> {
        for node in sample_nodes() {
            let children = node.children().into_iter().cloned().collect();
            assert_eq!(node.with_children(children)?, node);

            let expressions = node.expressions().into_iter().cloned().collect();
            assert_eq!(node.with_expressions(expressions)?, node);
        }
        Ok(())
    }

    #[test]
    fn test_with_expressions() -> Result<()> {
        let node = PlanNode::GroupBy {
            grouping: vec![n()],
            aggregates: vec![
                Aggregate::count_star(),
                Aggregate::new(AggregateFunction::Sum, Some(n())),
            ],
            input: Box::new(numbers(&[1])),
        };
        assert_eq!(node.expressions().len(), 2);

        let rebuilt = node.with_expressions(vec![Expression::literal(1), Expression::literal(2)])?;
        let PlanNode::GroupBy { grouping, aggregates, .. } = &rebuilt else {
            panic!("expected GroupBy");
        };
        assert_eq!(grouping, &vec![Expression::literal(1)]);
        assert_eq!(aggregates[0].arg, None);
        assert_eq!(aggregates[1].arg, Some(Expression::literal(2)));

        assert!(matches!(
            node.with_expressions(vec![]),
            Err(PlanError::InvalidExpressionsNumber { expected: 2, actual: 0, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_schema() {
        let join = PlanNode::CrossJoin {
            left: Box::new(numbers(&[1])),
            right: Box::new(PlanNode::Project {
                expressions: vec![Expression::alias(n(), "m"), Expression::literal("x")],
                input: Box::new(numbers(&[1])),
            }),
        };
        let names: Vec<String> = join.schema().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["n", "m", "'x'"]);

        let group = PlanNode::GroupBy {
            grouping: vec![],
            aggregates: vec![
                Aggregate::count_star(),
                Aggregate::new(AggregateFunction::Avg, Some(n())).with_alias("mean"),
            ],
            input: Box::new(numbers(&[1])),
        };
        let schema = group.schema();
        assert_eq!(schema[0].name, "COUNT(*)");
        assert!(!schema[0].nullable);
        assert_eq!(schema[1].data_type, DataType::Float64);
        assert_eq!(group.input_schema().len(), 1);
    }

    #[test]
    fn test_unresolved_plan_fails_to_execute() {
        let plan = PlanNode::Filter {
            predicate: Expression::literal(true),
            input: Box::new(PlanNode::UnresolvedTable { name: "users".into() }),
        };
        assert!(!plan.is_resolved());
        let err = plan.row_iter(&Context::new()).err().expect("unresolved plan");
        assert_eq!(
            err.downcast_ref::<PlanError>(),
            Some(&PlanError::Unresolved("table users".into()))
        );
    }

    #[test]
    fn test_pipeline() -> Result<()> {
        let plan = PlanNode::Limit {
            limit: Some(2),
            offset: 1,
            input: Box::new(PlanNode::Sort {
                fields: vec![SortField::new(n(), SortOrder::Desc)],
                input: Box::new(PlanNode::Distinct {
                    input: Box::new(numbers(&[3, 1, 3, 5, 4, 1])),
                }),
            }),
        };
        assert_eq!(ints(collect(plan.row_iter(&Context::new())?)?), vec![4, 3]);
        Ok(())
    }
}
