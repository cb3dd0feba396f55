//! Binding table and column names.

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::catalog::ColumnInfo;
use crate::expression::{ColumnRef, Expression, GetField};
use crate::plan::{PlanNode, TableRef};
use anyhow::Result;

/// Replace every `UnresolvedTable` with the database's table of that name.
pub fn resolve_tables(analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    plan.transform_up(&|node| match node {
        PlanNode::UnresolvedTable { name } => {
            let table = analyzer
                .database()
                .table(&name)
                .ok_or(AnalyzerError::TableNotFound(name))?;
            Ok(PlanNode::ResolvedTable {
                table: TableRef::new(table),
            })
        }
        other => Ok(other),
    })
}

/// Bind column references to positions in the input schema of the node
/// that uses them. Nodes whose children are not resolved yet are skipped.
pub fn resolve_columns(_analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    plan.transform_up(&|node| {
        let expressions = node.expressions();
        if expressions.iter().all(|e| e.is_resolved())
            || !node.children().iter().all(|c| c.is_resolved())
        {
            return Ok(node);
        }

        let schema = node.input_schema();
        let resolved = expressions
            .into_iter()
            .map(|e| {
                e.try_transform_up(&|e| match e {
                    Expression::UnresolvedColumn(col) => bind_column(&col, &schema),
                    other => Ok(other),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(node.with_expressions(resolved)?)
    })
}

fn bind_column(col: &ColumnRef, schema: &[ColumnInfo]) -> Result<Expression> {
    let mut matches = schema
        .iter()
        .enumerate()
        .filter(|(_, c)| c.matches(col.table.as_deref(), &col.name));

    let Some((index, column)) = matches.next() else {
        return Err(AnalyzerError::ColumnNotFound(col.to_string()).into());
    };
    if matches.next().is_some() {
        return Err(AnalyzerError::AmbiguousColumn(col.to_string()).into());
    }

    let mut field = GetField::new(index, column.name.clone(), column.data_type.clone(), column.nullable);
    if let Some(source) = &column.source {
        field = field.with_table(source.clone());
    }
    Ok(Expression::GetField(field))
}
