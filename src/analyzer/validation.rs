//! Checks run once after the plan has been rewritten.

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::catalog::schema_types;
use crate::expression::{validate_filter_predicate, TypeChecker};
use crate::plan::PlanNode;
use anyhow::Result;

/// Fail if any table or column is still unbound.
pub fn validate_resolved(_analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    if plan.is_resolved() {
        return Ok(plan.clone());
    }
    let mut unresolved = None;
    find_unresolved(plan, &mut unresolved);
    Err(AnalyzerError::UnresolvedNode(unresolved.unwrap_or_else(|| plan.describe())).into())
}

fn find_unresolved(node: &PlanNode, found: &mut Option<String>) {
    if found.is_some() {
        return;
    }
    for child in node.children() {
        find_unresolved(child, found);
    }
    if found.is_none() {
        let own_unresolved = matches!(node, PlanNode::UnresolvedTable { .. })
            || node.expressions().iter().any(|e| !e.is_resolved());
        if own_unresolved {
            *found = Some(node.describe());
        }
    }
}

/// Type check every expression against the columns its node reads.
pub fn validate_operand_columns(_analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    check_nodes(plan, &|node| {
        let types = schema_types(&node.input_schema());
        let checker = TypeChecker::new(&types);
        for expr in node.expressions() {
            checker.check(&expr)?;
        }
        Ok(())
    })?;
    Ok(plan.clone())
}

/// Filter predicates and join conditions must produce a boolean.
pub fn validate_filter_types(_analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    check_nodes(plan, &|node| {
        let predicate = match node {
            PlanNode::Filter { predicate, .. } => predicate,
            PlanNode::InnerJoin { condition, .. } => condition,
            _ => return Ok(()),
        };
        validate_filter_predicate(predicate, &schema_types(&node.input_schema()))?;
        Ok(())
    })?;
    Ok(plan.clone())
}

fn check_nodes<F>(node: &PlanNode, check: &F) -> Result<()>
where
    F: Fn(&PlanNode) -> Result<()>,
{
    for child in node.children() {
        check_nodes(child, check)?;
    }
    check(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::analyzer;
    use crate::expression::{ErrorKind, Expression, ExpressionError};
    use crate::plan::PlanBuilder;

    #[test]
    fn test_validate_resolved() -> Result<()> {
        let analyzer = analyzer()?;
        let plan = PlanBuilder::scan("users").filter(Expression::col("id")).build();
        let err = validate_resolved(&analyzer, &plan).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalyzerError>(),
            Some(&AnalyzerError::UnresolvedNode("UnresolvedTable: users".into()))
        );
        Ok(())
    }

    #[test]
    fn test_validate_filter_types() -> Result<()> {
        let analyzer = analyzer()?;
        let table = analyzer.database().table("users");
        let Some(table) = table else {
            panic!("users table missing");
        };
        let plan = PlanBuilder::table(table)
            .filter(Expression::get_field(0, "id", crate::types::DataType::Int64, false))
            .build();

        assert!(validate_operand_columns(&analyzer, &plan).is_ok());
        let err = validate_filter_types(&analyzer, &plan).unwrap_err();
        let err = err.downcast_ref::<ExpressionError>().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::UnsupportedOperand));
        Ok(())
    }
}
