//! Rewrites that make a resolved plan cheaper to run.

use crate::analyzer::Analyzer;
use crate::context::Context;
use crate::expression::expr::Literal;
use crate::expression::{BinaryOperator, Expression, ExpressionResult};
use crate::plan::{PlanNode, Recursion};
use crate::types::{DataType, Value};
use anyhow::Result;

/// Evaluate constant subexpressions, simplify AND/OR with boolean literals
/// and drop filters that are always TRUE.
///
/// A constant that fails to evaluate is left in place so that the error is
/// raised per row at execution time.
pub fn fold_constants(_analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    let ctx = Context::new();
    let folded = plan.transform_expressions_up(&|e| fold_expression(&ctx, e))?;
    folded.transform_up(&|node| match node {
        PlanNode::Filter { predicate, input } if is_bool_literal(&predicate, true) => Ok(*input),
        other => Ok(other),
    })
}

fn fold_expression(ctx: &Context, expr: Expression) -> ExpressionResult<Expression> {
    match &expr {
        // Tuples stay tuples so IN keeps seeing a candidate list, and
        // aliases keep their output name
        Expression::Literal(_) | Expression::Tuple(_) | Expression::Alias { .. } => Ok(expr),
        e if e.is_constant() => match e.eval(ctx, &[]) {
            Ok(Value::Null) => Ok(Expression::Literal(Literal::with_type(Value::Null, e.data_type()))),
            Ok(value) => Ok(Expression::Literal(Literal::new(value))),
            Err(_) => Ok(expr),
        },
        Expression::BinaryOp {
            op: op @ (BinaryOperator::And | BinaryOperator::Or),
            left,
            right,
        } => Ok(simplify_logical(*op, left, right).unwrap_or(expr)),
        _ => Ok(expr),
    }
}

/// Identity and absorption rules for a logical operator with one boolean
/// literal operand. Only rewrites that keep the exact result are applied.
fn simplify_logical(op: BinaryOperator, left: &Expression, right: &Expression) -> Option<Expression> {
    // TRUE for AND, FALSE for OR
    let identity = op == BinaryOperator::And;
    let is_boolean = |e: &Expression| e.data_type() == DataType::Boolean;

    if is_bool_literal(left, !identity) {
        // The left side decides before the right side is evaluated
        return Some(left.clone());
    }
    if is_bool_literal(left, identity) && is_boolean(right) {
        return Some(right.clone());
    }
    if is_bool_literal(right, identity) && is_boolean(left) {
        return Some(left.clone());
    }
    None
}

fn is_bool_literal(expr: &Expression, value: bool) -> bool {
    matches!(expr, Expression::Literal(lit) if lit.value == Value::Boolean(value))
}

/// Convert linear IN lists whose candidates are all non-NULL constants into
/// the hashed variant. Lists that cannot be hashed stay linear.
pub fn hash_in_tuples(_analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    plan.transform_expressions_up(&|e| match e {
        Expression::InTuple(in_tuple) if hashable(in_tuple.left(), in_tuple.right()) => {
            let left = in_tuple.left().clone();
            let right = in_tuple.right().clone();
            Ok(Expression::hash_in_tuple(left, right)
                .unwrap_or(Expression::InTuple(in_tuple)))
        }
        other => Ok::<_, crate::expression::ExpressionError>(other),
    })
}

fn hashable(left: &Expression, right: &Expression) -> bool {
    let Expression::Tuple(candidates) = right else {
        return false;
    };
    left.is_resolved() && candidates.iter().all(non_null_constant)
}

fn non_null_constant(expr: &Expression) -> bool {
    match expr {
        Expression::Literal(lit) => !lit.value.contains_null(),
        Expression::Tuple(elements) => elements.iter().all(non_null_constant),
        _ => false,
    }
}

/// Run scans in parallel: each chain of filters and projections that ends
/// at a table is wrapped in an `Exchange`.
pub fn parallelize(analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
    let parallelism = analyzer.config().parallelism;
    if parallelism <= 1 {
        return Ok(plan.clone());
    }

    plan.transform_down(&|node| match node {
        PlanNode::Exchange { .. } => Ok((node, Recursion::Skip)),
        node if is_scan_chain(&node) => Ok((
            PlanNode::Exchange {
                parallelism,
                input: Box::new(node),
            },
            Recursion::Skip,
        )),
        other => Ok((other, Recursion::Continue)),
    })
}

fn is_scan_chain(node: &PlanNode) -> bool {
    match node {
        PlanNode::ResolvedTable { .. } => true,
        PlanNode::Filter { input, .. } | PlanNode::Project { input, .. } => is_scan_chain(input),
        _ => false,
    }
}
