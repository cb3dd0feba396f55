//! Bottom-up expression rewriting.

use crate::expression::{Expression, ExpressionError, ExpressionResult};

impl Expression {
    /// Rebuild the tree bottom-up: children are transformed first and
    /// reattached through [`Expression::with_children`], then `f` is applied
    /// to the rebuilt node. The input tree is never modified.
    pub fn transform_up<F>(&self, f: &F) -> ExpressionResult<Expression>
    where
        F: Fn(Expression) -> ExpressionResult<Expression>,
    {
        self.try_transform_up(f)
    }

    /// [`Expression::transform_up`] for rewrites with their own error type.
    pub fn try_transform_up<F, E>(&self, f: &F) -> Result<Expression, E>
    where
        F: Fn(Expression) -> Result<Expression, E>,
        E: From<ExpressionError>,
    {
        let children = self.children();
        let node = if children.is_empty() {
            self.clone()
        } else {
            let transformed = children
                .into_iter()
                .map(|c| c.try_transform_up(f))
                .collect::<Result<Vec<_>, E>>()?;
            self.with_children(transformed)?
        };
        f(node)
    }
}

/// Free-function form of [`Expression::transform_up`].
pub fn transform_up<F>(expr: &Expression, f: &F) -> ExpressionResult<Expression>
where
    F: Fn(Expression) -> ExpressionResult<Expression>,
{
    expr.transform_up(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::expression::expr::Literal;
    use crate::types::{DataType, Value};

    fn sample() -> Expression {
        let a = Expression::get_field(0, "a", DataType::Int64, true);
        let b = Expression::get_field(1, "b", DataType::Varchar, true);
        Expression::and(
            Expression::in_tuple(
                Expression::tuple(vec![a.clone(), b]),
                Expression::tuple(vec![
                    Expression::tuple(vec![Expression::literal(1), Expression::literal("x")]),
                    Expression::tuple(vec![Expression::literal(2), Expression::literal("y")]),
                ]),
            ),
            Expression::not_expr(Expression::is_null(Expression::cast(
                Expression::add_expr(a, Expression::literal(1)),
                DataType::Varchar,
            ))),
        )
    }

    #[test]
    fn test_identity_keeps_representation() {
        let expr = sample();
        let same = expr.transform_up(&|e| Ok(e)).unwrap();
        assert_eq!(same.to_string(), expr.to_string());
        assert_eq!(same, expr);

        let hashed = Expression::hash_in_tuple(
            Expression::col("a"),
            Expression::tuple(vec![Expression::literal(1)]),
        )
        .unwrap();
        let same = transform_up(&hashed, &|e| Ok(e)).unwrap();
        assert_eq!(same.to_string(), "(a HASH IN (1))");
    }

    #[test]
    fn test_rewrite_columns() {
        let expr = Expression::add_expr(Expression::col("a"), Expression::col("b"));
        let rewritten = expr
            .transform_up(&|e| match e {
                Expression::UnresolvedColumn(col) => Ok(Expression::literal(col.name.len() as i64)),
                other => Ok(other),
            })
            .unwrap();
        assert_eq!(rewritten.to_string(), "(1 + 1)");
        // The input tree is untouched
        assert_eq!(expr.to_string(), "(a + b)");
    }

    #[test]
    fn test_bottom_up_order() {
        // Folding constants bottom-up collapses the whole tree in one pass
        let ctx = Context::new();
        let expr = Expression::mul_expr(
            Expression::add_expr(Expression::literal(1), Expression::literal(2)),
            Expression::literal(3),
        );
        let fold = |e: Expression| {
            if matches!(e, Expression::Literal(_)) || !e.is_constant() {
                return Ok(e);
            }
            let value = e.eval(&ctx, &[])?;
            Ok(Expression::Literal(Literal::new(value)))
        };
        let folded = expr.transform_up(&fold).unwrap();
        assert_eq!(folded, Expression::literal(Value::Int64(9)));

        // Applying an idempotent rewrite again changes nothing
        assert_eq!(folded.transform_up(&fold).unwrap(), folded);
    }

    #[test]
    fn test_error_aborts_rewrite() {
        let expr = Expression::eq(Expression::col("a"), Expression::literal(1));
        let result = expr.transform_up(&|e| match e {
            Expression::UnresolvedColumn(col) => {
                Err(crate::expression::ExpressionError::UnresolvedColumn { name: col.name })
            }
            other => Ok(other),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_foreign_error_type() {
        let expr = Expression::not_expr(Expression::col("missing"));
        let result: anyhow::Result<Expression> = expr.try_transform_up(&|e| match e {
            Expression::UnresolvedColumn(col) => Err(anyhow::anyhow!("no column {}", col)),
            other => Ok(other),
        });
        assert_eq!(result.unwrap_err().to_string(), "no column missing");
    }
}
