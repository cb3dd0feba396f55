//! Projection executor: evaluates a list of expressions against every input
//! row and emits the results as a new row.

use crate::context::Context;
use crate::executor::RowIter;
use crate::expression::{evaluate_expression, Expression};
use crate::types::Row;
use anyhow::Result;

pub struct ProjectionExecutor {
    ctx: Context,
    child: Box<dyn RowIter>,
    expressions: Vec<Expression>,
}

impl ProjectionExecutor {
    pub fn new(ctx: Context, child: Box<dyn RowIter>, expressions: Vec<Expression>) -> Self {
        Self {
            ctx,
            child,
            expressions,
        }
    }
}

impl RowIter for ProjectionExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        self.ctx.check_cancelled()?;
        let Some(row) = self.child.next()? else {
            return Ok(None);
        };

        let mut projected = Vec::with_capacity(self.expressions.len());
        for expr in &self.expressions {
            projected.push(evaluate_expression(&self.ctx, expr, &row)?);
        }
        Ok(Some(projected))
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::collect;
    use crate::executor::testing::MockRowIter;
    use crate::expression::GetField;
    use crate::types::{DataType, Value};

    #[test]
    fn test_projection_reorders_and_computes() -> Result<()> {
        let rows = vec![
            vec![Value::Int64(1), Value::from("alice")],
            vec![Value::Int64(2), Value::Null],
        ];
        let id = Expression::GetField(GetField::new(0, "id", DataType::Int64, false));
        let name = Expression::GetField(GetField::new(1, "name", DataType::Varchar, true));
        let iter = ProjectionExecutor::new(
            Context::new(),
            Box::new(MockRowIter::new(rows)),
            vec![
                name,
                Expression::alias(Expression::mul_expr(id, Expression::literal(10)), "scaled"),
            ],
        );

        let rows = collect(Box::new(iter))?;
        assert_eq!(
            rows,
            vec![
                vec![Value::from("alice"), Value::Int64(10)],
                vec![Value::Null, Value::Int64(20)],
            ]
        );
        Ok(())
    }

    #[test]
    fn test_projection_of_empty_input() -> Result<()> {
        let iter = ProjectionExecutor::new(
            Context::new(),
            Box::new(MockRowIter::new(vec![])),
            vec![Expression::literal(1)],
        );
        assert!(collect(Box::new(iter))?.is_empty());
        Ok(())
    }
}
