//! Expression evaluation implementation.

use crate::context::Context;
use crate::expression::{
    BinaryOperator, Expression, ExpressionError, ExpressionResult, UnaryOperator,
};
use crate::types::{DataType, Value};
use std::cmp::Ordering;

/// Evaluator for expressions
pub struct ExpressionEvaluator<'a> {
    ctx: &'a Context,
    /// The row values to evaluate against
    row: &'a [Value],
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(ctx: &'a Context, row: &'a [Value]) -> Self {
        Self { ctx, row }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&self, expr: &Expression) -> ExpressionResult<Value> {
        match expr {
            Expression::Literal(lit) => Ok(lit.value.clone()),

            Expression::UnresolvedColumn(col) => Err(ExpressionError::UnresolvedColumn {
                name: col.to_string(),
            }),

            Expression::GetField(field) => {
                self.row
                    .get(field.index)
                    .cloned()
                    .ok_or(ExpressionError::ColumnIndexOutOfBounds {
                        index: field.index,
                        row_size: self.row.len(),
                    })
            }

            Expression::Alias { expr, .. } => self.evaluate(expr),

            Expression::Tuple(elements) => {
                if elements.len() == 1 {
                    return self.evaluate(&elements[0]);
                }
                let values = elements
                    .iter()
                    .map(|e| self.evaluate(e))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(Value::Tuple(values))
            }

            Expression::BinaryOp { op, left, right } => match op {
                BinaryOperator::And | BinaryOperator::Or => self.evaluate_logical(*op, left, right),
                _ => {
                    let left_val = self.evaluate(left)?;
                    let right_val = self.evaluate(right)?;
                    self.evaluate_binary_op(*op, left_val, right_val)
                }
            },

            Expression::UnaryOp { op, operand } => {
                let operand_val = self.evaluate(operand)?;
                self.evaluate_unary_op(*op, operand_val)
            }

            Expression::Cast { expr, data_type } => data_type.convert(&self.evaluate(expr)?),

            Expression::InTuple(in_tuple) => in_tuple.eval(self.ctx, self.row),

            Expression::HashInTuple(hit) => hit.eval(self.ctx, self.row),
        }
    }

    /// AND/OR with three-valued logic. The right side is skipped once the
    /// left side decides the result.
    fn evaluate_logical(
        &self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> ExpressionResult<Value> {
        let short_circuit = op == BinaryOperator::Or;
        let l = truth_value(op.as_str(), &self.evaluate(left)?)?;
        if l == Some(short_circuit) {
            return Ok(Value::Boolean(short_circuit));
        }
        let r = truth_value(op.as_str(), &self.evaluate(right)?)?;
        if r == Some(short_circuit) {
            return Ok(Value::Boolean(short_circuit));
        }
        Ok(match (l, r) {
            (Some(_), Some(_)) => Value::Boolean(!short_circuit),
            _ => Value::Null,
        })
    }

    /// Evaluate a binary operation
    fn evaluate_binary_op(
        &self,
        op: BinaryOperator,
        left: Value,
        right: Value,
    ) -> ExpressionResult<Value> {
        if op.is_comparison() {
            return compare_values(op, &left, &right);
        }

        // NULL propagates through arithmetic and concatenation
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        match op {
            BinaryOperator::Concat => match (left.to_text(), right.to_text()) {
                (Some(a), Some(b)) => Ok(Value::String(a + &b)),
                _ => Err(invalid_operands(op.as_str(), &left, Some(&right))),
            },
            _ => {
                let ty = DataType::arithmetic_type(&left.data_type(), &right.data_type())
                    .ok_or_else(|| invalid_operands(op.as_str(), &left, Some(&right)))?;
                arithmetic(op, &ty.convert(&left)?, &ty.convert(&right)?)
            }
        }
    }

    /// Evaluate a unary operation
    fn evaluate_unary_op(&self, op: UnaryOperator, operand: Value) -> ExpressionResult<Value> {
        match op {
            UnaryOperator::Not => Ok(match truth_value(op.as_str(), &operand)? {
                Some(b) => Value::Boolean(!b),
                None => Value::Null,
            }),

            UnaryOperator::IsNull => Ok(Value::Boolean(operand.is_null())),

            UnaryOperator::IsNotNull => Ok(Value::Boolean(!operand.is_null())),

            UnaryOperator::Plus | UnaryOperator::Minus => {
                if operand.is_null() {
                    return Ok(Value::Null);
                }
                let ty = op
                    .output_type(&operand.data_type())
                    .ok_or_else(|| invalid_operands(op.as_str(), &operand, None))?;
                let value = ty.convert(&operand)?;
                if op == UnaryOperator::Plus {
                    return Ok(value);
                }
                let overflow = || ExpressionError::Overflow {
                    operator: op.as_str().to_string(),
                };
                match value {
                    Value::Int64(n) => n.checked_neg().map(Value::Int64).ok_or_else(overflow),
                    Value::UInt64(n) => i64::try_from(n)
                        .ok()
                        .and_then(i64::checked_neg)
                        .map(Value::Int64)
                        .ok_or_else(overflow),
                    Value::Float64(f) => Ok(Value::Float64(-f)),
                    other => Err(invalid_operands(op.as_str(), &other, None)),
                }
            }
        }
    }
}

/// Truth value of a logical operand: `None` stands for NULL.
fn truth_value(operator: &str, value: &Value) -> ExpressionResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        v if v.data_type().is_numeric() => match DataType::Boolean.convert(v)? {
            Value::Boolean(b) => Ok(Some(b)),
            _ => Ok(None),
        },
        v => Err(invalid_operands(operator, v, None)),
    }
}

fn invalid_operands(operator: &str, left: &Value, right: Option<&Value>) -> ExpressionError {
    ExpressionError::InvalidOperandTypes {
        operator: operator.to_string(),
        left: left.data_type(),
        right: right.map(|r| r.data_type()),
    }
}

/// Compare two values under their common comparison type.
fn compare_values(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let ty = DataType::comparison_type(&left.data_type(), &right.data_type())?;
    let (left, right) = (ty.convert_for_compare(left)?, ty.convert_for_compare(right)?);

    let result = match op {
        BinaryOperator::Eq => ty.sql_equals(&left, &right)?,
        BinaryOperator::Ne => ty.sql_equals(&left, &right)?.map(|eq| !eq),
        _ => ty.sql_compare(&left, &right)?.map(|ord| match op {
            BinaryOperator::Lt => ord == Ordering::Less,
            BinaryOperator::Le => ord != Ordering::Greater,
            BinaryOperator::Gt => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        }),
    };
    Ok(result.map(Value::Boolean).unwrap_or(Value::Null))
}

/// Checked arithmetic over operands already converted to the result type.
pub(crate) fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionResult<Value> {
    let overflow = || ExpressionError::Overflow {
        operator: op.as_str().to_string(),
    };

    match (left, right) {
        (Value::Int64(a), Value::Int64(b)) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(*b),
                BinaryOperator::Sub => a.checked_sub(*b),
                BinaryOperator::Mul => a.checked_mul(*b),
                _ => {
                    if *b == 0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    a.checked_div(*b)
                }
            };
            result.map(Value::Int64).ok_or_else(overflow)
        }
        (Value::UInt64(a), Value::UInt64(b)) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(*b),
                BinaryOperator::Sub => a.checked_sub(*b),
                BinaryOperator::Mul => a.checked_mul(*b),
                _ => {
                    if *b == 0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    a.checked_div(*b)
                }
            };
            result.map(Value::UInt64).ok_or_else(overflow)
        }
        (Value::Float64(a), Value::Float64(b)) => {
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                _ => {
                    if *b == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    a / b
                }
            };
            Ok(Value::Float64(result))
        }
        _ => Err(invalid_operands(op.as_str(), left, Some(right))),
    }
}

impl Expression {
    /// Evaluate this expression against one row.
    pub fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        ExpressionEvaluator::new(ctx, row).evaluate(self)
    }
}

/// Helper function to evaluate an expression against row values
pub fn evaluate_expression(
    ctx: &Context,
    expr: &Expression,
    row: &[Value],
) -> ExpressionResult<Value> {
    ExpressionEvaluator::new(ctx, row).evaluate(expr)
}

/// Evaluate a predicate: `Some(true)` keeps the row, `Some(false)` and
/// `None` (NULL) drop it. Non-boolean results are a type mismatch.
pub fn evaluate_predicate(
    ctx: &Context,
    expr: &Expression,
    row: &[Value],
) -> ExpressionResult<Option<bool>> {
    match evaluate_expression(ctx, expr, row)? {
        Value::Boolean(b) => Ok(Some(b)),
        Value::Null => Ok(None),
        other => Err(ExpressionError::TypeMismatch {
            expected: DataType::Boolean,
            actual: other.data_type(),
            context: format!("predicate {}", expr),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &Expression) -> ExpressionResult<Value> {
        expr.eval(&Context::new(), &[])
    }

    fn field(index: usize, data_type: DataType) -> Expression {
        Expression::get_field(index, format!("c{}", index), data_type, true)
    }

    #[test]
    fn test_literal_evaluation() {
        assert_eq!(eval(&Expression::literal(42)).unwrap(), Value::Int32(42));
        assert_eq!(eval(&Expression::literal(true)).unwrap(), Value::Boolean(true));
        assert_eq!(
            eval(&Expression::literal("hello")).unwrap(),
            Value::String("hello".to_string())
        );
        assert_eq!(eval(&Expression::null()).unwrap(), Value::Null);
    }

    #[test]
    fn test_get_field_evaluation() {
        let ctx = Context::new();
        let row = vec![Value::Int32(1), Value::from("test"), Value::Boolean(true)];

        assert_eq!(
            field(0, DataType::Int32).eval(&ctx, &row).unwrap(),
            Value::Int32(1)
        );
        assert_eq!(
            field(2, DataType::Boolean).eval(&ctx, &row).unwrap(),
            Value::Boolean(true)
        );

        // Out of bounds
        assert!(matches!(
            field(3, DataType::Int32).eval(&ctx, &row),
            Err(ExpressionError::ColumnIndexOutOfBounds { index: 3, row_size: 3 })
        ));

        // Unresolved columns cannot be evaluated
        assert!(matches!(
            Expression::col("a").eval(&ctx, &row),
            Err(ExpressionError::UnresolvedColumn { .. })
        ));
    }

    #[test]
    fn test_arithmetic_operations() {
        let expr = Expression::add_expr(Expression::literal(10), Expression::literal(5));
        assert_eq!(eval(&expr).unwrap(), Value::Int64(15));

        let expr = Expression::sub_expr(Expression::literal(10), Expression::literal(15));
        assert_eq!(eval(&expr).unwrap(), Value::Int64(-5));

        let expr = Expression::mul_expr(Expression::literal(4), Expression::literal(3));
        assert_eq!(eval(&expr).unwrap(), Value::Int64(12));

        let expr = Expression::div_expr(Expression::literal(10), Expression::literal(3));
        assert_eq!(eval(&expr).unwrap(), Value::Int64(3));

        let expr = Expression::add_expr(Expression::literal(1), Expression::literal(0.5));
        assert_eq!(eval(&expr).unwrap(), Value::Float64(1.5));

        // Numeric strings take part in arithmetic as floats
        let expr = Expression::add_expr(Expression::literal(10), Expression::literal("5"));
        assert_eq!(eval(&expr).unwrap(), Value::Float64(15.0));

        // Division by zero
        let expr = Expression::div_expr(Expression::literal(10), Expression::literal(0));
        assert!(matches!(eval(&expr), Err(ExpressionError::DivisionByZero)));

        // Overflow
        let expr = Expression::add_expr(Expression::literal(i64::MAX), Expression::literal(1));
        assert!(matches!(eval(&expr), Err(ExpressionError::Overflow { .. })));

        // Type mismatch
        let expr = Expression::add_expr(Expression::literal(10), Expression::literal("five"));
        assert!(matches!(eval(&expr), Err(ExpressionError::Conversion { .. })));
        let expr = Expression::add_expr(
            Expression::literal(10),
            Expression::literal(Value::Date(chrono::NaiveDate::MIN)),
        );
        assert!(matches!(
            eval(&expr),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));
    }

    #[test]
    fn test_comparison_operations() {
        let expr = Expression::eq(Expression::literal(5), Expression::literal(5));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::ne(Expression::literal(5), Expression::literal(3));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::lt(Expression::literal(3), Expression::literal(5));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::ge(Expression::literal(5), Expression::literal(5));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        // Cross-type comparisons promote
        let expr = Expression::eq(Expression::literal(5), Expression::literal(5.0));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));
        let expr = Expression::lt(Expression::literal(2), Expression::literal("10"));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::lt(Expression::literal("abc"), Expression::literal("def"));
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_signed_unsigned_comparison_is_exact() {
        // Both values round to the same f64
        let signed = || Expression::literal(Value::Int64(9_007_199_254_740_993));
        let unsigned = || Expression::literal(Value::UInt64(9_007_199_254_740_992));

        let expr = Expression::eq(signed(), unsigned());
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(false));
        let expr = Expression::gt(signed(), unsigned());
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::lt(
            Expression::literal(Value::Int64(-1)),
            Expression::literal(Value::UInt64(u64::MAX)),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_tuple_comparison() {
        let pair = |a: Expression, b: Expression| Expression::tuple(vec![a, b]);

        let expr = Expression::eq(
            pair(Expression::literal(1), Expression::literal("a")),
            pair(Expression::literal(1), Expression::literal("a")),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        // One differing element decides false even next to a NULL
        let expr = Expression::eq(
            pair(Expression::literal(1), Expression::null()),
            pair(Expression::literal(2), Expression::literal("a")),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(false));

        let expr = Expression::eq(
            pair(Expression::literal(1), Expression::null()),
            pair(Expression::literal(1), Expression::literal("a")),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Null);

        let expr = Expression::lt(
            pair(Expression::literal(1), Expression::literal(9)),
            pair(Expression::literal(2), Expression::literal(0)),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        // Column count mismatch is structural
        let expr = Expression::eq(
            pair(Expression::literal(1), Expression::literal(2)),
            Expression::literal(1),
        );
        assert!(matches!(
            eval(&expr),
            Err(ExpressionError::InvalidOperandColumns { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_logical_operations() {
        let t = || Expression::literal(true);
        let f = || Expression::literal(false);
        let n = Expression::null;

        assert_eq!(eval(&Expression::and(t(), t())).unwrap(), Value::Boolean(true));
        assert_eq!(eval(&Expression::and(t(), f())).unwrap(), Value::Boolean(false));
        assert_eq!(eval(&Expression::or(f(), t())).unwrap(), Value::Boolean(true));
        assert_eq!(eval(&Expression::or(f(), f())).unwrap(), Value::Boolean(false));

        // Three-valued logic
        assert_eq!(eval(&Expression::and(n(), f())).unwrap(), Value::Boolean(false));
        assert_eq!(eval(&Expression::and(n(), t())).unwrap(), Value::Null);
        assert_eq!(eval(&Expression::or(n(), t())).unwrap(), Value::Boolean(true));
        assert_eq!(eval(&Expression::or(n(), f())).unwrap(), Value::Null);

        assert_eq!(eval(&Expression::not_expr(t())).unwrap(), Value::Boolean(false));
        assert_eq!(eval(&Expression::not_expr(n())).unwrap(), Value::Null);
    }

    #[test]
    fn test_logical_short_circuit() {
        // The right side would fail if it were evaluated
        let failing = Expression::div_expr(Expression::literal(1), Expression::literal(0));
        let expr = Expression::and(
            Expression::literal(false),
            Expression::eq(failing.clone(), Expression::literal(1)),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(false));

        let expr = Expression::or(
            Expression::literal(true),
            Expression::eq(failing, Expression::literal(1)),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::and(Expression::literal("x"), Expression::literal(true));
        assert!(matches!(
            eval(&expr),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));
    }

    #[test]
    fn test_null_operations() {
        let ctx = Context::new();
        let row = vec![Value::Null, Value::Int32(5)];

        let expr = Expression::is_null(field(0, DataType::Int32));
        assert_eq!(expr.eval(&ctx, &row).unwrap(), Value::Boolean(true));

        let expr = Expression::is_not_null(field(1, DataType::Int32));
        assert_eq!(expr.eval(&ctx, &row).unwrap(), Value::Boolean(true));

        // NULL propagation in arithmetic
        let expr = Expression::add_expr(field(0, DataType::Int32), Expression::literal(5));
        assert_eq!(expr.eval(&ctx, &row).unwrap(), Value::Null);

        // NULL in comparisons
        let expr = Expression::eq(field(0, DataType::Int32), Expression::literal(5));
        assert_eq!(expr.eval(&ctx, &row).unwrap(), Value::Null);
    }

    #[test]
    fn test_cast_and_concat() {
        let expr = Expression::cast(Expression::literal("42"), DataType::Int32);
        assert_eq!(eval(&expr).unwrap(), Value::Int32(42));

        let expr = Expression::cast(Expression::literal(1.5), DataType::Int32);
        assert!(matches!(eval(&expr), Err(ExpressionError::Conversion { .. })));

        let expr = Expression::concat(Expression::literal("id-"), Expression::literal(7));
        assert_eq!(eval(&expr).unwrap(), Value::from("id-7"));
    }

    #[test]
    fn test_unary_arithmetic() {
        let expr = Expression::unary_op(UnaryOperator::Plus, Expression::literal(42));
        assert_eq!(eval(&expr).unwrap(), Value::Int64(42));

        let expr = Expression::unary_op(UnaryOperator::Minus, Expression::literal(42));
        assert_eq!(eval(&expr).unwrap(), Value::Int64(-42));

        let expr = Expression::unary_op(UnaryOperator::Minus, Expression::null());
        assert_eq!(eval(&expr).unwrap(), Value::Null);

        let expr = Expression::unary_op(UnaryOperator::Minus, Expression::literal(i64::MIN));
        assert!(matches!(eval(&expr), Err(ExpressionError::Overflow { .. })));
    }

    #[test]
    fn test_evaluate_predicate() {
        let ctx = Context::new();
        let expr = Expression::gt(field(0, DataType::Int32), Expression::literal(5));

        assert_eq!(
            evaluate_predicate(&ctx, &expr, &[Value::Int32(10)]).unwrap(),
            Some(true)
        );
        assert_eq!(
            evaluate_predicate(&ctx, &expr, &[Value::Int32(3)]).unwrap(),
            Some(false)
        );
        assert_eq!(evaluate_predicate(&ctx, &expr, &[Value::Null]).unwrap(), None);

        let expr = field(0, DataType::Int32);
        assert!(matches!(
            evaluate_predicate(&ctx, &expr, &[Value::Int32(10)]),
            Err(ExpressionError::TypeMismatch { .. })
        ));
    }
}
