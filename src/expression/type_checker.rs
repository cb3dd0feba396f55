//! Type checking for resolved expressions.

use crate::expression::{Expression, ExpressionError, ExpressionResult};
use crate::types::DataType;

/// Type checker for expressions
pub struct TypeChecker<'a> {
    /// Types of the input columns
    schema: &'a [DataType],
}

impl<'a> TypeChecker<'a> {
    /// Create a new type checker with the given schema
    pub fn new(schema: &'a [DataType]) -> Self {
        Self { schema }
    }

    /// Type check an expression and return its output type
    ///
    /// NULL literals check as [`DataType::Null`]; they are accepted wherever
    /// a value is and handled at runtime.
    pub fn check(&self, expr: &Expression) -> ExpressionResult<DataType> {
        match expr {
            Expression::Literal(lit) => Ok(lit.data_type.clone()),

            Expression::UnresolvedColumn(col) => Err(ExpressionError::UnresolvedColumn {
                name: col.to_string(),
            }),

            Expression::GetField(field) => {
                if field.index >= self.schema.len() {
                    return Err(ExpressionError::ColumnIndexOutOfBounds {
                        index: field.index,
                        row_size: self.schema.len(),
                    });
                }
                Ok(field.data_type.clone())
            }

            Expression::Alias { expr, .. } => self.check(expr),

            Expression::Tuple(elements) => {
                if elements.len() == 1 {
                    return self.check(&elements[0]);
                }
                elements
                    .iter()
                    .map(|e| self.check(e))
                    .collect::<ExpressionResult<Vec<_>>>()
                    .map(DataType::Tuple)
            }

            Expression::BinaryOp { op, left, right } => {
                let left_type = self.check(left)?;
                let right_type = self.check(right)?;

                if op.is_comparison() {
                    // Column-count mismatches surface as structural errors
                    DataType::comparison_type(&left_type, &right_type)?;
                    return Ok(DataType::Boolean);
                }

                op.output_type(&left_type, &right_type).ok_or_else(|| {
                    ExpressionError::InvalidOperandTypes {
                        operator: op.as_str().to_string(),
                        left: left_type,
                        right: Some(right_type),
                    }
                })
            }

            Expression::UnaryOp { op, operand } => {
                let operand_type = self.check(operand)?;
                op.output_type(&operand_type)
                    .ok_or_else(|| ExpressionError::InvalidOperandTypes {
                        operator: op.as_str().to_string(),
                        left: operand_type,
                        right: None,
                    })
            }

            Expression::Cast { expr, data_type } => {
                self.check(expr)?;
                Ok(data_type.clone())
            }

            Expression::InTuple(in_tuple) => {
                self.check_membership(in_tuple.left(), in_tuple.right())
            }

            Expression::HashInTuple(hit) => self.check_membership(hit.left(), hit.right()),
        }
    }

    fn check_membership(&self, left: &Expression, right: &Expression) -> ExpressionResult<DataType> {
        let left_type = self.check(left)?.promote();
        let Expression::Tuple(candidates) = right else {
            return Err(ExpressionError::UnsupportedInOperand {
                found: right.to_string(),
            });
        };

        for candidate in candidates {
            let candidate_type = self.check(candidate)?;
            if left_type == DataType::Null || candidate_type == DataType::Null {
                continue;
            }
            if left_type.num_columns() != candidate_type.num_columns() {
                return Err(ExpressionError::InvalidOperandColumns {
                    expected: left_type.num_columns(),
                    actual: candidate_type.num_columns(),
                });
            }
        }
        Ok(DataType::Boolean)
    }

    /// Check if an expression is valid for use as a filter predicate
    pub fn check_filter_predicate(&self, expr: &Expression) -> ExpressionResult<()> {
        match self.check(expr)? {
            DataType::Boolean | DataType::Null => Ok(()),
            other_type => Err(ExpressionError::TypeMismatch {
                expected: DataType::Boolean,
                actual: other_type,
                context: "filter predicate".to_string(),
            }),
        }
    }
}

/// Helper function to type check an expression
pub fn type_check_expression(expr: &Expression, schema: &[DataType]) -> ExpressionResult<DataType> {
    TypeChecker::new(schema).check(expr)
}

/// Helper function to validate a filter predicate
pub fn validate_filter_predicate(expr: &Expression, schema: &[DataType]) -> ExpressionResult<()> {
    TypeChecker::new(schema).check_filter_predicate(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{BinaryOperator, ErrorKind, UnaryOperator};

    fn column(schema: &[DataType], index: usize) -> Expression {
        Expression::get_field(index, format!("c{}", index), schema[index].clone(), true)
    }

    #[test]
    fn test_literal_type_checking() {
        let checker = TypeChecker::new(&[]);

        assert_eq!(checker.check(&Expression::literal(42)).unwrap(), DataType::Int32);
        assert_eq!(
            checker.check(&Expression::literal("test")).unwrap(),
            DataType::Varchar
        );
        assert_eq!(checker.check(&Expression::null()).unwrap(), DataType::Null);
    }

    #[test]
    fn test_column_type_checking() {
        let schema = vec![DataType::Int32, DataType::Varchar, DataType::Boolean];
        let checker = TypeChecker::new(&schema);

        assert_eq!(checker.check(&column(&schema, 1)).unwrap(), DataType::Varchar);

        // Out of bounds
        let stray = Expression::get_field(3, "d", DataType::Int32, true);
        assert!(matches!(
            checker.check(&stray),
            Err(ExpressionError::ColumnIndexOutOfBounds { .. })
        ));

        assert!(matches!(
            checker.check(&Expression::col("a")),
            Err(ExpressionError::UnresolvedColumn { .. })
        ));
    }

    #[test]
    fn test_binary_op_type_checking() {
        let schema = vec![DataType::Int32, DataType::Date, DataType::Boolean];
        let checker = TypeChecker::new(&schema);
        let c = |i| column(&schema, i);

        let expr = Expression::add_expr(c(0), Expression::literal(5));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Int64);

        let expr = Expression::add_expr(c(0), c(1));
        assert!(matches!(
            checker.check(&expr),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));

        let expr = Expression::gt(c(0), Expression::literal(10));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Boolean);

        let expr = Expression::and(c(2), Expression::literal(true));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Boolean);

        let expr = Expression::and(c(1), c(2));
        assert!(matches!(
            checker.check(&expr),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));

        let expr = Expression::binary_op(BinaryOperator::Concat, c(0), Expression::literal("x"));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Varchar);

        // Comparing a pair with a scalar is structural
        let pair = Expression::tuple(vec![c(0), c(0)]);
        let err = checker.check(&Expression::eq(pair, c(0))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_unary_op_type_checking() {
        let schema = vec![DataType::Int32, DataType::Varchar];
        let checker = TypeChecker::new(&schema);

        let expr = Expression::not_expr(Expression::literal(true));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Boolean);

        let expr = Expression::not_expr(column(&schema, 1));
        assert!(matches!(
            checker.check(&expr),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));

        // IS NULL works on any type
        let expr = Expression::is_null(column(&schema, 1));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Boolean);

        let expr = Expression::unary_op(UnaryOperator::Minus, column(&schema, 0));
        assert_eq!(checker.check(&expr).unwrap(), DataType::Int64);
    }

    #[test]
    fn test_membership_type_checking() {
        let schema = vec![DataType::Int32, DataType::Int64];
        let checker = TypeChecker::new(&schema);

        let expr = Expression::in_tuple(
            column(&schema, 0),
            Expression::tuple(vec![Expression::literal(1), Expression::null()]),
        );
        assert_eq!(checker.check(&expr).unwrap(), DataType::Boolean);

        let expr = Expression::in_tuple(
            Expression::tuple(vec![column(&schema, 0), column(&schema, 1)]),
            Expression::tuple(vec![Expression::literal(1)]),
        );
        assert!(matches!(
            checker.check(&expr),
            Err(ExpressionError::InvalidOperandColumns { expected: 2, actual: 1 })
        ));

        let expr = Expression::in_tuple(column(&schema, 0), Expression::literal(1));
        assert!(matches!(
            checker.check(&expr),
            Err(ExpressionError::UnsupportedInOperand { .. })
        ));
    }

    #[test]
    fn test_filter_predicate_checking() {
        let schema = vec![DataType::Int32, DataType::Boolean];

        let expr = Expression::gt(column(&schema, 0), Expression::literal(5));
        assert!(validate_filter_predicate(&expr, &schema).is_ok());

        assert!(validate_filter_predicate(&column(&schema, 1), &schema).is_ok());

        // NULL is allowed in filters
        assert!(validate_filter_predicate(&Expression::null(), &schema).is_ok());

        assert!(matches!(
            validate_filter_predicate(&column(&schema, 0), &schema),
            Err(ExpressionError::TypeMismatch { .. })
        ));

        assert_eq!(
            type_check_expression(&column(&schema, 0), &schema).unwrap(),
            DataType::Int32
        );
    }
}
