//! Scalar operators and their result types.

use crate::types::DataType;
use std::fmt;

/// Operators taking two operands.
///
/// Arithmetic results follow [`DataType::arithmetic_type`]; comparisons are
/// typed by [`DataType::comparison_type`] and always yield a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    /// Truncating for integers
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Three-valued AND
    And,
    /// Three-valued OR
    Or,
    /// Text concatenation (`||`)
    Concat,
}

impl BinaryOperator {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Result type for the given operand types, or `None` if unsupported
    pub fn output_type(&self, left: &DataType, right: &DataType) -> Option<DataType> {
        match self {
            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div => DataType::arithmetic_type(left, right),

            // Comparison operators always return boolean when the operands
            // can be brought to a common type
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge => DataType::comparison_type(left, right)
                .ok()
                .map(|_| DataType::Boolean),

            BinaryOperator::And | BinaryOperator::Or => {
                if is_truth_value(left) && is_truth_value(right) {
                    Some(DataType::Boolean)
                } else {
                    None
                }
            }

            BinaryOperator::Concat => match (left, right) {
                (DataType::Tuple(_), _) | (_, DataType::Tuple(_)) => None,
                _ => Some(DataType::Varchar),
            },
        }
    }

    /// SQL spelling of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Concat => "||",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    /// Never NULL itself
    IsNull,
    IsNotNull,
    Plus,
    Minus,
}

impl UnaryOperator {
    pub fn output_type(&self, operand: &DataType) -> Option<DataType> {
        match self {
            UnaryOperator::Not => {
                if is_truth_value(operand) {
                    Some(DataType::Boolean)
                } else {
                    None
                }
            }
            UnaryOperator::IsNull | UnaryOperator::IsNotNull => Some(DataType::Boolean),
            UnaryOperator::Plus | UnaryOperator::Minus => match operand {
                DataType::Null => Some(DataType::Null),
                t if t.is_numeric() => Some(t.promote()),
                _ => None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::IsNull => "IS NULL",
            UnaryOperator::IsNotNull => "IS NOT NULL",
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        }
    }
}

/// Types that can stand in for a boolean in logical operators.
fn is_truth_value(t: &DataType) -> bool {
    matches!(t, DataType::Boolean | DataType::Null) || t.is_numeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_operator_output_types() {
        assert_eq!(
            BinaryOperator::Add.output_type(&DataType::Int32, &DataType::Int32),
            Some(DataType::Int64)
        );
        assert_eq!(
            BinaryOperator::Div.output_type(&DataType::Int32, &DataType::Float64),
            Some(DataType::Float64)
        );
        assert_eq!(
            BinaryOperator::Add.output_type(&DataType::Boolean, &DataType::Date),
            None
        );

        assert_eq!(
            BinaryOperator::Eq.output_type(&DataType::Int32, &DataType::Varchar),
            Some(DataType::Boolean)
        );
        assert_eq!(
            BinaryOperator::Lt.output_type(
                &DataType::Int32,
                &DataType::Tuple(vec![DataType::Int32, DataType::Int32])
            ),
            None
        );

        assert_eq!(
            BinaryOperator::And.output_type(&DataType::Boolean, &DataType::Boolean),
            Some(DataType::Boolean)
        );
        assert_eq!(
            BinaryOperator::Or.output_type(&DataType::Boolean, &DataType::Varchar),
            None
        );

        assert_eq!(
            BinaryOperator::Concat.output_type(&DataType::Varchar, &DataType::Int32),
            Some(DataType::Varchar)
        );
    }

    #[test]
    fn test_unary_operator_output_types() {
        assert_eq!(
            UnaryOperator::Not.output_type(&DataType::Boolean),
            Some(DataType::Boolean)
        );
        assert_eq!(UnaryOperator::Not.output_type(&DataType::Varchar), None);
        assert_eq!(
            UnaryOperator::IsNull.output_type(&DataType::Varchar),
            Some(DataType::Boolean)
        );
        assert_eq!(
            UnaryOperator::Minus.output_type(&DataType::Int16),
            Some(DataType::Int64)
        );
        assert_eq!(UnaryOperator::Minus.output_type(&DataType::Varchar), None);
    }

    #[test]
    fn test_operator_strings() {
        assert_eq!(BinaryOperator::Ne.as_str(), "!=");
        assert_eq!(BinaryOperator::Concat.to_string(), "||");
        assert_eq!(UnaryOperator::IsNotNull.as_str(), "IS NOT NULL");
    }
}
