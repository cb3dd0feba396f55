//! Error types for expression construction and evaluation.

use crate::types::DataType;
use thiserror::Error;

/// Broad classification of an [`ExpressionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed tree: wrong child count or operand column count.
    Structural,
    /// A value could not be represented in the required type.
    Conversion,
    /// An operand of a kind the operator does not accept.
    UnsupportedOperand,
    /// Any other data-dependent failure.
    Evaluation,
}

/// Errors that can occur while building or evaluating expressions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("{node}: invalid children number, got {actual}, expected {expected}")]
    InvalidChildrenNumber {
        node: String,
        actual: usize,
        expected: usize,
    },

    #[error("operand should contain {expected} column(s), got {actual}")]
    InvalidOperandColumns { expected: usize, actual: usize },

    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: DataType },

    #[error("IN operator expects Tuple in right expression, found {found}")]
    UnsupportedInOperand { found: String },

    #[error("hash IN operator expects Tuple in right expression, found {found}")]
    UnsupportedHashInOperand { found: String },

    #[error("hash IN operator expects Tuple or Literal subexpressions, found {found}")]
    UnsupportedHashInSubexpression { found: String },

    #[error("invalid operand types for operator {operator}: left={left}, right={right:?}")]
    InvalidOperandTypes {
        operator: String,
        left: DataType,
        right: Option<DataType>,
    },

    #[error("type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: DataType,
        actual: DataType,
        context: String,
    },

    #[error("column index {index} out of bounds for row with {row_size} columns")]
    ColumnIndexOutOfBounds { index: usize, row_size: usize },

    #[error("column {name} has not been resolved")]
    UnresolvedColumn { name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in {operator}")]
    Overflow { operator: String },

    #[error("cannot compare NULL values with {0}")]
    NullComparison(DataType),
}

impl ExpressionError {
    pub fn conversion(value: impl std::fmt::Display, target: &DataType) -> Self {
        ExpressionError::Conversion {
            value: value.to_string(),
            target: target.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExpressionError::InvalidChildrenNumber { .. }
            | ExpressionError::InvalidOperandColumns { .. } => ErrorKind::Structural,
            ExpressionError::Conversion { .. } => ErrorKind::Conversion,
            ExpressionError::UnsupportedInOperand { .. }
            | ExpressionError::UnsupportedHashInOperand { .. }
            | ExpressionError::UnsupportedHashInSubexpression { .. }
            | ExpressionError::InvalidOperandTypes { .. }
            | ExpressionError::TypeMismatch { .. } => ErrorKind::UnsupportedOperand,
            ExpressionError::ColumnIndexOutOfBounds { .. }
            | ExpressionError::UnresolvedColumn { .. }
            | ExpressionError::DivisionByZero
            | ExpressionError::Overflow { .. }
            | ExpressionError::NullComparison(_) => ErrorKind::Evaluation,
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
