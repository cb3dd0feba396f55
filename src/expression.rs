//! Scalar expressions.
//!
//! This module provides:
//! - The immutable expression tree and its builders
//! - Evaluation against a row under SQL three-valued logic
//! - Bottom-up rewriting through `transform_up`
//! - Linear and hashed list membership (`IN`)
//! - Type checking of resolved trees

pub mod error;
pub mod eval;
pub mod expr;
pub mod in_tuple;
pub mod operator;
pub mod transform;
pub mod type_checker;

pub use error::{ErrorKind, ExpressionError, ExpressionResult};
pub use eval::{evaluate_expression, evaluate_predicate, ExpressionEvaluator};
pub use expr::{ColumnRef, Expression, GetField, Literal};
pub use in_tuple::{HashInTuple, InTuple};
pub use operator::{BinaryOperator, UnaryOperator};
pub use transform::transform_up;
pub use type_checker::{type_check_expression, validate_filter_predicate, TypeChecker};
