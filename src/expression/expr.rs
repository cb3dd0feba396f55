//! Expression tree definitions.

use crate::expression::in_tuple::{HashInTuple, InTuple};
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::expression::{ExpressionError, ExpressionResult};
use crate::types::{DataType, Value};
use std::fmt;

/// Unresolved column reference, as produced by builders and parsers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Resolved column: a position in the input row plus its type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GetField {
    /// Column index in the row (0-based)
    pub index: usize,
    pub table: Option<String>,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl GetField {
    pub fn new(index: usize, name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            index,
            table: None,
            name: name.into(),
            data_type,
            nullable,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// Literal value in an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: Value,
    pub data_type: DataType,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        let data_type = value.data_type();
        Self { value, data_type }
    }

    /// Literal carrying a declared type, e.g. a folded column value that may
    /// be NULL.
    pub fn with_type(value: Value, data_type: DataType) -> Self {
        Self { value, data_type }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }
}

/// Expression tree node
///
/// Nodes are immutable: rewrites build new nodes through
/// [`Expression::with_children`] instead of editing in place, so one tree can
/// be shared by several concurrent executions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal constant value
    Literal(Literal),

    /// Column reference that has not been bound to a row position yet
    UnresolvedColumn(ColumnRef),

    /// Column bound to a row position
    GetField(GetField),

    /// Named expression
    Alias { expr: Box<Expression>, name: String },

    /// Ordered group of expressions
    Tuple(Vec<Expression>),

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Explicit conversion
    Cast {
        expr: Box<Expression>,
        data_type: DataType,
    },

    /// Linear list membership test
    InTuple(InTuple),

    /// Hashed list membership test over constant candidates
    HashInTuple(HashInTuple),
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(Literal::new(value.into()))
    }

    /// Create a NULL literal
    pub fn null() -> Self {
        Expression::Literal(Literal::null())
    }

    /// Create an unresolved column reference
    pub fn col(name: impl Into<String>) -> Self {
        Expression::UnresolvedColumn(ColumnRef::new(name))
    }

    /// Create an unresolved column reference qualified by a table name
    pub fn qualified_col(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expression::UnresolvedColumn(ColumnRef::qualified(table, name))
    }

    /// Create a resolved column reference
    pub fn get_field(
        index: usize,
        name: impl Into<String>,
        data_type: DataType,
        nullable: bool,
    ) -> Self {
        Expression::GetField(GetField::new(index, name, data_type, nullable))
    }

    pub fn tuple(elements: Vec<Expression>) -> Self {
        Expression::Tuple(elements)
    }

    pub fn alias(expr: Expression, name: impl Into<String>) -> Self {
        Expression::Alias {
            expr: Box::new(expr),
            name: name.into(),
        }
    }

    pub fn cast(expr: Expression, data_type: DataType) -> Self {
        Expression::Cast {
            expr: Box::new(expr),
            data_type,
        }
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::And, left, right)
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Or, left, right)
    }

    pub fn not_expr(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::Not, operand)
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Eq, left, right)
    }

    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Ne, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Lt, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Le, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Gt, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Ge, left, right)
    }

    pub fn add_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Add, left, right)
    }

    pub fn sub_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Sub, left, right)
    }

    pub fn mul_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Mul, left, right)
    }

    pub fn div_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Div, left, right)
    }

    pub fn concat(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Concat, left, right)
    }

    pub fn is_null(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::IsNull, operand)
    }

    pub fn is_not_null(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::IsNotNull, operand)
    }

    /// `left IN (candidates...)`, evaluated linearly
    pub fn in_tuple(left: Expression, right: Expression) -> Self {
        Expression::InTuple(InTuple::new(left, right))
    }

    /// `left NOT IN (candidates...)`
    pub fn not_in_tuple(left: Expression, right: Expression) -> Self {
        Self::not_expr(Self::in_tuple(left, right))
    }

    /// `left IN (candidates...)` backed by a hash set. Fails unless every
    /// candidate is a literal or a tuple of literals.
    pub fn hash_in_tuple(left: Expression, right: Expression) -> ExpressionResult<Self> {
        HashInTuple::new(left, right).map(Expression::HashInTuple)
    }

    /// Resolved output type of this expression.
    ///
    /// Unresolved columns report [`DataType::Null`] until they are bound.
    pub fn data_type(&self) -> DataType {
        match self {
            Expression::Literal(lit) => lit.data_type.clone(),
            Expression::UnresolvedColumn(_) => DataType::Null,
            Expression::GetField(field) => field.data_type.clone(),
            Expression::Alias { expr, .. } => expr.data_type(),
            Expression::Tuple(elements) => {
                if elements.len() == 1 {
                    elements[0].data_type()
                } else {
                    DataType::Tuple(elements.iter().map(|e| e.data_type()).collect())
                }
            }
            Expression::BinaryOp { op, left, right } => {
                if op.is_comparison() || op.is_logical() {
                    DataType::Boolean
                } else {
                    op.output_type(&left.data_type(), &right.data_type())
                        .unwrap_or(DataType::Null)
                }
            }
            Expression::UnaryOp { op, operand } => op
                .output_type(&operand.data_type())
                .unwrap_or(DataType::Null),
            Expression::Cast { data_type, .. } => data_type.clone(),
            Expression::InTuple(_) | Expression::HashInTuple(_) => DataType::Boolean,
        }
    }

    /// Whether evaluation may produce NULL
    pub fn nullable(&self) -> bool {
        match self {
            Expression::Literal(lit) => lit.value.is_null(),
            Expression::GetField(field) => field.nullable,
            Expression::Alias { expr, .. } => expr.nullable(),
            Expression::UnaryOp {
                op: UnaryOperator::IsNull | UnaryOperator::IsNotNull,
                ..
            } => false,
            _ => true,
        }
    }

    /// Column name this expression produces in a projection.
    pub fn name(&self) -> String {
        match self {
            Expression::Alias { name, .. } => name.clone(),
            Expression::UnresolvedColumn(col) => col.name.clone(),
            Expression::GetField(field) => field.name.clone(),
            other => other.to_string(),
        }
    }

    /// Table the produced column belongs to, if any
    pub fn source(&self) -> Option<String> {
        match self {
            Expression::UnresolvedColumn(col) => col.table.clone(),
            Expression::GetField(field) => field.table.clone(),
            _ => None,
        }
    }

    /// Child expressions, in order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal(_)
            | Expression::UnresolvedColumn(_)
            | Expression::GetField(_) => vec![],
            Expression::Alias { expr, .. } | Expression::Cast { expr, .. } => vec![expr],
            Expression::Tuple(elements) => elements.iter().collect(),
            Expression::BinaryOp { left, right, .. } => vec![left, right],
            Expression::UnaryOp { operand, .. } => vec![operand],
            Expression::InTuple(in_tuple) => vec![in_tuple.left(), in_tuple.right()],
            Expression::HashInTuple(hit) => vec![hit.left(), hit.right()],
        }
    }

    /// Rebuild this node with new children. The number of children must match
    /// [`Expression::children`].
    pub fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(ExpressionError::InvalidChildrenNumber {
                node: self.to_string(),
                actual: children.len(),
                expected,
            });
        }

        let mut children = children.into_iter();
        let mut next = || {
            children
                .next()
                .map(Box::new)
                .ok_or_else(|| ExpressionError::InvalidChildrenNumber {
                    node: self.to_string(),
                    actual: 0,
                    expected,
                })
        };

        let node = match self {
            Expression::Literal(_)
            | Expression::UnresolvedColumn(_)
            | Expression::GetField(_) => self.clone(),
            Expression::Alias { name, .. } => Expression::Alias {
                expr: next()?,
                name: name.clone(),
            },
            Expression::Cast { data_type, .. } => Expression::Cast {
                expr: next()?,
                data_type: data_type.clone(),
            },
            Expression::Tuple(_) => {
                let mut elements = Vec::with_capacity(expected);
                for _ in 0..expected {
                    elements.push(*next()?);
                }
                Expression::Tuple(elements)
            }
            Expression::BinaryOp { op, .. } => Expression::BinaryOp {
                op: *op,
                left: next()?,
                right: next()?,
            },
            Expression::UnaryOp { op, .. } => Expression::UnaryOp {
                op: *op,
                operand: next()?,
            },
            Expression::InTuple(_) => Expression::InTuple(InTuple::new(*next()?, *next()?)),
            Expression::HashInTuple(hit) => {
                Expression::HashInTuple(hit.with_operands(*next()?, *next()?)?)
            }
        };
        Ok(node)
    }

    /// Check if this expression is a constant (contains no column references)
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::UnresolvedColumn(_) | Expression::GetField(_) => false,
            other => other.children().into_iter().all(|c| c.is_constant()),
        }
    }

    /// True if any node of this tree satisfies `predicate`.
    pub fn any<F>(&self, predicate: &F) -> bool
    where
        F: Fn(&Expression) -> bool,
    {
        predicate(self) || self.children().into_iter().any(|c| c.any(predicate))
    }

    /// True once no unresolved column is left in this tree.
    pub fn is_resolved(&self) -> bool {
        !self.any(&|e| matches!(e, Expression::UnresolvedColumn(_)))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit.value),
            Expression::UnresolvedColumn(col) => write!(f, "{}", col),
            Expression::GetField(field) => match &field.table {
                Some(table) => write!(f, "{}.{}", table, field.name),
                None => write!(f, "{}", field.name),
            },
            Expression::Alias { expr, name } => write!(f, "{} AS {}", expr, name),
            Expression::Tuple(elements) => {
                write!(f, "(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Expression::BinaryOp { op, left, right } => {
                write!(f, "({} {} {})", left, op.as_str(), right)
            }
            Expression::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => write!(f, "NOT({})", operand),
                UnaryOperator::IsNull | UnaryOperator::IsNotNull => {
                    write!(f, "{} {}", operand, op.as_str())
                }
                UnaryOperator::Plus | UnaryOperator::Minus => {
                    write!(f, "{}{}", op.as_str(), operand)
                }
            },
            Expression::Cast { expr, data_type } => write!(f, "CAST({} AS {})", expr, data_type),
            Expression::InTuple(in_tuple) => {
                write!(f, "({} IN {})", in_tuple.left(), in_tuple.right())
            }
            Expression::HashInTuple(hit) => write!(f, "({} HASH IN {})", hit.left(), hit.right()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ErrorKind;

    fn sample_nodes() -> Vec<Expression> {
        let a = Expression::get_field(0, "a", DataType::Int32, true);
        let list = Expression::tuple(vec![Expression::literal(1), Expression::literal(2)]);
        vec![
            Expression::literal(1),
            Expression::col("a"),
            a.clone(),
            Expression::alias(a.clone(), "x"),
            list.clone(),
            Expression::eq(a.clone(), Expression::literal(1)),
            Expression::is_null(a.clone()),
            Expression::cast(a.clone(), DataType::Varchar),
            Expression::in_tuple(a.clone(), list.clone()),
            Expression::hash_in_tuple(a, list).unwrap(),
        ]
    }

    #[test]
    fn test_with_children_rejects_wrong_count() {
        for node in sample_nodes() {
            let mut children: Vec<Expression> = node.children().into_iter().cloned().collect();
            children.push(Expression::literal(99));
            let err = node.with_children(children).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Structural, "node {}", node);
        }
    }

    #[test]
    fn test_with_children_same_children_is_identity() {
        for node in sample_nodes() {
            let children: Vec<Expression> = node.children().into_iter().cloned().collect();
            let rebuilt = node.with_children(children).unwrap();
            assert_eq!(rebuilt, node);
            assert_eq!(rebuilt.to_string(), node.to_string());
        }
    }

    #[test]
    fn test_with_children_substitutes() {
        let expr = Expression::add_expr(Expression::col("a"), Expression::literal(1));
        let rebuilt = expr
            .with_children(vec![Expression::col("b"), Expression::literal(2)])
            .unwrap();
        assert_eq!(rebuilt.to_string(), "(b + 2)");
    }

    #[test]
    fn test_is_constant() {
        assert!(Expression::literal(42).is_constant());
        assert!(!Expression::col("a").is_constant());
        assert!(Expression::add_expr(Expression::literal(1), Expression::literal(2)).is_constant());
        assert!(!Expression::add_expr(Expression::col("a"), Expression::literal(2)).is_constant());
        assert!(Expression::not_expr(Expression::literal(true)).is_constant());
        assert!(!Expression::is_null(Expression::col("a")).is_constant());
    }

    #[test]
    fn test_data_type() {
        let a = Expression::get_field(0, "a", DataType::Int32, true);
        assert_eq!(a.data_type(), DataType::Int32);
        assert_eq!(Expression::literal("x").data_type(), DataType::Varchar);
        assert_eq!(Expression::null().data_type(), DataType::Null);
        assert_eq!(
            Expression::add_expr(a.clone(), Expression::literal(1.5)).data_type(),
            DataType::Float64
        );
        assert_eq!(
            Expression::tuple(vec![a.clone(), Expression::literal("x")]).data_type(),
            DataType::Tuple(vec![DataType::Int32, DataType::Varchar])
        );
        // A one-element tuple is just its element
        assert_eq!(Expression::tuple(vec![a.clone()]).data_type(), DataType::Int32);
        assert_eq!(
            Expression::in_tuple(a, Expression::tuple(vec![Expression::literal(1)])).data_type(),
            DataType::Boolean
        );
    }

    #[test]
    fn test_display() {
        let expr = Expression::and(
            Expression::gt(Expression::col("age"), Expression::literal(18)),
            Expression::is_not_null(Expression::qualified_col("users", "name")),
        );
        assert_eq!(expr.to_string(), "((age > 18) AND users.name IS NOT NULL)");

        let expr = Expression::not_in_tuple(
            Expression::col("a"),
            Expression::tuple(vec![Expression::literal(1), Expression::literal("b")]),
        );
        assert_eq!(expr.to_string(), "NOT((a IN (1, 'b')))");
    }

    #[test]
    fn test_is_resolved() {
        assert!(!Expression::eq(Expression::col("a"), Expression::literal(1)).is_resolved());
        assert!(Expression::eq(
            Expression::get_field(0, "a", DataType::Int64, false),
            Expression::literal(1)
        )
        .is_resolved());
    }
}
