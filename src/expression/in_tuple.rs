//! List membership: `left IN (candidates...)`.
//!
//! [`InTuple`] walks the candidates in order and follows SQL semantics
//! exactly: a NULL candidate defers a `false` verdict to NULL but never
//! blocks an early `true`. [`HashInTuple`] is the constant-list fast path;
//! its candidates are converted and hashed once at construction and shared
//! read-only by every evaluation.

use crate::context::Context;
use crate::expression::expr::Literal;
use crate::expression::{Expression, ExpressionError, ExpressionResult};
use crate::types::{canonical_hash, DataType, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Linear membership test
#[derive(Debug, Clone, PartialEq)]
pub struct InTuple {
    left: Box<Expression>,
    right: Box<Expression>,
}

impl InTuple {
    pub fn new(left: Expression, right: Expression) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    pub fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let left = self.left.eval(ctx, row)?;
        if left.is_null() {
            return Ok(Value::Null);
        }

        let Expression::Tuple(candidates) = self.right.as_ref() else {
            return Err(ExpressionError::UnsupportedInOperand {
                found: self.right.to_string(),
            });
        };

        let ty = match self.left.data_type().promote() {
            DataType::Null => left.data_type().promote(),
            ty => ty,
        };
        for candidate in candidates {
            check_columns(&ty, &candidate.data_type())?;
        }

        let left = ty.convert(&left)?;
        let mut saw_null = false;
        for candidate in candidates {
            let value = candidate.eval(ctx, row)?;
            if value.is_null() {
                saw_null = true;
                continue;
            }
            match ty.sql_equals(&left, &ty.convert(&value)?)? {
                Some(true) => return Ok(Value::Boolean(true)),
                Some(false) => {}
                None => saw_null = true,
            }
        }

        Ok(if saw_null {
            Value::Null
        } else {
            Value::Boolean(false)
        })
    }
}

/// Hashed membership test over literal candidates
///
/// Candidates are bucketed by their canonical hash under the key type, and a
/// bucket hit is confirmed with a real comparison, so two distinct values
/// sharing a digest never produce a false match.
#[derive(Debug, Clone)]
pub struct HashInTuple {
    left: Box<Expression>,
    right: Box<Expression>,
    key_type: DataType,
    buckets: Arc<HashMap<u64, Vec<Value>>>,
    has_null: bool,
}

impl HashInTuple {
    /// Build the hashed variant. Fails with
    /// [`ExpressionError::UnsupportedHashInOperand`] when `right` is not a
    /// tuple and with [`ExpressionError::UnsupportedHashInSubexpression`] when
    /// a candidate is not a literal or cannot be brought to the key type.
    pub fn new(left: Expression, right: Expression) -> ExpressionResult<Self> {
        let Expression::Tuple(candidates) = &right else {
            return Err(ExpressionError::UnsupportedHashInOperand {
                found: right.to_string(),
            });
        };

        let values = candidates
            .iter()
            .map(literal_value)
            .collect::<ExpressionResult<Vec<_>>>()?;

        let key_type = match left.data_type().promote() {
            DataType::Null => values
                .iter()
                .find(|v| !v.is_null())
                .map(|v| v.data_type().promote())
                .unwrap_or(DataType::Null),
            ty => ty,
        };

        let mut has_null = false;
        let mut buckets: HashMap<u64, Vec<Value>> = HashMap::new();
        for (candidate, value) in candidates.iter().zip(values) {
            if value.contains_null() {
                has_null = true;
            }
            if value.is_null() {
                continue;
            }
            check_columns(&key_type, &value.data_type())?;

            let converted = key_type.convert(&value).map_err(|_| {
                ExpressionError::UnsupportedHashInSubexpression {
                    found: candidate.to_string(),
                }
            })?;
            let bucket = buckets
                .entry(canonical_hash(&converted, &key_type)?)
                .or_default();
            if !contains(&key_type, bucket, &converted)? {
                bucket.push(converted);
            }
        }

        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            key_type,
            buckets: Arc::new(buckets),
            has_null,
        })
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    /// True when a candidate is NULL or holds a NULL component.
    pub fn has_null(&self) -> bool {
        self.has_null
    }

    /// Rebuild with new operands. The hashed candidates are shared with
    /// `self` when neither the candidate list nor the left type changed.
    pub fn with_operands(&self, left: Expression, right: Expression) -> ExpressionResult<Self> {
        if right == *self.right && left.data_type() == self.left.data_type() {
            return Ok(Self {
                left: Box::new(left),
                right: self.right.clone(),
                key_type: self.key_type.clone(),
                buckets: Arc::clone(&self.buckets),
                has_null: self.has_null,
            });
        }
        Self::new(left, right)
    }

    pub fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        if self.has_null {
            return Ok(Value::Null);
        }

        let left = self.normalize_left(ctx, row)?;
        if self.key_type != DataType::Null {
            check_columns(&self.key_type, &left.data_type())?;
        }

        let value = left.eval(ctx, row)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        if self.buckets.is_empty() {
            return Ok(Value::Boolean(false));
        }

        let key = self.key_type.convert(&value)?;
        if key.contains_null() {
            return self.scan(&key);
        }

        let found = match self.buckets.get(&canonical_hash(&key, &self.key_type)?) {
            Some(bucket) => contains(&self.key_type, bucket, &key)?,
            None => false,
        };
        Ok(Value::Boolean(found))
    }

    /// Fold the row-dependent parts of a tuple operand into literals so the
    /// operand is fully resolved before hashing.
    fn normalize_left(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Expression> {
        if !matches!(self.left.as_ref(), Expression::Tuple(_)) {
            return Ok(self.left.as_ref().clone());
        }
        self.left.transform_up(&|e| match e {
            Expression::Literal(_) | Expression::Tuple(_) => Ok(e),
            other => {
                let value = other.eval(ctx, row)?;
                Ok(Expression::Literal(Literal::with_type(
                    value,
                    other.data_type(),
                )))
            }
        })
    }

    /// A tuple key with NULL components has no hash; compare it against every
    /// candidate with SQL tuple equality instead.
    fn scan(&self, key: &Value) -> ExpressionResult<Value> {
        let mut saw_null = false;
        for candidate in self.buckets.values().flatten() {
            match self.key_type.sql_equals(key, candidate)? {
                Some(true) => return Ok(Value::Boolean(true)),
                Some(false) => {}
                None => saw_null = true,
            }
        }
        Ok(if saw_null {
            Value::Null
        } else {
            Value::Boolean(false)
        })
    }
}

impl PartialEq for HashInTuple {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.right == other.right
    }
}

/// Value of a literal or a tuple of literals.
fn literal_value(expr: &Expression) -> ExpressionResult<Value> {
    match expr {
        Expression::Literal(lit) => Ok(lit.value.clone()),
        Expression::Tuple(elements) if elements.len() == 1 => literal_value(&elements[0]),
        Expression::Tuple(elements) => elements
            .iter()
            .map(literal_value)
            .collect::<ExpressionResult<Vec<_>>>()
            .map(Value::Tuple),
        other => Err(ExpressionError::UnsupportedHashInSubexpression {
            found: other.to_string(),
        }),
    }
}

/// NULL-typed operands fit any column count.
fn check_columns(expected: &DataType, actual: &DataType) -> ExpressionResult<()> {
    if *actual == DataType::Null || *expected == DataType::Null {
        return Ok(());
    }
    if expected.num_columns() != actual.num_columns() {
        return Err(ExpressionError::InvalidOperandColumns {
            expected: expected.num_columns(),
            actual: actual.num_columns(),
        });
    }
    Ok(())
}

fn contains(ty: &DataType, bucket: &[Value], value: &Value) -> ExpressionResult<bool> {
    for candidate in bucket {
        if ty.compare(candidate, value)? == Ordering::Equal {
            return Ok(true);
        }
    }
    Ok(false)
}
