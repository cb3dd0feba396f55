//! Sort executor implementation.
//!
//! This executor sorts rows from a child executor based on one or more
//! sort fields. It materializes all rows from the child executor into
//! memory before sorting, then returns them in the sorted order.
//!
//! Supports:
//! - Multi-key sorting (ORDER BY a ASC, b DESC)
//! - NULL handling (NULLs first or last)
//! - Keys of differing types: each key column is compared under one type,
//!   unified over the key expression's type and every value it produced

use crate::context::Context;
use crate::executor::RowIter;
use crate::expression::{evaluate_expression, Expression, ExpressionResult};
use crate::types::{DataType, Row, Value};
use anyhow::Result;
use std::cmp::Ordering;
use std::fmt;

/// Sort order for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// NULL ordering preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    First,
    Last,
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub expr: Expression,
    pub order: SortOrder,
    pub null_order: NullOrder,
}

impl SortField {
    /// Create a sort field with default NULL ordering
    /// (NULLs first for ASC, NULLs last for DESC)
    pub fn new(expr: Expression, order: SortOrder) -> Self {
        let null_order = match order {
            SortOrder::Asc => NullOrder::First,
            SortOrder::Desc => NullOrder::Last,
        };
        Self {
            expr,
            order,
            null_order,
        }
    }

    pub fn asc(expr: Expression) -> Self {
        Self::new(expr, SortOrder::Asc)
    }

    pub fn desc(expr: Expression) -> Self {
        Self::new(expr, SortOrder::Desc)
    }

    pub fn with_null_order(mut self, null_order: NullOrder) -> Self {
        self.null_order = null_order;
        self
    }

    pub fn with_expr(&self, expr: Expression) -> Self {
        Self {
            expr,
            order: self.order,
            null_order: self.null_order,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let nulls = match self.null_order {
            NullOrder::First => "FIRST",
            NullOrder::Last => "LAST",
        };
        write!(f, "{} {} NULLS {}", self.expr, order, nulls)
    }
}

/// Executor that sorts rows based on multiple fields
pub struct SortExecutor {
    ctx: Context,
    child: Box<dyn RowIter>,
    /// Sort fields (in order of precedence)
    fields: Vec<SortField>,
    /// Sorted rows, populated on the first call to `next`
    sorted: Option<std::vec::IntoIter<Row>>,
}

impl SortExecutor {
    pub fn new(ctx: Context, child: Box<dyn RowIter>, fields: Vec<SortField>) -> Self {
        Self {
            ctx,
            child,
            fields,
            sorted: None,
        }
    }

    /// Compare two key values according to sort order and null handling.
    /// Both values are already in `ty`'s domain.
    fn compare_values(
        a: &Value,
        b: &Value,
        field: &SortField,
        ty: &DataType,
    ) -> ExpressionResult<Ordering> {
        match (a, b) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(match field.null_order {
                NullOrder::First => Ordering::Less,
                NullOrder::Last => Ordering::Greater,
            }),
            (_, Value::Null) => Ok(match field.null_order {
                NullOrder::First => Ordering::Greater,
                NullOrder::Last => Ordering::Less,
            }),
            (a, b) => {
                let cmp = ty.compare(a, b)?;
                Ok(match field.order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                })
            }
        }
    }

    fn compare_keys(
        a: &[Value],
        b: &[Value],
        fields: &[SortField],
        types: &[DataType],
    ) -> ExpressionResult<Ordering> {
        for (((x, y), field), ty) in a.iter().zip(b).zip(fields).zip(types) {
            match Self::compare_values(x, y, field, ty)? {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }

    /// The comparison type of each key column. Pairwise types would not give
    /// a total order: "10" < "9" as text but 9 < "10" as numbers.
    fn key_types(&self, keyed: &[(Vec<Value>, Row)]) -> ExpressionResult<Vec<DataType>> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                keyed
                    .iter()
                    .map(|(key, _)| &key[i])
                    .filter(|v| !v.is_null())
                    .try_fold(field.expr.data_type(), |ty, v| {
                        DataType::comparison_type(&ty, &v.data_type())
                    })
            })
            .collect()
    }

    /// Materialize the child and sort it. Sorting is stable, so rows with
    /// equal keys keep their input order.
    fn sort_rows(&mut self) -> Result<Vec<Row>> {
        let mut keyed = Vec::new();
        while let Some(row) = self.child.next()? {
            self.ctx.check_cancelled()?;
            let key = self
                .fields
                .iter()
                .map(|f| evaluate_expression(&self.ctx, &f.expr, &row))
                .collect::<ExpressionResult<Vec<_>>>()?;
            keyed.push((key, row));
        }

        let types = self.key_types(&keyed)?;
        for (key, _) in keyed.iter_mut() {
            for (value, ty) in key.iter_mut().zip(&types) {
                *value = ty.convert_for_compare(value)?;
            }
        }

        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            Self::compare_keys(a, b, &self.fields, &types).unwrap_or_else(|e| {
                failure = Some(e);
                Ordering::Equal
            })
        });
        if let Some(e) = failure {
            return Err(e.into());
        }

        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }
}

impl RowIter for SortExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        self.ctx.check_cancelled()?;
        let rows = match self.sorted.as_mut() {
            Some(rows) => rows,
            None => {
                let rows = self.sort_rows()?;
                self.sorted.insert(rows.into_iter())
            }
        };
        Ok(rows.next())
    }

    fn close(&mut self) -> Result<()> {
        self.sorted = None;
        self.child.close()
    }
}
