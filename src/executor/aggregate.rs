//! Hash-based aggregation executor for GROUP BY and aggregate functions.
//!
//! This module implements a hash aggregation executor that supports:
//! - Multiple grouping expressions
//! - Multiple aggregate functions (COUNT, SUM, AVG, MIN, MAX)
//! - NULL handling according to SQL semantics (aggregates skip NULLs)
//! - One-pass execution over a hash table keyed by the canonical encoding
//!   of the promoted grouping values, so an INT32 `1` and an INT64 `1` fall
//!   into the same group
//!
//! Groups are emitted in the order they were first seen.

use crate::context::Context;
use crate::executor::RowIter;
use crate::expression::eval::arithmetic;
use crate::expression::{
    evaluate_expression, BinaryOperator, Expression, ExpressionError, ExpressionResult,
};
use crate::types::{encode_row, DataType, Row, Value};
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// COUNT(*) or COUNT(expr) - counts non-NULL values
    Count,
    /// SUM(expr) - sums numeric values, ignoring NULLs
    Sum,
    /// AVG(expr) - average of numeric values, ignoring NULLs
    Avg,
    /// MIN(expr) - minimum value, ignoring NULLs
    Min,
    /// MAX(expr) - maximum value, ignoring NULLs
    Max,
}

impl AggregateFunction {
    /// Returns the name of the aggregate function
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    /// Returns the output data type for this aggregate function given the input type
    pub fn output_type(&self, input_type: Option<&DataType>) -> DataType {
        match self {
            AggregateFunction::Count => DataType::Int64,
            AggregateFunction::Avg => DataType::Float64,
            AggregateFunction::Sum => input_type
                .and_then(|t| DataType::arithmetic_type(t, t))
                .unwrap_or(DataType::Null),
            AggregateFunction::Min | AggregateFunction::Max => {
                input_type.cloned().unwrap_or(DataType::Null)
            }
        }
    }
}

/// One aggregate computation in a GROUP BY
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    /// Argument expression (None for COUNT(*))
    pub arg: Option<Expression>,
    /// Optional alias for the result column
    pub alias: Option<String>,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, arg: Option<Expression>) -> Self {
        Self {
            function,
            arg,
            alias: None,
        }
    }

    pub fn count_star() -> Self {
        Self::new(AggregateFunction::Count, None)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_arg(&self, arg: Option<Expression>) -> Self {
        Self {
            function: self.function,
            arg,
            alias: self.alias.clone(),
        }
    }

    /// Output column name
    pub fn name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.to_string(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.function
            .output_type(self.arg.as_ref().map(|a| a.data_type()).as_ref())
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}({})", self.function.name(), arg)?,
            None => write!(f, "{}(*)", self.function.name())?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

/// Running state of one aggregate within one group
#[derive(Debug, Clone)]
enum AggregateState {
    Count(i64),
    Sum(Option<Value>),
    Avg { sum: f64, count: i64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl AggregateState {
    fn new(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Count => AggregateState::Count(0),
            AggregateFunction::Sum => AggregateState::Sum(None),
            AggregateFunction::Avg => AggregateState::Avg { sum: 0.0, count: 0 },
            AggregateFunction::Min => AggregateState::Min(None),
            AggregateFunction::Max => AggregateState::Max(None),
        }
    }

    /// Update the state with a new value
    fn update(&mut self, value: &Value) -> ExpressionResult<()> {
        if value.is_null() {
            return Ok(());
        }

        match self {
            AggregateState::Count(count) => *count += 1,
            AggregateState::Sum(sum) => {
                let next = match sum.take() {
                    None => sum_type(value, value)?.convert(value)?,
                    Some(current) => {
                        let ty = sum_type(&current, value)?;
                        arithmetic(BinaryOperator::Add, &ty.convert(&current)?, &ty.convert(value)?)?
                    }
                };
                *sum = Some(next);
            }
            AggregateState::Avg { sum, count } => {
                let Value::Float64(f) = DataType::Float64.convert(value)? else {
                    return Err(ExpressionError::conversion(value, &DataType::Float64));
                };
                *sum += f;
                *count += 1;
            }
            AggregateState::Min(current) => {
                if extreme_replaced(current.as_ref(), value, Ordering::Less)? {
                    *current = Some(value.clone());
                }
            }
            AggregateState::Max(current) => {
                if extreme_replaced(current.as_ref(), value, Ordering::Greater)? {
                    *current = Some(value.clone());
                }
            }
        }
        Ok(())
    }

    /// Finalize the state and return the result
    fn finalize(&self) -> Value {
        match self {
            AggregateState::Count(count) => Value::Int64(*count),
            AggregateState::Sum(sum) => sum.clone().unwrap_or(Value::Null),
            AggregateState::Avg { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Float64(sum / *count as f64)
                }
            }
            AggregateState::Min(v) | AggregateState::Max(v) => v.clone().unwrap_or(Value::Null),
        }
    }
}

fn sum_type(left: &Value, right: &Value) -> ExpressionResult<DataType> {
    DataType::arithmetic_type(&left.data_type(), &right.data_type()).ok_or_else(|| {
        ExpressionError::InvalidOperandTypes {
            operator: AggregateFunction::Sum.name().to_string(),
            left: left.data_type(),
            right: Some(right.data_type()),
        }
    })
}

/// Whether `candidate` should replace `current` as the running MIN/MAX.
fn extreme_replaced(current: Option<&Value>, candidate: &Value, wanted: Ordering) -> ExpressionResult<bool> {
    let Some(current) = current else {
        return Ok(true);
    };
    let ty = DataType::comparison_type(&candidate.data_type(), &current.data_type())?;
    Ok(ty.compare(candidate, current)? == wanted)
}

struct Group {
    values: Row,
    states: Vec<AggregateState>,
}

/// Hash aggregation executor
pub struct AggregateExecutor {
    ctx: Context,
    child: Box<dyn RowIter>,
    grouping: Vec<Expression>,
    aggregates: Vec<Aggregate>,
    /// Results, computed on the first call to `next`
    results: Option<std::vec::IntoIter<Row>>,
}

impl AggregateExecutor {
    pub fn new(
        ctx: Context,
        child: Box<dyn RowIter>,
        grouping: Vec<Expression>,
        aggregates: Vec<Aggregate>,
    ) -> Self {
        Self {
            ctx,
            child,
            grouping,
            aggregates,
            results: None,
        }
    }

    fn new_states(&self) -> Vec<AggregateState> {
        self.aggregates
            .iter()
            .map(|a| AggregateState::new(a.function))
            .collect()
    }

    fn compute(&mut self) -> Result<Vec<Row>> {
        let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();

        while let Some(row) = self.child.next()? {
            self.ctx.check_cancelled()?;

            let values = self
                .grouping
                .iter()
                .map(|e| evaluate_expression(&self.ctx, e, &row))
                .collect::<ExpressionResult<Vec<_>>>()?;
            let types: Vec<DataType> = values.iter().map(|v| v.data_type().promote()).collect();
            let key = encode_row(&values, &types)?;

            let slot = match index.get(&key) {
                Some(slot) => *slot,
                None => {
                    groups.push(Group {
                        values,
                        states: self.new_states(),
                    });
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };

            for (aggregate, state) in self.aggregates.iter().zip(groups[slot].states.iter_mut()) {
                let value = match &aggregate.arg {
                    Some(arg) => evaluate_expression(&self.ctx, arg, &row)?,
                    // COUNT(*) counts every row
                    None => Value::Boolean(true),
                };
                state.update(&value)?;
            }
        }

        // Aggregating an empty input without grouping still yields one row
        if groups.is_empty() && self.grouping.is_empty() {
            groups.push(Group {
                values: Vec::new(),
                states: self.new_states(),
            });
        }

        Ok(groups
            .into_iter()
            .map(|group| {
                let mut row = group.values;
                row.extend(group.states.iter().map(|s| s.finalize()));
                row
            })
            .collect())
    }
}

impl RowIter for AggregateExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        self.ctx.check_cancelled()?;
        let results = match self.results.as_mut() {
            Some(results) => results,
            None => {
                let rows = self.compute()?;
                self.results.insert(rows.into_iter())
            }
        };
        Ok(results.next())
    }

    fn close(&mut self) -> Result<()> {
        self.results = None;
        self.child.close()
    }
}
