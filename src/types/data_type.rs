//! Column type descriptors.
//!
//! A [`DataType`] knows how to convert arbitrary values into its domain, how
//! to compare two values of its domain, and which representative type it
//! promotes to when operands of different types meet in a comparison.

use crate::expression::{ExpressionError, ExpressionResult};
use crate::types::Value;
use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;

/// Data types supported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Type of the NULL literal
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Varchar,
    Date,
    Timestamp,
    /// Fixed-arity row of values, used for multi-column comparison
    Tuple(Vec<DataType>),
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl DataType {
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, DataType::UInt32 | DataType::UInt64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_signed() || self.is_unsigned() || self.is_float()
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Timestamp)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, DataType::Tuple(_))
    }

    /// Number of columns a value of this type spans: 1 for scalars, N for a
    /// tuple of N elements.
    pub fn num_columns(&self) -> usize {
        match self {
            DataType::Tuple(types) => types.len(),
            _ => 1,
        }
    }

    /// The representative type used when this type is compared with others.
    pub fn promote(&self) -> DataType {
        match self {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                DataType::Int64
            }
            DataType::UInt32 | DataType::UInt64 => DataType::UInt64,
            DataType::Float32 | DataType::Float64 => DataType::Float64,
            DataType::Date | DataType::Timestamp => DataType::Timestamp,
            DataType::Tuple(types) => DataType::Tuple(types.iter().map(|t| t.promote()).collect()),
            other => other.clone(),
        }
    }

    /// Type both sides of a binary comparison are converted to.
    pub fn comparison_type(left: &DataType, right: &DataType) -> ExpressionResult<DataType> {
        let (left, right) = (left.promote(), right.promote());
        if left.num_columns() != right.num_columns() {
            return Err(ExpressionError::InvalidOperandColumns {
                expected: left.num_columns(),
                actual: right.num_columns(),
            });
        }

        let unified = match (&left, &right) {
            (DataType::Tuple(ls), DataType::Tuple(rs)) => DataType::Tuple(
                ls.iter()
                    .zip(rs)
                    .map(|(l, r)| DataType::comparison_type(l, r))
                    .collect::<ExpressionResult<Vec<_>>>()?,
            ),
            (l, r) if l == r => l.clone(),
            (DataType::Null, other) | (other, DataType::Null) => other.clone(),
            (l, r) if l.is_numeric() && r.is_numeric() => {
                if l.is_float() || r.is_float() {
                    DataType::Float64
                } else {
                    // Signed with unsigned; `compare` orders these losslessly.
                    DataType::Int64
                }
            }
            (DataType::Boolean, n) | (n, DataType::Boolean) if n.is_numeric() => n.clone(),
            (DataType::Varchar, n) | (n, DataType::Varchar) if n.is_numeric() => DataType::Float64,
            (DataType::Varchar, t) | (t, DataType::Varchar) if t.is_temporal() => {
                DataType::Timestamp
            }
            (l, _) => l.clone(),
        };
        Ok(unified)
    }

    /// Result type of an arithmetic operator, or `None` if the operands do not
    /// support arithmetic.
    pub fn arithmetic_type(left: &DataType, right: &DataType) -> Option<DataType> {
        let numeric_like = |t: &DataType| {
            t.is_numeric() || matches!(t, DataType::Boolean | DataType::Varchar | DataType::Null)
        };
        if !numeric_like(left) || !numeric_like(right) {
            return None;
        }

        let (left, right) = (left.promote(), right.promote());
        match (&left, &right) {
            (DataType::Null, DataType::Null) => Some(DataType::Null),
            (l, r) if l.is_float() || r.is_float() => Some(DataType::Float64),
            (DataType::Varchar, _) | (_, DataType::Varchar) => Some(DataType::Float64),
            (DataType::UInt64, DataType::UInt64) => Some(DataType::UInt64),
            (DataType::UInt64, DataType::Null) | (DataType::Null, DataType::UInt64) => {
                Some(DataType::UInt64)
            }
            _ => Some(DataType::Int64),
        }
    }

    /// Convert a value into this type's domain.
    ///
    /// NULL converts to NULL for every type. Lossy conversions (out of range
    /// integers, fractional floats into integers, unparsable text) fail with
    /// [`ExpressionError::Conversion`].
    pub fn convert(&self, value: &Value) -> ExpressionResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match (self, value) {
            (DataType::Null, _) => Ok(Value::Null),
            (DataType::Tuple(types), Value::Tuple(values)) => {
                if types.len() != values.len() {
                    return Err(ExpressionError::InvalidOperandColumns {
                        expected: types.len(),
                        actual: values.len(),
                    });
                }
                let converted = types
                    .iter()
                    .zip(values)
                    .map(|(t, v)| t.convert(v))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(Value::Tuple(converted))
            }
            (DataType::Tuple(types), _) => Err(ExpressionError::InvalidOperandColumns {
                expected: types.len(),
                actual: 1,
            }),
            (_, Value::Tuple(values)) if values.len() == 1 => self.convert(&values[0]),
            (_, Value::Tuple(values)) => Err(ExpressionError::InvalidOperandColumns {
                expected: 1,
                actual: values.len(),
            }),
            (DataType::Boolean, _) => self.convert_boolean(value),
            (DataType::Int8, _) => {
                let n = self.integer_value(value)?;
                i8::try_from(n)
                    .map(Value::Int8)
                    .map_err(|_| ExpressionError::conversion(value, self))
            }
            (DataType::Int16, _) => {
                let n = self.integer_value(value)?;
                i16::try_from(n)
                    .map(Value::Int16)
                    .map_err(|_| ExpressionError::conversion(value, self))
            }
            (DataType::Int32, _) => {
                let n = self.integer_value(value)?;
                i32::try_from(n)
                    .map(Value::Int32)
                    .map_err(|_| ExpressionError::conversion(value, self))
            }
            (DataType::Int64, _) => {
                let n = self.integer_value(value)?;
                i64::try_from(n)
                    .map(Value::Int64)
                    .map_err(|_| ExpressionError::conversion(value, self))
            }
            (DataType::UInt32, _) => {
                let n = self.integer_value(value)?;
                u32::try_from(n)
                    .map(Value::UInt32)
                    .map_err(|_| ExpressionError::conversion(value, self))
            }
            (DataType::UInt64, _) => {
                let n = self.integer_value(value)?;
                u64::try_from(n)
                    .map(Value::UInt64)
                    .map_err(|_| ExpressionError::conversion(value, self))
            }
            (DataType::Float32, _) => {
                let f = self.float_value(value)?;
                let narrowed = f as f32;
                if f.is_finite() && !narrowed.is_finite() {
                    return Err(ExpressionError::conversion(value, self));
                }
                Ok(Value::Float32(narrowed))
            }
            (DataType::Float64, _) => self.float_value(value).map(Value::Float64),
            (DataType::Varchar, _) => value
                .to_text()
                .map(Value::String)
                .ok_or_else(|| ExpressionError::conversion(value, self)),
            (DataType::Date, _) => self.convert_date(value),
            (DataType::Timestamp, _) => self.convert_timestamp(value),
        }
    }

    /// [`convert`](Self::convert) for comparison operands. Integers are left
    /// as they are under an integer type, since [`compare`](Self::compare)
    /// orders any two integers exactly and narrowing could fail.
    pub fn convert_for_compare(&self, value: &Value) -> ExpressionResult<Value> {
        let is_integer = |t: &DataType| t.is_signed() || t.is_unsigned();
        if is_integer(self) && is_integer(&value.data_type()) {
            return Ok(value.clone());
        }
        self.convert(value)
    }

    /// Compare two non-NULL values of this type.
    ///
    /// Both values are expected to already be in this type's domain; values
    /// of a different variant are converted first.
    pub fn compare(&self, a: &Value, b: &Value) -> ExpressionResult<Ordering> {
        if a.is_null() || b.is_null() {
            return Err(ExpressionError::NullComparison(self.clone()));
        }

        if let DataType::Tuple(types) = self {
            let (Value::Tuple(xs), Value::Tuple(ys)) = (a, b) else {
                let converted = (self.convert(a)?, self.convert(b)?);
                return self.compare(&converted.0, &converted.1);
            };
            if xs.len() != types.len() || ys.len() != types.len() {
                return Err(ExpressionError::InvalidOperandColumns {
                    expected: types.len(),
                    actual: xs.len().max(ys.len()),
                });
            }
            for ((t, x), y) in types.iter().zip(xs).zip(ys) {
                match t.compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            return Ok(Ordering::Equal);
        }

        if let Some(ordering) = compare_same_variant(a, b) {
            return Ok(ordering);
        }
        if self.is_signed() || self.is_unsigned() {
            if let Some(ordering) = integer_cmp(a, b) {
                return Ok(ordering);
            }
        }

        let (a, b) = (self.convert(a)?, self.convert(b)?);
        compare_same_variant(&a, &b).ok_or_else(|| ExpressionError::conversion(&b, self))
    }

    /// SQL equality: `None` when the outcome is unknown because of NULLs.
    ///
    /// For tuples a single differing non-NULL element pair decides `false`
    /// regardless of NULLs elsewhere.
    pub fn sql_equals(&self, a: &Value, b: &Value) -> ExpressionResult<Option<bool>> {
        if a.is_null() || b.is_null() {
            return Ok(None);
        }

        match (self, a, b) {
            (DataType::Tuple(types), Value::Tuple(xs), Value::Tuple(ys)) => {
                check_tuple_arity(types, xs, ys)?;
                let mut saw_null = false;
                for ((t, x), y) in types.iter().zip(xs).zip(ys) {
                    match t.sql_equals(x, y)? {
                        Some(false) => return Ok(Some(false)),
                        Some(true) => {}
                        None => saw_null = true,
                    }
                }
                Ok(if saw_null { None } else { Some(true) })
            }
            _ => Ok(Some(self.compare(a, b)? == Ordering::Equal)),
        }
    }

    /// SQL ordering: `None` when a NULL decides the outcome. Tuples compare
    /// lexicographically.
    pub fn sql_compare(&self, a: &Value, b: &Value) -> ExpressionResult<Option<Ordering>> {
        if a.is_null() || b.is_null() {
            return Ok(None);
        }

        match (self, a, b) {
            (DataType::Tuple(types), Value::Tuple(xs), Value::Tuple(ys)) => {
                check_tuple_arity(types, xs, ys)?;
                for ((t, x), y) in types.iter().zip(xs).zip(ys) {
                    match t.sql_compare(x, y)? {
                        None => return Ok(None),
                        Some(Ordering::Equal) => continue,
                        Some(other) => return Ok(Some(other)),
                    }
                }
                Ok(Some(Ordering::Equal))
            }
            _ => self.compare(a, b).map(Some),
        }
    }

    fn convert_boolean(&self, value: &Value) -> ExpressionResult<Value> {
        let b = match value {
            Value::Boolean(b) => *b,
            Value::Float32(f) => *f != 0.0,
            Value::Float64(f) => *f != 0.0,
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(ExpressionError::conversion(value, self)),
            },
            v if v.data_type().is_signed() || v.data_type().is_unsigned() => {
                self.integer_value(v)? != 0
            }
            _ => return Err(ExpressionError::conversion(value, self)),
        };
        Ok(Value::Boolean(b))
    }

    fn integer_value(&self, value: &Value) -> ExpressionResult<i128> {
        let err = || ExpressionError::conversion(value, self);
        match value {
            Value::Boolean(b) => Ok(*b as i128),
            Value::Int8(v) => Ok(*v as i128),
            Value::Int16(v) => Ok(*v as i128),
            Value::Int32(v) => Ok(*v as i128),
            Value::Int64(v) => Ok(*v as i128),
            Value::UInt32(v) => Ok(*v as i128),
            Value::UInt64(v) => Ok(*v as i128),
            Value::Float32(v) => integral_float(*v as f64).ok_or_else(err),
            Value::Float64(v) => integral_float(*v).ok_or_else(err),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i128>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral_float))
                    .ok_or_else(err)
            }
            _ => Err(err()),
        }
    }

    fn float_value(&self, value: &Value) -> ExpressionResult<f64> {
        match value {
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int8(v) => Ok(*v as f64),
            Value::Int16(v) => Ok(*v as f64),
            Value::Int32(v) => Ok(*v as f64),
            Value::Int64(v) => Ok(*v as f64),
            Value::UInt32(v) => Ok(*v as f64),
            Value::UInt64(v) => Ok(*v as f64),
            Value::Float32(v) => Ok(*v as f64),
            Value::Float64(v) => Ok(*v),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ExpressionError::conversion(value, self)),
            _ => Err(ExpressionError::conversion(value, self)),
        }
    }

    fn convert_date(&self, value: &Value) -> ExpressionResult<Value> {
        match value {
            Value::Date(d) => Ok(Value::Date(*d)),
            Value::Timestamp(ts) => Ok(Value::Date(ts.date())),
            Value::String(s) => parse_date(s.trim())
                .or_else(|| parse_timestamp(s.trim()).map(|ts| ts.date()))
                .map(Value::Date)
                .ok_or_else(|| ExpressionError::conversion(value, self)),
            _ => Err(ExpressionError::conversion(value, self)),
        }
    }

    fn convert_timestamp(&self, value: &Value) -> ExpressionResult<Value> {
        let err = || ExpressionError::conversion(value, self);
        match value {
            Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::Timestamp).ok_or_else(err),
            Value::String(s) => {
                let s = s.trim();
                parse_timestamp(s)
                    .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
                    .map(Value::Timestamp)
                    .ok_or_else(err)
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Int8 => write!(f, "INT8"),
            DataType::Int16 => write!(f, "INT16"),
            DataType::Int32 => write!(f, "INT32"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::UInt32 => write!(f, "UINT32"),
            DataType::UInt64 => write!(f, "UINT64"),
            DataType::Float32 => write!(f, "FLOAT32"),
            DataType::Float64 => write!(f, "FLOAT64"),
            DataType::Varchar => write!(f, "VARCHAR"),
            DataType::Date => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Tuple(types) => {
                write!(f, "TUPLE(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn check_tuple_arity(types: &[DataType], xs: &[Value], ys: &[Value]) -> ExpressionResult<()> {
    for len in [xs.len(), ys.len()] {
        if len != types.len() {
            return Err(ExpressionError::InvalidOperandColumns {
                expected: types.len(),
                actual: len,
            });
        }
    }
    Ok(())
}

fn integral_float(f: f64) -> Option<i128> {
    if f.is_finite() && f.fract() == 0.0 {
        Some(f as i128)
    } else {
        None
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Order two integers of any width and signedness; `None` unless both are
/// integers.
fn integer_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    let widen = |v: &Value| match v {
        Value::Int8(n) => Some(*n as i128),
        Value::Int16(n) => Some(*n as i128),
        Value::Int32(n) => Some(*n as i128),
        Value::Int64(n) => Some(*n as i128),
        Value::UInt32(n) => Some(*n as i128),
        Value::UInt64(n) => Some(*n as i128),
        _ => None,
    };
    Some(widen(a)?.cmp(&widen(b)?))
}

/// Compare two values of the same variant; `None` if the variants differ.
fn compare_same_variant(a: &Value, b: &Value) -> Option<Ordering> {
    let ordering = match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Int8(x), Value::Int8(y)) => x.cmp(y),
        (Value::Int16(x), Value::Int16(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::UInt32(x), Value::UInt32(y)) => x.cmp(y),
        (Value::UInt64(x), Value::UInt64(y)) => x.cmp(y),
        (Value::Float32(x), Value::Float32(y)) => float_cmp(*x as f64, *y as f64),
        (Value::Float64(x), Value::Float64(y)) => float_cmp(*x, *y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        _ => return None,
    };
    Some(ordering)
}
