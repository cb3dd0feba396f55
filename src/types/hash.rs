//! Canonical encoding and hashing of values.
//!
//! Values are first converted to a target type, then written with a
//! type-directed big-endian encoding. Two values that compare equal under
//! the target type produce identical bytes, so the encoding can serve as a
//! grouping key and its digest as a set-membership key.

use crate::expression::{ExpressionError, ExpressionResult};
use crate::types::{DataType, Value};
use xxhash_rust::xxh3::xxh3_64;

const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_UINT: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_DATE: u8 = 6;
const TAG_TIMESTAMP: u8 = 7;
const TAG_TUPLE: u8 = 8;

/// Append the canonical encoding of `value`, converted to `ty`, to `buf`.
pub fn encode_canonical(value: &Value, ty: &DataType, buf: &mut Vec<u8>) -> ExpressionResult<()> {
    let converted = ty.convert(value)?;
    encode_value(&converted, buf);
    Ok(())
}

/// Canonical encoding of a whole row, each value under its own type.
pub fn encode_row(values: &[Value], types: &[DataType]) -> ExpressionResult<Vec<u8>> {
    if values.len() != types.len() {
        return Err(ExpressionError::InvalidOperandColumns {
            expected: types.len(),
            actual: values.len(),
        });
    }
    let mut buf = Vec::new();
    for (value, ty) in values.iter().zip(types) {
        encode_canonical(value, ty, &mut buf)?;
    }
    Ok(buf)
}

/// Digest of the canonical encoding of `value` converted to `ty`.
///
/// Tuples hash each element on its own and then hash the concatenation of
/// the element digests.
pub fn canonical_hash(value: &Value, ty: &DataType) -> ExpressionResult<u64> {
    let converted = ty.convert(value)?;
    Ok(hash_converted(&converted))
}

fn hash_converted(value: &Value) -> u64 {
    match value {
        Value::Tuple(values) => {
            let mut digests = Vec::with_capacity(values.len() * 8 + 1);
            digests.push(TAG_TUPLE);
            for v in values {
                digests.extend_from_slice(&hash_converted(v).to_be_bytes());
            }
            xxh3_64(&digests)
        }
        scalar => {
            let mut buf = Vec::new();
            encode_value(scalar, &mut buf);
            xxh3_64(&buf)
        }
    }
}

fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(u8::from(*b));
        }
        Value::Int8(v) => encode_int(*v as i64, buf),
        Value::Int16(v) => encode_int(*v as i64, buf),
        Value::Int32(v) => encode_int(*v as i64, buf),
        Value::Int64(v) => encode_int(*v, buf),
        Value::UInt32(v) => encode_uint(*v as u64, buf),
        Value::UInt64(v) => encode_uint(*v, buf),
        Value::Float32(v) => encode_float(*v as f64, buf),
        Value::Float64(v) => encode_float(*v, buf),
        Value::String(s) => {
            buf.push(TAG_STRING);
            buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Date(d) => {
            buf.push(TAG_DATE);
            buf.extend_from_slice(&chrono::Datelike::num_days_from_ce(d).to_be_bytes());
        }
        Value::Timestamp(ts) => {
            buf.push(TAG_TIMESTAMP);
            let utc = ts.and_utc();
            buf.extend_from_slice(&utc.timestamp().to_be_bytes());
            buf.extend_from_slice(&utc.timestamp_subsec_nanos().to_be_bytes());
        }
        Value::Tuple(values) => {
            buf.push(TAG_TUPLE);
            buf.extend_from_slice(&(values.len() as u32).to_be_bytes());
            for v in values {
                encode_value(v, buf);
            }
        }
    }
}

fn encode_int(v: i64, buf: &mut Vec<u8>) {
    buf.push(TAG_INT);
    buf.extend_from_slice(&v.to_be_bytes());
}

fn encode_uint(v: u64, buf: &mut Vec<u8>) {
    buf.push(TAG_UINT);
    buf.extend_from_slice(&v.to_be_bytes());
}

fn encode_float(v: f64, buf: &mut Vec<u8>) {
    // -0.0 == 0.0 and all NaNs compare equal
    let canonical = if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    };
    buf.push(TAG_FLOAT);
    buf.extend_from_slice(&canonical.to_bits().to_be_bytes());
}
