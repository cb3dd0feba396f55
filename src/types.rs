//! Type system: column types, values and their canonical encoding.
//!
//! - **DataType**: scalar and tuple type descriptors with conversion,
//!   promotion and comparison rules
//! - **Value**: a single (possibly NULL, possibly multi-column) value
//! - **Row**: an ordered sequence of values, one per column

pub mod data_type;
pub mod hash;
pub mod value;

pub use data_type::DataType;
pub use hash::{canonical_hash, encode_canonical, encode_row};
pub use value::Value;

/// One row of column values
pub type Row = Vec<Value>;
