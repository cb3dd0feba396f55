//! Storage layer error types.

use thiserror::Error;

/// Errors raised by the in-memory storage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Row has {actual} values but table {table} has {expected} columns")]
    RowArity {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Column {column} of table {table} does not accept NULL")]
    NullViolation { table: String, column: String },

    #[error("Invalid partition key {key} for table {table}")]
    InvalidPartition { table: String, key: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
