//! Storage backends for the engine.
//!
//! Storage is consumed only through the [`crate::catalog`] capabilities. The
//! in-memory backend partitions each table's rows so scans can run in
//! parallel.

pub mod error;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryDatabase, MemoryTable};
