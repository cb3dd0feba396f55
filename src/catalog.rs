//! Schema metadata and the data source capabilities the engine consumes.
//!
//! A [`Database`] resolves table names. A [`Table`] describes its columns and
//! splits its data into [`Partition`]s; each partition is read through its own
//! row iterator, which is what lets several workers scan one table at once.

use crate::context::Context;
use crate::executor::RowIter;
use crate::types::DataType;
use anyhow::Result;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Information about a column in a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    /// Table the column comes from, if any
    pub source: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            source: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Case-insensitive match against an optional qualifier and a name.
    pub fn matches(&self, table: Option<&str>, name: &str) -> bool {
        if !self.name.eq_ignore_ascii_case(name) {
            return false;
        }
        match (table, &self.source) {
            (None, _) => true,
            (Some(t), Some(source)) => source.eq_ignore_ascii_case(t),
            (Some(_), None) => false,
        }
    }
}

pub type Schema = Vec<ColumnInfo>;

/// Column types of a schema, in order.
pub fn schema_types(schema: &[ColumnInfo]) -> Vec<DataType> {
    schema.iter().map(|c| c.data_type.clone()).collect()
}

/// Opaque handle to one slice of a table's data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    key: Bytes,
}

impl Partition {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.key.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Sequence of partitions produced by [`Table::partitions`]
pub trait PartitionIter: Send {
    fn next(&mut self) -> Result<Option<Partition>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Partition iterator over a precomputed list
pub struct PartitionList {
    partitions: std::vec::IntoIter<Partition>,
}

impl PartitionList {
    pub fn new(partitions: Vec<Partition>) -> Self {
        Self {
            partitions: partitions.into_iter(),
        }
    }
}

impl PartitionIter for PartitionList {
    fn next(&mut self) -> Result<Option<Partition>> {
        Ok(self.partitions.next())
    }
}

/// A named row source
pub trait Table: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn schema(&self) -> &[ColumnInfo];

    /// Partitions covering all of the table's rows.
    fn partitions(&self, ctx: &Context) -> Result<Box<dyn PartitionIter>>;

    /// Rows of one partition. Every call returns a fresh iterator.
    fn partition_rows(&self, ctx: &Context, partition: &Partition) -> Result<Box<dyn RowIter>>;
}

/// Resolves table names
pub trait Database: Send + Sync {
    fn name(&self) -> &str;

    /// Look up a table, ignoring case.
    fn table(&self, name: &str) -> Option<Arc<dyn Table>>;

    fn table_names(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_info_creation() {
        let col = ColumnInfo::new("id", DataType::Int32);
        assert_eq!(col.name, "id");
        assert_eq!(col.data_type, DataType::Int32);
        assert!(col.nullable);
        assert_eq!(col.source, None);

        let col = ColumnInfo::new(String::from("name"), DataType::Varchar)
            .not_null()
            .with_source("users");
        assert!(!col.nullable);
        assert_eq!(col.source.as_deref(), Some("users"));
    }

    #[test]
    fn test_column_matching() {
        let col = ColumnInfo::new("Name", DataType::Varchar).with_source("Users");
        assert!(col.matches(None, "name"));
        assert!(col.matches(Some("users"), "NAME"));
        assert!(!col.matches(Some("orders"), "name"));
        assert!(!col.matches(None, "id"));

        let unqualified = ColumnInfo::new("name", DataType::Varchar);
        assert!(!unqualified.matches(Some("users"), "name"));
    }

    #[test]
    fn test_partition_list() -> Result<()> {
        let mut iter = PartitionList::new(vec![
            Partition::new(vec![0u8, 1]),
            Partition::new(Bytes::from_static(b"\xff")),
        ]);
        let first = iter.next()?.expect("first partition");
        assert_eq!(first.to_string(), "0001");
        assert_eq!(iter.next()?.map(|p| p.to_string()), Some("ff".to_string()));
        assert!(iter.next()?.is_none());
        Ok(())
    }
}
