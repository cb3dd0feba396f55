//! Partitioned in-memory tables.

use crate::catalog::{ColumnInfo, Database, Partition, PartitionIter, PartitionList, Table};
use crate::context::Context;
use crate::executor::{RowIter, ValuesExecutor};
use crate::storage::{StorageError, StorageResult};
use crate::types::Row;
use anyhow::Result;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Table whose rows are spread round-robin over a fixed number of partitions
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    schema: Vec<ColumnInfo>,
    partitions: Vec<RwLock<Vec<Row>>>,
    next_partition: AtomicUsize,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, schema: Vec<ColumnInfo>) -> Self {
        Self::with_partitions(name, schema, 1)
    }

    /// Create a table with `count` partitions (at least one).
    pub fn with_partitions(name: impl Into<String>, schema: Vec<ColumnInfo>, count: usize) -> Self {
        let name = name.into();
        let schema = schema
            .into_iter()
            .map(|c| c.with_source(name.clone()))
            .collect();
        Self {
            name,
            schema,
            partitions: (0..count.max(1)).map(|_| RwLock::new(Vec::new())).collect(),
            next_partition: AtomicUsize::new(0),
        }
    }

    /// Insert a row, converting each value to its column type.
    pub fn insert(&self, row: Row) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(StorageError::RowArity {
                table: self.name.clone(),
                expected: self.schema.len(),
                actual: row.len(),
            }
            .into());
        }

        let mut converted = Vec::with_capacity(row.len());
        for (value, column) in row.iter().zip(&self.schema) {
            if value.is_null() && !column.nullable {
                return Err(StorageError::NullViolation {
                    table: self.name.clone(),
                    column: column.name.clone(),
                }
                .into());
            }
            converted.push(column.data_type.convert(value)?);
        }

        let slot = self.next_partition.fetch_add(1, Ordering::Relaxed) % self.partitions.len();
        self.partitions[slot].write().push(converted);
        Ok(())
    }

    pub fn insert_all(&self, rows: impl IntoIterator<Item = Row>) -> Result<()> {
        for row in rows {
            self.insert(row)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn partition_index(&self, partition: &Partition) -> StorageResult<usize> {
        let invalid = || StorageError::InvalidPartition {
            table: self.name.clone(),
            key: partition.to_string(),
        };
        let bytes = <[u8; 4]>::try_from(&partition.key()[..]).map_err(|_| invalid())?;
        let index = u32::from_be_bytes(bytes) as usize;
        if index >= self.partitions.len() {
            return Err(invalid());
        }
        Ok(index)
    }
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &[ColumnInfo] {
        &self.schema
    }

    fn partitions(&self, ctx: &Context) -> Result<Box<dyn PartitionIter>> {
        ctx.check_cancelled()?;
        let partitions = (0..self.partitions.len() as u32)
            .map(|i| Partition::new(i.to_be_bytes().to_vec()))
            .collect();
        Ok(Box::new(PartitionList::new(partitions)))
    }

    fn partition_rows(&self, ctx: &Context, partition: &Partition) -> Result<Box<dyn RowIter>> {
        let index = self.partition_index(partition)?;
        // Snapshot so concurrent inserts never disturb an open scan
        let rows = self.partitions[index].read().clone();
        Ok(Box::new(ValuesExecutor::new(ctx.clone(), rows)))
    }
}

/// In-memory database: a case-insensitive set of [`MemoryTable`]s
pub struct MemoryDatabase {
    name: String,
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl MemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: DashMap::new(),
        }
    }

    pub fn add_table(&self, table: MemoryTable) -> StorageResult<Arc<MemoryTable>> {
        let key = table.name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(StorageError::TableExists(table.name));
        }
        let table = Arc::new(table);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn create_table(
        &self,
        name: &str,
        schema: Vec<ColumnInfo>,
        partitions: usize,
    ) -> StorageResult<Arc<MemoryTable>> {
        self.add_table(MemoryTable::with_partitions(name, schema, partitions))
    }

    pub fn get_table(&self, name: &str) -> Option<Arc<MemoryTable>> {
        self.tables
            .get(&name.to_lowercase())
            .map(|t| Arc::clone(t.value()))
    }
}

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn table(&self, name: &str) -> Option<Arc<dyn Table>> {
        self.get_table(name).map(|t| t as Arc<dyn Table>)
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.value().name.clone()).collect();
        names.sort();
        names
    }
}
