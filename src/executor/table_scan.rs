//! Full table scan.
//!
//! Reads a table's partitions one after another, opening each partition's
//! row iterator only once the previous one is exhausted.

use crate::catalog::{PartitionIter, Table};
use crate::context::Context;
use crate::executor::RowIter;
use crate::types::Row;
use anyhow::Result;
use std::sync::Arc;

/// Executor that scans every partition of a table sequentially
pub struct TableScanExecutor {
    ctx: Context,
    table: Arc<dyn Table>,
    partitions: Option<Box<dyn PartitionIter>>,
    current: Option<Box<dyn RowIter>>,
}

impl TableScanExecutor {
    pub fn new(ctx: Context, table: Arc<dyn Table>) -> Self {
        Self {
            ctx,
            table,
            partitions: None,
            current: None,
        }
    }
}

impl RowIter for TableScanExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        loop {
            self.ctx.check_cancelled()?;

            if let Some(rows) = self.current.as_mut() {
                if let Some(row) = rows.next()? {
                    return Ok(Some(row));
                }
                rows.close()?;
                self.current = None;
            }

            let partitions = match self.partitions.as_mut() {
                Some(partitions) => partitions,
                None => self.partitions.insert(self.table.partitions(&self.ctx)?),
            };
            match partitions.next()? {
                Some(partition) => {
                    self.current = Some(self.table.partition_rows(&self.ctx, &partition)?);
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut rows) = self.current.take() {
            rows.close()?;
        }
        if let Some(mut partitions) = self.partitions.take() {
            partitions.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnInfo;
    use crate::executor::collect;
    use crate::storage::MemoryTable;
    use crate::types::{DataType, Value};

    #[test]
    fn test_scan_all_partitions() -> Result<()> {
        let table = MemoryTable::with_partitions(
            "numbers",
            vec![ColumnInfo::new("n", DataType::Int64)],
            4,
        );
        table.insert_all((0..10).map(|i| vec![Value::Int64(i)]))?;

        let scan = TableScanExecutor::new(Context::new(), Arc::new(table));
        let mut rows = collect(Box::new(scan))?;
        rows.sort_by_key(|r| match r[0] {
            Value::Int64(n) => n,
            _ => -1,
        });
        let expected: Vec<Row> = (0..10).map(|i| vec![Value::Int64(i)]).collect();
        assert_eq!(rows, expected);
        Ok(())
    }

    #[test]
    fn test_scan_empty_table() -> Result<()> {
        let table = MemoryTable::with_partitions("empty", vec![ColumnInfo::new("n", DataType::Int64)], 3);
        let mut scan = TableScanExecutor::new(Context::new(), Arc::new(table));
        assert!(scan.next()?.is_none());
        // Exhausted iterators stay exhausted
        assert!(scan.next()?.is_none());
        scan.close()
    }

    #[test]
    fn test_scan_cancelled() {
        let ctx = Context::new();
        let table = MemoryTable::new("t", vec![ColumnInfo::new("n", DataType::Int64)]);
        let mut scan = TableScanExecutor::new(ctx.clone(), Arc::new(table));
        ctx.cancel();
        assert!(scan.next().is_err());
    }
}
