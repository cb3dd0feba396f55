use crate::context::Context;
use crate::executor::RowIter;
use crate::types::{encode_row, DataType, Row};
use anyhow::Result;
use std::collections::HashSet;

/// Removes duplicate rows, keeping the first occurrence of each.
///
/// Rows are compared through the canonical encoding of their promoted
/// values; two NULLs count as duplicates.
pub struct DistinctExecutor {
    ctx: Context,
    child: Box<dyn RowIter>,
    seen: HashSet<Vec<u8>>,
}

impl DistinctExecutor {
    pub fn new(ctx: Context, child: Box<dyn RowIter>) -> Self {
        Self {
            ctx,
            child,
            seen: HashSet::new(),
        }
    }
}

impl RowIter for DistinctExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        loop {
            self.ctx.check_cancelled()?;
            let Some(row) = self.child.next()? else {
                return Ok(None);
            };
            let types: Vec<DataType> = row.iter().map(|v| v.data_type().promote()).collect();
            if self.seen.insert(encode_row(&row, &types)?) {
                return Ok(Some(row));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.seen.clear();
        self.child.close()
    }
}
