//! Executor over an in-memory list of rows.

use crate::context::Context;
use crate::executor::RowIter;
use crate::types::Row;
use anyhow::Result;

/// Executor that yields precomputed rows in order
pub struct ValuesExecutor {
    ctx: Context,
    rows: std::vec::IntoIter<Row>,
}

impl ValuesExecutor {
    pub fn new(ctx: Context, rows: Vec<Row>) -> Self {
        Self {
            ctx,
            rows: rows.into_iter(),
        }
    }
}

impl RowIter for ValuesExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        self.ctx.check_cancelled()?;
        Ok(self.rows.next())
    }
}
