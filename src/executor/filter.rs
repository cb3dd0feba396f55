//! Filter executor implementation.
//!
//! This executor filters rows based on a predicate expression. Only rows for
//! which the predicate evaluates to TRUE are passed through; FALSE and NULL
//! both drop the row.

use crate::context::Context;
use crate::executor::RowIter;
use crate::expression::{evaluate_predicate, Expression};
use crate::types::Row;
use anyhow::Result;

/// Filter executor that applies a predicate to filter rows
pub struct FilterExecutor {
    ctx: Context,
    /// Child executor that produces rows
    child: Box<dyn RowIter>,
    /// Predicate expression to evaluate
    predicate: Expression,
}

impl FilterExecutor {
    pub fn new(ctx: Context, child: Box<dyn RowIter>, predicate: Expression) -> Self {
        Self {
            ctx,
            child,
            predicate,
        }
    }
}

impl RowIter for FilterExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        loop {
            self.ctx.check_cancelled()?;
            match self.child.next()? {
                Some(row) => {
                    if evaluate_predicate(&self.ctx, &self.predicate, &row)? == Some(true) {
                        return Ok(Some(row));
                    }
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}
