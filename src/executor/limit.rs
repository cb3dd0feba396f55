//! LIMIT and OFFSET executor implementation.
//!
//! Skips the first `offset` rows of its child, then passes through at most
//! `limit` rows. Once the limit is reached the child is no longer pulled.

use crate::context::Context;
use crate::executor::RowIter;
use crate::types::Row;
use anyhow::Result;

/// Executor that limits the number of rows returned
pub struct LimitExecutor {
    ctx: Context,
    child: Box<dyn RowIter>,
    /// Maximum number of rows to return (None = unlimited)
    limit: Option<usize>,
    /// Number of rows to skip
    offset: usize,
    /// Rows skipped so far
    skipped: usize,
    /// Rows returned so far
    returned: usize,
}

impl LimitExecutor {
    pub fn new(ctx: Context, child: Box<dyn RowIter>, limit: Option<usize>, offset: usize) -> Self {
        Self {
            ctx,
            child,
            limit,
            offset,
            skipped: 0,
            returned: 0,
        }
    }
}

impl RowIter for LimitExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        if let Some(limit) = self.limit {
            if self.returned >= limit {
                return Ok(None);
            }
        }

        while self.skipped < self.offset {
            self.ctx.check_cancelled()?;
            if self.child.next()?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }

        self.ctx.check_cancelled()?;
        let row = self.child.next()?;
        if row.is_some() {
            self.returned += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::collect;
    use crate::executor::testing::{ints, MockRowIter};

    fn limit(values: &[i64], limit: Option<usize>, offset: usize) -> Result<Vec<Row>> {
        let iter = LimitExecutor::new(
            Context::new(),
            Box::new(MockRowIter::new(ints(values))),
            limit,
            offset,
        );
        collect(Box::new(iter))
    }

    #[test]
    fn test_limit_only() -> Result<()> {
        assert_eq!(limit(&[1, 2, 3, 4, 5], Some(3), 0)?, ints(&[1, 2, 3]));
        assert_eq!(limit(&[1, 2], Some(5), 0)?, ints(&[1, 2]));
        assert!(limit(&[1, 2], Some(0), 0)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_offset() -> Result<()> {
        assert_eq!(limit(&[1, 2, 3, 4, 5], None, 2)?, ints(&[3, 4, 5]));
        assert_eq!(limit(&[1, 2, 3, 4, 5], Some(2), 1)?, ints(&[2, 3]));
        assert!(limit(&[1, 2], Some(2), 5)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_limit_stops_pulling() -> Result<()> {
        // The child fails on its third pull, which LIMIT 2 never makes
        let mut child = MockRowIter::new(ints(&[1, 2, 3]));
        child.fail_at = Some(2);
        let iter = LimitExecutor::new(Context::new(), Box::new(child), Some(2), 0);
        assert_eq!(collect(Box::new(iter))?, ints(&[1, 2]));
        Ok(())
    }
}
