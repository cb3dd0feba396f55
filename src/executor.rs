//! Executor layer for query execution.
//!
//! This module implements the Volcano-style iterator model for executing
//! plan trees. Each executor produces rows one at a time via `next()`, so a
//! streaming pipeline only holds the state of its active operators. Sort,
//! aggregation and the buffered side of a join materialize their input.
//!
//! Every executor checks the query [`Context`](crate::context::Context) for
//! cancellation at each row boundary.

use crate::types::Row;
use anyhow::Result;

pub mod aggregate;
pub mod distinct;
pub mod exchange;
pub mod filter;
pub mod limit;
pub mod nested_loop_join;
pub mod projection;
pub mod sort;
pub mod table_scan;
pub mod values;

// Re-export executors
pub use aggregate::{Aggregate, AggregateExecutor, AggregateFunction};
pub use distinct::DistinctExecutor;
pub use exchange::ExchangeExecutor;
pub use filter::FilterExecutor;
pub use limit::LimitExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use projection::ProjectionExecutor;
pub use sort::{NullOrder, SortExecutor, SortField, SortOrder};
pub use table_scan::TableScanExecutor;
pub use values::ValuesExecutor;

/// Forward-only, non-restartable sequence of rows
///
/// `next` may block on worker threads (see
/// [`ExchangeExecutor`](exchange::ExchangeExecutor)). Async callers should
/// drive an iterator from `tokio::task::spawn_blocking`; the exchange
/// refuses to block inside a runtime and returns an error instead.
pub trait RowIter: Send {
    /// Get the next row. Returns `None` once the sequence is exhausted.
    fn next(&mut self) -> Result<Option<Row>>;

    /// Release resources held by this iterator and its inputs.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Drain an iterator into a vector, closing it afterwards.
pub fn collect(mut iter: Box<dyn RowIter>) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    loop {
        match iter.next() {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break,
            Err(e) => {
                let _ = iter.close();
                return Err(e);
            }
        }
    }
    iter.close()?;
    Ok(rows)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_collect_closes_iterator() -> Result<()> {
        let iter = MockRowIter::new(ints(&[1, 2, 3]));
        let closed = iter.closed_flag();
        let rows = collect(Box::new(iter))?;
        assert_eq!(rows, ints(&[1, 2, 3]));
        assert!(closed.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_collect_closes_on_error() {
        let mut iter = MockRowIter::new(ints(&[1, 2, 3]));
        iter.fail_at = Some(1);
        let closed = iter.closed_flag();
        assert!(collect(Box::new(iter)).is_err());
        assert!(closed.load(Ordering::SeqCst));
    }
}
