//! Nested loop join executor implementation.
//!
//! For each left row, the executor walks every buffered right row and emits
//! the concatenation when the join condition holds. Without a condition this
//! is a cross join.
//!
//! Time complexity: O(|left| × |right|). The right side is materialized on
//! the first call to `next`.

use crate::context::Context;
use crate::executor::RowIter;
use crate::expression::{evaluate_predicate, Expression};
use crate::types::Row;
use anyhow::Result;

pub struct NestedLoopJoinExecutor {
    ctx: Context,
    left: Box<dyn RowIter>,
    right: Box<dyn RowIter>,
    condition: Option<Expression>,
    /// Buffered rows of the right side
    right_rows: Option<Vec<Row>>,
    /// Left row currently being joined
    current_left: Option<Row>,
    /// Position in `right_rows` for the current left row
    right_index: usize,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        ctx: Context,
        left: Box<dyn RowIter>,
        right: Box<dyn RowIter>,
        condition: Option<Expression>,
    ) -> Self {
        Self {
            ctx,
            left,
            right,
            condition,
            right_rows: None,
            current_left: None,
            right_index: 0,
        }
    }

    fn buffer_right(&mut self) -> Result<()> {
        if self.right_rows.is_some() {
            return Ok(());
        }
        let mut rows = Vec::new();
        while let Some(row) = self.right.next()? {
            self.ctx.check_cancelled()?;
            rows.push(row);
        }
        self.right.close()?;
        self.right_rows = Some(rows);
        Ok(())
    }
}

impl RowIter for NestedLoopJoinExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        self.buffer_right()?;
        let right_rows = match self.right_rows.as_ref() {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Ok(None),
        };

        loop {
            self.ctx.check_cancelled()?;

            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.right_index = 0;
                    }
                    None => return Ok(None),
                }
            }

            let Some(left_row) = self.current_left.as_ref() else {
                continue;
            };
            while self.right_index < right_rows.len() {
                let right_row = &right_rows[self.right_index];
                self.right_index += 1;

                let mut joined = Vec::with_capacity(left_row.len() + right_row.len());
                joined.extend_from_slice(left_row);
                joined.extend_from_slice(right_row);

                let keep = match &self.condition {
                    Some(condition) => {
                        evaluate_predicate(&self.ctx, condition, &joined)? == Some(true)
                    }
                    None => true,
                };
                if keep {
                    return Ok(Some(joined));
                }
            }
            self.current_left = None;
        }
    }

    fn close(&mut self) -> Result<()> {
        self.right_rows = None;
        self.current_left = None;
        let left = self.left.close();
        let right = self.right.close();
        left.and(right)
    }
}
