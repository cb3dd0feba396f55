//! Per-query execution context.
//!
//! A [`Context`] is threaded through every evaluation and row iterator. It
//! carries the query id and a cancellation flag; child contexts observe
//! their parent's cancellation but can be cancelled on their own, which is
//! how parallel workers are stopped without touching the caller's query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("query {0} was cancelled")]
    Cancelled(u64),
}

#[derive(Debug)]
struct ContextInner {
    query_id: u64,
    cancelled: AtomicBool,
    parent: Option<Context>,
}

/// Execution context shared by all operators of one query
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_query_id(rand::random())
    }

    pub fn with_query_id(query_id: u64) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                query_id,
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// Create a context that is cancelled whenever this one is, and that can
    /// also be cancelled independently.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                query_id: self.inner.query_id,
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn query_id(&self) -> u64 {
        self.inner.query_id
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
            || self
                .inner
                .parent
                .as_ref()
                .map(|p| p.is_cancelled())
                .unwrap_or(false)
    }

    /// Fails with [`ContextError::Cancelled`] once the query was cancelled.
    pub fn check_cancelled(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            Err(ContextError::Cancelled(self.query_id()))
        } else {
            Ok(())
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel() {
        let ctx = Context::with_query_id(7);
        assert!(ctx.check_cancelled().is_ok());

        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check_cancelled(), Err(ContextError::Cancelled(7)));
    }

    #[test]
    fn test_child_context() {
        let parent = Context::with_query_id(1);
        let child = parent.child();
        assert_eq!(child.query_id(), 1);

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }
}
