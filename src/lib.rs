//! In-memory relational query core.
//!
//! Plans are built from [`plan::PlanBuilder`], bound and optimized by the
//! [`analyzer`], and executed as a tree of pull-based [`executor::RowIter`]s
//! over any [`catalog::Database`].

pub mod analyzer;
pub mod catalog;
pub mod context;
pub mod engine;
pub mod executor;
pub mod expression;
pub mod parse;
pub mod plan;
pub mod storage;
pub mod types;
