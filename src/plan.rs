//! Query plan trees.
//!
//! A [`PlanNode`] is an immutable operator tree. Like expressions, plans are
//! rewritten by rebuilding nodes through `with_children` and
//! `with_expressions`, never by editing them in place, so one plan can be
//! shared by several concurrent executions. Executing a plan means asking
//! its root for a fresh row iterator.

pub mod builder;
pub mod display;
pub mod error;
pub mod node;
pub mod transform;

pub use builder::PlanBuilder;
pub use error::{PlanError, PlanResult};
pub use node::{PlanNode, TableRef};
pub use transform::Recursion;
