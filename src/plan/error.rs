use thiserror::Error;

/// Errors raised while rebuilding or executing plan trees
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("plan is not resolved: {0}")]
    Unresolved(String),

    #[error("{node}: invalid children number, got {actual}, expected {expected}")]
    InvalidChildrenNumber {
        node: String,
        actual: usize,
        expected: usize,
    },

    #[error("{node}: invalid expressions number, got {actual}, expected {expected}")]
    InvalidExpressionsNumber {
        node: String,
        actual: usize,
        expected: usize,
    },

    #[error("no table found beneath {0}")]
    MissingTable(String),
}

pub type PlanResult<T> = Result<T, PlanError>;
