use thiserror::Error;

/// Errors raised while analyzing a plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("ambiguous column name: {0}")]
    AmbiguousColumn(String),

    #[error("plan is not resolved: {0}")]
    UnresolvedNode(String),

    #[error("batch {batch} did not converge after {iterations} iterations")]
    DidNotConverge { batch: String, iterations: usize },
}
