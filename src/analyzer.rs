//! Plan analysis.
//!
//! The analyzer turns a plan as it was built (table and column names) into
//! one that can be executed. It runs named [`Batch`]es of rewrite [`Rule`]s
//! in order:
//!
//! 1. `resolution`: binds tables and columns, folds constants, hashes
//!    constant `IN` lists and introduces parallel scans. Repeated until the
//!    plan stops changing, up to [`AnalyzerConfig::max_iterations`] passes.
//! 2. `validation`: a single pass of checks that leave the plan unchanged.

pub mod batch;
pub mod error;
pub mod optimize;
pub mod resolve;
pub mod validation;

use crate::catalog::Database;
use crate::plan::PlanNode;
use anyhow::Result;
use log::debug;
use std::sync::Arc;

pub use batch::{Batch, Rule, RuleFn, Strategy};
pub use error::AnalyzerError;
pub use optimize::{fold_constants, hash_in_tuples, parallelize};
pub use resolve::{resolve_columns, resolve_tables};
pub use validation::{validate_filter_types, validate_operand_columns, validate_resolved};

/// Default cap on fixed-point passes
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Passes a fixed-point batch may take before it fails
    pub max_iterations: usize,
    /// Workers per parallel scan; 1 disables `Exchange`
    pub parallelism: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallelism: 1,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }
}

pub struct Analyzer {
    database: Arc<dyn Database>,
    config: AnalyzerConfig,
    batches: Vec<Batch>,
}

impl Analyzer {
    pub fn new(database: Arc<dyn Database>) -> Self {
        let config = AnalyzerConfig::default();
        Self {
            batches: default_batches(&config),
            database,
            config,
        }
    }

    /// Same database with a new configuration and the default batches
    /// rebuilt for it.
    pub fn with_config(&self, config: AnalyzerConfig) -> Self {
        Self {
            database: Arc::clone(&self.database),
            batches: default_batches(&config),
            config,
        }
    }

    /// Replace the batches to run.
    pub fn with_batches(mut self, batches: Vec<Batch>) -> Self {
        self.batches = batches;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn database(&self) -> &dyn Database {
        self.database.as_ref()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Run every batch in order and return the rewritten plan. The input
    /// plan is left untouched.
    pub fn analyze(&self, plan: &PlanNode) -> Result<PlanNode> {
        let mut current = plan.clone();
        for batch in &self.batches {
            debug!("running batch {} ({:?})", batch.name, batch.strategy);
            current = batch.run(self, &current)?;
        }
        Ok(current)
    }
}

fn default_batches(config: &AnalyzerConfig) -> Vec<Batch> {
    vec![
        Batch::new(
            "resolution",
            Strategy::FixedPoint(config.max_iterations),
            vec![
                Rule::new("resolve_tables", resolve_tables),
                Rule::new("resolve_columns", resolve_columns),
                Rule::new("fold_constants", fold_constants),
                Rule::new("hash_in_tuples", hash_in_tuples),
                Rule::new("parallelize", parallelize),
            ],
        ),
        Batch::new(
            "validation",
            Strategy::Once,
            vec![
                Rule::new("validate_resolved", validate_resolved),
                Rule::new("validate_operand_columns", validate_operand_columns),
                Rule::new("validate_filter_types", validate_filter_types),
            ],
        ),
    ]
}
