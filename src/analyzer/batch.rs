//! Named rules grouped into batches.

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::plan::PlanNode;
use anyhow::Result;
use log::{debug, trace};

/// A rewrite rule: a pure function from plan to plan
pub type RuleFn = fn(&Analyzer, &PlanNode) -> Result<PlanNode>;

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: RuleFn,
}

impl Rule {
    pub const fn new(name: &'static str, apply: RuleFn) -> Self {
        Self { name, apply }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// How often a batch runs its rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A single pass
    Once,
    /// Repeat until a pass changes nothing, failing after this many passes
    FixedPoint(usize),
}

/// Ordered list of rules applied together
#[derive(Debug, Clone)]
pub struct Batch {
    pub name: &'static str,
    pub strategy: Strategy,
    pub rules: Vec<Rule>,
}

impl Batch {
    pub fn new(name: &'static str, strategy: Strategy, rules: Vec<Rule>) -> Self {
        Self {
            name,
            strategy,
            rules,
        }
    }

    /// Run the batch. The first failing rule aborts it and its error is
    /// returned unchanged.
    pub fn run(&self, analyzer: &Analyzer, plan: &PlanNode) -> Result<PlanNode> {
        let max_passes = match self.strategy {
            Strategy::Once => 1,
            Strategy::FixedPoint(n) => n.max(1),
        };

        let mut current = plan.clone();
        for pass in 1..=max_passes {
            let before = current.clone();
            current = self.apply_rules(analyzer, current)?;
            if current == before {
                trace!("batch {} reached a fixed point after {} passes", self.name, pass);
                return Ok(current);
            }
        }

        match self.strategy {
            Strategy::Once => Ok(current),
            Strategy::FixedPoint(_) => Err(AnalyzerError::DidNotConverge {
                batch: self.name.to_string(),
                iterations: max_passes,
            }
            .into()),
        }
    }

    fn apply_rules(&self, analyzer: &Analyzer, mut plan: PlanNode) -> Result<PlanNode> {
        for rule in &self.rules {
            let next = (rule.apply)(analyzer, &plan)?;
            if next != plan {
                debug!("rule {} changed plan:\n{}", rule.name, next);
            }
            plan = next;
        }
        Ok(plan)
    }
}
