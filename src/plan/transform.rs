//! Plan tree rewriting.
//!
//! Both directions rebuild the tree through [`PlanNode::with_children`];
//! the input plan is never modified.

use crate::expression::{Expression, ExpressionError};
use crate::plan::PlanNode;
use anyhow::Result;

/// What a top-down rewrite does after visiting a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    /// Rewrite the returned node's children as well
    Continue,
    /// Keep the returned node's children as they are
    Skip,
}

impl PlanNode {
    /// Transform children first, reattach them, then apply `f` to the node.
    pub fn transform_up<F>(&self, f: &F) -> Result<PlanNode>
    where
        F: Fn(PlanNode) -> Result<PlanNode>,
    {
        let children = self.children();
        let node = if children.is_empty() {
            self.clone()
        } else {
            let transformed = children
                .into_iter()
                .map(|c| c.transform_up(f))
                .collect::<Result<Vec<_>>>()?;
            self.with_children(transformed)?
        };
        f(node)
    }

    /// Apply `f` to the node first, then to the children of its result
    /// unless `f` asked to skip them.
    pub fn transform_down<F>(&self, f: &F) -> Result<PlanNode>
    where
        F: Fn(PlanNode) -> Result<(PlanNode, Recursion)>,
    {
        let (node, recursion) = f(self.clone())?;
        if recursion == Recursion::Skip {
            return Ok(node);
        }

        let children = node.children();
        if children.is_empty() {
            return Ok(node);
        }
        let transformed = children
            .into_iter()
            .map(|c| c.transform_down(f))
            .collect::<Result<Vec<_>>>()?;
        Ok(node.with_children(transformed)?)
    }

    /// Rewrite every embedded expression of every node bottom-up with `f`.
    pub fn transform_expressions_up<F, E>(&self, f: &F) -> Result<PlanNode>
    where
        F: Fn(Expression) -> Result<Expression, E>,
        E: From<ExpressionError> + Into<anyhow::Error>,
    {
        self.transform_up(&|node| {
            let expressions = node.expressions();
            if expressions.is_empty() {
                return Ok(node);
            }
            let rewritten = expressions
                .into_iter()
                .map(|e| e.try_transform_up(f))
                .collect::<Result<Vec<_>, E>>()
                .map_err(Into::<anyhow::Error>::into)?;
            Ok(node.with_expressions(rewritten)?)
        })
    }
}
