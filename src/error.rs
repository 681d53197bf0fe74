//! Error types for the analysis core.
//!
//! Structural IR errors indicate a bug in the surrounding compiler (the
//! lowering passes guarantee well-formed control flow); they are reported
//! rather than asserted so hosts can surface them. Environment lookup
//! failures and recursive analysis requests are not errors: they recover
//! locally with empty type information or the analysis bottom.

use thiserror::Error;

use crate::ir::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A `break` or `continue` survived to the top level of a function
    /// body. Lowering only emits these inside loops.
    #[error("break/continue outside of a loop (node {node:?})")]
    UnmatchedJump { node: NodeId },

    /// A loop fixed point failed to stabilize within the iteration cap.
    /// The lattice is finite-height after reduction, so this indicates a
    /// widening bug rather than an input problem.
    #[error("loop fixed point did not converge after {iterations} iterations (node {node:?})")]
    FixedPointDivergence { node: NodeId, iterations: usize },

    /// An assignment target that no lvalue rule covers (e.g. a literal on
    /// the left of `=`). Lowering never produces these.
    #[error("expression cannot be assigned to (node {node:?})")]
    InvalidLvalue { node: NodeId },
}
