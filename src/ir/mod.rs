//! Structured IR consumed by the analysis core.
//!
//! The IR is supplied by the surrounding compiler; this module defines the
//! node kinds the analyses traverse and the handle types used to key
//! analysis results. Nodes are plain tagged variants with public fields,
//! identified by [`NodeId`] values issued at construction time.

pub mod core;
pub mod visit;

pub use core::{
    BinaryOp, Expr, ExprKind, Function, FunctionId, NodeId, NodeIdGen, Program, Stmt, StmtKind,
    StmtSeq, Symbol, UnaryOp,
};
