//! Core IR node definitions.
//!
//! Statements and expressions are tagged variants carrying a [`NodeId`];
//! analysis results (reaching definitions, live sets, type maps) are keyed
//! by these ids, so every node that can be a program point must have one.
//! Functions are referenced through [`FunctionId`] handles into the
//! [`Program`] table rather than through pointers; the program outlives
//! every analysis result.

use serde::{Deserialize, Serialize};

use crate::env::Environment;

/// Identifier of an IR node (statement, sequence or expression).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Handle to a function in the [`Program`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

/// Variable and function names. The surrounding compiler interns these;
/// the analyses only compare and hash them.
pub type Symbol = String;

/// Issues fresh node ids during IR construction.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// A sequence of statements (function body, branch block, loop section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StmtSeq {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

/// Statement kinds.
///
/// Loops are normalized by the lowering passes into the four-section form
/// `init; while test { body; incr }`; `for` loops put the induction update
/// into `incr`, `while` loops leave `init` and `incr` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Multi-assignment: `[lhs...] = rhs`. A single-target assignment has
    /// one lhs expression.
    Assign { lhs: Vec<Expr>, rhs: Expr },
    /// Bare expression statement, evaluated for effect.
    Expr(Expr),
    IfElse {
        cond: Expr,
        then_seq: StmtSeq,
        else_seq: StmtSeq,
    },
    Loop {
        init: StmtSeq,
        test: StmtSeq,
        body: StmtSeq,
        incr: StmtSeq,
    },
    Break,
    Continue,
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Symbol(Symbol),
    IntConst(i64),
    FpConst(f64),
    StrConst(String),
    /// `start:step:end`; any component may be elided.
    Range {
        start: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    /// Matrix literal `[a b; c d]`, row-major rows.
    Matrix { rows: Vec<Vec<Expr>> },
    /// Cell-array literal `{a b; c d}`.
    CellArray { rows: Vec<Vec<Expr>> },
    /// Function handle `@f`.
    FnHandle(Symbol),
    /// Field access `expr.field`.
    Dot { expr: Box<Expr>, field: String },
    /// Parameterized expression `sym(args...)`: matrix indexing or a call,
    /// disambiguated by type inference.
    Param { sym: Symbol, args: Vec<Expr> },
    /// Cell indexing `sym{args...}`.
    CellIndex { sym: Symbol, args: Vec<Expr> },
    /// Anonymous function. Opaque to the analyses.
    Lambda {
        params: Vec<Symbol>,
        body: Box<Expr>,
    },
    /// The `end` keyword inside an indexing context.
    End,
    BinaryOp {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Element-wise arithmetic, integer preserving
    Plus,
    Minus,
    ArrayMult,
    ArrayPower,
    // Element-wise arithmetic, non integer preserving
    ArrayDiv,
    ArrayLeftDiv,
    // Matrix arithmetic
    Mult,
    Div,
    LeftDiv,
    Power,
    // Comparisons and element-wise logic
    Equal,
    NotEqual,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
    ArrayOr,
    ArrayAnd,
    // Short-circuit logic
    Or,
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Transpose,
    ArrayTranspose,
}

impl Expr {
    /// The leftmost symbol of an lvalue chain (`a` in `a.b(5).c`).
    ///
    /// Returns `None` for expressions that cannot head an lvalue.
    pub fn root_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Symbol(sym) => Some(sym),
            ExprKind::Dot { expr, .. } => expr.root_symbol(),
            ExprKind::Param { sym, .. } | ExprKind::CellIndex { sym, .. } => Some(sym),
            _ => None,
        }
    }
}

/// A user-defined function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Symbol,
    pub in_params: Vec<Symbol>,
    pub out_params: Vec<Symbol>,
    pub body: StmtSeq,
    /// Enclosing function for nested functions. Handles to nested
    /// functions cannot be typed and resolve to no information.
    pub parent: Option<FunctionId>,
}

/// The analyzed program: function table plus the global environment the
/// analyses resolve free names against.
#[derive(Debug, Default)]
pub struct Program {
    pub functions: Vec<Function>,
    pub env: Environment,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function and binds its name in the environment.
    pub fn add_function(&mut self, func: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.env.bind_user(func.name.clone(), id);
        self.functions.push(func);
        id
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }
}
