//! Sub-expression traversal and symbol collection.
//!
//! The live-variable analysis needs the used and defined symbol sets of a
//! statement; type inference walks sub-expressions explicitly, so only the
//! generic collection helpers live here.

use std::collections::BTreeSet;

use super::core::{Expr, ExprKind, Stmt, StmtKind, Symbol};

/// Set of symbols, ordered for deterministic iteration.
pub type SymbolSet = BTreeSet<Symbol>;

impl Expr {
    /// Calls `f` on this expression and every sub-expression, pre-order.
    pub fn walk<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match &self.kind {
            ExprKind::Symbol(_)
            | ExprKind::IntConst(_)
            | ExprKind::FpConst(_)
            | ExprKind::StrConst(_)
            | ExprKind::FnHandle(_)
            | ExprKind::End => {}
            ExprKind::Range { start, step, end } => {
                for part in [start, step, end].into_iter().flatten() {
                    part.walk(f);
                }
            }
            ExprKind::Matrix { rows } | ExprKind::CellArray { rows } => {
                for row in rows {
                    for e in row {
                        e.walk(f);
                    }
                }
            }
            ExprKind::Dot { expr, .. } => expr.walk(f),
            ExprKind::Param { args, .. } | ExprKind::CellIndex { args, .. } => {
                for a in args {
                    a.walk(f);
                }
            }
            ExprKind::Lambda { body, .. } => body.walk(f),
            ExprKind::BinaryOp { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::UnaryOp { operand, .. } => operand.walk(f),
        }
    }

    /// Collects every symbol referenced by this expression, including the
    /// head symbols of indexing and handle expressions.
    pub fn collect_symbols(&self, out: &mut SymbolSet) {
        self.walk(&mut |e| match &e.kind {
            ExprKind::Symbol(sym) | ExprKind::FnHandle(sym) => {
                out.insert(sym.clone());
            }
            ExprKind::Param { sym, .. } | ExprKind::CellIndex { sym, .. } => {
                out.insert(sym.clone());
            }
            _ => {}
        });
    }
}

impl Stmt {
    /// Root symbols defined by this statement (assignment targets).
    pub fn defs(&self) -> SymbolSet {
        let mut out = SymbolSet::new();
        if let StmtKind::Assign { lhs, .. } = &self.kind {
            for lv in lhs {
                if let Some(root) = lv.root_symbol() {
                    out.insert(root.clone());
                }
            }
        }
        out
    }

    /// Symbols used by this statement: every referenced symbol except the
    /// assignment root targets themselves. Index arguments of an indexed
    /// lvalue are uses (`a(i) = x` reads `i`).
    pub fn uses(&self) -> SymbolSet {
        let mut out = SymbolSet::new();
        match &self.kind {
            StmtKind::Assign { lhs, rhs } => {
                rhs.collect_symbols(&mut out);
                for lv in lhs {
                    lvalue_uses(lv, &mut out);
                }
            }
            StmtKind::Expr(e) => e.collect_symbols(&mut out),
            StmtKind::IfElse { cond, .. } => cond.collect_symbols(&mut out),
            StmtKind::Loop { .. } | StmtKind::Break | StmtKind::Continue | StmtKind::Return => {}
        }
        out
    }
}

/// Collects the symbols an lvalue *reads*: index arguments and the inner
/// chain, but not the root target itself.
pub(crate) fn lvalue_uses(lv: &Expr, out: &mut SymbolSet) {
    match &lv.kind {
        ExprKind::Symbol(_) => {}
        ExprKind::Dot { expr, .. } => lvalue_uses(expr, out),
        ExprKind::Param { args, .. } | ExprKind::CellIndex { args, .. } => {
            for a in args {
                a.collect_symbols(out);
            }
        }
        // Not a well-formed lvalue; collect conservatively.
        _ => lv.collect_symbols(out),
    }
}
