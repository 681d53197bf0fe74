//! Live-variable analysis.
//!
//! Backward analysis over symbol sets: `in = (out \ defs) ∪ uses`. At a
//! `return` the set is re-seeded with the function's formal out-parameters
//! (those are what the caller observes); the engine re-seeds `break` and
//! `continue` with the enclosing loop's exit and continue-target sets.

use std::collections::HashMap;

use crate::analysis::dataflow::{self, DataflowAnalysis, Direction};
use crate::analysis::lattice::TypeSetString;
use crate::error::AnalysisError;
use crate::ir::visit::{lvalue_uses, SymbolSet};
use crate::ir::{Expr, FunctionId, NodeId, Program, StmtSeq};

/// Live symbols per program point (the set *live before* each node).
pub type LiveVarMap = HashMap<NodeId, SymbolSet>;

/// Result of the live-variable analysis.
#[derive(Debug, Default)]
pub struct LiveVarInfo {
    pub live_var_map: LiveVarMap,
    /// Symbols live at function entry.
    pub entry_live_set: SymbolSet,
}

struct LiveVars;

impl DataflowAnalysis for LiveVars {
    type Info = SymbolSet;

    const DIRECTION: Direction = Direction::Backward;

    fn merge(&mut self, a: &SymbolSet, b: &SymbolSet) -> SymbolSet {
        a.union(b).cloned().collect()
    }

    fn transfer_assign(
        &mut self,
        mut info: SymbolSet,
        _stmt_id: NodeId,
        lhs: &[Expr],
        rhs: &Expr,
    ) -> Result<SymbolSet, AnalysisError> {
        // Kill the defined roots, then add the uses: the RHS and the
        // reads an indexed lvalue performs (its index arguments).
        for lv in lhs {
            if let Some(root) = lv.root_symbol() {
                info.remove(root);
            }
        }
        rhs.collect_symbols(&mut info);
        for lv in lhs {
            lvalue_uses(lv, &mut info);
        }
        Ok(info)
    }

    fn transfer_expr(
        &mut self,
        mut info: SymbolSet,
        _stmt_id: NodeId,
        expr: &Expr,
    ) -> Result<SymbolSet, AnalysisError> {
        expr.collect_symbols(&mut info);
        Ok(info)
    }

    fn transfer_cond(&mut self, mut info: SymbolSet, cond: &Expr) -> SymbolSet {
        cond.collect_symbols(&mut info);
        info
    }
}

/// Computes live variables for a function body.
///
/// With `return_bottom` the result is the analysis bottom: empty map and
/// empty entry set.
pub fn compute_live_vars(
    program: &Program,
    function: FunctionId,
    body: &StmtSeq,
    _in_arg_types: &TypeSetString,
    return_bottom: bool,
) -> Result<LiveVarInfo, AnalysisError> {
    if return_bottom {
        return Ok(LiveVarInfo::default());
    }

    let func = program.function(function);
    let out_set: SymbolSet = func.out_params.iter().cloned().collect();

    let mut analysis = LiveVars;
    let run = dataflow::run(&mut analysis, out_set.clone(), body, Some(out_set))?;

    Ok(LiveVarInfo {
        live_var_map: run.post_map,
        entry_live_set: run.exit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ExprKind, Function, NodeIdGen, Stmt, StmtKind};

    fn sym(gen: &mut NodeIdGen, name: &str) -> Expr {
        Expr {
            id: gen.fresh(),
            kind: ExprKind::Symbol(name.to_string()),
        }
    }

    #[test]
    fn test_out_param_live_at_exit_dead_after_def() {
        let mut gen = NodeIdGen::new();
        // y = x
        let stmt = Stmt {
            id: gen.fresh(),
            kind: StmtKind::Assign {
                lhs: vec![sym(&mut gen, "y")],
                rhs: sym(&mut gen, "x"),
            },
        };
        let stmt_id = stmt.id;
        let body = StmtSeq {
            id: gen.fresh(),
            stmts: vec![stmt],
        };
        let mut program = Program::new();
        let fid = program.add_function(Function {
            name: "f".to_string(),
            in_params: vec!["x".to_string()],
            out_params: vec!["y".to_string()],
            body: body.clone(),
            parent: None,
        });

        let info = compute_live_vars(&program, fid, &body, &Vec::new(), false).unwrap();

        // Before `y = x`: x live, y not.
        let before = &info.live_var_map[&stmt_id];
        assert!(before.contains("x"));
        assert!(!before.contains("y"));
        assert!(info.entry_live_set.contains("x"));
    }

    #[test]
    fn test_loop_keeps_accumulator_live() {
        let mut gen = NodeIdGen::new();
        // loop { test: t = c; body: x = x; }
        let test_stmt = Stmt {
            id: gen.fresh(),
            kind: StmtKind::Assign {
                lhs: vec![sym(&mut gen, "t")],
                rhs: sym(&mut gen, "c"),
            },
        };
        let body_stmt = Stmt {
            id: gen.fresh(),
            kind: StmtKind::Assign {
                lhs: vec![sym(&mut gen, "x")],
                rhs: sym(&mut gen, "x"),
            },
        };
        let loop_stmt = Stmt {
            id: gen.fresh(),
            kind: StmtKind::Loop {
                init: StmtSeq { id: gen.fresh(), stmts: vec![] },
                test: StmtSeq { id: gen.fresh(), stmts: vec![test_stmt] },
                body: StmtSeq { id: gen.fresh(), stmts: vec![body_stmt] },
                incr: StmtSeq { id: gen.fresh(), stmts: vec![] },
            },
        };
        let loop_id = loop_stmt.id;
        let body = StmtSeq {
            id: gen.fresh(),
            stmts: vec![loop_stmt],
        };
        let mut program = Program::new();
        let fid = program.add_function(Function {
            name: "f".to_string(),
            in_params: vec!["c".to_string()],
            out_params: vec!["x".to_string()],
            body: body.clone(),
            parent: None,
        });

        let info = compute_live_vars(&program, fid, &body, &Vec::new(), false).unwrap();
        let before_loop = &info.live_var_map[&loop_id];
        assert!(before_loop.contains("x"));
        assert!(before_loop.contains("c"));
    }
}
