//! Reaching-definition analysis.
//!
//! Forward analysis over maps from symbol to the set of definition sites
//! that may reach a program point. The distinguished [`Def::Entry`] site
//! means "defined before function entry, from the enclosing environment";
//! type inference resolves free names (library calls, globals) through
//! it.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::analysis::dataflow::{self, DataflowAnalysis, Direction};
use crate::analysis::lattice::TypeSetString;
use crate::error::AnalysisError;
use crate::ir::{Expr, FunctionId, NodeId, Program, StmtSeq, Symbol};

/// A definition site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Def {
    /// Defined before function entry (enclosing environment).
    Entry,
    /// Defined by the assignment statement with this id.
    Node(NodeId),
}

/// Possible definition sites of one symbol.
pub type VarDefSet = BTreeSet<Def>;

/// Definition sites per symbol at one program point.
pub type VarDefMap = HashMap<Symbol, VarDefSet>;

/// Per-program-point definition maps (the map *entering* each node).
pub type ReachDefMap = HashMap<NodeId, VarDefMap>;

/// Result of the reaching-definition analysis.
#[derive(Debug, Default)]
pub struct ReachDefInfo {
    pub reach_def_map: ReachDefMap,
    /// Definitions reaching the function's exit points.
    pub exit_def_map: VarDefMap,
}

/// Union of two definition maps, pointwise over symbols.
pub fn var_def_map_union(a: &VarDefMap, b: &VarDefMap) -> VarDefMap {
    let mut out = a.clone();
    for (sym, defs) in b {
        out.entry(sym.clone()).or_default().extend(defs.iter().copied());
    }
    out
}

/// Looks up the definition sites of `sym` in a map, treating an absent
/// symbol as defined only before entry: a name never assigned on any path
/// can only come from the enclosing environment.
pub fn defs_of<'a>(map: &'a VarDefMap, sym: &str) -> std::borrow::Cow<'a, VarDefSet> {
    match map.get(sym) {
        Some(set) => std::borrow::Cow::Borrowed(set),
        None => {
            let mut set = VarDefSet::new();
            set.insert(Def::Entry);
            std::borrow::Cow::Owned(set)
        }
    }
}

/// True when the only definition of `sym` reaching this point is the
/// entry sentinel.
pub fn only_entry_def(map: &VarDefMap, sym: &str) -> bool {
    let defs = defs_of(map, sym);
    defs.len() == 1 && defs.contains(&Def::Entry)
}

struct ReachDefs;

impl DataflowAnalysis for ReachDefs {
    type Info = VarDefMap;

    const DIRECTION: Direction = Direction::Forward;

    fn merge(&mut self, a: &VarDefMap, b: &VarDefMap) -> VarDefMap {
        var_def_map_union(a, b)
    }

    fn transfer_assign(
        &mut self,
        mut info: VarDefMap,
        stmt_id: NodeId,
        lhs: &[Expr],
        _rhs: &Expr,
    ) -> Result<VarDefMap, AnalysisError> {
        for lv in lhs {
            if let Some(root) = lv.root_symbol() {
                let mut defs = VarDefSet::new();
                defs.insert(Def::Node(stmt_id));
                info.insert(root.clone(), defs);
            }
        }
        Ok(info)
    }
}

/// Computes reaching definitions for a function body.
///
/// The initial map binds every formal in-parameter to the entry sentinel.
/// With `return_bottom` the result is the analysis bottom: empty maps.
pub fn compute_reach_defs(
    program: &Program,
    function: FunctionId,
    body: &StmtSeq,
    _in_arg_types: &TypeSetString,
    return_bottom: bool,
) -> Result<ReachDefInfo, AnalysisError> {
    if return_bottom {
        return Ok(ReachDefInfo::default());
    }

    let func = program.function(function);
    let mut entry = VarDefMap::new();
    for param in &func.in_params {
        let mut defs = VarDefSet::new();
        defs.insert(Def::Entry);
        entry.insert(param.clone(), defs);
    }

    let mut analysis = ReachDefs;
    let run = dataflow::run(&mut analysis, entry, body, None)?;

    let mut exit_def_map = run.exit;
    for ret in &run.ret_points {
        exit_def_map = var_def_map_union(&exit_def_map, ret);
    }

    Ok(ReachDefInfo {
        reach_def_map: run.pre_map,
        exit_def_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ExprKind, Function, NodeIdGen, Stmt, StmtKind};

    fn assign(gen: &mut NodeIdGen, name: &str, value: i64) -> Stmt {
        Stmt {
            id: gen.fresh(),
            kind: StmtKind::Assign {
                lhs: vec![Expr {
                    id: gen.fresh(),
                    kind: ExprKind::Symbol(name.to_string()),
                }],
                rhs: Expr {
                    id: gen.fresh(),
                    kind: ExprKind::IntConst(value),
                },
            },
        }
    }

    #[test]
    fn test_assignment_kills_entry_def() {
        let mut gen = NodeIdGen::new();
        let stmt = assign(&mut gen, "x", 1);
        let stmt_id = stmt.id;
        let body = StmtSeq {
            id: gen.fresh(),
            stmts: vec![stmt],
        };
        let mut program = Program::new();
        let fid = program.add_function(Function {
            name: "f".to_string(),
            in_params: vec!["x".to_string()],
            out_params: vec![],
            body: body.clone(),
            parent: None,
        });

        let info = compute_reach_defs(&program, fid, &body, &Vec::new(), false).unwrap();

        // Before the statement: the parameter's entry definition.
        let before = &info.reach_def_map[&stmt_id];
        assert!(before["x"].contains(&Def::Entry));

        // At exit: only the assignment.
        let exit = &info.exit_def_map["x"];
        assert_eq!(exit.len(), 1);
        assert!(exit.contains(&Def::Node(stmt_id)));
    }

    #[test]
    fn test_branch_defs_union_at_join() {
        let mut gen = NodeIdGen::new();
        let then_stmt = assign(&mut gen, "x", 1);
        let else_stmt = assign(&mut gen, "x", 2);
        let then_id = then_stmt.id;
        let else_id = else_stmt.id;

        let if_stmt = Stmt {
            id: gen.fresh(),
            kind: StmtKind::IfElse {
                cond: Expr {
                    id: gen.fresh(),
                    kind: ExprKind::Symbol("c".to_string()),
                },
                then_seq: StmtSeq {
                    id: gen.fresh(),
                    stmts: vec![then_stmt],
                },
                else_seq: StmtSeq {
                    id: gen.fresh(),
                    stmts: vec![else_stmt],
                },
            },
        };
        let body = StmtSeq {
            id: gen.fresh(),
            stmts: vec![if_stmt],
        };
        let mut program = Program::new();
        let fid = program.add_function(Function {
            name: "f".to_string(),
            in_params: vec!["c".to_string()],
            out_params: vec![],
            body: body.clone(),
            parent: None,
        });

        let info = compute_reach_defs(&program, fid, &body, &Vec::new(), false).unwrap();
        let exit = &info.exit_def_map["x"];
        assert!(exit.contains(&Def::Node(then_id)));
        assert!(exit.contains(&Def::Node(else_id)));
    }

    #[test]
    fn test_missing_symbol_reads_as_entry() {
        let map = VarDefMap::new();
        assert!(only_entry_def(&map, "sin"));
    }
}
