//! Parameterized-expression inference: matrix indexing or a call.
//!
//! `sym(args...)` is ambiguous until the bound types of `sym` are known.
//! Matrix-family bindings mean indexing and produce a result shape from
//! the index-argument analysis; function-handle bindings and names that
//! resolve through the environment mean calls, whose output summaries are
//! requested per callee and merged. A name can be both (on different
//! paths); every possibility contributes to the merged output.

use std::collections::BTreeSet;

use crate::analysis::lattice::{
    type_set_union, FunctionRef, ObjType, TypeInfo, TypeSet, TypeSetString, VarTypeMap,
};
use crate::analysis::manager::AnalysisManager;
use crate::analysis::reach_defs::{only_entry_def, VarDefMap};
use crate::analysis::typeinf::{expr::infer_expr, ExprTypeMap};
use crate::env::Callable;
use crate::error::AnalysisError;
use crate::ir::{Expr, ExprKind};

/// Shape classification of an index-argument list.
#[derive(Debug, Clone, Copy)]
pub struct IndexShape {
    /// Number of index dimensions (the argument count).
    pub num_index_dims: usize,
    /// Every index is guaranteed scalar: the result is one element.
    pub is_scalar_indexing: bool,
    /// A single non-scalar index: the result takes the index's shape.
    pub is_matrix_indexing: bool,
}

/// Analyzes index-argument types: optimistic scalar until an argument
/// may be non-scalar or unknown.
pub fn analyze_index_types(
    args: &[Expr],
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<IndexShape, AnalysisError> {
    let mut shape = IndexShape {
        num_index_dims: args.len(),
        is_scalar_indexing: true,
        is_matrix_indexing: false,
    };

    for arg in args {
        let arg_types = infer_expr(arg, mgr, reach, var_types, expr_types)?;

        if arg_types.is_empty() || arg_types[0].is_empty() {
            if args.len() == 1 {
                shape.is_matrix_indexing = true;
            }
            shape.is_scalar_indexing = false;
            continue;
        }

        for info in &arg_types[0] {
            if info.obj_type.is_matrix() && !info.is_scalar {
                if args.len() == 1 {
                    shape.is_matrix_indexing = true;
                }
                shape.is_scalar_indexing = false;
            }
        }
    }

    Ok(shape)
}

/// Infers a parameterized expression `sym(args...)`.
pub fn infer_param(
    sym: &str,
    args: &[Expr],
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    let shape = analyze_index_types(args, mgr, reach, var_types, expr_types)?;

    let mut callee_set: BTreeSet<FunctionRef> = BTreeSet::new();
    let mut output_set: BTreeSet<TypeSetString> = BTreeSet::new();

    // Bound types: matrix family means indexing, handles mean calls.
    if let Some(type_set) = var_types.get(sym).filter(|s| !s.is_empty()) {
        let mut out_set = TypeSet::new();

        for info in type_set {
            if info.obj_type.is_matrix() {
                out_set.insert(TypeInfo::matrix(
                    info.obj_type,
                    shape.num_index_dims <= 2 && !shape.is_matrix_indexing,
                    shape.is_scalar_indexing,
                    info.is_integer,
                    shape.is_scalar_indexing,
                    if shape.is_scalar_indexing { vec![1, 1] } else { Vec::new() },
                ));
            } else if info.obj_type == ObjType::CellArray {
                out_set.insert(TypeInfo::cell_array(
                    shape.num_index_dims <= 2 && !shape.is_matrix_indexing,
                    shape.is_scalar_indexing,
                    shape.is_scalar_indexing,
                    if shape.is_scalar_indexing { vec![1, 1] } else { Vec::new() },
                    info.cell_types.clone(),
                ));
            } else if info.obj_type == ObjType::FnHandle {
                match &info.function {
                    Some(fref) => {
                        callee_set.insert(fref.clone());
                    }
                    // A handle to an unknown function defeats inference.
                    None => return Ok(TypeSetString::new()),
                }
            }
        }

        output_set.insert(vec![out_set]);
    }

    // A free name whose only reaching definition is the entry sentinel
    // may resolve to a function in the environment.
    if only_entry_def(reach, sym) {
        match mgr.program().env.lookup(sym) {
            Some(Callable::User(fid)) => {
                callee_set.insert(FunctionRef::User(fid));
            }
            Some(Callable::Library(lib)) => {
                callee_set.insert(FunctionRef::Library(lib.name.to_string()));
            }
            None => {}
        }
    }

    if !callee_set.is_empty() {
        // Evaluate the argument expressions into one flat type string.
        let mut call_args = TypeSetString::new();
        for arg in args {
            // Cell indexing can splat an unknown number of values.
            if matches!(arg.kind, ExprKind::CellIndex { .. }) {
                return Ok(TypeSetString::new());
            }
            let arg_types = infer_expr(arg, mgr, reach, var_types, expr_types)?;
            if arg_types.is_empty() {
                return Ok(TypeSetString::new());
            }
            for later in arg_types.iter().skip(1) {
                if later.is_empty() {
                    return Ok(TypeSetString::new());
                }
            }
            call_args.extend(arg_types);
        }

        for callee in &callee_set {
            match callee {
                FunctionRef::User(fid) => {
                    let body = &mgr.program().function(*fid).body;
                    let info = mgr.request_type_info(*fid, body, &call_args)?;
                    output_set.insert(info.out_arg_types.clone());
                }
                FunctionRef::Library(name) => match mgr.program().env.lookup(name) {
                    Some(Callable::Library(lib)) => {
                        output_set.insert((lib.type_mapping)(&call_args));
                    }
                    _ => {
                        output_set.insert(TypeSetString::new());
                    }
                },
            }
        }
    }

    // Merge the candidate outputs pointwise; disagreeing arities mean no
    // reliable information.
    let mut candidates = output_set.into_iter();
    let Some(mut merged) = candidates.next() else {
        return Ok(TypeSetString::new());
    };
    for candidate in candidates {
        if candidate.len() != merged.len() {
            return Ok(TypeSetString::new());
        }
        for (slot, set) in merged.iter_mut().zip(candidate.iter()) {
            *slot = type_set_union(slot, set);
        }
    }
    Ok(merged)
}
