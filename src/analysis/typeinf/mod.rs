//! Type inference for function bodies.
//!
//! Given the types of a function's input arguments, computes per-program-
//! point sets of possible types for every variable and expression, and a
//! summary (`out_arg_types`) other inference runs consume through the
//! manager. Inference is a forward dataflow instance: the statement-level
//! transfer evaluates right-hand sides through the expression transfer
//! functions and pushes results through the recursive lvalue assignment.
//!
//! Calls to user functions re-enter the manager with the concrete
//! argument types; cycles come back as bottom summaries (empty output
//! sets) and dissolve in the union at the call site.

pub mod call;
pub mod expr;
pub mod lvalue;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::analysis::dataflow::{self, DataflowAnalysis, Direction};
use crate::analysis::lattice::{
    type_map_vector_union, type_set_reduce, var_type_map_union, TypeSet, TypeSetString, VarTypeMap,
};
use crate::analysis::manager::AnalysisManager;
use crate::analysis::reach_defs::{ReachDefInfo, VarDefMap};
use crate::error::AnalysisError;
use crate::ir::{Expr, FunctionId, NodeId, StmtSeq};

/// Possible types per expression node, one set per return-value slot.
pub type ExprTypeMap = HashMap<NodeId, TypeSetString>;

/// Per-program-point variable type maps.
pub type TypeInfoMap = HashMap<NodeId, VarTypeMap>;

/// Result of type inference on a function body.
#[derive(Debug, Default)]
pub struct TypeInferInfo {
    /// Variable types entering each statement.
    pub pre_type_map: TypeInfoMap,
    /// Variable types leaving each statement.
    pub post_type_map: TypeInfoMap,
    /// Union of the variable types at every exit point.
    pub exit_type_map: VarTypeMap,
    /// Possible types of each output argument, `|out_params|` sets.
    pub out_arg_types: TypeSetString,
    /// Possible types of every expression, accumulated across visits.
    pub expr_type_map: ExprTypeMap,
}

struct TypeInference<'a, 'p> {
    mgr: &'a mut AnalysisManager<'p>,
    reach: Rc<ReachDefInfo>,
    expr_types: ExprTypeMap,
}

impl<'a, 'p> DataflowAnalysis for TypeInference<'a, 'p> {
    type Info = VarTypeMap;

    const DIRECTION: Direction = Direction::Forward;

    fn merge(&mut self, a: &VarTypeMap, b: &VarTypeMap) -> VarTypeMap {
        var_type_map_union(a, b)
    }

    fn transfer_assign(
        &mut self,
        info: VarTypeMap,
        stmt_id: NodeId,
        lhs: &[Expr],
        rhs: &Expr,
    ) -> Result<VarTypeMap, AnalysisError> {
        let reach_info = self.reach.clone();
        let empty_defs = VarDefMap::new();
        let defs = reach_info.reach_def_map.get(&stmt_id).unwrap_or(&empty_defs);

        let mut map = info;
        let mut rhs_types =
            expr::infer_expr(rhs, self.mgr, defs, &map, &mut self.expr_types)?;

        // More targets than inferred values: nothing reliable is known
        // about any of them.
        if lhs.len() > rhs_types.len() {
            rhs_types.clear();
            rhs_types.resize(lhs.len(), TypeSet::new());
        }

        for (i, lv) in lhs.iter().enumerate() {
            let rhs_val = type_set_reduce(&rhs_types[i]);
            let new_set =
                lvalue::infer_lvalue(lv, rhs_val, self.mgr, defs, &map, &mut self.expr_types)?;
            match lv.root_symbol() {
                Some(root) => {
                    map.insert(root.clone(), new_set);
                }
                None => return Err(AnalysisError::InvalidLvalue { node: lv.id }),
            }
        }
        Ok(map)
    }

    fn transfer_expr(
        &mut self,
        info: VarTypeMap,
        stmt_id: NodeId,
        e: &Expr,
    ) -> Result<VarTypeMap, AnalysisError> {
        let reach_info = self.reach.clone();
        let empty_defs = VarDefMap::new();
        let defs = reach_info.reach_def_map.get(&stmt_id).unwrap_or(&empty_defs);

        // Inferred for its effect on the expression type map only.
        expr::infer_expr(e, self.mgr, defs, &info, &mut self.expr_types)?;
        Ok(info)
    }
}

/// Performs type inference on a function body.
///
/// `in_arg_types` supplies the types of the first `|in_arg_types|`
/// formal in-parameters; the remaining parameters stay unbound. With
/// `return_bottom` the result is the analysis bottom: empty maps and
/// `|out_params|` empty output sets.
pub fn compute_type_info(
    mgr: &mut AnalysisManager<'_>,
    function: FunctionId,
    body: &StmtSeq,
    in_arg_types: &TypeSetString,
    return_bottom: bool,
) -> Result<TypeInferInfo, AnalysisError> {
    let program = mgr.program();
    let func = program.function(function);
    let out_len = func.out_params.len();

    if return_bottom {
        return Ok(TypeInferInfo {
            out_arg_types: vec![TypeSet::new(); out_len],
            ..TypeInferInfo::default()
        });
    }

    debug!(function = %func.name, args = in_arg_types.len(), "type inference start");

    let mut initial = VarTypeMap::new();
    for (param, types) in func.in_params.iter().zip(in_arg_types.iter()) {
        initial.insert(param.clone(), types.clone());
    }

    let reach = mgr.request_reach_defs(function, body, in_arg_types)?;
    let live = mgr.request_live_vars(function, body, in_arg_types)?;
    debug!(entry_live = live.entry_live_set.len(), "supporting analyses ready");

    let mut analysis = TypeInference {
        mgr,
        reach,
        expr_types: ExprTypeMap::new(),
    };
    let run = dataflow::run(&mut analysis, initial, body, None)?;
    let expr_type_map = analysis.expr_types;

    // Fall-through is a return point like any other.
    let mut ret_points = run.ret_points;
    ret_points.push(run.exit);
    let exit_type_map = type_map_vector_union(&ret_points);

    let mut out_arg_types = vec![TypeSet::new(); out_len];
    for (i, out_param) in func.out_params.iter().enumerate() {
        match exit_type_map.get(out_param) {
            Some(set) => out_arg_types[i] = set.clone(),
            None => warn!(param = %out_param, "output parameter may be unassigned"),
        }
    }

    debug!(function = %func.name, "type inference complete");

    Ok(TypeInferInfo {
        pre_type_map: run.pre_map,
        post_type_map: run.post_map,
        exit_type_map,
        out_arg_types,
        expr_type_map,
    })
}
