//! Expression transfer functions.
//!
//! `infer_expr` computes a [`TypeSetString`] for an expression — one type
//! set per value it produces — and accumulates the result into the
//! expression type map by pointwise union (an expression visited on
//! several paths or fixed-point rounds collects all its possibilities).
//!
//! Unknown is always representable: an empty string (or an empty set in a
//! slot) means "no information, be conservative". Environment lookup
//! failures degrade to unknown rather than erroring.

use std::collections::BTreeSet;

use crate::analysis::lattice::ops::type_set_str_accumulate;
use crate::analysis::lattice::types::type_set_str_make;
use crate::analysis::lattice::{
    type_set_reduce, FunctionRef, ObjType, TypeInfo, TypeSet, TypeSetString, VarTypeMap,
};
use crate::analysis::manager::AnalysisManager;
use crate::analysis::reach_defs::{only_entry_def, VarDefMap};
use crate::analysis::tfuncs::arithmetic as tmap;
use crate::analysis::typeinf::{call, ExprTypeMap};
use crate::env::Callable;
use crate::error::AnalysisError;
use crate::ir::{BinaryOp, Expr, ExprKind, UnaryOp};

/// Infers the possible types of `expr` and records them in `expr_types`.
pub fn infer_expr(
    expr: &Expr,
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    let out_types = match &expr.kind {
        // Numeric literals are scalar F64 values; integer literals and
        // `end` are integer-valued.
        ExprKind::IntConst(_) | ExprKind::End => {
            type_set_str_make(TypeInfo::scalar(ObjType::MatrixF64, true))
        }
        ExprKind::FpConst(_) => type_set_str_make(TypeInfo::scalar(ObjType::MatrixF64, false)),

        ExprKind::StrConst(s) => {
            let len = s.chars().count();
            type_set_str_make(TypeInfo::matrix(
                ObjType::Char,
                true,
                len == 1,
                true,
                true,
                vec![1, len],
            ))
        }

        ExprKind::Symbol(sym) => infer_symbol(sym, mgr, reach, var_types)?,

        ExprKind::Range { start, step, end } => {
            infer_range(start, step, end, mgr, reach, var_types, expr_types)?
        }

        ExprKind::Matrix { rows } => infer_matrix(rows, mgr, reach, var_types, expr_types)?,

        ExprKind::CellArray { rows } => {
            infer_cell_array(rows, mgr, reach, var_types, expr_types)?
        }

        ExprKind::FnHandle(sym) => infer_fn_handle(sym, mgr, reach),

        ExprKind::Dot { expr: inner, field } => {
            infer_dot(inner, field, mgr, reach, var_types, expr_types)?
        }

        ExprKind::Param { sym, args } => {
            call::infer_param(sym, args, mgr, reach, var_types, expr_types)?
        }

        ExprKind::CellIndex { sym, args } => {
            infer_cell_index(sym, args, mgr, reach, var_types, expr_types)?
        }

        ExprKind::UnaryOp { op, operand } => {
            let operand_types = infer_expr(operand, mgr, reach, var_types, expr_types)?;
            let arg = vec![operand_types.into_iter().next().unwrap_or_default()];
            match op {
                UnaryOp::Plus => tmap::tmap_ident(&arg),
                UnaryOp::Minus => tmap::tmap_minus(&arg),
                UnaryOp::Not => tmap::tmap_not(&arg),
                UnaryOp::Transpose | UnaryOp::ArrayTranspose => tmap::tmap_transp(&arg),
            }
        }

        ExprKind::BinaryOp { op, lhs, rhs } => {
            let left_types = infer_expr(lhs, mgr, reach, var_types, expr_types)?;
            let right_types = infer_expr(rhs, mgr, reach, var_types, expr_types)?;
            let args = vec![
                left_types.into_iter().next().unwrap_or_default(),
                right_types.into_iter().next().unwrap_or_default(),
            ];
            match op {
                BinaryOp::Plus
                | BinaryOp::Minus
                | BinaryOp::ArrayMult
                | BinaryOp::ArrayPower => tmap::tmap_array_arith_int(&args),
                BinaryOp::ArrayDiv | BinaryOp::ArrayLeftDiv => tmap::tmap_array_arith(&args),
                BinaryOp::Mult => tmap::tmap_mult(&args),
                BinaryOp::Div => tmap::tmap_div(&args),
                BinaryOp::LeftDiv => tmap::tmap_left_div(&args),
                BinaryOp::Power => tmap::tmap_power(&args),
                BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanEq
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEq
                | BinaryOp::ArrayOr
                | BinaryOp::ArrayAnd => tmap::tmap_array_logic(&args),
                // Short-circuit forms force their operands to scalars.
                BinaryOp::Or | BinaryOp::And => {
                    type_set_str_make(TypeInfo::scalar(ObjType::Logical, true))
                }
            }
        }

        // Opaque to the analysis.
        ExprKind::Lambda { .. } => TypeSetString::new(),
    };

    type_set_str_accumulate(expr_types.entry(expr.id).or_default(), &out_types);
    Ok(out_types)
}

/// A symbol read: bound variables first; otherwise a name whose only
/// reaching definition is the entry sentinel resolves through the
/// environment (a no-argument call of a function, or a function value).
fn infer_symbol(
    sym: &str,
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    if let Some(set) = var_types.get(sym) {
        return Ok(vec![set.clone()]);
    }
    if !only_entry_def(reach, sym) {
        return Ok(TypeSetString::new());
    }
    match mgr.program().env.lookup(sym) {
        Some(Callable::User(fid)) => {
            let body = &mgr.program().function(fid).body;
            let info = mgr.request_type_info(fid, body, &TypeSetString::new())?;
            Ok(info.out_arg_types.clone())
        }
        Some(Callable::Library(lib)) => Ok((lib.type_mapping)(&TypeSetString::new())),
        None => Ok(TypeSetString::new()),
    }
}

/// Range expressions produce F64 row vectors. The result is integer when
/// every present endpoint component is known integer; the size is known
/// only for literal integer endpoints.
fn infer_range(
    start: &Option<Box<Expr>>,
    step: &Option<Box<Expr>>,
    end: &Option<Box<Expr>>,
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    let mut is_integer = true;
    for part in [start, step].into_iter().flatten() {
        let types = infer_expr(part, mgr, reach, var_types, expr_types)?;
        let set = types.into_iter().next().unwrap_or_default();
        if set.is_empty() || set.iter().any(|t| !t.is_integer) {
            is_integer = false;
        }
    }

    // Literal endpoints give an exact element count.
    let literal = |e: &Option<Box<Expr>>| match e.as_deref() {
        Some(Expr {
            kind: ExprKind::IntConst(v),
            ..
        }) => Some(*v),
        _ => None,
    };
    if let (Some(first), Some(last)) = (literal(start), literal(end)) {
        let step_val = match step {
            None => Some(1),
            Some(_) => literal(step),
        };
        if let Some(step_val) = step_val {
            if step_val != 0 {
                let span = last - first;
                let len = if span.signum() == step_val.signum() || span == 0 {
                    (span / step_val + 1) as usize
                } else {
                    0
                };
                return Ok(type_set_str_make(TypeInfo::matrix(
                    ObjType::MatrixF64,
                    true,
                    len == 1,
                    is_integer,
                    true,
                    vec![1, len],
                )));
            }
        }
    }

    Ok(type_set_str_make(TypeInfo::matrix(
        ObjType::MatrixF64,
        true,
        false,
        is_integer,
        false,
        Vec::new(),
    )))
}

/// Matrix literal typing: element types are examined left-to-right,
/// top-to-bottom. Dim 0 accumulates first-column row counts, dim 1
/// first-row column counts; higher dimensions must agree. A complex or
/// unknown element adds a complex sibling to the possible output types.
fn infer_matrix(
    rows: &[Vec<Expr>],
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    if rows.is_empty() || rows[0].is_empty() {
        // The empty matrix: F64, 0x0.
        return Ok(type_set_str_make(TypeInfo::matrix(
            ObjType::MatrixF64,
            true,
            false,
            true,
            true,
            vec![0, 0],
        )));
    }

    let mut size_known = true;
    let mut all_integer = true;
    let mut complex_arg = false;
    let mut unknown_arg = false;
    let mut out_mat_size: Vec<usize> = vec![0, 0];
    let mut first_types: BTreeSet<ObjType> = BTreeSet::new();

    for (ri, row) in rows.iter().enumerate() {
        for (ci, elem) in row.iter().enumerate() {
            let elem_types = infer_expr(elem, mgr, reach, var_types, expr_types)?;
            let first_elem = ri == 0 && ci == 0;

            if elem_types.is_empty() || elem_types[0].is_empty() {
                // An unknown first element gives the whole literal an
                // unknown type.
                if first_elem {
                    return Ok(TypeSetString::new());
                }
                unknown_arg = true;
                size_known = false;
                all_integer = false;
                continue;
            }

            let arg_types = &elem_types[0];
            let mut prev_size: Vec<usize> = Vec::new();

            for (ti, info) in arg_types.iter().enumerate() {
                let mat_size = &info.mat_size;

                if first_elem {
                    first_types.insert(info.obj_type);
                    if ti == 0 {
                        out_mat_size = if mat_size.len() >= 2 {
                            let mut size = mat_size.clone();
                            size[0] = 0;
                            size[1] = 0;
                            size
                        } else {
                            vec![0, 0]
                        };
                    }
                } else if out_mat_size.len() != mat_size.len() {
                    size_known = false;
                } else {
                    for d in 2..out_mat_size.len() {
                        if out_mat_size[d] != mat_size[d] {
                            size_known = false;
                        }
                    }
                }

                if ti == 0 && info.size_known && mat_size.len() >= 2 {
                    // First column grows the rows; first row grows the
                    // columns.
                    if ci == 0 {
                        out_mat_size[0] += mat_size[0];
                    }
                    if ri == 0 {
                        out_mat_size[1] += mat_size[1];
                    }
                }

                if !info.size_known {
                    size_known = false;
                } else {
                    if ti != 0 && *mat_size != prev_size {
                        size_known = false;
                    }
                    prev_size = mat_size.clone();
                }

                if !info.is_integer {
                    all_integer = false;
                }
                if info.obj_type == ObjType::MatrixC128 {
                    complex_arg = true;
                }
            }
        }
    }

    let is_2d = size_known && out_mat_size.len() == 2;
    let is_scalar = size_known && out_mat_size == vec![1, 1];

    if (unknown_arg || complex_arg) && !first_types.is_empty() {
        first_types.insert(ObjType::MatrixC128);
    }

    let mut out = TypeSet::new();
    for obj_type in first_types {
        out.insert(TypeInfo::matrix(
            obj_type,
            is_2d,
            is_scalar,
            all_integer,
            size_known,
            if size_known { out_mat_size.clone() } else { Vec::new() },
        ));
    }
    Ok(vec![out])
}

/// Cell-array literal: shape is the literal's row/column counts; the
/// stored-type set unions all element types, or collapses to unknown if
/// any element is unknown.
fn infer_cell_array(
    rows: &[Vec<Expr>],
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    if rows.is_empty() || rows[0].is_empty() {
        return Ok(type_set_str_make(TypeInfo::cell_array(
            true,
            false,
            true,
            vec![0, 0],
            TypeSet::new(),
        )));
    }

    let out_mat_size = vec![rows.len(), rows[0].len()];
    let mut unknown_arg = false;
    let mut cell_types = TypeSet::new();

    for row in rows {
        for elem in row {
            let elem_types = infer_expr(elem, mgr, reach, var_types, expr_types)?;
            if elem_types.is_empty() || elem_types[0].is_empty() {
                unknown_arg = true;
            } else {
                cell_types.extend(elem_types[0].iter().cloned());
            }
        }
    }

    if unknown_arg {
        cell_types.clear();
    }
    let cell_types = type_set_reduce(&cell_types);
    let is_scalar = out_mat_size == vec![1, 1];

    Ok(type_set_str_make(TypeInfo::cell_array(
        true,
        is_scalar,
        true,
        out_mat_size,
        cell_types,
    )))
}

/// A handle is typed only when the name cannot be a local variable (its
/// sole reaching definition is the entry sentinel) and resolves to a
/// non-nested user function or a library function.
fn infer_fn_handle(
    sym: &str,
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
) -> TypeSetString {
    if !only_entry_def(reach, sym) {
        return TypeSetString::new();
    }
    match mgr.program().env.lookup(sym) {
        Some(Callable::User(fid)) => {
            if mgr.program().function(fid).parent.is_some() {
                TypeSetString::new()
            } else {
                type_set_str_make(TypeInfo::fn_handle(FunctionRef::User(fid)))
            }
        }
        Some(Callable::Library(lib)) => {
            type_set_str_make(TypeInfo::fn_handle(FunctionRef::Library(lib.name.to_string())))
        }
        None => TypeSetString::new(),
    }
}

/// Field read `e.field`: known only when the base has exactly one
/// possible type, a struct array carrying the field.
fn infer_dot(
    inner: &Expr,
    field: &str,
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    let inner_types = infer_expr(inner, mgr, reach, var_types, expr_types)?;
    if inner_types.len() != 1 || inner_types[0].len() != 1 {
        return Ok(TypeSetString::new());
    }
    match inner_types[0].iter().next() {
        Some(info) if info.obj_type == ObjType::StructArray => match info.fields.get(field) {
            Some(field_type) => Ok(type_set_str_make(field_type.clone())),
            None => Ok(TypeSetString::new()),
        },
        _ => Ok(TypeSetString::new()),
    }
}

/// Cell-content read `sym{args}`: only scalar indexing yields the stored
/// type set of the (reduced) cell-array type of `sym`.
fn infer_cell_index(
    sym: &str,
    args: &[Expr],
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSetString, AnalysisError> {
    let Some(var_set) = var_types.get(sym) else {
        return Ok(TypeSetString::new());
    };

    let index = call::analyze_index_types(args, mgr, reach, var_types, expr_types)?;
    if !index.is_scalar_indexing {
        return Ok(TypeSetString::new());
    }

    // After reduction there is at most one cell-array record to read.
    let reduced = type_set_reduce(var_set);
    let mut out = TypeSet::new();
    for info in &reduced {
        if info.obj_type == ObjType::CellArray {
            out = info.cell_types.clone();
        }
    }
    Ok(vec![out])
}
