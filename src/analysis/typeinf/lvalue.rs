//! Recursive left-hand-side assignment inference.
//!
//! Given the (reduced) possible types of the assigned value and an lvalue
//! expression, computes the new type set of the lvalue's root symbol.
//! Plain symbols take the value types directly; dotted targets wrap them
//! into struct-array records merged with what the root already carried;
//! indexed targets relax the bound types — an indexed store can grow the
//! array, so the exact size and scalarness are gone, and integerness
//! survives only if every stored value is integer.

use std::collections::BTreeMap;

use crate::analysis::lattice::{
    type_set_reduce, type_set_union, widen, ObjType, TypeInfo, TypeSet, VarTypeMap,
};
use crate::analysis::manager::AnalysisManager;
use crate::analysis::reach_defs::VarDefMap;
use crate::analysis::typeinf::call::analyze_index_types;
use crate::analysis::typeinf::ExprTypeMap;
use crate::error::AnalysisError;
use crate::ir::{Expr, ExprKind};

/// Computes the new type set for the root symbol of lvalue `lv` when the
/// assigned value has the types `rhs_types`.
pub fn infer_lvalue(
    lv: &Expr,
    rhs_types: TypeSet,
    mgr: &mut AnalysisManager<'_>,
    reach: &VarDefMap,
    var_types: &VarTypeMap,
    expr_types: &mut ExprTypeMap,
) -> Result<TypeSet, AnalysisError> {
    match &lv.kind {
        ExprKind::Symbol(_) => Ok(rhs_types),

        ExprKind::Dot { expr: inner, field } => {
            let prev_set = lv.root_symbol().and_then(|root| var_types.get(root));
            let mut out = TypeSet::new();

            for rhs in &rhs_types {
                // Wrap the value into a 1x1 struct holding just this
                // field, then let the inner chain shape it further.
                let mut fields = BTreeMap::new();
                fields.insert(field.clone(), rhs.clone());
                let mut wrapped = TypeSet::new();
                wrapped.insert(TypeInfo::struct_array(fields));

                let constructed_set =
                    infer_lvalue(inner, wrapped, mgr, reach, var_types, expr_types)?;
                let Some(constructed) = constructed_set.into_iter().next() else {
                    continue;
                };

                match prev_set {
                    Some(prev_set) if !prev_set.is_empty() => {
                        for prev in prev_set {
                            out.insert(merge_struct_fields(&constructed, prev));
                        }
                    }
                    _ => {
                        out.insert(constructed);
                    }
                }
            }
            Ok(out)
        }

        ExprKind::Param { args, .. } => {
            let shape = analyze_index_types(args, mgr, reach, var_types, expr_types)?;
            let root = lv.root_symbol();

            match root.and_then(|r| var_types.get(r)).filter(|s| !s.is_empty()) {
                Some(type_set) => {
                    let mut out = TypeSet::new();
                    for info in type_set {
                        let mut ty = info.clone();

                        if ty.obj_type.is_matrix() || ty.obj_type == ObjType::CellArray {
                            // The store may grow the array: shape
                            // guarantees weaken.
                            ty.is_2d = ty.is_2d && shape.num_index_dims <= 2;
                            ty.is_scalar = false;

                            // Integer only survives when every possible
                            // stored value is integer; an unknown value
                            // set forfeits the guarantee.
                            let rhs_integer =
                                !rhs_types.is_empty() && rhs_types.iter().all(|r| r.is_integer);
                            ty.is_integer = ty.is_integer && rhs_integer;

                            ty.size_known = false;
                            ty.mat_size.clear();

                            if ty.obj_type == ObjType::CellArray {
                                ty.cell_types = updated_cell_types(&rhs_types, &info.cell_types);
                            } else {
                                // A possibly-complex (or unknown) stored
                                // value makes the complex sibling possible.
                                let rhs_not_complex = !rhs_types.is_empty()
                                    && rhs_types
                                        .iter()
                                        .all(|r| r.obj_type != ObjType::MatrixC128);
                                if !rhs_not_complex {
                                    let mut complex = ty.clone();
                                    complex.obj_type = ObjType::MatrixC128;
                                    out.insert(complex);
                                }
                            }
                        }

                        out.insert(ty);
                    }
                    Ok(out)
                }

                // Unbound root: the store creates the array.
                None => {
                    let (size_known, mat_size) = literal_index_size(args);
                    let mut out = TypeSet::new();
                    for rhs in &rhs_types {
                        let mut ty = rhs.clone();
                        ty.is_2d = true;
                        ty.is_scalar = size_known && mat_size == vec![1, 1];
                        ty.size_known = size_known;
                        ty.mat_size = if size_known { mat_size.clone() } else { Vec::new() };
                        out.insert(ty);
                    }
                    Ok(out)
                }
            }
        }

        ExprKind::CellIndex { args, .. } => {
            let shape = analyze_index_types(args, mgr, reach, var_types, expr_types)?;
            let root = lv.root_symbol();

            match root.and_then(|r| var_types.get(r)).filter(|s| !s.is_empty()) {
                Some(type_set) => {
                    let mut out = TypeSet::new();
                    for info in type_set {
                        let mut ty = info.clone();
                        if ty.obj_type == ObjType::CellArray {
                            ty.is_2d = ty.is_2d && shape.num_index_dims <= 2;
                            ty.is_scalar = false;
                            ty.size_known = false;
                            ty.mat_size.clear();
                            // The stored-type set absorbs the assigned
                            // value types directly.
                            if !rhs_types.is_empty() {
                                ty.cell_types = type_set_union(&ty.cell_types, &rhs_types);
                            }
                        }
                        out.insert(ty);
                    }
                    Ok(out)
                }

                None => {
                    let (size_known, mat_size) = literal_index_size(args);
                    let mut out = TypeSet::new();
                    out.insert(TypeInfo::cell_array(
                        true,
                        size_known && mat_size == vec![1, 1],
                        size_known,
                        if size_known { mat_size } else { Vec::new() },
                        type_set_reduce(&rhs_types),
                    ));
                    Ok(out)
                }
            }
        }

        _ => Err(AnalysisError::InvalidLvalue { node: lv.id }),
    }
}

/// New stored-type set of a cell array after an indexed store: the cell
/// types of every assigned cell-array value unioned with the existing
/// stored types. An unknown value set clears the information.
fn updated_cell_types(rhs_types: &TypeSet, current: &TypeSet) -> TypeSet {
    if rhs_types.is_empty() {
        return TypeSet::new();
    }

    let mut cell_types = TypeSet::new();
    for rhs in rhs_types {
        if rhs.obj_type == ObjType::CellArray {
            cell_types = type_set_union(&cell_types, &rhs.cell_types);
        }
    }
    cell_types = type_set_union(&cell_types, current);
    type_set_reduce(&cell_types)
}

/// Dimensions of an indexed store target from literal integer index
/// arguments; any non-literal argument makes the size unknown.
fn literal_index_size(args: &[Expr]) -> (bool, Vec<usize>) {
    let mut dims = Vec::new();
    for arg in args {
        match arg.kind {
            ExprKind::IntConst(v) if v >= 0 => dims.push(v as usize),
            _ => return (false, Vec::new()),
        }
    }
    (true, dims)
}

/// Merges a freshly constructed struct record with one pre-existing type
/// of the root: fields present on both sides widen, fields on one side
/// survive. A non-struct previous type is simply overwritten.
fn merge_struct_fields(constructed: &TypeInfo, prev: &TypeInfo) -> TypeInfo {
    if prev.obj_type != ObjType::StructArray {
        return constructed.clone();
    }

    let mut out = constructed.clone();
    out.is_2d = out.is_2d && prev.is_2d;
    out.is_scalar = out.is_scalar && prev.is_scalar;
    if !(out.size_known && prev.size_known && out.mat_size == prev.mat_size) {
        out.size_known = false;
        out.mat_size.clear();
    }
    for (name, prev_field) in &prev.fields {
        match out.fields.get(name).map(|cur| widen(cur, prev_field)) {
            Some(Some(widened)) => {
                out.fields.insert(name.clone(), widened);
            }
            // Same field, incompatible object types: the new value wins.
            Some(None) => {}
            None => {
                out.fields.insert(name.clone(), prev_field.clone());
            }
        }
    }
    out
}
