//! Lattice operations: widen, union, reduce, and map combinators.
//!
//! `widen` is the pointwise precision-losing join of two records with the
//! same object type; records with different object types are incomparable
//! and coexist in a set. `reduce` coalesces same-object-type records so a
//! reduced set carries at most one record per matrix object type and at
//! most one cell-array record — consumers that pick "the cell-array
//! element" out of a set rely on this.

use std::collections::BTreeMap;

use super::types::{ObjType, TypeInfo, TypeSet, TypeSetString, VarTypeMap};

/// Pointwise widening of two records.
///
/// Returns `None` when the object types differ (incomparable — keep
/// both). Otherwise boolean guarantees are conjoined, the size is
/// retained only when both sides know it and agree, struct fields are
/// intersected key-wise with recursive widening, stored cell types are
/// unioned and reduced, and a handle's target survives only if equal.
pub fn widen(a: &TypeInfo, b: &TypeInfo) -> Option<TypeInfo> {
    if a.obj_type != b.obj_type {
        return None;
    }

    let size_known = a.size_known && b.size_known && a.mat_size == b.mat_size;
    let mat_size = if size_known { a.mat_size.clone() } else { Vec::new() };

    let mut fields = BTreeMap::new();
    if a.obj_type == ObjType::StructArray {
        for (name, fa) in &a.fields {
            if let Some(fb) = b.fields.get(name) {
                if let Some(widened) = widen(fa, fb) {
                    fields.insert(name.clone(), widened);
                }
            }
        }
    }

    let cell_types = if a.obj_type == ObjType::CellArray {
        type_set_union(&a.cell_types, &b.cell_types)
    } else {
        TypeSet::new()
    };

    Some(TypeInfo {
        obj_type: a.obj_type,
        is_2d: a.is_2d && b.is_2d,
        is_scalar: a.is_scalar && b.is_scalar,
        is_integer: a.is_integer && b.is_integer,
        size_known,
        mat_size,
        function: if a.function == b.function {
            a.function.clone()
        } else {
            None
        },
        cell_types,
        fields,
    })
}

/// Reduces a set so records that differ only in precision are coalesced.
///
/// Matrix-family and cell-array records with the same object type are
/// folded through [`widen`]; struct-array, handle and function records
/// are kept apart unless one strictly subsumes another. Idempotent.
pub fn type_set_reduce(set: &TypeSet) -> TypeSet {
    let mut merged: BTreeMap<ObjType, TypeInfo> = BTreeMap::new();
    let mut kept: Vec<TypeInfo> = Vec::new();

    for info in set {
        if info.obj_type.is_matrix() || info.obj_type == ObjType::CellArray {
            match merged.remove(&info.obj_type) {
                // Same object type always widens successfully.
                Some(prev) => {
                    if let Some(w) = widen(&prev, info) {
                        merged.insert(info.obj_type, w);
                    }
                }
                None => {
                    merged.insert(info.obj_type, info.clone());
                }
            }
        } else {
            kept.push(info.clone());
        }
    }

    let mut out: TypeSet = merged.into_values().collect();

    // Drop records strictly subsumed by another surviving record.
    for (i, info) in kept.iter().enumerate() {
        let subsumed = kept.iter().enumerate().any(|(j, other)| {
            i != j && other != info && widen(other, info).as_ref() == Some(other)
        });
        if !subsumed {
            out.insert(info.clone());
        }
    }

    out
}

/// Union of two type sets, reduced.
pub fn type_set_union(a: &TypeSet, b: &TypeSet) -> TypeSet {
    let mut joined = a.clone();
    joined.extend(b.iter().cloned());
    type_set_reduce(&joined)
}

/// Pointwise union of two variable type maps. A symbol present on only
/// one side keeps its set (its types on the other path are unknown, and
/// unknown contributes nothing to the union).
pub fn var_type_map_union(a: &VarTypeMap, b: &VarTypeMap) -> VarTypeMap {
    let mut out = a.clone();
    for (sym, set_b) in b {
        match out.get_mut(sym) {
            Some(set_a) => *set_a = type_set_union(set_a, set_b),
            None => {
                out.insert(sym.clone(), set_b.clone());
            }
        }
    }
    out
}

/// Union of a vector of variable type maps.
pub fn type_map_vector_union(maps: &[VarTypeMap]) -> VarTypeMap {
    let mut iter = maps.iter();
    let mut out = match iter.next() {
        Some(first) => first.clone(),
        None => return VarTypeMap::new(),
    };
    for map in iter {
        out = var_type_map_union(&out, map);
    }
    out
}

/// Reduces every set in a variable type map in place.
pub fn var_type_map_reduce(map: &mut VarTypeMap) {
    for set in map.values_mut() {
        *set = type_set_reduce(set);
    }
}

/// Accumulates `new_types` into an expression's recorded type string by
/// pointwise union, padding to the longer length.
pub fn type_set_str_accumulate(current: &mut TypeSetString, new_types: &TypeSetString) {
    if current.len() < new_types.len() {
        current.resize(new_types.len(), TypeSet::new());
    }
    for (i, set) in new_types.iter().enumerate() {
        current[i] = type_set_union(&current[i], set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lattice::types::type_set_str_make;

    fn f64_scalar(integer: bool) -> TypeInfo {
        TypeInfo::scalar(ObjType::MatrixF64, integer)
    }

    #[test]
    fn test_widen_different_obj_types_incomparable() {
        let a = f64_scalar(true);
        let b = TypeInfo::scalar(ObjType::Logical, true);
        assert!(widen(&a, &b).is_none());
    }

    #[test]
    fn test_widen_conjoins_flags() {
        let a = f64_scalar(true);
        let b = f64_scalar(false);
        let w = widen(&a, &b).unwrap();
        assert!(w.is_scalar);
        assert!(!w.is_integer);
        assert_eq!(w.mat_size, vec![1, 1]);
    }

    #[test]
    fn test_widen_drops_disagreeing_size() {
        let a = TypeInfo::matrix(ObjType::MatrixF64, true, false, true, true, vec![1, 3]);
        let b = TypeInfo::matrix(ObjType::MatrixF64, true, false, true, true, vec![2, 3]);
        let w = widen(&a, &b).unwrap();
        assert!(!w.size_known);
        assert!(w.mat_size.is_empty());
    }

    #[test]
    fn test_widen_intersects_struct_fields() {
        let mut fields_a = BTreeMap::new();
        fields_a.insert("x".to_string(), f64_scalar(true));
        fields_a.insert("y".to_string(), f64_scalar(true));
        let mut fields_b = BTreeMap::new();
        fields_b.insert("x".to_string(), f64_scalar(false));

        let a = TypeInfo::struct_array(fields_a);
        let b = TypeInfo::struct_array(fields_b);
        let w = widen(&a, &b).unwrap();

        assert_eq!(w.fields.len(), 1);
        assert!(!w.fields["x"].is_integer);
    }

    #[test]
    fn test_reduce_coalesces_same_matrix_type() {
        let mut set = TypeSet::new();
        set.insert(f64_scalar(true));
        set.insert(f64_scalar(false));
        let reduced = type_set_reduce(&set);
        assert_eq!(reduced.len(), 1);
        let only = reduced.iter().next().unwrap();
        assert!(only.is_scalar);
        assert!(!only.is_integer);
    }

    #[test]
    fn test_reduce_keeps_distinct_obj_types() {
        let mut set = TypeSet::new();
        set.insert(f64_scalar(true));
        set.insert(TypeInfo::scalar(ObjType::MatrixC128, false));
        let reduced = type_set_reduce(&set);
        assert_eq!(reduced.len(), 2);
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let mut set = TypeSet::new();
        set.insert(f64_scalar(true));
        set.insert(f64_scalar(false));
        set.insert(TypeInfo::matrix(ObjType::MatrixI32, true, false, true, false, vec![]));
        let once = type_set_reduce(&set);
        let twice = type_set_reduce(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reduce_no_element_subsumed() {
        let mut set = TypeSet::new();
        set.insert(f64_scalar(true));
        set.insert(TypeInfo::matrix(ObjType::MatrixF64, true, false, false, false, vec![]));
        let reduced = type_set_reduce(&set);
        for a in &reduced {
            for b in &reduced {
                if a != b {
                    assert_ne!(widen(a, b).as_ref(), Some(a), "{b:?} subsumed by {a:?}");
                }
            }
        }
    }

    #[test]
    fn test_union_laws() {
        let mut a = TypeSet::new();
        a.insert(f64_scalar(true));
        let mut b = TypeSet::new();
        b.insert(TypeInfo::scalar(ObjType::Logical, true));
        let mut c = TypeSet::new();
        c.insert(TypeInfo::scalar(ObjType::Char, true));

        // Idempotent up to reduce
        assert_eq!(type_set_union(&a, &a), type_set_reduce(&a));
        // Commutative
        assert_eq!(type_set_union(&a, &b), type_set_union(&b, &a));
        // Associative
        let ab_c = type_set_union(&type_set_union(&a, &b), &c);
        let a_bc = type_set_union(&a, &type_set_union(&b, &c));
        assert_eq!(ab_c, a_bc);
    }

    #[test]
    fn test_var_type_map_union_keeps_one_sided_symbols() {
        let mut a = VarTypeMap::new();
        a.insert("x".to_string(), {
            let mut s = TypeSet::new();
            s.insert(f64_scalar(true));
            s
        });
        let b = VarTypeMap::new();
        let u = var_type_map_union(&a, &b);
        assert!(u.contains_key("x"));
    }

    #[test]
    fn test_accumulate_pads_to_longer() {
        let mut cur = type_set_str_make(f64_scalar(true));
        let incoming = vec![
            {
                let mut s = TypeSet::new();
                s.insert(f64_scalar(false));
                s
            },
            {
                let mut s = TypeSet::new();
                s.insert(TypeInfo::scalar(ObjType::Logical, true));
                s
            },
        ];
        type_set_str_accumulate(&mut cur, &incoming);
        assert_eq!(cur.len(), 2);
        assert_eq!(cur[0].len(), 1); // coalesced F64
    }
}
