//! Operator type mappings.
//!
//! Each mapping takes the argument type string (one set per operand) and
//! produces the output type string. An empty operand set means the
//! operand's type is unknown; arithmetic mappings then produce no
//! information, while comparisons still know the result is logical.
//!
//! Shape rules for element-wise operations: a scalar combines with
//! anything and takes the other operand's shape; two non-scalars must
//! agree, so the exact size survives only when both sides know the same
//! size. Character and logical operands promote to F64 under arithmetic.

use crate::analysis::lattice::types::type_set_str_make;
use crate::analysis::lattice::{
    type_set_reduce, ObjType, TypeInfo, TypeSet, TypeSetString,
};

/// Identity mapping: the first component passes through unchanged.
pub fn tmap_ident(args: &TypeSetString) -> TypeSetString {
    match args.first() {
        Some(set) if !set.is_empty() => vec![set.clone()],
        _ => TypeSetString::new(),
    }
}

/// Arithmetic negation: numeric types keep their shape; logical and char
/// operands promote to F64.
pub fn tmap_minus(args: &TypeSetString) -> TypeSetString {
    let Some(set) = args.first().filter(|s| !s.is_empty()) else {
        return TypeSetString::new();
    };
    let mut out = TypeSet::new();
    for info in set {
        if !info.obj_type.is_matrix() {
            continue;
        }
        let mut ty = info.clone();
        if matches!(ty.obj_type, ObjType::Logical | ObjType::Char) {
            ty.obj_type = ObjType::MatrixF64;
        }
        out.insert(ty);
    }
    if out.is_empty() {
        return TypeSetString::new();
    }
    vec![type_set_reduce(&out)]
}

/// Logical negation: a logical array of the operand's shape.
pub fn tmap_not(args: &TypeSetString) -> TypeSetString {
    let Some(set) = args.first().filter(|s| !s.is_empty()) else {
        return TypeSetString::new();
    };
    let mut out = TypeSet::new();
    for info in set {
        out.insert(TypeInfo::matrix(
            ObjType::Logical,
            info.is_2d,
            info.is_scalar,
            true,
            info.size_known,
            info.mat_size.clone(),
        ));
    }
    vec![type_set_reduce(&out)]
}

/// Transpose: same element type; a known 2D size flips its dimensions.
pub fn tmap_transp(args: &TypeSetString) -> TypeSetString {
    let Some(set) = args.first().filter(|s| !s.is_empty()) else {
        return TypeSetString::new();
    };
    let mut out = TypeSet::new();
    for info in set {
        let mut ty = info.clone();
        if ty.size_known && ty.mat_size.len() == 2 {
            ty.mat_size.reverse();
        } else {
            ty.size_known = false;
            ty.mat_size.clear();
            ty.is_scalar = false;
        }
        out.insert(ty);
    }
    vec![type_set_reduce(&out)]
}

/// Element-wise arithmetic, integer preserving (`+`, `-`, `.*`, `.^`).
pub fn tmap_array_arith_int(args: &TypeSetString) -> TypeSetString {
    elementwise_arith(args, true)
}

/// Element-wise arithmetic, non integer preserving (`./`, `.\`).
pub fn tmap_array_arith(args: &TypeSetString) -> TypeSetString {
    elementwise_arith(args, false)
}

/// Matrix multiplication: scalar operands behave element-wise; the
/// product of two known 2D sizes is the outer dimensions.
pub fn tmap_mult(args: &TypeSetString) -> TypeSetString {
    binary_numeric(args, true, |left, right, mut ty| {
        if left.is_scalar {
            copy_shape(&mut ty, right);
        } else if right.is_scalar {
            copy_shape(&mut ty, left);
        } else {
            ty.is_2d = left.is_2d && right.is_2d;
            ty.is_scalar = false;
            let known = left.size_known
                && right.size_known
                && left.mat_size.len() == 2
                && right.mat_size.len() == 2;
            ty.size_known = known;
            ty.mat_size = if known {
                vec![left.mat_size[0], right.mat_size[1]]
            } else {
                Vec::new()
            };
        }
        ty
    })
}

/// Right division `a / b` (`a * inv(b)`). Not integer preserving.
pub fn tmap_div(args: &TypeSetString) -> TypeSetString {
    binary_numeric(args, false, |left, right, mut ty| {
        if right.is_scalar {
            copy_shape(&mut ty, left);
        } else {
            ty.is_2d = left.is_2d && right.is_2d;
            ty.is_scalar = false;
            ty.size_known = false;
            ty.mat_size = Vec::new();
        }
        ty
    })
}

/// Left division `a \ b` (`inv(a) * b`). Not integer preserving.
pub fn tmap_left_div(args: &TypeSetString) -> TypeSetString {
    binary_numeric(args, false, |left, right, mut ty| {
        if left.is_scalar {
            copy_shape(&mut ty, right);
        } else {
            ty.is_2d = left.is_2d && right.is_2d;
            ty.is_scalar = false;
            ty.size_known = false;
            ty.mat_size = Vec::new();
        }
        ty
    })
}

/// Matrix power: element-wise shape rules; integers are preserved (the
/// exponent may still be negative at runtime, the value just stops being
/// integral — the flag tracks the guarantee both operands give).
pub fn tmap_power(args: &TypeSetString) -> TypeSetString {
    elementwise_arith(args, true)
}

/// Comparisons and element-wise logic: a logical result whose shape
/// follows the element-wise rules. The result type is certain even when
/// the operand types are not; only the shape degrades.
pub fn tmap_array_logic(args: &TypeSetString) -> TypeSetString {
    let (left_set, right_set) = match (args.first(), args.get(1)) {
        (Some(l), Some(r)) => (l, r),
        _ => return TypeSetString::new(),
    };
    if left_set.is_empty() || right_set.is_empty() {
        return type_set_str_make(TypeInfo::matrix(
            ObjType::Logical,
            false,
            false,
            true,
            false,
            Vec::new(),
        ));
    }

    let mut out = TypeSet::new();
    for left in left_set {
        for right in right_set {
            let mut ty = TypeInfo::matrix(ObjType::Logical, false, false, true, false, Vec::new());
            combine_elementwise_shape(&mut ty, left, right);
            out.insert(ty);
        }
    }
    vec![type_set_reduce(&out)]
}

/// Element-wise arithmetic over the operand cross product.
fn elementwise_arith(args: &TypeSetString, int_preserving: bool) -> TypeSetString {
    binary_numeric(args, int_preserving, |left, right, mut ty| {
        combine_elementwise_shape(&mut ty, left, right);
        ty
    })
}

/// Shared skeleton of the binary numeric mappings: checks both operand
/// sets are known, crosses them, promotes the element type, and defers
/// the shape to `shape_rule`.
fn binary_numeric(
    args: &TypeSetString,
    int_preserving: bool,
    shape_rule: impl Fn(&TypeInfo, &TypeInfo, TypeInfo) -> TypeInfo,
) -> TypeSetString {
    let (left_set, right_set) = match (args.first(), args.get(1)) {
        (Some(l), Some(r)) if !l.is_empty() && !r.is_empty() => (l, r),
        _ => return TypeSetString::new(),
    };

    let mut out = TypeSet::new();
    for left in left_set {
        for right in right_set {
            if !left.obj_type.is_matrix() || !right.obj_type.is_matrix() {
                continue;
            }
            let obj_type = promote_obj_type(left.obj_type, right.obj_type);
            let is_integer = int_preserving && left.is_integer && right.is_integer;
            let ty = TypeInfo::matrix(obj_type, false, false, is_integer, false, Vec::new());
            out.insert(shape_rule(left, right, ty));
        }
    }
    if out.is_empty() {
        return TypeSetString::new();
    }
    vec![type_set_reduce(&out)]
}

/// Element type of a numeric operation: complex is contagious, two i32
/// operands stay i32, everything else (logical and char included) lands
/// in F64.
fn promote_obj_type(a: ObjType, b: ObjType) -> ObjType {
    if a == ObjType::MatrixC128 || b == ObjType::MatrixC128 {
        ObjType::MatrixC128
    } else if a == ObjType::MatrixI32 && b == ObjType::MatrixI32 {
        ObjType::MatrixI32
    } else {
        ObjType::MatrixF64
    }
}

/// Element-wise shape combination: scalars adopt the other operand's
/// shape; two non-scalars must agree for the size to survive.
fn combine_elementwise_shape(ty: &mut TypeInfo, left: &TypeInfo, right: &TypeInfo) {
    if left.is_scalar {
        copy_shape(ty, right);
    } else if right.is_scalar {
        copy_shape(ty, left);
    } else {
        ty.is_2d = left.is_2d && right.is_2d;
        ty.is_scalar = false;
        let known = left.size_known && right.size_known && left.mat_size == right.mat_size;
        ty.size_known = known;
        ty.mat_size = if known { left.mat_size.clone() } else { Vec::new() };
    }
}

fn copy_shape(ty: &mut TypeInfo, from: &TypeInfo) {
    ty.is_2d = from.is_2d;
    ty.is_scalar = from.is_scalar;
    ty.size_known = from.size_known;
    ty.mat_size = from.mat_size.clone();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(info: TypeInfo) -> TypeSet {
        let mut set = TypeSet::new();
        set.insert(info);
        set
    }

    #[test]
    fn test_scalar_int_plus_scalar_int() {
        let args = vec![
            one(TypeInfo::scalar(ObjType::MatrixF64, true)),
            one(TypeInfo::scalar(ObjType::MatrixF64, true)),
        ];
        let out = tmap_array_arith_int(&args);
        assert_eq!(out.len(), 1);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.obj_type, ObjType::MatrixF64);
        assert!(ty.is_scalar);
        assert!(ty.is_integer);
        assert_eq!(ty.mat_size, vec![1, 1]);
    }

    #[test]
    fn test_division_drops_integer() {
        let args = vec![
            one(TypeInfo::scalar(ObjType::MatrixF64, true)),
            one(TypeInfo::scalar(ObjType::MatrixF64, true)),
        ];
        let out = tmap_array_arith(&args);
        let ty = out[0].iter().next().unwrap();
        assert!(!ty.is_integer);
        assert!(ty.is_scalar);
    }

    #[test]
    fn test_complex_is_contagious() {
        let args = vec![
            one(TypeInfo::scalar(ObjType::MatrixF64, true)),
            one(TypeInfo::scalar(ObjType::MatrixC128, false)),
        ];
        let out = tmap_array_arith_int(&args);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.obj_type, ObjType::MatrixC128);
    }

    #[test]
    fn test_unknown_operand_gives_no_arith_info() {
        let args = vec![one(TypeInfo::scalar(ObjType::MatrixF64, true)), TypeSet::new()];
        assert!(tmap_array_arith_int(&args).is_empty());
    }

    #[test]
    fn test_comparison_is_logical_even_when_unknown() {
        let args = vec![one(TypeInfo::scalar(ObjType::MatrixF64, true)), TypeSet::new()];
        let out = tmap_array_logic(&args);
        assert_eq!(out.len(), 1);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.obj_type, ObjType::Logical);
        assert!(!ty.size_known);
    }

    #[test]
    fn test_matrix_mult_outer_dims() {
        let a = TypeInfo::matrix(ObjType::MatrixF64, true, false, true, true, vec![2, 3]);
        let b = TypeInfo::matrix(ObjType::MatrixF64, true, false, true, true, vec![3, 4]);
        let out = tmap_mult(&vec![one(a), one(b)]);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.mat_size, vec![2, 4]);
        assert!(ty.size_known);
    }

    #[test]
    fn test_transpose_flips_known_size() {
        let a = TypeInfo::matrix(ObjType::MatrixF64, true, false, true, true, vec![2, 3]);
        let out = tmap_transp(&vec![one(a)]);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.mat_size, vec![3, 2]);
    }

    #[test]
    fn test_not_keeps_shape() {
        let a = TypeInfo::scalar(ObjType::MatrixF64, false);
        let out = tmap_not(&vec![one(a)]);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.obj_type, ObjType::Logical);
        assert!(ty.is_scalar);
        assert!(ty.is_integer);
    }

    #[test]
    fn test_minus_promotes_logical() {
        let a = TypeInfo::scalar(ObjType::Logical, true);
        let out = tmap_minus(&vec![one(a)]);
        let ty = out[0].iter().next().unwrap();
        assert_eq!(ty.obj_type, ObjType::MatrixF64);
    }
}
