//! Core lattice type definitions.
//!
//! [`TypeInfo`] is a single possible shape of a runtime value: object type
//! plus shape flags, dimensions when known, and the payload that only some
//! object types carry (stored cell types, struct fields, the function a
//! handle points to). Records are plain data and freely copied.
//!
//! Sets are `BTreeSet`-backed: deterministic iteration, and `Ord + Hash`
//! come for free, which the analysis cache key and the callee-output
//! merging both rely on.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ir::FunctionId;

/// What a function handle points to: a user-defined function by handle,
/// or a library function by name (resolved through the environment when
/// the handle is called).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FunctionRef {
    User(FunctionId),
    Library(String),
}

/// Runtime object types of the language.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ObjType {
    /// 32-bit integer matrix
    MatrixI32,
    /// 64-bit float matrix (the default numeric type)
    MatrixF64,
    /// 128-bit complex matrix
    MatrixC128,
    /// Logical (boolean) array
    Logical,
    /// Character array (strings)
    Char,
    CellArray,
    StructArray,
    /// Function handle value
    FnHandle,
    /// A function itself (name bound in an environment)
    Function,
}

impl ObjType {
    /// True for the matrix family: numeric, logical and character arrays.
    /// Cell arrays index like matrices but are not in this family.
    pub fn is_matrix(self) -> bool {
        matches!(
            self,
            ObjType::MatrixI32
                | ObjType::MatrixF64
                | ObjType::MatrixC128
                | ObjType::Logical
                | ObjType::Char
        )
    }

    /// True for matrix types whose elements participate in arithmetic.
    pub fn is_numeric_matrix(self) -> bool {
        matches!(
            self,
            ObjType::MatrixI32 | ObjType::MatrixF64 | ObjType::MatrixC128
        )
    }

    /// Short signature token used in profiler counter signatures.
    pub fn short_name(self) -> &'static str {
        match self {
            ObjType::MatrixI32 => "i32",
            ObjType::MatrixF64 => "f64",
            ObjType::MatrixC128 => "c128",
            ObjType::Logical => "log",
            ObjType::Char => "char",
            ObjType::CellArray => "cell",
            ObjType::StructArray => "struct",
            ObjType::FnHandle => "fnh",
            ObjType::Function => "fn",
        }
    }
}

/// One possible type of a value at a program point.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TypeInfo {
    pub obj_type: ObjType,
    /// Guaranteed two-dimensional.
    pub is_2d: bool,
    /// Guaranteed 1x1. Implies `is_2d`, `size_known` and `mat_size == [1, 1]`.
    pub is_scalar: bool,
    /// All elements are integer-valued.
    pub is_integer: bool,
    /// `mat_size` holds the exact dimensions.
    pub size_known: bool,
    /// Dimension sizes; populated exactly when `size_known`.
    pub mat_size: Vec<usize>,
    /// Target of a function handle (`FnHandle` only). `None` means the
    /// handle's target is unknown.
    pub function: Option<FunctionRef>,
    /// Possible stored types of a cell array (`CellArray` only).
    pub cell_types: TypeSet,
    /// Field name to field type (`StructArray` only).
    pub fields: BTreeMap<String, TypeInfo>,
}

/// Set of possible types for one value.
pub type TypeSet = BTreeSet<TypeInfo>;

/// One type set per tuple component of a multi-return value.
pub type TypeSetString = Vec<TypeSet>;

/// Possible types per variable at a program point.
pub type VarTypeMap = std::collections::HashMap<crate::ir::Symbol, TypeSet>;

impl TypeInfo {
    /// A matrix-family record with explicit flags and size.
    pub fn matrix(
        obj_type: ObjType,
        is_2d: bool,
        is_scalar: bool,
        is_integer: bool,
        size_known: bool,
        mat_size: Vec<usize>,
    ) -> Self {
        Self {
            obj_type,
            is_2d,
            is_scalar,
            is_integer,
            size_known,
            mat_size,
            function: None,
            cell_types: TypeSet::new(),
            fields: BTreeMap::new(),
        }
    }

    /// A known 1x1 matrix value.
    pub fn scalar(obj_type: ObjType, is_integer: bool) -> Self {
        Self::matrix(obj_type, true, true, is_integer, true, vec![1, 1])
    }

    /// A cell array with the given shape and stored-type set.
    pub fn cell_array(
        is_2d: bool,
        is_scalar: bool,
        size_known: bool,
        mat_size: Vec<usize>,
        cell_types: TypeSet,
    ) -> Self {
        Self {
            obj_type: ObjType::CellArray,
            is_2d,
            is_scalar,
            is_integer: false,
            size_known,
            mat_size,
            function: None,
            cell_types,
            fields: BTreeMap::new(),
        }
    }

    /// A 1x1 struct array with the given fields.
    pub fn struct_array(fields: BTreeMap<String, TypeInfo>) -> Self {
        Self {
            obj_type: ObjType::StructArray,
            is_2d: true,
            is_scalar: true,
            is_integer: false,
            size_known: true,
            mat_size: vec![1, 1],
            function: None,
            cell_types: TypeSet::new(),
            fields,
        }
    }

    /// A handle to a known function.
    pub fn fn_handle(function: FunctionRef) -> Self {
        Self {
            obj_type: ObjType::FnHandle,
            is_2d: false,
            is_scalar: false,
            is_integer: false,
            size_known: false,
            mat_size: Vec::new(),
            function: Some(function),
            cell_types: TypeSet::new(),
            fields: BTreeMap::new(),
        }
    }
}

/// Builds a one-component type string from a single record.
pub fn type_set_str_make(info: TypeInfo) -> TypeSetString {
    let mut set = TypeSet::new();
    set.insert(info);
    vec![set]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_invariant() {
        let t = TypeInfo::scalar(ObjType::MatrixF64, true);
        assert!(t.is_2d);
        assert!(t.is_scalar);
        assert!(t.size_known);
        assert_eq!(t.mat_size, vec![1, 1]);
    }

    #[test]
    fn test_matrix_family_predicates() {
        assert!(ObjType::MatrixF64.is_matrix());
        assert!(ObjType::Logical.is_matrix());
        assert!(ObjType::Char.is_matrix());
        assert!(!ObjType::CellArray.is_matrix());
        assert!(!ObjType::StructArray.is_matrix());

        assert!(ObjType::MatrixC128.is_numeric_matrix());
        assert!(!ObjType::Char.is_numeric_matrix());
    }

    #[test]
    fn test_type_sets_deduplicate() {
        let mut set = TypeSet::new();
        set.insert(TypeInfo::scalar(ObjType::MatrixF64, true));
        set.insert(TypeInfo::scalar(ObjType::MatrixF64, true));
        assert_eq!(set.len(), 1);
    }
}
