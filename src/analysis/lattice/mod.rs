//! Type lattice for the inference analyses.
//!
//! A variable's abstract value is a *set* of [`TypeInfo`] records — each
//! record one possible concrete shape. Precision is lost only through
//! `widen`, the pointwise join of two records with the same object type;
//! `reduce` keeps sets small by coalescing records that differ only in
//! precision. Both are driven by [`ops`].
//!
//! # Module structure
//!
//! - `types`: [`ObjType`], [`TypeInfo`], [`TypeSet`], [`TypeSetString`]
//! - `ops`: widen / union / reduce and the variable-map combinators
//! - `limits`: fixed-point iteration caps

pub mod limits;
pub mod ops;
pub mod types;

pub use ops::{
    type_map_vector_union, type_set_reduce, type_set_union, var_type_map_reduce,
    var_type_map_union, widen,
};
pub use types::{FunctionRef, ObjType, TypeInfo, TypeSet, TypeSetString, VarTypeMap};
