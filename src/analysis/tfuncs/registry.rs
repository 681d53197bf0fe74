//! Registry of library type mappings.
//!
//! Library functions expose their type-level behavior through a
//! registered [`TypeMapFn`]; the environment hands these to the inference
//! engine as [`LibFunction`] bindings. The full catalogue belongs to the
//! runtime — the registrations here cover the common builtins the
//! analyses and their tests exercise.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::analysis::lattice::types::type_set_str_make;
use crate::analysis::lattice::{type_set_reduce, ObjType, TypeInfo, TypeSet, TypeSetString};
use crate::env::{LibFunction, TypeMapFn};

/// Name → type-mapping registry.
#[derive(Default)]
pub struct TypeMappings {
    mappings: HashMap<&'static str, TypeMapFn>,
}

impl TypeMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, mapping: TypeMapFn) {
        self.mappings.insert(name, mapping);
    }

    pub fn get(&self, name: &str) -> Option<TypeMapFn> {
        self.mappings.get(name).copied()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Registers the default library mappings.
pub fn register_all(registry: &mut TypeMappings) {
    // Shape-preserving float math
    registry.register("sin", tmap_float_unary);
    registry.register("cos", tmap_float_unary);
    registry.register("tan", tmap_float_unary);
    registry.register("exp", tmap_float_unary);
    registry.register("log", tmap_float_unary);
    registry.register("sqrt", tmap_float_unary);

    // Shape and integerness preserving
    registry.register("abs", tmap_abs);
    registry.register("floor", tmap_round);
    registry.register("ceil", tmap_round);
    registry.register("round", tmap_round);

    // Array creation
    registry.register("zeros", tmap_fill);
    registry.register("ones", tmap_fill);
    registry.register("eye", tmap_fill);

    // Queries
    registry.register("size", tmap_size);
    registry.register("length", tmap_scalar_query);
    registry.register("numel", tmap_scalar_query);

    // Output-less builtins
    registry.register("disp", tmap_no_output);
}

/// The default registry with every standard mapping registered.
pub fn default_registry() -> &'static TypeMappings {
    static REGISTRY: Lazy<TypeMappings> = Lazy::new(|| {
        let mut registry = TypeMappings::new();
        register_all(&mut registry);
        registry
    });
    &REGISTRY
}

/// A library-function binding for `name`, if registered.
pub fn lib_function(name: &'static str) -> Option<LibFunction> {
    default_registry().get(name).map(|type_mapping| LibFunction {
        name,
        type_mapping,
    })
}

/// Float math: F64 of the argument's shape, integerness not preserved.
fn tmap_float_unary(args: &TypeSetString) -> TypeSetString {
    map_first_set(args, |info| {
        let mut ty = info.clone();
        if !ty.obj_type.is_matrix() {
            return None;
        }
        ty.obj_type = ObjType::MatrixF64;
        ty.is_integer = false;
        Some(ty)
    })
}

/// `abs`: same shape, integerness preserved, complex collapses to F64.
fn tmap_abs(args: &TypeSetString) -> TypeSetString {
    map_first_set(args, |info| {
        let mut ty = info.clone();
        if !ty.obj_type.is_matrix() {
            return None;
        }
        if !matches!(ty.obj_type, ObjType::MatrixI32) {
            ty.obj_type = ObjType::MatrixF64;
        }
        Some(ty)
    })
}

/// Rounding: same shape, result is integer-valued.
fn tmap_round(args: &TypeSetString) -> TypeSetString {
    map_first_set(args, |info| {
        let mut ty = info.clone();
        if !ty.obj_type.is_matrix() {
            return None;
        }
        if ty.obj_type != ObjType::MatrixI32 {
            ty.obj_type = ObjType::MatrixF64;
        }
        ty.is_integer = true;
        Some(ty)
    })
}

/// `zeros`/`ones`/`eye`: an F64 matrix of unknown size (the dimensions
/// are argument *values*, invisible at the type level) holding integer
/// values.
fn tmap_fill(_args: &TypeSetString) -> TypeSetString {
    type_set_str_make(TypeInfo::matrix(
        ObjType::MatrixF64,
        true,
        false,
        true,
        false,
        Vec::new(),
    ))
}

/// `size`: a 1xN integer row vector of unknown length.
fn tmap_size(_args: &TypeSetString) -> TypeSetString {
    type_set_str_make(TypeInfo::matrix(
        ObjType::MatrixF64,
        true,
        false,
        true,
        false,
        Vec::new(),
    ))
}

/// `length`/`numel`: a scalar integer.
fn tmap_scalar_query(_args: &TypeSetString) -> TypeSetString {
    type_set_str_make(TypeInfo::scalar(ObjType::MatrixF64, true))
}

/// Builtins with no output values.
fn tmap_no_output(_args: &TypeSetString) -> TypeSetString {
    TypeSetString::new()
}

/// Applies `f` to each record of the first argument set.
fn map_first_set(
    args: &TypeSetString,
    f: impl Fn(&TypeInfo) -> Option<TypeInfo>,
) -> TypeSetString {
    let Some(set) = args.first().filter(|s| !s.is_empty()) else {
        return TypeSetString::new();
    };
    let mut out = TypeSet::new();
    for info in set {
        if let Some(ty) = f(info) {
            out.insert(ty);
        }
    }
    if out.is_empty() {
        return TypeSetString::new();
    }
    vec![type_set_reduce(&out)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all() {
        let mut registry = TypeMappings::new();
        register_all(&mut registry);
        assert!(registry.len() >= 10);
        assert!(registry.has_function("sin"));
        assert!(registry.has_function("zeros"));
        assert!(registry.has_function("numel"));
        assert!(!registry.has_function("no_such_builtin"));
    }

    #[test]
    fn test_lib_function_binding() {
        let sin = lib_function("sin").unwrap();
        assert_eq!(sin.name, "sin");
        assert!(lib_function("no_such_builtin").is_none());
    }

    #[test]
    fn test_sin_drops_integer() {
        let args = type_set_str_make(TypeInfo::scalar(ObjType::MatrixF64, true));
        let out = tmap_float_unary(&args);
        let ty = out[0].iter().next().unwrap();
        assert!(!ty.is_integer);
        assert!(ty.is_scalar);
    }

    #[test]
    fn test_length_is_scalar_integer() {
        let out = tmap_scalar_query(&TypeSetString::new());
        let ty = out[0].iter().next().unwrap();
        assert!(ty.is_scalar);
        assert!(ty.is_integer);
    }
}
