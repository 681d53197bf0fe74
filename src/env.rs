//! Environment collaborator: resolving free names to callables.
//!
//! The interpreter owns the real environment chain; the analyses only need
//! a lookup facility that resolves a name to either a user-defined
//! function or a library function with a registered type mapping. Lookup
//! failure is not an error — inference recovers by returning no type
//! information.

use std::collections::HashMap;

use crate::analysis::lattice::TypeSetString;
use crate::ir::{FunctionId, Symbol};

/// Type-mapping function of a library function: argument types in,
/// possible output types out. Pure and total; unknown inputs map to an
/// empty string.
pub type TypeMapFn = fn(&TypeSetString) -> TypeSetString;

/// A library function visible to the analyses: name plus type mapping.
/// The executable implementation lives with the runtime.
#[derive(Clone, Copy)]
pub struct LibFunction {
    pub name: &'static str,
    pub type_mapping: TypeMapFn,
}

impl std::fmt::Debug for LibFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibFunction").field("name", &self.name).finish()
    }
}

/// What a name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum Callable {
    User(FunctionId),
    Library(LibFunction),
}

/// Name-to-callable bindings for one analysis run.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: HashMap<Symbol, Callable>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_user(&mut self, name: Symbol, id: FunctionId) {
        self.bindings.insert(name, Callable::User(id));
    }

    pub fn bind_library(&mut self, lib: LibFunction) {
        self.bindings.insert(lib.name.to_string(), Callable::Library(lib));
    }

    /// Resolves `name`, or `None` if unbound.
    pub fn lookup(&self, name: &str) -> Option<Callable> {
        self.bindings.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_mapping(_args: &TypeSetString) -> TypeSetString {
        TypeSetString::new()
    }

    #[test]
    fn test_lookup_resolves_bindings() {
        let mut env = Environment::new();
        env.bind_user("f".to_string(), FunctionId(0));
        env.bind_library(LibFunction {
            name: "sin",
            type_mapping: empty_mapping,
        });

        assert!(matches!(env.lookup("f"), Some(Callable::User(FunctionId(0)))));
        assert!(matches!(env.lookup("sin"), Some(Callable::Library(_))));
        assert!(env.lookup("missing").is_none());
    }
}
