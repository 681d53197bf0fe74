//! Type-mapping functions for operators and library functions.
//!
//! Type mappings encode the type-level semantics of operations: argument
//! type string in, output type string out. The operator mappings are
//! dispatched directly by the expression transfer functions; library
//! functions carry a registered mapping resolved through the environment.
//!
//! # Module structure
//!
//! - `registry`: name → mapping registry and the default registrations
//! - `arithmetic`: operator mappings (arithmetic, logic, transpose)

pub mod arithmetic;
pub mod registry;

pub use registry::{default_registry, lib_function, register_all, TypeMappings};
