//! Static analyses over the structured IR.
//!
//! The analyses are organized around a small number of pieces:
//!
//! - `lattice`: the `TypeInfo` value lattice and its set operations
//! - `manager`: result caching and the inter-procedural recursion guard
//! - `dataflow`: the direction-agnostic traversal engine
//! - `reach_defs`, `live_vars`: the two classic bit-vector style analyses
//! - `typeinf`: the type-inference engine built on all of the above
//! - `tfuncs`: operator and library type-mapping functions

pub mod dataflow;
pub mod lattice;
pub mod live_vars;
pub mod manager;
pub mod reach_defs;
pub mod tfuncs;
pub mod typeinf;
