// Prevent accidental debug output in library code.
// Host binaries may use eprintln!() for user-facing error messages.
#![deny(clippy::print_stderr)]

// Core modules
pub mod analysis;
pub mod env;
pub mod error;
pub mod ir;

// Hotspot profiler (counter instrumentation + background decay)
pub mod profiler;

pub use analysis::manager::AnalysisManager;
pub use error::AnalysisError;
