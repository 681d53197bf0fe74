//! Iteration caps for fixed-point computations.
//!
//! The lattice is finite-height after reduction, so every loop fixed
//! point terminates; the caps exist to turn a widening bug into a
//! reported error instead of a hang.

/// Maximum rounds for a single loop's fixed point. Real programs
/// stabilize within a handful of rounds; the flag lattice alone bounds
/// the chain at a small constant per variable.
pub const MAX_LOOP_FIXPOINT_ITERATIONS: usize = 64;
