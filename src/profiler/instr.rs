//! Counter slots and the instrumentation contract.
//!
//! The profiler hands out [`CounterSlot`] handles whose addresses are
//! stable for the life of the store (the slot is a shared allocation, not
//! a map entry), and emits the three-op increment sequence — load, add
//! one, store — into a [`BlockBuilder`] supplied by the code emitter.
//! Increments are not atomic read-modify-writes: there is a single
//! mutator, and an increment lost against a concurrent decay is
//! acceptable.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Stable handle to one u32 counter.
#[derive(Clone, Debug, Default)]
pub struct CounterSlot(Arc<AtomicU32>);

impl CounterSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn store(&self, value: u32) {
        self.0.store(value, Ordering::Relaxed)
    }
}

/// One IR operation of the increment sequence.
#[derive(Clone, Debug)]
pub enum CounterOp {
    /// Load the slot's current value into the working register.
    Load(CounterSlot),
    /// Add one to the working register.
    AddOne,
    /// Store the working register back to the slot.
    Store(CounterSlot),
}

/// A basic block the profiler can emit counter ops into. Implemented by
/// the code emitter; [`RecordedBlock`] is the reference implementation
/// the interpreter fallback and the tests use.
pub trait BlockBuilder {
    fn emit(&mut self, op: CounterOp);
}

/// Emits the canonical increment sequence for `slot` into `block`.
pub fn emit_increment(slot: &CounterSlot, block: &mut dyn BlockBuilder) {
    block.emit(CounterOp::Load(slot.clone()));
    block.emit(CounterOp::AddOne);
    block.emit(CounterOp::Store(slot.clone()));
}

/// A block that records emitted ops and can execute them, mimicking what
/// generated code does with the sequence.
#[derive(Default)]
pub struct RecordedBlock {
    pub ops: Vec<CounterOp>,
}

impl RecordedBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes the recorded ops once: plain load / add / store, exactly
    /// as emitted code would.
    pub fn execute(&self) {
        let mut reg: u32 = 0;
        for op in &self.ops {
            match op {
                CounterOp::Load(slot) => reg = slot.load(),
                CounterOp::AddOne => reg = reg.wrapping_add(1),
                CounterOp::Store(slot) => slot.store(reg),
            }
        }
    }
}

impl BlockBuilder for RecordedBlock {
    fn emit(&mut self, op: CounterOp) {
        self.ops.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_sequence_shape() {
        let slot = CounterSlot::new();
        let mut block = RecordedBlock::new();
        emit_increment(&slot, &mut block);
        assert_eq!(block.ops.len(), 3);
        assert!(matches!(block.ops[0], CounterOp::Load(_)));
        assert!(matches!(block.ops[1], CounterOp::AddOne));
        assert!(matches!(block.ops[2], CounterOp::Store(_)));
    }

    #[test]
    fn test_executing_increments() {
        let slot = CounterSlot::new();
        let mut block = RecordedBlock::new();
        emit_increment(&slot, &mut block);
        for _ in 0..5 {
            block.execute();
        }
        assert_eq!(slot.load(), 5);
    }
}
