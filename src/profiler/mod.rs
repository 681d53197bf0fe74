//! Hotspot profiler: counter instrumentation and background decay.
//!
//! Counts program events — per caller/callee pair, per loop, per
//! interpreted-call context — without disturbing the single-threaded JIT
//! semantics. The emitter requests instrumentation at code-generation
//! time; the profiler interns a counter slot per signature and emits the
//! load/add/store sequence into the given basic block.
//!
//! One background worker periodically decays every counter so recent
//! activity dominates, and the final dump writes all three stores to a
//! CSV. Counter updates are unsynchronized: the structure mutex guards
//! the maps (slot interning and decay iteration), never the increments.
//!
//! # Module structure
//!
//! - `instr`: counter slots and the basic-block emission contract
//! - `signature`: structural counter keys and their CSV rendering

pub mod instr;
pub mod signature;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use instr::{BlockBuilder, CounterOp, CounterSlot, RecordedBlock};
pub use signature::{CallSite, Signature};

/// Worker poll granularity; decay timing is approximate.
const WORKER_POLL: Duration = Duration::from_millis(100);

/// Profiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Interval between decay passes.
    pub decay_interval: Duration,
    /// CSV dump destination.
    pub dump_path: PathBuf,
    /// Whether the background worker runs at all.
    pub enabled: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            decay_interval: Duration::from_millis(1000),
            dump_path: PathBuf::from("counters.out"),
            enabled: true,
        }
    }
}

/// One counter store: signature → slot, ordered for deterministic dumps.
/// The map only grows; slot values live in shared allocations, so decay
/// and increments never invalidate each other's addresses.
type CounterStore = Mutex<BTreeMap<Signature, CounterSlot>>;

#[derive(Default)]
struct Stores {
    functions: CounterStore,
    loops: CounterStore,
    interpreted: CounterStore,
}

impl Stores {
    fn intern(store: &CounterStore, sig: Signature) -> CounterSlot {
        let mut map = store.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(sig).or_default().clone()
    }

    /// Scales every counter in one store: 0.9 normally, 0.7 when the
    /// store is close to overflow. Reads and writes are plain relaxed
    /// accesses; increments racing the pass may be lost.
    fn decay_store(store: &CounterStore) {
        let map = store.lock().unwrap_or_else(|e| e.into_inner());
        let max = map.values().map(CounterSlot::load).max().unwrap_or(0);
        let multiplier = if max > i32::MAX as u32 / 2 { 0.7 } else { 0.9 };
        for slot in map.values() {
            let value = slot.load();
            slot.store((f64::from(value) * multiplier) as u32);
        }
    }

    fn decay_all(&self) {
        Self::decay_store(&self.functions);
        Self::decay_store(&self.loops);
        Self::decay_store(&self.interpreted);
    }

    fn snapshot(store: &CounterStore) -> Vec<(Signature, u32)> {
        let map = store.lock().unwrap_or_else(|e| e.into_inner());
        map.iter().map(|(sig, slot)| (sig.clone(), slot.load())).collect()
    }
}

/// The hotspot profiler.
pub struct Profiler {
    config: ProfilerConfig,
    stores: Arc<Stores>,
    context_stack: Mutex<Vec<Signature>>,
    next_context_id: AtomicU64,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        let stores = Arc::new(Stores::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = if config.enabled {
            let stores = stores.clone();
            let shutdown = shutdown.clone();
            let interval = config.decay_interval;
            Some(std::thread::spawn(move || {
                worker_loop(&stores, &shutdown, interval);
            }))
        } else {
            None
        };

        Self {
            config,
            stores,
            context_stack: Mutex::new(Vec::new()),
            next_context_id: AtomicU64::new(0),
            shutdown,
            worker,
        }
    }

    /// Instruments a call from `caller` to `callee`: interns the counter
    /// and emits the increment sequence into `block`.
    pub fn instrument_func_call(
        &self,
        caller: CallSite<'_>,
        callee: CallSite<'_>,
        block: &mut dyn BlockBuilder,
    ) {
        let sig = signature::function_signature(caller, callee);
        let slot = Stores::intern(&self.stores.functions, sig);
        instr::emit_increment(&slot, block);
    }

    /// Instruments one iteration count of the loop `loop_id` in `owner`.
    pub fn instrument_loop(
        &self,
        owner: CallSite<'_>,
        loop_id: u64,
        block: &mut dyn BlockBuilder,
    ) {
        let sig = signature::loop_signature(owner, loop_id);
        let slot = Stores::intern(&self.stores.loops, sig);
        instr::emit_increment(&slot, block);
    }

    /// Enters an interpreted-call context. Subsequent
    /// [`Profiler::instrument_interpreter`] calls count against it.
    pub fn push_context(&self, owner: CallSite<'_>) {
        let id = self.next_context_id.fetch_add(1, Ordering::Relaxed);
        let sig = signature::interp_signature(owner, id);
        self.context_stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sig);
    }

    /// Leaves the current interpreted-call context.
    pub fn pop_context(&self) {
        self.context_stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();
    }

    /// Instruments an interpreted invocation in the current context. A
    /// call outside any context is not counted.
    pub fn instrument_interpreter(&self, block: &mut dyn BlockBuilder) {
        let sig = {
            let stack = self.context_stack.lock().unwrap_or_else(|e| e.into_inner());
            match stack.last() {
                Some(sig) => sig.clone(),
                None => return,
            }
        };
        let slot = Stores::intern(&self.stores.interpreted, sig);
        instr::emit_increment(&slot, block);
    }

    /// Runs one decay pass over all stores.
    pub fn decay(&self) {
        self.stores.decay_all();
    }

    /// Current (signature, count) pairs of every store, function counters
    /// first, then loops, then interpreted contexts.
    pub fn counters(&self) -> Vec<(Signature, u32)> {
        let mut out = Stores::snapshot(&self.stores.functions);
        out.extend(Stores::snapshot(&self.stores.loops));
        out.extend(Stores::snapshot(&self.stores.interpreted));
        out
    }

    /// Writes the CSV dump. Failure to write is logged and otherwise
    /// ignored; profiling data is best-effort.
    pub fn dump(&self) {
        if let Err(err) = self.write_dump() {
            warn!(path = %self.config.dump_path.display(), %err, "could not write counter dump");
        }
    }

    fn write_dump(&self) -> std::io::Result<()> {
        let mut out = std::fs::File::create(&self.config.dump_path)?;
        writeln!(out, "calling,callee,count")?;
        for (sig, count) in self.counters() {
            writeln!(out, "{},{}", sig, count)?;
        }
        debug!(path = %self.config.dump_path.display(), "counter dump written");
        Ok(())
    }

    /// Stops the background worker and writes the final dump.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("profiler worker panicked");
            }
        }
        self.dump();
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

fn worker_loop(stores: &Stores, shutdown: &AtomicBool, interval: Duration) {
    debug!("profiler worker started");
    let mut next_decay = Instant::now() + interval;
    while !shutdown.load(Ordering::SeqCst) {
        // Sleep in short steps so shutdown stays responsive.
        std::thread::sleep(WORKER_POLL.min(interval));
        if Instant::now() < next_decay {
            continue;
        }
        stores.decay_all();
        next_decay = Instant::now() + interval;
    }
    debug!("profiler worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lattice::TypeSetString;

    fn disabled() -> Profiler {
        Profiler::new(ProfilerConfig {
            enabled: false,
            ..ProfilerConfig::default()
        })
    }

    #[test]
    fn test_same_signature_same_slot() {
        let profiler = disabled();
        let empty = TypeSetString::new();
        let caller = CallSite { name: "main", arg_types: &empty };
        let callee = CallSite { name: "f", arg_types: &empty };

        let mut b1 = RecordedBlock::new();
        let mut b2 = RecordedBlock::new();
        profiler.instrument_func_call(caller, callee, &mut b1);
        profiler.instrument_func_call(caller, callee, &mut b2);
        b1.execute();
        b2.execute();

        let counters = profiler.counters();
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].1, 2);
    }

    #[test]
    fn test_decay_multiplier() {
        let profiler = disabled();
        let empty = TypeSetString::new();
        let owner = CallSite { name: "f", arg_types: &empty };
        let mut block = RecordedBlock::new();
        profiler.instrument_loop(owner, 0, &mut block);
        for _ in 0..100 {
            block.execute();
        }

        profiler.decay();
        let counters = profiler.counters();
        assert_eq!(counters[0].1, 90);
    }

    #[test]
    fn test_interpreter_counts_against_top_context() {
        let profiler = disabled();
        let empty = TypeSetString::new();
        let owner = CallSite { name: "g", arg_types: &empty };

        profiler.push_context(owner);
        let mut block = RecordedBlock::new();
        profiler.instrument_interpreter(&mut block);
        block.execute();
        profiler.pop_context();

        let counters = profiler.counters();
        assert_eq!(counters.len(), 1);
        assert!(counters[0].0.as_str().contains("_interpreted"));
        assert_eq!(counters[0].1, 1);
    }

    #[test]
    fn test_instrument_interpreter_without_context_is_noop() {
        let profiler = disabled();
        let mut block = RecordedBlock::new();
        profiler.instrument_interpreter(&mut block);
        assert!(block.ops.is_empty());
        assert!(profiler.counters().is_empty());
    }
}
