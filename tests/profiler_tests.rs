//! Hotspot profiler properties: counting, decay, CSV dump, shutdown.

use std::time::Duration;

use matvm::analysis::lattice::{ObjType, TypeInfo, TypeSet, TypeSetString};
use matvm::profiler::{CallSite, Profiler, ProfilerConfig, RecordedBlock};

fn scalar_args() -> TypeSetString {
    let mut set = TypeSet::new();
    set.insert(TypeInfo::scalar(ObjType::MatrixF64, true));
    vec![set]
}

fn disabled_config(dump_path: std::path::PathBuf) -> ProfilerConfig {
    ProfilerConfig {
        enabled: false,
        dump_path,
        ..ProfilerConfig::default()
    }
}

#[test]
fn counter_equals_invocation_count() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = Profiler::new(disabled_config(dir.path().join("counters.out")));

    let args = scalar_args();
    let empty = TypeSetString::new();
    let caller = CallSite { name: "main", arg_types: &empty };
    let callee = CallSite { name: "fib", arg_types: &args };

    let mut block = RecordedBlock::new();
    profiler.instrument_func_call(caller, callee, &mut block);

    for _ in 0..37 {
        block.execute();
    }

    let counters = profiler.counters();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].1, 37);
}

#[test]
fn decay_scales_by_point_nine_below_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = Profiler::new(disabled_config(dir.path().join("counters.out")));

    let empty = TypeSetString::new();
    let owner = CallSite { name: "f", arg_types: &empty };

    let mut block = RecordedBlock::new();
    profiler.instrument_loop(owner, 1, &mut block);
    for _ in 0..11 {
        block.execute();
    }

    profiler.decay();
    let counters = profiler.counters();
    // floor(11 * 0.9) = 9
    assert_eq!(counters[0].1, 9);

    // Monotonic, non-increasing under repeated decay.
    profiler.decay();
    assert_eq!(profiler.counters()[0].1, 8);
}

#[test]
fn csv_dump_has_header_and_one_row_per_signature() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("counters.out");
    let mut profiler = Profiler::new(disabled_config(dump_path.clone()));

    let args = scalar_args();
    let empty = TypeSetString::new();
    let caller = CallSite { name: "main", arg_types: &empty };
    let callee = CallSite { name: "fib", arg_types: &args };

    let mut call_block = RecordedBlock::new();
    profiler.instrument_func_call(caller, callee, &mut call_block);
    call_block.execute();

    let mut loop_block = RecordedBlock::new();
    profiler.instrument_loop(caller, 0, &mut loop_block);
    loop_block.execute();
    loop_block.execute();

    profiler.push_context(caller);
    let mut interp_block = RecordedBlock::new();
    profiler.instrument_interpreter(&mut interp_block);
    interp_block.execute();
    profiler.pop_context();

    profiler.shutdown();

    let contents = std::fs::read_to_string(&dump_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "calling,callee,count");
    assert_eq!(lines.len(), 4, "one row per touched signature");

    assert!(lines.iter().any(|l| l.starts_with("\"main()\",\"fib(f64SI2)\",")));
    assert!(lines.iter().any(|l| l.contains("\"_loop0\",2")));
    assert!(lines.iter().any(|l| l.contains("_interpreted")));
}

#[test]
fn shutdown_joins_worker_and_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("counters.out");
    let mut profiler = Profiler::new(ProfilerConfig {
        decay_interval: Duration::from_millis(10),
        dump_path: dump_path.clone(),
        enabled: true,
    });

    let empty = TypeSetString::new();
    let caller = CallSite { name: "main", arg_types: &empty };
    let callee = CallSite { name: "work", arg_types: &empty };
    let mut block = RecordedBlock::new();
    profiler.instrument_func_call(caller, callee, &mut block);
    block.execute();

    profiler.shutdown();

    let contents = std::fs::read_to_string(&dump_path).unwrap();
    assert!(contents.starts_with("calling,callee,count"));
    assert!(contents.contains("\"main()\",\"work()\""));
}

#[test]
fn distinct_argument_types_are_distinct_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = Profiler::new(disabled_config(dir.path().join("counters.out")));

    let int_args = scalar_args();
    let mut nonint = TypeSet::new();
    nonint.insert(TypeInfo::scalar(ObjType::MatrixF64, false));
    let fp_args = vec![nonint];
    let empty = TypeSetString::new();
    let caller = CallSite { name: "main", arg_types: &empty };

    let mut b1 = RecordedBlock::new();
    let mut b2 = RecordedBlock::new();
    profiler.instrument_func_call(
        caller,
        CallSite { name: "g", arg_types: &int_args },
        &mut b1,
    );
    profiler.instrument_func_call(
        caller,
        CallSite { name: "g", arg_types: &fp_args },
        &mut b2,
    );
    b1.execute();
    b2.execute();
    b2.execute();

    let counters = profiler.counters();
    assert_eq!(counters.len(), 2);
    let counts: Vec<u32> = counters.iter().map(|(_, c)| *c).collect();
    assert!(counts.contains(&1));
    assert!(counts.contains(&2));
}
