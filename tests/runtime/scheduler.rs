//! Chunk scheduler tests

use std::sync::atomic::{AtomicU32, Ordering};

use vectorvm_dataset::DataSetMeta;
use vectorvm_exec::{BytecodeBuilder, ConstantTable, ExecArgs, Opcode, Src, VmConfig};
use vectorvm_foundation::RegisterId;
use vectorvm_runtime::{CancelToken, ChunkScheduler, SchedulerConfig, optimal_chunk_size};

fn vm() -> VmConfig {
    VmConfig::default().with_temp_registers(4)
}

fn column(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

/// Appends the absolute index of every even instance.
fn compact_evens(constants: &mut ConstantTable) -> Vec<u8> {
    let one = constants.push_i32(1).unwrap();
    let zero = constants.push_i32(0).unwrap();
    BytecodeBuilder::new()
        .exec_index(RegisterId(0))
        .compute(Opcode::BitAnd, &[Src::Reg(RegisterId(0)), Src::Const(one)], RegisterId(1))
        .compute(Opcode::CmpEqI, &[Src::Reg(RegisterId(1)), Src::Const(zero)], RegisterId(1))
        .acquire_index(0, Src::Reg(RegisterId(1)), RegisterId(2))
        .output_data(0, Src::Reg(RegisterId(2)), Src::Reg(RegisterId(0)), 0)
        .done()
        .build()
        .unwrap()
}

#[test]
fn parallel_append_keeps_every_valid_instance_once() {
    let mut constants = ConstantTable::new();
    let code = compact_evens(&mut constants);
    let size = 20_000;
    let out = column(size / 2);
    let outputs = [out.as_slice()];
    let meta = DataSetMeta::new(1, size / 2);
    let datasets = [&meta];
    let args = ExecArgs::new(&code, constants.as_bytes())
        .with_outputs(&outputs)
        .with_datasets(&datasets)
        .with_instances(0, size);

    let config = SchedulerConfig::default()
        .with_chunk_size(256)
        .with_serial_threshold(0);
    let report = ChunkScheduler::new(config, vm()).run(&args).unwrap();
    assert!(report.is_ok());
    assert_eq!(meta.append_count(), size / 2);

    let mut written: Vec<u32> = out.iter().map(|c| c.load(Ordering::Relaxed)).collect();
    written.sort_unstable();
    let expected: Vec<u32> = (0..size as u32).step_by(2).collect();
    assert_eq!(written, expected);
}

#[test]
fn serial_append_preserves_instance_order() {
    let mut constants = ConstantTable::new();
    let code = compact_evens(&mut constants);
    let out = column(50);
    let outputs = [out.as_slice()];
    let meta = DataSetMeta::new(1, 50);
    let datasets = [&meta];
    let args = ExecArgs::new(&code, constants.as_bytes())
        .with_outputs(&outputs)
        .with_datasets(&datasets)
        .with_instances(0, 100);

    let config = SchedulerConfig::serial().with_chunk_size(12);
    ChunkScheduler::new(config, vm()).run(&args).unwrap();
    let written: Vec<u32> = out.iter().map(|c| c.load(Ordering::Relaxed)).collect();
    assert_eq!(written, (0..100).step_by(2).collect::<Vec<u32>>());
}

#[test]
fn stats_merge_across_chunks() {
    let code = BytecodeBuilder::new()
        .enter_stat_scope(3)
        .exec_index(RegisterId(0))
        .exit_stat_scope()
        .done()
        .build()
        .unwrap();
    let args = ExecArgs::new(&code, &[]).with_instances(0, 64);
    let config = SchedulerConfig::serial().with_chunk_size(16);
    let stats = ChunkScheduler::new(config, vm())
        .run(&args)
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(stats.instances, 64);
    assert_eq!(stats.instructions, 3 * 4);
    assert_eq!(stats.scope(3).unwrap().count, 4);
}

#[test]
fn shared_token_cancels_later_runs() {
    let token = CancelToken::new();
    let scheduler = ChunkScheduler::new(SchedulerConfig::default(), vm())
        .with_cancel_token(token.clone());
    assert!(!scheduler.cancel_token().is_cancelled());
    token.cancel();
    assert!(scheduler.cancel_token().is_cancelled());

    let code = BytecodeBuilder::new().done().build().unwrap();
    let args = ExecArgs::new(&code, &[]).with_instances(0, 10);
    let report = scheduler.run(&args).unwrap();
    assert_eq!(report.completed, 0);
    assert_eq!(report.skipped, report.chunks);
}

#[test]
fn optimal_chunk_size_is_bounded() {
    for population in [0, 100, 10_000, 10_000_000] {
        let size = optimal_chunk_size(population);
        assert!((64..=4096).contains(&size));
    }
}
