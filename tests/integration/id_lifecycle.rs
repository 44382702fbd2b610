//! Stable ID allocation across runs

use std::sync::atomic::{AtomicU32, Ordering};

use vectorvm::dataset::DataSetMeta;
use vectorvm::exec::{BytecodeBuilder, ConstantTable, ExecArgs, Src, VmConfig, exec};
use vectorvm::foundation::{INDEX_NONE, RegisterId};

const TEMPS: u16 = 4;

fn vm() -> VmConfig {
    VmConfig::default().with_temp_registers(usize::from(TEMPS))
}

fn column(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

fn load_i32(column: &[AtomicU32]) -> Vec<i32> {
    column
        .iter()
        .map(|c| c.load(Ordering::Relaxed) as i32)
        .collect()
}

/// Acquires one ID per instance, places it in an appended slot, and writes
/// the ID to output column 0.
fn spawn_program(constants: &mut ConstantTable) -> Vec<u8> {
    let yes = constants.push_bool(true).unwrap();
    BytecodeBuilder::new()
        .acquire_id(0, RegisterId(0), RegisterId(1))
        .acquire_index(0, Src::Const(yes), RegisterId(2))
        .update_id(0, RegisterId(0), RegisterId(2))
        .output_data(0, Src::Reg(RegisterId(2)), Src::Reg(RegisterId(0)), 0)
        .done()
        .build()
        .unwrap()
}

fn run(
    code: &[u8],
    constants: &ConstantTable,
    meta: &DataSetMeta,
    out: &[AtomicU32],
    count: usize,
) {
    let outputs = [out];
    let datasets = [meta];
    let args = ExecArgs::new(code, constants.as_bytes())
        .with_outputs(&outputs)
        .with_datasets(&datasets)
        .with_instances(0, count);
    exec(&args, &vm()).unwrap();
}

#[test]
fn freed_ids_are_reacquired_last_in_first_out() {
    let mut constants = ConstantTable::new();
    let code = spawn_program(&mut constants);
    let meta = DataSetMeta::new(1, 10);

    let out = column(10);
    run(&code, &constants, &meta, &out, 10);
    assert_eq!(load_i32(&out), (0..10).collect::<Vec<_>>());

    meta.free_id(3).unwrap();
    meta.free_id(7).unwrap();

    let acquire = BytecodeBuilder::new()
        .acquire_id(0, RegisterId(TEMPS), RegisterId(0))
        .done()
        .build()
        .unwrap();
    let ids = column(2);
    run(&acquire, &ConstantTable::new(), &meta, &ids, 2);
    assert_eq!(load_i32(&ids), vec![7, 3]);

    let more = column(1);
    run(&acquire, &ConstantTable::new(), &meta, &more, 1);
    assert_eq!(load_i32(&more), vec![10]);
}

#[test]
fn dead_instances_return_their_ids() {
    let mut constants = ConstantTable::new();
    let code = spawn_program(&mut constants);
    let meta = DataSetMeta::new(1, 6);
    let out = column(6);
    run(&code, &constants, &meta, &out, 6);

    // Report slots for the survivors only; the rest died.
    let slots = [0, INDEX_NONE, 1, INDEX_NONE, INDEX_NONE, 2];
    let ids: Vec<u32> = (0..6).collect();
    let slot_bits: Vec<u32> = slots.iter().map(|&s| s as u32).collect();
    let inputs = [ids.as_slice(), slot_bits.as_slice()];
    let update = BytecodeBuilder::new()
        .update_id(0, RegisterId(TEMPS), RegisterId(TEMPS + 1))
        .done()
        .build()
        .unwrap();
    let datasets = [&meta];
    let args = ExecArgs::new(&update, &[])
        .with_inputs(&inputs)
        .with_datasets(&datasets)
        .with_instances(0, 6);
    exec(&args, &vm()).unwrap();

    let table = meta.lock_ids().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.free_ids(), &[1, 3, 4]);
    let live: Vec<(i32, Option<i32>)> = table
        .iter()
        .map(|id| (id.index, table.index_of(id).unwrap()))
        .collect();
    assert_eq!(live, vec![(0, Some(0)), (2, Some(1)), (5, Some(2))]);
}
