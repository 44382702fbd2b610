//! End-to-end programs through the root crate's re-exports

use std::sync::atomic::{AtomicU32, Ordering};

use vectorvm::dataset::DataSetMeta;
use vectorvm::exec::{BytecodeBuilder, ConstantTable, ExecArgs, Opcode, Src, VmConfig, exec};
use vectorvm::foundation::{FALSE_BITS, RegisterId, TRUE_BITS};

fn column(len: usize, fill: u32) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(fill)).collect()
}

fn load(column: &[AtomicU32]) -> Vec<u32> {
    column.iter().map(|c| c.load(Ordering::Relaxed)).collect()
}

// =============================================================================
// Constant Arithmetic Appended To A Dataset
// =============================================================================

#[test]
fn add_of_constants_is_appended_for_every_instance() {
    let mut constants = ConstantTable::new();
    let two = constants.push_f32(2.0).unwrap();
    let three = constants.push_f32(3.0).unwrap();
    let yes = constants.push_bool(true).unwrap();
    let code = BytecodeBuilder::new()
        .compute(Opcode::Add, &[Src::Const(two), Src::Const(three)], RegisterId(0))
        .acquire_index(0, Src::Const(yes), RegisterId(1))
        .output_data(0, Src::Reg(RegisterId(1)), Src::Reg(RegisterId(0)), 0)
        .done()
        .build()
        .unwrap();

    let out = column(4, 0);
    let outputs = [out.as_slice()];
    let meta = DataSetMeta::new(1, 4);
    let datasets = [&meta];
    let args = ExecArgs::new(&code, constants.as_bytes())
        .with_outputs(&outputs)
        .with_datasets(&datasets)
        .with_instances(0, 4);
    exec(&args, &VmConfig::checked()).unwrap();

    let values: Vec<f32> = load(&out).into_iter().map(f32::from_bits).collect();
    assert_eq!(values, vec![5.0; 4]);
    assert_eq!(meta.append_count(), 4);
}

// =============================================================================
// Compaction
// =============================================================================

#[test]
fn alternating_mask_compacts_valid_lanes_in_order() {
    let temps = 4u16;
    let code = BytecodeBuilder::new()
        .exec_index(RegisterId(0))
        .acquire_index(0, Src::Reg(RegisterId(temps)), RegisterId(1))
        .output_data(0, Src::Reg(RegisterId(1)), Src::Reg(RegisterId(0)), 0)
        .done()
        .build()
        .unwrap();

    let mask: Vec<u32> = (0..8)
        .map(|i| if i % 2 == 0 { TRUE_BITS } else { FALSE_BITS })
        .collect();
    let inputs = [mask.as_slice()];
    let out = column(8, u32::MAX);
    let outputs = [out.as_slice()];
    let meta = DataSetMeta::new(1, 8);
    let datasets = [&meta];
    let args = ExecArgs::new(&code, &[])
        .with_inputs(&inputs)
        .with_outputs(&outputs)
        .with_datasets(&datasets)
        .with_instances(0, 8);
    exec(&args, &VmConfig::default().with_temp_registers(usize::from(temps))).unwrap();

    assert_eq!(meta.append_count(), 4);
    assert_eq!(&load(&out)[..4], &[0, 2, 4, 6]);
    assert_eq!(&load(&out)[4..], &[u32::MAX; 4]);
}
