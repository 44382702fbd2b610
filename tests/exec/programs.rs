//! Whole-program execution tests

use std::sync::atomic::{AtomicU32, Ordering};

use proptest::prelude::*;
use vectorvm_dataset::DataSetMeta;
use vectorvm_exec::{BytecodeBuilder, ConstantTable, ExecArgs, Opcode, Src, VmConfig, exec};
use vectorvm_foundation::{ErrorKind, RegisterId, TRUE_BITS};

const TEMPS: u16 = 8;

fn vm() -> VmConfig {
    VmConfig::default().with_temp_registers(usize::from(TEMPS))
}

fn reg(index: u16) -> Src {
    Src::Reg(RegisterId(index))
}

fn column(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

fn floats(column: &[AtomicU32]) -> Vec<f32> {
    column
        .iter()
        .map(|c| f32::from_bits(c.load(Ordering::Relaxed)))
        .collect()
}

fn ints(column: &[AtomicU32]) -> Vec<i32> {
    column
        .iter()
        .map(|c| c.load(Ordering::Relaxed) as i32)
        .collect()
}

/// Runs a program whose single input column is `input` and whose single
/// output column is written at the instance index.
fn run_unary(code: &[u8], constants: &ConstantTable, input: &[u32]) -> Vec<AtomicU32> {
    let out = column(input.len());
    let inputs = [input];
    let outputs = [out.as_slice()];
    let args = ExecArgs::new(code, constants.as_bytes())
        .with_inputs(&inputs)
        .with_outputs(&outputs)
        .with_instances(0, input.len());
    exec(&args, &vm()).unwrap();
    out
}

// =============================================================================
// Arithmetic Pipelines
// =============================================================================

#[test]
fn register_and_constant_operands_mix() {
    let mut constants = ConstantTable::new();
    let half = constants.push_f32(0.5).unwrap();
    let one = constants.push_f32(1.0).unwrap();
    let two = constants.push_f32(2.0).unwrap();
    let input_reg = TEMPS;
    let output_reg = TEMPS + 1;
    // clamp(x * 0.5 + 1.0, 1.0, 2.0)
    let code = BytecodeBuilder::new()
        .compute(Opcode::Mad, &[reg(input_reg), Src::Const(half), Src::Const(one)], RegisterId(0))
        .compute(Opcode::Clamp, &[reg(0), Src::Const(one), Src::Const(two)], RegisterId(output_reg))
        .done()
        .build()
        .unwrap();

    let xs: Vec<u32> = [-4.0f32, 0.0, 1.0, 3.0, 10.0].iter().map(|x| x.to_bits()).collect();
    let out = run_unary(&code, &constants, &xs);
    assert_eq!(floats(&out), vec![1.0, 1.0, 1.5, 2.0, 2.0]);
}

#[test]
fn float_int_round_trip_truncates() {
    let code = BytecodeBuilder::new()
        .compute(Opcode::F2I, &[reg(TEMPS)], RegisterId(0))
        .compute(Opcode::I2F, &[reg(0)], RegisterId(TEMPS + 1))
        .done()
        .build()
        .unwrap();
    let xs: Vec<u32> = [2.9f32, -2.9, 0.4, 7.0].iter().map(|x| x.to_bits()).collect();
    let out = run_unary(&code, &ConstantTable::new(), &xs);
    assert_eq!(floats(&out), vec![2.0, -2.0, 0.0, 7.0]);
}

#[test]
fn comparison_feeds_select() {
    let mut constants = ConstantTable::new();
    let limit = constants.push_f32(0.0).unwrap();
    let neg = constants.push_f32(-1.0).unwrap();
    let pos = constants.push_f32(1.0).unwrap();
    let code = BytecodeBuilder::new()
        .compute(Opcode::CmpLt, &[reg(TEMPS), Src::Const(limit)], RegisterId(0))
        .compute(Opcode::Select, &[reg(0), Src::Const(neg), Src::Const(pos)], RegisterId(TEMPS + 1))
        .done()
        .build()
        .unwrap();
    let xs: Vec<u32> = [-3.0f32, 0.0, 2.0, -0.5, f32::NAN]
        .iter()
        .map(|x| x.to_bits())
        .collect();
    let out = run_unary(&code, &constants, &xs);
    assert_eq!(floats(&out), vec![-1.0, 1.0, 1.0, -1.0, 1.0]);
}

#[test]
fn select_treats_non_canonical_masks_as_false() {
    let mut constants = ConstantTable::new();
    let a = constants.push_i32(1).unwrap();
    let b = constants.push_i32(2).unwrap();
    let code = BytecodeBuilder::new()
        .compute(Opcode::Select, &[reg(TEMPS), Src::Const(a), Src::Const(b)], RegisterId(TEMPS + 1))
        .done()
        .build()
        .unwrap();
    let masks = [TRUE_BITS, 0, 1, 0x7FFF_FFFF, 0x8000_0000];
    let out = run_unary(&code, &constants, &masks);
    assert_eq!(ints(&out), vec![1, 2, 2, 2, 2]);
}

#[test]
fn integer_bit_pipeline() {
    let mut constants = ConstantTable::new();
    let mask = constants.push_i32(0xFF).unwrap();
    let shift = constants.push_i32(4).unwrap();
    let code = BytecodeBuilder::new()
        .compute(Opcode::BitAnd, &[reg(TEMPS), Src::Const(mask)], RegisterId(0))
        .compute(Opcode::BitLShift, &[reg(0), Src::Const(shift)], RegisterId(1))
        .compute(Opcode::SubI, &[reg(1), reg(0)], RegisterId(TEMPS + 1))
        .done()
        .build()
        .unwrap();
    let xs = [0x1234_5678u32, 0xFF, 1, 0];
    let out = run_unary(&code, &constants, &xs);
    assert_eq!(ints(&out), vec![0x78 * 15, 0xFF * 15, 15, 0]);
}

// =============================================================================
// Data Movement
// =============================================================================

#[test]
fn inputs_follow_the_dataset_read_position() {
    let column_data: Vec<u32> = (0..16).map(|i| (i * 10) as u32).collect();
    let inputs = [column_data.as_slice()];
    let out = column(4);
    let fixed = column(4);
    let outputs = [out.as_slice(), fixed.as_slice()];
    let meta = DataSetMeta::new(1, 4).with_instance_offset(8);
    let datasets = [&meta];
    let code = BytecodeBuilder::new()
        .input_data(0, 0, RegisterId(TEMPS + 1))
        .input_data_no_advance(0, 0, RegisterId(TEMPS + 2))
        .done()
        .build()
        .unwrap();
    let args = ExecArgs::new(&code, &[])
        .with_inputs(&inputs)
        .with_outputs(&outputs)
        .with_datasets(&datasets)
        .with_instances(0, 4);
    exec(&args, &vm()).unwrap();

    assert_eq!(ints(&out), vec![80, 90, 100, 110]);
    assert_eq!(ints(&fixed), vec![80; 4]);
}

#[test]
fn exec_index_is_absolute() {
    let code = BytecodeBuilder::new()
        .exec_index(RegisterId(TEMPS))
        .done()
        .build()
        .unwrap();
    let out = column(12);
    let outputs = [out.as_slice()];
    let args = ExecArgs::new(&code, &[])
        .with_outputs(&outputs)
        .with_instances(5, 7);
    exec(&args, &vm().with_instances_per_chunk(4)).unwrap();

    let written = ints(&out);
    assert_eq!(&written[..5], &[0; 5]);
    assert_eq!(&written[5..], &[5, 6, 7, 8, 9, 10, 11]);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn writing_an_input_register_is_rejected() {
    let code = BytecodeBuilder::new()
        .exec_index(RegisterId(TEMPS))
        .done()
        .build()
        .unwrap();
    let input = vec![0u32; 4];
    let inputs = [input.as_slice()];
    let args = ExecArgs::new(&code, &[])
        .with_inputs(&inputs)
        .with_instances(0, 4);
    let err = exec(&args, &vm()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidDestination(_)));
    assert_eq!(err.context.unwrap().opcode, Some("exec_index"));
}

#[test]
fn program_without_done_is_truncated() {
    let code = BytecodeBuilder::new()
        .exec_index(RegisterId(0))
        .build()
        .unwrap();
    let args = ExecArgs::new(&code, &[]).with_instances(0, 4);
    let err = exec(&args, &vm()).unwrap_err();
    assert!(err.kind.is_malformed_bytecode());
}

#[test]
fn zero_instances_run_nothing() {
    let args = ExecArgs::new(&[0xFF], &[]);
    let stats = exec(&args, &vm()).unwrap();
    assert_eq!(stats.instances, 0);
    assert_eq!(stats.chunks, 0);
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn noise_is_deterministic_and_bounded() {
    let code = BytecodeBuilder::new()
        .compute(Opcode::Noise, &[reg(TEMPS)], RegisterId(TEMPS + 1))
        .done()
        .build()
        .unwrap();
    let xs: Vec<u32> = (0..64).map(|i| (i as f32 * 0.37).to_bits()).collect();
    let first = floats(&run_unary(&code, &ConstantTable::new(), &xs));
    let second = floats(&run_unary(&code, &ConstantTable::new(), &xs));
    assert_eq!(first, second);
    assert!(first.iter().all(|n| (-1.0..=1.0).contains(n)));
}

proptest! {
    #[test]
    fn random_is_reproducible_for_a_seed(seed in any::<u64>(), count in 1usize..64) {
        let mut constants = ConstantTable::new();
        let scale = constants.push_f32(1.0).unwrap();
        let code = BytecodeBuilder::new()
            .compute(Opcode::Random, &[Src::Const(scale)], RegisterId(TEMPS))
            .done()
            .build()
            .unwrap();

        let run = || {
            let out = column(count);
            let outputs = [out.as_slice()];
            let args = ExecArgs::new(&code, constants.as_bytes())
                .with_outputs(&outputs)
                .with_instances(0, count);
            exec(&args, &vm().with_seed(seed)).unwrap();
            floats(&out)
        };
        let first = run();
        prop_assert_eq!(&first, &run());
        prop_assert!(first.iter().all(|x| (0.0..1.0).contains(x)));
    }
}
