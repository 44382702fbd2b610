//! Results that must not depend on how a population is split

use vectorvm::dataset::{DataSet, DataSetLayout, Variable};
use vectorvm::exec::{BytecodeBuilder, ConstantTable, FunctionRegistry, Opcode, Src, VmConfig};
use vectorvm::foundation::RegisterId;
use vectorvm::runtime::{Program, SchedulerConfig, Simulation};

/// `x' = noise(x) * 0.5 + x` for every instance, kept in order.
fn program() -> Program {
    let mut constants = ConstantTable::new();
    let half = constants.push_f32(0.5).unwrap();
    let yes = constants.push_bool(true).unwrap();
    let code = BytecodeBuilder::new()
        .input_data(0, 0, RegisterId(0))
        .compute(Opcode::Noise, &[Src::Reg(RegisterId(0))], RegisterId(1))
        .compute(
            Opcode::Mad,
            &[Src::Reg(RegisterId(1)), Src::Const(half), Src::Reg(RegisterId(0))],
            RegisterId(0),
        )
        .acquire_index(0, Src::Const(yes), RegisterId(2))
        .output_data(0, Src::Reg(RegisterId(2)), Src::Reg(RegisterId(0)), 0)
        .done()
        .build()
        .unwrap();
    Program::new(code, constants)
}

fn run(scheduler: SchedulerConfig, vm: VmConfig) -> Vec<f32> {
    let size = 1000;
    let mut points = DataSet::new("points", DataSetLayout::new().with_variable(Variable::float("x")))
        .unwrap();
    points.set_num_instances(size);
    for i in 0..size {
        points.write_f32(0, i, i as f32 * 0.1).unwrap();
    }

    let mut sim = Simulation::new(program(), &FunctionRegistry::new())
        .with_config(scheduler, vm.with_temp_registers(4));
    sim.add_dataset(points).unwrap();
    sim.allocate(size);
    for _ in 0..3 {
        sim.step(size).unwrap();
    }

    let points = sim.dataset(0).unwrap();
    (0..size).map(|i| points.read_f32(0, i).unwrap()).collect()
}

#[test]
fn chunking_does_not_change_serial_results() {
    let reference = run(SchedulerConfig::serial().with_chunk_size(1000), VmConfig::default());
    for (chunk, sub) in [(4, 4), (64, 16), (333, 128), (1000, 7)] {
        let result = run(
            SchedulerConfig::serial().with_chunk_size(chunk),
            VmConfig::default().with_instances_per_chunk(sub),
        );
        assert_eq!(result, reference, "chunk {chunk}, sub-chunk {sub}");
    }
}

#[test]
fn parallel_matches_serial_as_a_set() {
    let mut serial = run(SchedulerConfig::serial(), VmConfig::default());
    let mut parallel = run(
        SchedulerConfig::default()
            .with_chunk_size(64)
            .with_serial_threshold(0),
        VmConfig::default(),
    );
    serial.sort_by(f32::total_cmp);
    parallel.sort_by(f32::total_cmp);
    assert_eq!(serial, parallel);
}
