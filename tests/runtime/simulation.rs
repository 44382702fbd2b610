//! Simulation driver tests

use vectorvm_dataset::{DataSet, DataSetLayout, Variable};
use vectorvm_exec::{
    BytecodeBuilder, ConstantTable, ExternalFunction, FunctionRegistry, Opcode, Src, VmConfig,
};
use vectorvm_foundation::RegisterId;
use vectorvm_runtime::{Program, SchedulerConfig, Simulation};

fn layout() -> DataSetLayout {
    DataSetLayout::new()
        .with_variable(Variable::float("age"))
        .with_variable(Variable::float("lifetime"))
}

/// Ages every particle by `dt` and keeps the ones younger than their lifetime.
fn lifetime_program(dt: f32) -> Program {
    let mut constants = ConstantTable::new();
    let dt = constants.push_f32(dt).unwrap();
    let code = BytecodeBuilder::new()
        .input_data(0, 0, RegisterId(0))
        .input_data(0, 1, RegisterId(1))
        .compute(Opcode::Add, &[Src::Reg(RegisterId(0)), Src::Const(dt)], RegisterId(0))
        .compute(Opcode::CmpLt, &[Src::Reg(RegisterId(0)), Src::Reg(RegisterId(1))], RegisterId(2))
        .acquire_index(0, Src::Reg(RegisterId(2)), RegisterId(3))
        .output_data(0, Src::Reg(RegisterId(3)), Src::Reg(RegisterId(0)), 0)
        .output_data(0, Src::Reg(RegisterId(3)), Src::Reg(RegisterId(1)), 1)
        .done()
        .build()
        .unwrap();
    Program::new(code, constants)
}

fn spawn(lifetimes: &[f32]) -> DataSet {
    let mut particles = DataSet::new("particles", layout()).unwrap();
    particles.set_num_instances(lifetimes.len());
    for (i, &lifetime) in lifetimes.iter().enumerate() {
        particles.write_f32(1, i, lifetime).unwrap();
    }
    particles.allocate(lifetimes.len());
    particles
}

#[test]
fn expired_particles_are_compacted_away() {
    let mut sim = Simulation::new(lifetime_program(1.0), &FunctionRegistry::new())
        .with_config(SchedulerConfig::serial(), VmConfig::default().with_temp_registers(4));
    sim.add_dataset(spawn(&[1.5, 3.5, 0.5, 2.5])).unwrap();

    let mut alive = Vec::new();
    for _ in 0..4 {
        let count = sim.dataset(0).unwrap().num_instances();
        sim.step(count).unwrap();
        alive.push(sim.dataset(0).unwrap().num_instances());
    }
    assert_eq!(alive, vec![3, 2, 1, 0]);
}

#[test]
fn survivors_keep_relative_order() {
    let mut sim = Simulation::new(lifetime_program(1.0), &FunctionRegistry::new())
        .with_config(SchedulerConfig::serial(), VmConfig::default().with_temp_registers(4));
    sim.add_dataset(spawn(&[5.0, 0.5, 4.0, 0.5, 3.0])).unwrap();
    sim.step(5).unwrap();

    let particles = sim.dataset(0).unwrap();
    let lifetimes: Vec<f32> = (0..particles.num_instances())
        .map(|i| particles.read_f32(1, i).unwrap())
        .collect();
    assert_eq!(lifetimes, vec![5.0, 4.0, 3.0]);
}

#[test]
fn cancelled_simulation_does_not_tick() {
    let mut sim = Simulation::new(lifetime_program(1.0), &FunctionRegistry::new());
    sim.add_dataset(spawn(&[9.0; 8])).unwrap();
    sim.cancel_token().cancel();

    let report = sim.run(8).unwrap();
    assert_eq!(report.completed, 0);
    assert_eq!(sim.ticks(), 0);
}

#[test]
fn bindings_resolve_by_name() {
    let mut registry = FunctionRegistry::new();
    registry.register(ExternalFunction::new("gravity", 0, 1, |call| {
        for i in 0..call.num_instances() {
            call.set_output_f32(0, i, -9.8)?;
        }
        Ok(())
    }));
    let code = BytecodeBuilder::new()
        .external_call(1, None, &[], &[RegisterId(0)])
        .done()
        .build()
        .unwrap();
    let program = Program::new(code, ConstantTable::new()).with_bindings(["wind", "gravity"]);
    let mut sim = Simulation::new(program, &registry)
        .with_config(SchedulerConfig::serial(), VmConfig::default().with_temp_registers(4));
    sim.add_dataset(spawn(&[1.0; 4])).unwrap();

    assert_eq!(sim.functions().num_unbound(), 1);
    assert_eq!(sim.validate().unwrap(), 1);
    assert!(sim.run(4).unwrap().is_ok());
}
