//! Static validation tests

use vectorvm_dataset::DataSetMeta;
use vectorvm_exec::{
    BytecodeBuilder, ConstantTable, ExecArgs, ExternalFunction, FunctionTable, Opcode,
    RegisterLayout, Src, ValidationEnv, VmConfig, exec, validate_bytecode,
};
use vectorvm_foundation::{ErrorKind, RegisterId};

struct Env {
    constants: ConstantTable,
    meta: DataSetMeta,
    functions: FunctionTable,
}

impl Env {
    fn new() -> Self {
        let mut constants = ConstantTable::new();
        constants.push_f32(1.0).unwrap();
        let mut functions = FunctionTable::new();
        functions.push(ExternalFunction::new("pair", 2, 1, |_| Ok(())));
        Self {
            constants,
            meta: DataSetMeta::new(3, 8),
            functions,
        }
    }

    fn validate(&self, code: &[u8]) -> vectorvm_foundation::Result<usize> {
        let datasets = [&self.meta];
        let env = ValidationEnv {
            layout: RegisterLayout::new(4, 3, 3),
            constants: self.constants.as_bytes(),
            datasets: &datasets,
            functions: &self.functions,
            num_user_ptrs: 0,
        };
        validate_bytecode(code, &env)
    }
}

#[test]
fn counts_instructions_before_done() {
    let code = BytecodeBuilder::new()
        .input_data(0, 2, RegisterId(0))
        .external_call(0, None, &[Src::Reg(RegisterId(0)), Src::Const(0)], &[RegisterId(1)])
        .enter_stat_scope(1)
        .acquire_index(0, Src::UNUSED, RegisterId(2))
        .output_data(0, Src::Reg(RegisterId(2)), Src::Reg(RegisterId(1)), 2)
        .exit_stat_scope()
        .done()
        .build()
        .unwrap();
    assert_eq!(Env::new().validate(&code).unwrap(), 6);
}

#[test]
fn constant_past_the_table_is_rejected() {
    let code = BytecodeBuilder::new()
        .compute(Opcode::Add, &[Src::Const(0), Src::Const(4)], RegisterId(0))
        .done()
        .build()
        .unwrap();
    let err = Env::new().validate(&code).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConstantOutOfBounds { .. }));
    assert_eq!(err.context.unwrap().offset, Some(0));
}

#[test]
fn column_past_the_dataset_is_rejected() {
    let code = BytecodeBuilder::new()
        .input_data(0, 3, RegisterId(0))
        .done()
        .build()
        .unwrap();
    assert!(Env::new().validate(&code).unwrap_err().kind.is_out_of_bounds());
}

#[test]
fn unbalanced_scopes_are_rejected() {
    let open = BytecodeBuilder::new()
        .enter_stat_scope(0)
        .done()
        .build()
        .unwrap();
    let close = BytecodeBuilder::new().exit_stat_scope().done().build().unwrap();
    let env = Env::new();
    for code in [open, close] {
        assert_eq!(
            env.validate(&code).unwrap_err().kind,
            ErrorKind::UnbalancedStatScope
        );
    }
}

#[test]
fn checked_config_rejects_before_touching_outputs() {
    let code = BytecodeBuilder::new()
        .exec_index(RegisterId(4))
        .compute(Opcode::Add, &[Src::Reg(RegisterId(900)), Src::Const(0)], RegisterId(0))
        .done()
        .build()
        .unwrap();
    let out: Vec<_> = (0..4).map(|_| std::sync::atomic::AtomicU32::new(7)).collect();
    let outputs = [out.as_slice()];
    let constants = Env::new().constants;
    let args = ExecArgs::new(&code, constants.as_bytes())
        .with_outputs(&outputs)
        .with_instances(0, 4);

    let config = VmConfig::checked().with_temp_registers(4);
    let err = exec(&args, &config).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RegisterOutOfBounds { .. }));
    assert!(
        out.iter()
            .all(|c| c.load(std::sync::atomic::Ordering::Relaxed) == 7)
    );
}
