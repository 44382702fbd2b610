//! Owned programs and datasets driven tick by tick.
//!
//! A [`Simulation`] binds every dataset it owns into one register space:
//! dataset `d`'s input columns follow those of datasets `0..d`, and likewise
//! for output columns. Bytecode addresses columns through those offsets, so the
//! order datasets are added in is part of a program's contract.

use tracing::debug;
use vectorvm_dataset::{DataSet, DataSetMeta};
use vectorvm_exec::{
    ConstantTable, ExecArgs, ExecStats, FunctionRegistry, FunctionTable, RegisterLayout,
    UserData, ValidationEnv, VmConfig, disassemble, validate_bytecode,
};
use vectorvm_foundation::{Error, ErrorKind, Result};

use crate::config::SchedulerConfig;
use crate::scheduler::{CancelToken, ChunkScheduler, RunReport};

/// Bytecode with its constant table and the names of the native functions it
/// calls, in slot order.
#[derive(Clone, Debug, Default)]
pub struct Program {
    code: Vec<u8>,
    constants: ConstantTable,
    bindings: Vec<String>,
}

impl Program {
    /// Creates a program that calls no native functions.
    #[must_use]
    pub fn new(code: Vec<u8>, constants: ConstantTable) -> Self {
        Self {
            code,
            constants,
            bindings: Vec::new(),
        }
    }

    /// Sets the native function names, one per call slot.
    #[must_use]
    pub fn with_bindings<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.bindings = names.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the bytecode.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Returns the constant table.
    #[must_use]
    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    /// Returns the native function names in slot order.
    #[must_use]
    pub fn bindings(&self) -> &[String] {
        &self.bindings
    }
}

/// A program bound to the datasets it reads and writes.
#[derive(Debug)]
pub struct Simulation {
    program: Program,
    functions: FunctionTable,
    datasets: Vec<DataSet>,
    user_ptrs: Vec<UserData>,
    scheduler: ChunkScheduler,
    ticks: u64,
}

impl Simulation {
    /// Loads a program, resolving its bindings against `registry`.
    #[must_use]
    pub fn new(program: Program, registry: &FunctionRegistry) -> Self {
        let functions = registry.resolve(program.bindings());
        Self {
            program,
            functions,
            datasets: Vec::new(),
            user_ptrs: Vec::new(),
            scheduler: ChunkScheduler::default(),
            ticks: 0,
        }
    }

    /// Builder method to set the scheduler and VM configuration.
    ///
    /// The scheduler keeps the current cancel token.
    #[must_use]
    pub fn with_config(mut self, scheduler: SchedulerConfig, vm: VmConfig) -> Self {
        let token = self.scheduler.cancel_token().clone();
        self.scheduler = ChunkScheduler::new(scheduler, vm).with_cancel_token(token);
        self
    }

    /// Returns the loaded program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns the resolved native function table.
    #[must_use]
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Returns the token that stops a run between chunks.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        self.scheduler.cancel_token()
    }

    /// Returns the number of completed ticks.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Appends a dataset, returning the index bytecode uses for it.
    pub fn add_dataset(&mut self, dataset: DataSet) -> Result<u16> {
        let index = u16::try_from(self.datasets.len()).map_err(|_| {
            Error::new(ErrorKind::InvalidConfig("too many datasets".to_string()))
        })?;
        self.datasets.push(dataset);
        self.bind_offsets()?;
        Ok(index)
    }

    /// Appends an opaque value for native functions, returning its index.
    pub fn add_user_ptr(&mut self, data: UserData) -> Result<u16> {
        let index = u16::try_from(self.user_ptrs.len()).map_err(|_| {
            Error::new(ErrorKind::InvalidConfig("too many user pointers".to_string()))
        })?;
        self.user_ptrs.push(data);
        Ok(index)
    }

    /// Returns every dataset in binding order.
    #[must_use]
    pub fn datasets(&self) -> &[DataSet] {
        &self.datasets
    }

    /// Returns one dataset.
    pub fn dataset(&self, index: u16) -> Result<&DataSet> {
        let count = self.datasets.len();
        self.datasets
            .get(usize::from(index))
            .ok_or_else(|| Error::new(ErrorKind::DataSetOutOfBounds { index, count }))
    }

    /// Returns one dataset mutably.
    pub fn dataset_mut(&mut self, index: u16) -> Result<&mut DataSet> {
        let count = self.datasets.len();
        self.datasets
            .get_mut(usize::from(index))
            .ok_or_else(|| Error::new(ErrorKind::DataSetOutOfBounds { index, count }))
    }

    /// Sizes every dataset's output buffer.
    pub fn allocate(&mut self, capacity: usize) {
        for dataset in &mut self.datasets {
            dataset.allocate(capacity);
        }
    }

    /// Returns the register space the program runs in.
    #[must_use]
    pub fn register_layout(&self) -> RegisterLayout {
        let columns: usize = self.datasets.iter().map(DataSet::num_variables).sum();
        RegisterLayout::new(self.scheduler.vm_config().num_temp_registers, columns, columns)
    }

    /// Checks the program against the bound datasets and functions without
    /// running it. Returns the number of instructions before `done`.
    pub fn validate(&self) -> Result<usize> {
        let metas = self.metas();
        let env = ValidationEnv {
            layout: self.register_layout(),
            constants: self.program.constants.as_bytes(),
            datasets: &metas,
            functions: &self.functions,
            num_user_ptrs: self.user_ptrs.len(),
        };
        validate_bytecode(&self.program.code, &env)
    }

    /// Renders the program one instruction per line.
    pub fn disassemble(&self) -> Result<String> {
        disassemble(&self.program.code, &self.functions)
    }

    /// Runs the program over instances `[0, num_instances)`.
    pub fn run(&self, num_instances: usize) -> Result<RunReport> {
        let inputs: Vec<&[u32]> = self
            .datasets
            .iter()
            .flat_map(DataSet::input_columns)
            .collect();
        let outputs: Vec<_> = self
            .datasets
            .iter()
            .flat_map(DataSet::output_columns)
            .collect();
        let metas = self.metas();

        let args = ExecArgs::new(&self.program.code, self.program.constants.as_bytes())
            .with_inputs(&inputs)
            .with_outputs(&outputs)
            .with_datasets(&metas)
            .with_functions(&self.functions)
            .with_user_ptrs(&self.user_ptrs)
            .with_instances(0, num_instances);
        self.scheduler.run(&args)
    }

    /// Promotes every dataset's appended outputs to inputs.
    ///
    /// Returns the new instance count of each dataset.
    pub fn tick(&mut self) -> Vec<usize> {
        let counts = self.datasets.iter_mut().map(DataSet::tick).collect();
        self.ticks += 1;
        debug!(tick = self.ticks, ?counts, "tick");
        counts
    }

    /// Runs the program and, if no chunk failed, ticks.
    pub fn step(&mut self, num_instances: usize) -> Result<ExecStats> {
        let stats = self.run(num_instances)?.into_result()?;
        self.tick();
        Ok(stats)
    }

    fn metas(&self) -> Vec<&DataSetMeta> {
        self.datasets.iter().map(DataSet::meta).collect()
    }

    fn bind_offsets(&mut self) -> Result<()> {
        let mut offset: u16 = 0;
        for dataset in &mut self.datasets {
            let meta = dataset.meta_mut();
            meta.input_register_offset = offset;
            meta.output_register_offset = offset;
            offset = offset.checked_add(meta.num_variables).ok_or_else(|| {
                Error::new(ErrorKind::InvalidConfig(
                    "dataset columns exceed the register space".to_string(),
                ))
            })?;
        }
        Ok(())
    }
}
