//! Arguments and per-thread state of one `exec` call.
//!
//! [`ExecArgs`] is everything the caller binds: bytecode, register columns,
//! the constant table, dataset metadata, native functions, and user pointers.
//! It is shared read-only between every thread executing part of the same
//! population.
//!
//! [`ExecContext`] is owned by the thread running the call. It holds the
//! temporaries, the random stream, open stat scopes, and counters, none of
//! which are visible to other threads.

use std::sync::atomic::AtomicU32;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::span::EnteredSpan;
use vectorvm_dataset::DataSetMeta;
use vectorvm_foundation::{Error, ErrorKind, Lanes, Result};

use crate::config::VmConfig;
use crate::cursor::{DestCursor, Operand};
use crate::decoder::BytecodeReader;
use crate::external::{FunctionTable, UserData};
use crate::register::{RegisterFile, RegisterLayout};
use crate::stats::ExecStats;

static EMPTY_FUNCTIONS: FunctionTable = FunctionTable::new();

/// Bindings for one `exec` call.
#[derive(Clone, Copy, Debug)]
pub struct ExecArgs<'a> {
    /// Bytecode, terminated by `done`.
    pub code: &'a [u8],
    /// Input register columns, indexed by absolute instance.
    pub inputs: &'a [&'a [u32]],
    /// Output register columns, indexed by absolute instance.
    pub outputs: &'a [&'a [AtomicU32]],
    /// Constant table addressed by byte offset.
    pub constants: &'a [u8],
    /// Datasets referenced by data and ID instructions.
    pub datasets: &'a [&'a DataSetMeta],
    /// Native functions referenced by `external_func_call`.
    pub functions: &'a FunctionTable,
    /// Opaque values handed to native functions.
    pub user_ptrs: &'a [UserData],
    /// Number of instances to run.
    pub num_instances: usize,
    /// Absolute index of the first instance.
    pub start_instance: usize,
}

impl<'a> ExecArgs<'a> {
    /// Creates arguments with no registers, datasets, or functions bound.
    #[must_use]
    pub fn new(code: &'a [u8], constants: &'a [u8]) -> Self {
        Self {
            code,
            inputs: &[],
            outputs: &[],
            constants,
            datasets: &[],
            functions: &EMPTY_FUNCTIONS,
            user_ptrs: &[],
            num_instances: 0,
            start_instance: 0,
        }
    }

    /// Binds input register columns.
    #[must_use]
    pub fn with_inputs(mut self, inputs: &'a [&'a [u32]]) -> Self {
        self.inputs = inputs;
        self
    }

    /// Binds output register columns.
    #[must_use]
    pub fn with_outputs(mut self, outputs: &'a [&'a [AtomicU32]]) -> Self {
        self.outputs = outputs;
        self
    }

    /// Binds dataset metadata.
    #[must_use]
    pub fn with_datasets(mut self, datasets: &'a [&'a DataSetMeta]) -> Self {
        self.datasets = datasets;
        self
    }

    /// Binds the native function table.
    #[must_use]
    pub fn with_functions(mut self, functions: &'a FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    /// Binds user pointers.
    #[must_use]
    pub fn with_user_ptrs(mut self, user_ptrs: &'a [UserData]) -> Self {
        self.user_ptrs = user_ptrs;
        self
    }

    /// Sets the instance range.
    #[must_use]
    pub fn with_instances(mut self, start_instance: usize, num_instances: usize) -> Self {
        self.start_instance = start_instance;
        self.num_instances = num_instances;
        self
    }
}

/// A stat scope entered but not yet exited.
#[derive(Debug)]
pub(crate) struct OpenScope {
    pub(crate) scope: u16,
    pub(crate) started: Instant,
    pub(crate) _span: EnteredSpan,
}

/// Thread-owned execution state.
#[derive(Debug)]
pub struct ExecContext<'a> {
    pub(crate) args: &'a ExecArgs<'a>,
    pub(crate) layout: RegisterLayout,
    pub(crate) regs: RegisterFile<'a>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) stats: ExecStats,
    pub(crate) scopes: Vec<OpenScope>,
}

impl<'a> ExecContext<'a> {
    /// Creates the state for one call.
    ///
    /// The random stream is seeded from the configured seed and the first
    /// instance, so disjoint ranges of one population draw different values.
    #[must_use]
    pub fn new(args: &'a ExecArgs<'a>, config: &VmConfig) -> Self {
        let regs = RegisterFile::new(
            config.num_temp_registers,
            config.chunk_instances(),
            args.inputs,
            args.outputs,
        );
        Self {
            args,
            layout: regs.layout(),
            regs,
            rng: ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(args.start_instance as u64)),
            stats: ExecStats::new(),
            scopes: Vec::new(),
        }
    }

    /// Returns the register layout.
    #[must_use]
    pub fn layout(&self) -> RegisterLayout {
        self.layout
    }

    /// Returns the counters gathered so far.
    #[must_use]
    pub fn stats(&self) -> &ExecStats {
        &self.stats
    }

    /// Consumes the context, returning its counters.
    #[must_use]
    pub fn into_stats(self) -> ExecStats {
        self.stats
    }

    pub(crate) fn dataset(&self, index: u16) -> Result<&'a DataSetMeta> {
        self.args
            .datasets
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| {
                Error::new(ErrorKind::DataSetOutOfBounds {
                    index,
                    count: self.args.datasets.len(),
                })
            })
    }

    pub(crate) fn user_ptr(&self, index: u16) -> Result<&'a UserData> {
        self.args.user_ptrs.get(usize::from(index)).ok_or_else(|| {
            Error::new(ErrorKind::UserPtrOutOfBounds {
                index,
                count: self.args.user_ptrs.len(),
            })
        })
    }

    pub(crate) fn source(
        &self,
        reader: &mut BytecodeReader<'_>,
        constant: bool,
        default: Lanes,
    ) -> Result<Operand> {
        Operand::decode(reader, &self.layout, self.args.constants, constant, default)
    }

    pub(crate) fn dest(&self, reader: &mut BytecodeReader<'_>) -> Result<DestCursor> {
        DestCursor::decode(reader, &self.layout)
    }
}
