//! Static bytecode validation.
//!
//! Walks a program once, without executing it, and checks every operand the
//! dispatch loop would otherwise check lazily: register ranges, destinations,
//! constant offsets, dataset indices and columns, function bindings, user
//! pointers, and stat scope nesting. A program that passes cannot fail on
//! decoding at run time; it can still fail on data (instance bounds, ID
//! misuse).

use vectorvm_dataset::DataSetMeta;
use vectorvm_foundation::{Error, ErrorContext, ErrorKind, Result};

use crate::constants::read_constant;
use crate::context::ExecArgs;
use crate::decoder::BytecodeReader;
use crate::external::FunctionTable;
use crate::instruction::{Arg, Instruction, decode_instruction};
use crate::opcode::Opcode;
use crate::register::RegisterLayout;

/// What a program may reference.
#[derive(Clone, Copy, Debug)]
pub struct ValidationEnv<'a> {
    /// Register ranges.
    pub layout: RegisterLayout,
    /// Constant table.
    pub constants: &'a [u8],
    /// Bound datasets.
    pub datasets: &'a [&'a DataSetMeta],
    /// Native function table.
    pub functions: &'a FunctionTable,
    /// Number of bound user pointers.
    pub num_user_ptrs: usize,
}

impl<'a> ValidationEnv<'a> {
    /// Describes the bindings of an `exec` call.
    #[must_use]
    pub fn for_args(args: &ExecArgs<'a>, layout: RegisterLayout) -> Self {
        Self {
            layout,
            constants: args.constants,
            datasets: args.datasets,
            functions: args.functions,
            num_user_ptrs: args.user_ptrs.len(),
        }
    }

    fn check_arg(&self, arg: Arg) -> Result<()> {
        match arg {
            Arg::Src(r) => self.layout.resolve_source(r).map(drop),
            Arg::Dst(r) => self.layout.resolve_dest(r).map(drop),
            Arg::Const(offset) => read_constant(self.constants, offset).map(drop),
            Arg::DataSet(d) => self.dataset(d).map(drop),
            Arg::Input { dataset, variable } => {
                let meta = self.dataset(dataset)?;
                check_column(meta, variable)?;
                let index = usize::from(meta.input_register_offset) + usize::from(variable);
                if index >= self.layout.num_inputs {
                    return Err(Error::register_out_of_bounds(variable, self.layout.num_inputs));
                }
                Ok(())
            }
            Arg::Output { dataset, variable } => {
                let meta = self.dataset(dataset)?;
                check_column(meta, variable)?;
                let index = usize::from(meta.output_register_offset) + usize::from(variable);
                if index >= self.layout.num_outputs {
                    return Err(Error::register_out_of_bounds(variable, self.layout.num_outputs));
                }
                Ok(())
            }
            Arg::Function(slot) => self.functions.get(slot).map(drop),
            Arg::UserPtr(index) => {
                if usize::from(index) < self.num_user_ptrs {
                    Ok(())
                } else {
                    Err(Error::new(ErrorKind::UserPtrOutOfBounds {
                        index,
                        count: self.num_user_ptrs,
                    }))
                }
            }
            Arg::Scope(_) => Ok(()),
        }
    }

    fn dataset(&self, index: u16) -> Result<&'a DataSetMeta> {
        self.datasets.get(usize::from(index)).copied().ok_or_else(|| {
            Error::new(ErrorKind::DataSetOutOfBounds {
                index,
                count: self.datasets.len(),
            })
        })
    }
}

fn check_column(meta: &DataSetMeta, variable: u16) -> Result<()> {
    if variable < meta.num_variables {
        Ok(())
    } else {
        Err(Error::register_out_of_bounds(
            variable,
            usize::from(meta.num_variables),
        ))
    }
}

/// Validates a whole program.
///
/// Returns the number of instructions before the terminating `done`.
pub fn validate_bytecode(code: &[u8], env: &ValidationEnv<'_>) -> Result<usize> {
    let mut reader = BytecodeReader::new(code);
    let mut depth = 0usize;
    let mut count = 0;

    loop {
        let offset = reader.offset();
        let ins = decode_instruction(&mut reader, env.functions)
            .map_err(|err| err.with_context(ErrorContext::new().with_instruction(offset, None)))?;
        check_instruction(&ins, env, &mut depth).map_err(|err| {
            err.with_context(
                ErrorContext::new().with_instruction(offset, Some(ins.opcode.mnemonic())),
            )
        })?;
        if ins.opcode == Opcode::Done {
            return Ok(count);
        }
        count += 1;
    }
}

fn check_instruction(ins: &Instruction, env: &ValidationEnv<'_>, depth: &mut usize) -> Result<()> {
    for arg in &ins.args {
        env.check_arg(*arg)?;
    }
    match ins.opcode {
        Opcode::EnterStatScope => *depth += 1,
        Opcode::ExitStatScope => {
            *depth = depth
                .checked_sub(1)
                .ok_or_else(|| Error::new(ErrorKind::UnbalancedStatScope))?;
        }
        Opcode::Done if *depth != 0 => return Err(Error::new(ErrorKind::UnbalancedStatScope)),
        _ => {}
    }
    Ok(())
}
