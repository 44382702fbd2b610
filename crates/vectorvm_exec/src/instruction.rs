//! Structural decoding of single instructions.
//!
//! The dispatch loop decodes operands straight into cursors. Tools that look
//! at a program without running it (the validator, the disassembler) decode
//! into an [`Instruction`] instead.

use std::fmt;

use vectorvm_foundation::{RegisterId, Result};

use crate::decoder::BytecodeReader;
use crate::external::{CALL_CONSTANT_FLAG, FunctionTable};
use crate::opcode::{Opcode, Shape};

/// One decoded operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    /// Register read.
    Src(RegisterId),
    /// Constant-table byte offset.
    Const(u16),
    /// Register write.
    Dst(RegisterId),
    /// Dataset index.
    DataSet(u16),
    /// Column of a dataset's input registers.
    Input {
        /// Dataset index.
        dataset: u16,
        /// Column within the dataset.
        variable: u16,
    },
    /// Column of a dataset's output registers.
    Output {
        /// Dataset index.
        dataset: u16,
        /// Column within the dataset.
        variable: u16,
    },
    /// External function slot.
    Function(u16),
    /// User pointer index.
    UserPtr(u16),
    /// Stat scope identifier.
    Scope(u16),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Src(r) | Self::Dst(r) => write!(f, "{r}"),
            Self::Const(offset) => write!(f, "c[{offset}]"),
            Self::DataSet(d) => write!(f, "ds{d}"),
            Self::Input { dataset, variable } => write!(f, "ds{dataset}.in[{variable}]"),
            Self::Output { dataset, variable } => write!(f, "ds{dataset}.out[{variable}]"),
            Self::Function(slot) => write!(f, "fn{slot}"),
            Self::UserPtr(index) => write!(f, "user{index}"),
            Self::Scope(scope) => write!(f, "scope{scope}"),
        }
    }
}

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset of the opcode.
    pub offset: usize,
    /// The opcode.
    pub opcode: Opcode,
    /// Operands in encoding order.
    pub args: Vec<Arg>,
}

impl Instruction {
    /// Returns the destination operands.
    pub fn dests(&self) -> impl Iterator<Item = RegisterId> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Dst(r) => Some(*r),
            _ => None,
        })
    }
}

/// Decodes the instruction at the reader's position.
///
/// External calls need `functions` to know their operand count; an unbound
/// slot cannot be decoded past.
pub fn decode_instruction(
    reader: &mut BytecodeReader<'_>,
    functions: &FunctionTable,
) -> Result<Instruction> {
    let offset = reader.offset();
    let opcode = reader.decode_op()?;
    let mut args = Vec::new();

    match opcode.shape() {
        Shape::Done | Shape::ExitStatScope => {}
        Shape::Compute(n) => {
            let optype = reader.decode_u8()?;
            for i in 0..n {
                args.push(source(reader, optype & (1 << i) != 0)?);
            }
            args.push(Arg::Dst(reader.decode_register()?));
        }
        Shape::ExecIndex => args.push(Arg::Dst(reader.decode_register()?)),
        Shape::InputData => {
            let dataset = reader.decode_u16()?;
            let variable = reader.decode_u16()?;
            args.push(Arg::Input { dataset, variable });
            args.push(Arg::Dst(reader.decode_register()?));
        }
        Shape::OutputData => {
            let optype = reader.decode_u8()?;
            let dataset = reader.decode_u16()?;
            args.push(Arg::DataSet(dataset));
            args.push(source(reader, optype & 1 != 0)?);
            args.push(source(reader, optype & 2 != 0)?);
            let variable = reader.decode_u16()?;
            args.push(Arg::Output { dataset, variable });
        }
        Shape::AcquireIndex => {
            let optype = reader.decode_u8()?;
            args.push(Arg::DataSet(reader.decode_u16()?));
            args.push(source(reader, optype & 1 != 0)?);
            args.push(Arg::Dst(reader.decode_register()?));
        }
        Shape::AcquireId => {
            args.push(Arg::DataSet(reader.decode_u16()?));
            args.push(Arg::Dst(reader.decode_register()?));
            args.push(Arg::Dst(reader.decode_register()?));
        }
        Shape::UpdateId => {
            args.push(Arg::DataSet(reader.decode_u16()?));
            args.push(Arg::Src(reader.decode_register()?));
            args.push(Arg::Src(reader.decode_register()?));
        }
        Shape::ExternalCall => {
            let slot = reader.decode_u16()?;
            args.push(Arg::Function(slot));
            let function = functions.get(slot)?;
            if function.needs_user_ptr {
                args.push(Arg::UserPtr(reader.decode_u16()?));
            }
            for _ in 0..function.num_inputs {
                let raw = reader.decode_u16()?;
                args.push(if raw != u16::MAX && raw & CALL_CONSTANT_FLAG != 0 {
                    Arg::Const(raw & !CALL_CONSTANT_FLAG)
                } else {
                    Arg::Src(RegisterId(raw))
                });
            }
            for _ in 0..function.num_outputs {
                args.push(Arg::Dst(reader.decode_register()?));
            }
        }
        Shape::EnterStatScope => args.push(Arg::Scope(reader.decode_u16()?)),
    }

    Ok(Instruction {
        offset,
        opcode,
        args,
    })
}

fn source(reader: &mut BytecodeReader<'_>, constant: bool) -> Result<Arg> {
    let raw = reader.decode_u16()?;
    Ok(if constant {
        Arg::Const(raw)
    } else {
        Arg::Src(RegisterId(raw))
    })
}
