//! Bytecode decoding, register files, and the SIMD dispatch loop for VectorVM.
//!
//! This crate provides:
//! - [`exec`] - Runs a program over a range of instances
//! - [`Opcode`] - The instruction set and its operand shapes
//! - [`ExecArgs`] / [`ExecContext`] - Call bindings and thread-owned state
//! - [`RegisterFile`] / [`LaneCursor`] - Lane-group access to registers
//! - [`FunctionRegistry`] / [`FunctionTable`] - Native function bindings
//! - [`BytecodeBuilder`] / [`ConstantTable`] - Program assembly
//! - [`validate_bytecode`] / [`disassemble`] - Static tooling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod config;
pub mod constants;
pub mod context;
pub mod cursor;
pub mod decoder;
pub mod disasm;
pub mod external;
pub mod instruction;
pub mod opcode;
pub mod register;
pub mod stats;
pub mod validate;
pub mod vm;

pub use builder::{BytecodeBuilder, Src};
pub use config::{MAX_INSTANCES_PER_CHUNK, VmConfig};
pub use constants::{ConstantTable, read_constant};
pub use context::{ExecArgs, ExecContext};
pub use cursor::{ConstantCursor, DestCursor, LaneCursor, Operand, RegisterCursor};
pub use decoder::BytecodeReader;
pub use disasm::{disassemble, format_instruction};
pub use external::{
    CALL_CONSTANT_FLAG, ExternalCall, ExternalFunction, FunctionRegistry, FunctionTable,
    NativeFn, UserData,
};
pub use instruction::{Arg, Instruction, decode_instruction};
pub use opcode::{Opcode, Shape};
pub use register::{RegisterFile, RegisterLayout, RegisterSlot};
pub use stats::{ExecStats, ScopeTiming};
pub use validate::{ValidationEnv, validate_bytecode};
pub use vm::exec;
