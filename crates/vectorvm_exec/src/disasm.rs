//! Human-readable listings of bytecode.

use std::fmt::Write as _;

use vectorvm_foundation::Result;

use crate::decoder::BytecodeReader;
use crate::external::FunctionTable;
use crate::instruction::{Arg, Instruction, decode_instruction};
use crate::opcode::Opcode;

/// Renders one instruction: offset, mnemonic, operands, then destinations.
#[must_use]
pub fn format_instruction(ins: &Instruction) -> String {
    let mut line = format!("{:04}  {}", ins.offset, ins.opcode.mnemonic());
    let operands: Vec<String> = ins
        .args
        .iter()
        .filter(|arg| !matches!(arg, Arg::Dst(_)))
        .map(ToString::to_string)
        .collect();
    if !operands.is_empty() {
        line.push(' ');
        line.push_str(&operands.join(", "));
    }
    let dests: Vec<String> = ins.dests().map(|r| r.to_string()).collect();
    if !dests.is_empty() {
        line.push_str(" -> ");
        line.push_str(&dests.join(", "));
    }
    line
}

/// Disassembles a program up to and including its `done`.
pub fn disassemble(code: &[u8], functions: &FunctionTable) -> Result<String> {
    let mut reader = BytecodeReader::new(code);
    let mut out = String::new();
    loop {
        let ins = decode_instruction(&mut reader, functions)?;
        let _ = writeln!(out, "{}", format_instruction(&ins));
        if ins.opcode == Opcode::Done {
            return Ok(out);
        }
    }
}
