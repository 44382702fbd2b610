//! Forward-only bytecode cursor.

use vectorvm_foundation::{Error, RegisterId, Result};

use crate::opcode::Opcode;

/// Reads little-endian fields from a bytecode stream.
///
/// The cursor only moves forward and has no effect on VM state.
#[derive(Clone, Debug)]
pub struct BytecodeReader<'a> {
    code: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Creates a reader positioned at the start of `code`.
    #[must_use]
    pub fn new(code: &'a [u8]) -> Self {
        Self { code, pos: 0 }
    }

    /// Returns the byte offset of the next read.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Returns true once every byte has been consumed.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.code.len()
    }

    /// Returns the bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.code[self.pos.min(self.code.len())..]
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self
            .code
            .get(self.pos..self.pos + N)
            .ok_or_else(|| Error::unexpected_end(self.pos))?;
        self.pos += N;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads one byte.
    pub fn decode_u8(&mut self) -> Result<u8> {
        self.take::<1>().map(|[b]| b)
    }

    /// Reads a little-endian `u16`.
    pub fn decode_u16(&mut self) -> Result<u16> {
        self.take().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    pub fn decode_u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_le_bytes)
    }

    /// Reads a register operand.
    pub fn decode_register(&mut self) -> Result<RegisterId> {
        self.decode_u16().map(RegisterId)
    }

    /// Reads an opcode byte.
    ///
    /// Fails with `InvalidOpcode` for bytes outside the instruction set.
    pub fn decode_op(&mut self) -> Result<Opcode> {
        Opcode::try_from(self.decode_u8()?)
    }
}
