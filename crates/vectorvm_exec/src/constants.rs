//! The constant table: a flat byte buffer addressed by `u16` byte offsets.

use vectorvm_foundation::{Error, ErrorKind, Result, bool_to_bits};

/// Reads the 32-bit little-endian constant at `offset`.
pub fn read_constant(table: &[u8], offset: u16) -> Result<u32> {
    let start = usize::from(offset);
    table
        .get(start..start + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| Error::constant_out_of_bounds(start, table.len()))
}

/// Builds a constant table for a program.
///
/// Each push returns the byte offset to encode in the instruction stream.
/// Identical values share one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstantTable {
    bytes: Vec<u8>,
}

impl ConstantTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing byte buffer.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Appends raw bits, returning their byte offset.
    pub fn push_bits(&mut self, bits: u32) -> Result<u16> {
        let encoded = bits.to_le_bytes();
        if let Some(found) = self
            .bytes
            .chunks_exact(4)
            .position(|chunk| chunk == encoded)
        {
            return Self::offset_of(found * 4);
        }
        let offset = Self::offset_of(self.bytes.len())?;
        self.bytes.extend_from_slice(&encoded);
        Ok(offset)
    }

    /// Appends a float, returning its byte offset.
    pub fn push_f32(&mut self, value: f32) -> Result<u16> {
        self.push_bits(value.to_bits())
    }

    /// Appends an integer, returning its byte offset.
    #[allow(clippy::cast_sign_loss)]
    pub fn push_i32(&mut self, value: i32) -> Result<u16> {
        self.push_bits(value as u32)
    }

    /// Appends a boolean mask, returning its byte offset.
    pub fn push_bool(&mut self, value: bool) -> Result<u16> {
        self.push_bits(bool_to_bits(value))
    }

    /// Reads the 32-bit constant at `offset`.
    pub fn read(&self, offset: u16) -> Result<u32> {
        read_constant(&self.bytes, offset)
    }

    /// Returns the table bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the table size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn offset_of(position: usize) -> Result<u16> {
        u16::try_from(position).map_err(|_| {
            Error::new(ErrorKind::InvalidConfig(
                "constant table exceeds 64 KiB".to_string(),
            ))
        })
    }
}
