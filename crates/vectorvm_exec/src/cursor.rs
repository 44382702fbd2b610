//! Lane cursors over register and constant operands.
//!
//! An instruction walks its operands one lane group at a time. Register
//! operands advance with the walk; constants and the unused sentinel stay put,
//! so optional operands never desynchronize the lane position.

use vectorvm_foundation::{LANE_WIDTH, Lanes, RegisterId, Result, splat};

use crate::constants::read_constant;
use crate::decoder::BytecodeReader;
use crate::register::{RegisterFile, RegisterLayout, RegisterSlot};

/// A readable operand positioned at one lane group.
pub trait LaneCursor {
    /// Reads the lane group at the current position.
    fn get(&self, regs: &RegisterFile<'_>) -> Result<Lanes>;

    /// Moves to the next lane group.
    fn advance(&mut self);

    /// Reads the current lane group, then advances.
    fn get_and_advance(&mut self, regs: &RegisterFile<'_>) -> Result<Lanes> {
        let lanes = self.get(regs)?;
        self.advance();
        Ok(lanes)
    }
}

/// Cursor over a register operand.
///
/// The unused sentinel reads the default given at construction, never touches
/// register storage, and never advances.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterCursor {
    slot: Option<RegisterSlot>,
    default: Lanes,
    group: usize,
}

impl RegisterCursor {
    /// Creates a cursor at lane group zero.
    #[must_use]
    pub fn new(slot: Option<RegisterSlot>, default: Lanes) -> Self {
        Self {
            slot,
            default,
            group: 0,
        }
    }

    /// Returns true for the unused sentinel.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.slot.is_none()
    }

    /// Returns how many lanes the cursor has advanced over.
    #[must_use]
    pub fn position(&self) -> usize {
        self.group * LANE_WIDTH
    }
}

impl LaneCursor for RegisterCursor {
    fn get(&self, regs: &RegisterFile<'_>) -> Result<Lanes> {
        match self.slot {
            Some(slot) => regs.read(slot, self.group),
            None => Ok(self.default),
        }
    }

    fn advance(&mut self) {
        if self.slot.is_some() {
            self.group += 1;
        }
    }
}

/// Cursor over a constant, broadcast to every lane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConstantCursor {
    bits: u32,
}

impl ConstantCursor {
    /// Creates a cursor broadcasting `bits`.
    #[must_use]
    pub fn new(bits: u32) -> Self {
        Self { bits }
    }
}

impl LaneCursor for ConstantCursor {
    fn get(&self, _regs: &RegisterFile<'_>) -> Result<Lanes> {
        Ok(splat(self.bits))
    }

    fn advance(&mut self) {}
}

/// A decoded source operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Register, possibly the unused sentinel.
    Register(RegisterCursor),
    /// Constant-table value.
    Constant(ConstantCursor),
}

impl Operand {
    /// Decodes one source operand.
    ///
    /// `constant` selects between a constant-table byte offset and a register
    /// index. Unused registers read `default`.
    pub fn decode(
        reader: &mut BytecodeReader<'_>,
        layout: &RegisterLayout,
        constants: &[u8],
        constant: bool,
        default: Lanes,
    ) -> Result<Self> {
        let raw = reader.decode_u16()?;
        if constant {
            Ok(Self::Constant(ConstantCursor::new(read_constant(constants, raw)?)))
        } else {
            let slot = layout.resolve_source(RegisterId(raw))?;
            Ok(Self::Register(RegisterCursor::new(slot, default)))
        }
    }
}

impl LaneCursor for Operand {
    fn get(&self, regs: &RegisterFile<'_>) -> Result<Lanes> {
        match self {
            Self::Register(c) => c.get(regs),
            Self::Constant(c) => c.get(regs),
        }
    }

    fn advance(&mut self) {
        match self {
            Self::Register(c) => c.advance(),
            Self::Constant(c) => c.advance(),
        }
    }
}

/// Cursor over a destination register.
///
/// Writes through the unused sentinel go to the register file's scratch sink.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DestCursor {
    slot: Option<RegisterSlot>,
    group: usize,
}

impl DestCursor {
    /// Creates a cursor at lane group zero.
    #[must_use]
    pub fn new(slot: Option<RegisterSlot>) -> Self {
        Self { slot, group: 0 }
    }

    /// Decodes a destination register operand.
    pub fn decode(reader: &mut BytecodeReader<'_>, layout: &RegisterLayout) -> Result<Self> {
        let reg = reader.decode_register()?;
        Ok(Self::new(layout.resolve_dest(reg)?))
    }

    /// Returns the slot written to, or `None` for the unused sentinel.
    #[must_use]
    pub fn get_dest(&self) -> Option<RegisterSlot> {
        self.slot
    }

    /// Writes the lane group at the current position.
    pub fn store(&self, regs: &mut RegisterFile<'_>, lanes: Lanes) -> Result<()> {
        match self.slot {
            Some(slot) => regs.write(slot, self.group, lanes),
            None => {
                regs.discard(lanes);
                Ok(())
            }
        }
    }

    /// Moves to the next lane group.
    pub fn advance(&mut self) {
        if self.slot.is_some() {
            self.group += 1;
        }
    }

    /// Writes the lane group at the current position, then advances.
    pub fn store_and_advance(&mut self, regs: &mut RegisterFile<'_>, lanes: Lanes) -> Result<()> {
        self.store(regs, lanes)?;
        self.advance();
        Ok(())
    }

    /// Returns how many lanes the cursor has advanced over.
    #[must_use]
    pub fn position(&self) -> usize {
        self.group * LANE_WIDTH
    }
}
