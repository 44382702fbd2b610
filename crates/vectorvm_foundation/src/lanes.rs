//! Lane-width scalar groups and the boolean bit convention.
//!
//! Every register access in the VM moves [`LANE_WIDTH`] raw 32-bit scalars at a
//! time. A value carries no type of its own: each opcode reinterprets the bits
//! as `f32`, `i32`, or a boolean mask.
//!
//! Booleans are all-ones ([`TRUE_BITS`]) or all-zero ([`FALSE_BITS`]). Any other
//! bit pattern is not a valid boolean and reads as `false`.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of scalars processed together per register operation.
pub const LANE_WIDTH: usize = 4;

/// Bit pattern of a `true` boolean lane.
pub const TRUE_BITS: u32 = 0xFFFF_FFFF;

/// Bit pattern of a `false` boolean lane.
pub const FALSE_BITS: u32 = 0x0000_0000;

/// One lane-width group of raw scalars.
pub type Lanes = [u32; LANE_WIDTH];

/// Returns true only for the canonical `true` pattern.
#[must_use]
pub const fn bits_to_bool(bits: u32) -> bool {
    bits == TRUE_BITS
}

/// Encodes a boolean as a lane mask.
#[must_use]
pub const fn bool_to_bits(value: bool) -> u32 {
    if value { TRUE_BITS } else { FALSE_BITS }
}

/// Maps any bit pattern onto one of the two valid boolean patterns.
#[must_use]
pub const fn canonical_bool(bits: u32) -> u32 {
    bool_to_bits(bits_to_bool(bits))
}

/// Broadcasts one scalar to every lane.
#[must_use]
pub const fn splat(bits: u32) -> Lanes {
    [bits; LANE_WIDTH]
}

/// Reinterprets lanes as floats.
#[must_use]
pub fn lanes_to_f32(lanes: Lanes) -> [f32; LANE_WIDTH] {
    lanes.map(f32::from_bits)
}

/// Packs floats into lanes.
#[must_use]
pub fn lanes_from_f32(values: [f32; LANE_WIDTH]) -> Lanes {
    values.map(f32::to_bits)
}

/// Reinterprets lanes as signed integers.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn lanes_to_i32(lanes: Lanes) -> [i32; LANE_WIDTH] {
    lanes.map(|bits| bits as i32)
}

/// Packs signed integers into lanes.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn lanes_from_i32(values: [i32; LANE_WIDTH]) -> Lanes {
    values.map(|v| v as u32)
}

/// How a 32-bit attribute column is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarType {
    /// IEEE-754 single precision float.
    Float,
    /// Two's complement 32-bit integer.
    Int,
    /// Boolean mask (all-ones or all-zero).
    Bool,
}

impl ScalarType {
    /// Renders raw bits according to this type.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn format_bits(self, bits: u32) -> String {
        match self {
            Self::Float => format!("{}", f32::from_bits(bits)),
            Self::Int => format!("{}", bits as i32),
            Self::Bool => format!("{}", bits_to_bool(bits)),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
        }
    }
}
