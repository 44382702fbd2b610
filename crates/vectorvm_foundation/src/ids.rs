//! Register operands and stable instance identifiers.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sentinel for "no slot": a dead lane, a free ID, or an unplaced instance.
pub const INDEX_NONE: i32 = -1;

/// A 16-bit register operand decoded from bytecode.
///
/// The all-ones value marks an unused operand. Reads through an unused
/// register yield a caller-supplied default and writes are discarded.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterId(pub u16);

impl RegisterId {
    /// The unused-operand sentinel.
    pub const UNUSED: Self = Self(u16::MAX);

    /// Returns true if this is the unused-operand sentinel.
    #[must_use]
    pub const fn is_unused(self) -> bool {
        self.0 == u16::MAX
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unused() {
            write!(f, "RegisterId(unused)")
        } else {
            write!(f, "RegisterId({})", self.0)
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unused() {
            write!(f, "r_")
        } else {
            write!(f, "r{}", self.0)
        }
    }
}

/// Stable identifier of one simulated instance.
///
/// `index` is the slot in the dataset's ID table and stays the same while the
/// instance lives, even as its data moves between buffer positions. `tag` is
/// the acquire tag stamped when the ID was handed out; it changes when the
/// table is rebuilt, which exposes references kept across a rebuild.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstanceId {
    /// Slot in the ID table.
    pub index: i32,
    /// Acquire tag at the time the ID was handed out.
    pub tag: i32,
}

impl InstanceId {
    /// Creates a new instance ID.
    #[must_use]
    pub const fn new(index: i32, tag: i32) -> Self {
        Self { index, tag }
    }

    /// Returns the "no instance" sentinel.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            index: INDEX_NONE,
            tag: 0,
        }
    }

    /// Returns true if this is the sentinel value.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.index == INDEX_NONE
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "InstanceId(none)")
        } else {
            write!(f, "InstanceId({}t{})", self.index, self.tag)
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Instance(none)")
        } else {
            write!(f, "Instance({})", self.index)
        }
    }
}
