//! Attribute layouts for datasets.
//!
//! A layout names the 32-bit columns of a dataset and how each is interpreted.
//! Column order is register order: variable `i` lives in the `i`-th input and
//! output register of the dataset.

use vectorvm_foundation::{Error, ErrorKind, Result, ScalarType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One 32-bit attribute column.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variable {
    /// Column name (e.g., `position.x`, `age`).
    pub name: String,
    /// How the column's bits are interpreted.
    pub ty: ScalarType,
}

impl Variable {
    /// Creates a float column.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ScalarType::Float,
        }
    }

    /// Creates an integer column.
    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ScalarType::Int,
        }
    }

    /// Creates a boolean column.
    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ScalarType::Bool,
        }
    }
}

/// Ordered list of columns of one dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataSetLayout {
    /// Columns in register order.
    pub variables: Vec<Variable>,
}

impl DataSetLayout {
    /// Creates an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns true if there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Returns the column index of a variable by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    /// Returns a column by index.
    #[must_use]
    pub fn variable(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    /// Returns the column count as a register count.
    ///
    /// Fails if the layout has more columns than a register operand can address,
    /// or repeats a name.
    pub fn register_count(&self) -> Result<u16> {
        for (i, v) in self.variables.iter().enumerate() {
            if self.variables[..i].iter().any(|w| w.name == v.name) {
                return Err(Error::new(ErrorKind::InvalidConfig(format!(
                    "duplicate variable '{}'",
                    v.name
                ))));
            }
        }
        u16::try_from(self.variables.len())
            .ok()
            .filter(|n| *n < u16::MAX)
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidConfig(format!(
                    "{} variables exceed the register space",
                    self.variables.len()
                )))
            })
    }
}
