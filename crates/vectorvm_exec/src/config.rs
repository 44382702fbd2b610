//! Configuration for one `exec` call.

use vectorvm_foundation::{Error, ErrorKind, LANE_WIDTH, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest accepted `instances_per_chunk`.
pub const MAX_INSTANCES_PER_CHUNK: usize = 1 << 20;

/// Configuration for the dispatch loop.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VmConfig {
    /// Number of temporary registers.
    pub num_temp_registers: usize,

    /// Instances decoded and executed per pass over the bytecode.
    pub instances_per_chunk: usize,

    /// Seed of the per-call random stream.
    pub seed: u64,

    /// Run the static validator before executing.
    pub validate_bytecode: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            num_temp_registers: 100,
            instances_per_chunk: 128,
            seed: 0,
            validate_bytecode: false,
        }
    }
}

impl VmConfig {
    /// Creates a configuration that validates bytecode before running it.
    #[must_use]
    pub fn checked() -> Self {
        Self {
            validate_bytecode: true,
            ..Self::default()
        }
    }

    /// Builder method to set the temporary register count.
    #[must_use]
    pub fn with_temp_registers(mut self, count: usize) -> Self {
        self.num_temp_registers = count;
        self
    }

    /// Builder method to set the chunk size.
    #[must_use]
    pub fn with_instances_per_chunk(mut self, count: usize) -> Self {
        self.instances_per_chunk = count;
        self
    }

    /// Builder method to set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to enable or disable static validation.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_bytecode = validate;
        self
    }

    /// Returns the chunk size rounded up to whole lane groups, capped at
    /// [`MAX_INSTANCES_PER_CHUNK`].
    #[must_use]
    pub fn chunk_instances(&self) -> usize {
        self.instances_per_chunk
            .min(MAX_INSTANCES_PER_CHUNK)
            .div_ceil(LANE_WIDTH)
            * LANE_WIDTH
    }

    /// Rejects configurations the VM cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.instances_per_chunk == 0 {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "instances_per_chunk must be positive".to_string(),
            )));
        }
        if self.instances_per_chunk > MAX_INSTANCES_PER_CHUNK {
            return Err(Error::new(ErrorKind::InvalidConfig(format!(
                "instances_per_chunk {} exceeds {MAX_INSTANCES_PER_CHUNK}",
                self.instances_per_chunk
            ))));
        }
        if self.num_temp_registers >= usize::from(u16::MAX) {
            return Err(Error::new(ErrorKind::InvalidConfig(format!(
                "{} temporary registers exceed the register space",
                self.num_temp_registers
            ))));
        }
        Ok(())
    }
}
