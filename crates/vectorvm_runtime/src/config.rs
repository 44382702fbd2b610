//! Scheduler configuration.

use vectorvm_foundation::{Error, ErrorKind, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest chunk picked by [`SchedulerConfig::auto`].
pub const MIN_CHUNK: usize = 64;

/// Largest chunk picked by [`SchedulerConfig::auto`].
pub const MAX_CHUNK: usize = 4096;

/// Chunks per worker thread targeted by [`SchedulerConfig::auto`].
const OVERSUBSCRIPTION: usize = 4;

/// How a population is split across the thread pool.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedulerConfig {
    /// Instances per scheduled chunk.
    pub chunk_size: usize,

    /// Populations at or below this size run on the calling thread.
    pub serial_threshold: usize,

    /// Spread chunks over the rayon pool.
    pub parallel: bool,

    /// Skip chunks that have not started once any chunk fails.
    pub stop_on_error: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            serial_threshold: 1024,
            parallel: true,
            stop_on_error: true,
        }
    }
}

impl SchedulerConfig {
    /// Creates a configuration that runs every chunk on the calling thread.
    #[must_use]
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Sizes chunks so each pool thread gets a few of them.
    #[must_use]
    pub fn auto(population: usize) -> Self {
        Self {
            chunk_size: optimal_chunk_size(population),
            ..Self::default()
        }
    }

    /// Builder method to set the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Builder method to set the serial threshold.
    #[must_use]
    pub fn with_serial_threshold(mut self, threshold: usize) -> Self {
        self.serial_threshold = threshold;
        self
    }

    /// Builder method to enable or disable the thread pool.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder method to keep running chunks after a failure.
    #[must_use]
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Returns true if a population of this size should use the pool.
    #[must_use]
    pub fn runs_parallel(&self, population: usize) -> bool {
        self.parallel && population > self.serial_threshold
    }

    /// Rejects configurations the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "chunk_size must be positive".to_string(),
            )));
        }
        Ok(())
    }
}

/// Picks a chunk size giving each rayon thread about four chunks.
#[must_use]
pub fn optimal_chunk_size(population: usize) -> usize {
    let threads = rayon::current_num_threads().max(1);
    (population / (threads * OVERSUBSCRIPTION)).clamp(MIN_CHUNK, MAX_CHUNK)
}
