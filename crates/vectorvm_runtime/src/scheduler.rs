//! Chunked execution of one population across the rayon pool.
//!
//! A population is cut into contiguous chunks of `chunk_size` instances. Each
//! chunk is one [`exec`] call with its own register file and random stream, so
//! chunks share nothing but the output columns and dataset metadata, both of
//! which are written atomically. The cancel token and the failure flag are
//! checked before a chunk starts; a chunk that has started always runs to
//! completion or to its first error.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, error};
use vectorvm_exec::{ExecArgs, ExecStats, VmConfig, exec};
use vectorvm_foundation::{Error, LANE_WIDTH, Result};

use crate::config::SchedulerConfig;

// =============================================================================
// Cancellation
// =============================================================================

/// Shared flag that stops chunks from being started.
///
/// Clones observe the same flag. Chunks already running are not interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that no further chunks start.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clears a previous cancellation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// =============================================================================
// Reports
// =============================================================================

/// A chunk that stopped on an error.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Scheduler chunk index.
    pub chunk: usize,
    /// Instances the chunk covered.
    pub range: Range<usize>,
    /// The error, with `context.chunk` set to the scheduler chunk index.
    pub error: Error,
}

/// Outcome of one scheduled run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Counters merged over every completed chunk, in chunk order.
    pub stats: ExecStats,
    /// Number of chunks the population was cut into.
    pub chunks: usize,
    /// Chunks that ran to `done`.
    pub completed: usize,
    /// Chunks never started because of cancellation or an earlier failure.
    pub skipped: usize,
    /// Failed chunks, in chunk order.
    pub failures: Vec<ChunkFailure>,
}

impl RunReport {
    /// Returns true if every chunk completed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    /// Returns the failure with the lowest chunk index.
    #[must_use]
    pub fn first_failure(&self) -> Option<&ChunkFailure> {
        self.failures.first()
    }

    /// Converts the report into the merged stats or the first failure.
    ///
    /// Chunks skipped by an external cancellation are not errors.
    pub fn into_result(mut self) -> Result<ExecStats> {
        if self.failures.is_empty() {
            Ok(self.stats)
        } else {
            Err(self.failures.swap_remove(0).error)
        }
    }
}

enum ChunkOutcome {
    Completed(ExecStats),
    Failed(ChunkFailure),
    Skipped,
}

// =============================================================================
// Scheduler
// =============================================================================

/// Runs `exec` over a population in chunks.
#[derive(Clone, Debug, Default)]
pub struct ChunkScheduler {
    config: SchedulerConfig,
    vm: VmConfig,
    cancel: CancelToken,
}

impl ChunkScheduler {
    /// Creates a scheduler with its own cancel token.
    #[must_use]
    pub fn new(config: SchedulerConfig, vm: VmConfig) -> Self {
        Self {
            config,
            vm,
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the cancel token with a shared one.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancel token.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns the scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns the configuration passed to every `exec` call.
    #[must_use]
    pub fn vm_config(&self) -> &VmConfig {
        &self.vm
    }

    /// Cuts `[start, start + count)` into lane-aligned chunks.
    #[must_use]
    pub fn chunk_ranges(&self, start: usize, count: usize) -> Vec<Range<usize>> {
        let size = self.config.chunk_size.max(1).div_ceil(LANE_WIDTH) * LANE_WIDTH;
        (0..count)
            .step_by(size)
            .map(|offset| start + offset..start + count.min(offset + size))
            .collect()
    }

    /// Runs `args.code` over `args.num_instances` instances starting at
    /// `args.start_instance`.
    ///
    /// Returns an error only for an unusable configuration. Chunk failures are
    /// collected in the report.
    pub fn run(&self, args: &ExecArgs<'_>) -> Result<RunReport> {
        self.config.validate()?;
        self.vm.validate()?;

        let ranges = self.chunk_ranges(args.start_instance, args.num_instances);
        let parallel = self.config.runs_parallel(args.num_instances);
        debug!(
            start = args.start_instance,
            instances = args.num_instances,
            chunks = ranges.len(),
            parallel,
            "schedule start"
        );

        let failed = AtomicBool::new(false);
        let run_chunk = |(index, range): (usize, &Range<usize>)| -> ChunkOutcome {
            if self.cancel.is_cancelled()
                || (self.config.stop_on_error && failed.load(Ordering::Acquire))
            {
                return ChunkOutcome::Skipped;
            }
            let chunk_args = args.with_instances(range.start, range.len());
            match exec(&chunk_args, &self.vm) {
                Ok(stats) => ChunkOutcome::Completed(stats),
                Err(err) => {
                    failed.store(true, Ordering::Release);
                    error!(chunk = index, start = range.start, error = %err, "chunk failed");
                    ChunkOutcome::Failed(ChunkFailure {
                        chunk: index,
                        range: range.clone(),
                        error: err.in_chunk(index),
                    })
                }
            }
        };

        let outcomes: Vec<ChunkOutcome> = if parallel {
            ranges.par_iter().enumerate().map(&run_chunk).collect()
        } else {
            ranges.iter().enumerate().map(&run_chunk).collect()
        };

        let mut report = RunReport {
            chunks: ranges.len(),
            ..RunReport::default()
        };
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Completed(stats) => {
                    report.stats.merge(&stats);
                    report.completed += 1;
                }
                ChunkOutcome::Failed(failure) => report.failures.push(failure),
                ChunkOutcome::Skipped => report.skipped += 1,
            }
        }

        debug!(
            completed = report.completed,
            failed = report.failures.len(),
            skipped = report.skipped,
            instructions = report.stats.instructions,
            "schedule finish"
        );
        Ok(report)
    }
}
