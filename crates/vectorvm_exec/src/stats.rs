//! Execution statistics.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Accumulated time spent inside one stat scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScopeTiming {
    /// Scope identifier from the bytecode.
    pub scope: u16,
    /// Number of times the scope was entered.
    pub count: u64,
    /// Total time between enter and exit.
    pub elapsed: Duration,
}

/// Counters gathered by one `exec` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExecStats {
    /// Instances executed.
    pub instances: usize,
    /// Sub-chunks the instances were split into.
    pub chunks: usize,
    /// Instructions dispatched, summed over sub-chunks.
    pub instructions: u64,
    /// Stat scope timings, ordered by first use.
    pub scopes: Vec<ScopeTiming>,
}

impl ExecStats {
    /// Creates empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one completed visit to a scope.
    pub fn record_scope(&mut self, scope: u16, elapsed: Duration) {
        self.record_scope_visits(scope, 1, elapsed);
    }

    fn record_scope_visits(&mut self, scope: u16, count: u64, elapsed: Duration) {
        if let Some(timing) = self.scopes.iter_mut().find(|t| t.scope == scope) {
            timing.count += count;
            timing.elapsed += elapsed;
        } else {
            self.scopes.push(ScopeTiming {
                scope,
                count,
                elapsed,
            });
        }
    }

    /// Folds another set of stats into this one.
    pub fn merge(&mut self, other: &ExecStats) {
        self.instances += other.instances;
        self.chunks += other.chunks;
        self.instructions += other.instructions;
        for timing in &other.scopes {
            self.record_scope_visits(timing.scope, timing.count, timing.elapsed);
        }
    }

    /// Returns the timing of one scope.
    #[must_use]
    pub fn scope(&self, scope: u16) -> Option<&ScopeTiming> {
        self.scopes.iter().find(|t| t.scope == scope)
    }
}
