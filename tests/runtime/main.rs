//! Integration tests for Layer 3: Runtime
//!
//! Tests for chunk scheduling and the simulation driver.

mod scheduler;
mod simulation;
