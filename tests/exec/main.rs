//! Integration tests for Layer 2: Exec
//!
//! Tests for whole programs: kernels through the dispatch loop, static
//! validation, and disassembly.

mod disassembly;
mod programs;
mod validation;
