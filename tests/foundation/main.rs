//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: lanes, register and instance IDs, and errors.

mod ids;
