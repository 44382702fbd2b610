//! Integration tests for Layer 1: Dataset
//!
//! Tests for ID tables, append cursors, and double-buffered storage.

mod buffers;
mod cursor;
mod id_table;
