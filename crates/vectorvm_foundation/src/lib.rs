//! Core types, lane values, identifiers, and errors for VectorVM.
//!
//! This crate provides:
//! - [`Lanes`] - One SIMD lane-width group of raw 32-bit scalars
//! - [`RegisterId`] - Bytecode register operand with an "unused" sentinel
//! - [`InstanceId`] - Stable per-instance identifier with an acquire tag
//! - [`ScalarType`] - How a 32-bit attribute column is interpreted
//! - [`Error`] - Rich error types with execution context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod lanes;

pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use ids::{INDEX_NONE, InstanceId, RegisterId};
pub use lanes::{
    FALSE_BITS, LANE_WIDTH, Lanes, ScalarType, TRUE_BITS, bits_to_bool, bool_to_bits,
    canonical_bool, lanes_from_f32, lanes_from_i32, lanes_to_f32, lanes_to_i32, splat,
};
