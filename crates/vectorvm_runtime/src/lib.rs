//! Scheduling and simulation driving for VectorVM.
//!
//! This crate provides:
//! - [`ChunkScheduler`] - Splits a population into chunks and runs them on the
//!   rayon pool, collecting per-chunk failures in a [`RunReport`]
//! - [`SchedulerConfig`] - Chunk sizing, serial threshold, and failure policy
//! - [`CancelToken`] - Stops a run between chunks
//! - [`Simulation`] / [`Program`] - Owned bytecode and datasets stepped tick by tick

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod scheduler;
pub mod simulation;

pub use config::{MAX_CHUNK, MIN_CHUNK, SchedulerConfig, optimal_chunk_size};
pub use scheduler::{CancelToken, ChunkFailure, ChunkScheduler, RunReport};
pub use simulation::{Program, Simulation};
