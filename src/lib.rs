//! VectorVM - Vectorized register bytecode VM for batched particle simulation
//!
//! This crate re-exports all layers of the VectorVM system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: vectorvm_runtime    - Chunk scheduler, simulation driver
//! Layer 2: vectorvm_exec       - Decoder, register file, kernels, dispatch loop
//! Layer 1: vectorvm_dataset    - Columnar datasets, append cursor, ID tables
//! Layer 0: vectorvm_foundation - Lanes, register and instance IDs, errors
//! ```

pub use vectorvm_dataset as dataset;
pub use vectorvm_exec as exec;
pub use vectorvm_foundation as foundation;
pub use vectorvm_runtime as runtime;
