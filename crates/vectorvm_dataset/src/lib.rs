//! Instance datasets, append cursors, and stable ID tables for VectorVM.
//!
//! This crate provides:
//! - [`IdTable`] - Stable instance IDs with a LIFO free stack and acquire tags
//! - [`DataSetMeta`] - What the VM sees of a dataset: register offsets, the
//!   atomic append cursor, and the locked ID table
//! - [`DataSetLayout`] - Named, typed attribute columns
//! - [`DataSet`] - Double-buffered columnar storage

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dataset;
pub mod id_table;
pub mod layout;
pub mod meta;

pub use dataset::DataSet;
pub use id_table::IdTable;
pub use layout::{DataSetLayout, Variable};
pub use meta::DataSetMeta;
