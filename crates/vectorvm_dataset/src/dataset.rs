//! Double-buffered columnar instance storage.
//!
//! A `DataSet` keeps two copies of every column. The previous buffer holds the
//! instances the VM reads as inputs; the current buffer receives the outputs of
//! a run, one atomic word per slot so chunks can write concurrently through a
//! shared reference. [`DataSet::tick`] promotes the written outputs to inputs.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;
use vectorvm_foundation::{Error, InstanceId, Result};

use crate::layout::DataSetLayout;
use crate::meta::DataSetMeta;

/// Named columnar buffer set with its metadata.
#[derive(Debug)]
pub struct DataSet {
    name: String,
    layout: DataSetLayout,
    meta: DataSetMeta,
    /// Input columns, `num_instances` long.
    prev: Vec<Vec<u32>>,
    /// Output columns, `capacity` long.
    curr: Vec<Vec<AtomicU32>>,
    num_instances: usize,
}

impl DataSet {
    /// Creates an empty dataset with no capacity.
    pub fn new(name: impl Into<String>, layout: DataSetLayout) -> Result<Self> {
        let num_variables = layout.register_count()?;
        let columns = usize::from(num_variables);
        Ok(Self {
            name: name.into(),
            layout,
            meta: DataSetMeta::new(num_variables, 0),
            prev: vec![Vec::new(); columns],
            curr: (0..columns).map(|_| Vec::new()).collect(),
            num_instances: 0,
        })
    }

    /// Returns the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column layout.
    #[must_use]
    pub fn layout(&self) -> &DataSetLayout {
        &self.layout
    }

    /// Returns the VM-facing metadata.
    #[must_use]
    pub fn meta(&self) -> &DataSetMeta {
        &self.meta
    }

    /// Returns the VM-facing metadata mutably.
    pub fn meta_mut(&mut self) -> &mut DataSetMeta {
        &mut self.meta
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.prev.len()
    }

    /// Returns the number of readable input instances.
    #[must_use]
    pub fn num_instances(&self) -> usize {
        self.num_instances
    }

    /// Returns the number of output slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.meta.capacity()
    }

    /// Sizes the output buffer, zeroing it and rewinding the append cursor.
    pub fn allocate(&mut self, capacity: usize) {
        for column in &mut self.curr {
            column.clear();
            column.resize_with(capacity, || AtomicU32::new(0));
        }
        self.meta.set_capacity(capacity);
        debug!(dataset = %self.name, capacity, "allocated output buffer");
    }

    /// Resizes the input buffer, zero-filling new instances.
    pub fn set_num_instances(&mut self, count: usize) {
        for column in &mut self.prev {
            column.resize(count, 0);
        }
        self.num_instances = count;
    }

    /// Promotes the appended outputs to inputs and clears the output buffer.
    ///
    /// Returns the new instance count.
    pub fn tick(&mut self) -> usize {
        let written = self.curr.first().map_or(self.meta.capacity(), Vec::len);
        let count = self.meta.append_count().min(written);
        for (prev, curr) in self.prev.iter_mut().zip(&mut self.curr) {
            prev.clear();
            prev.extend(curr[..count].iter_mut().map(|slot| *slot.get_mut()));
            for slot in curr.iter_mut() {
                *slot.get_mut() = 0;
            }
        }
        self.num_instances = count;
        self.meta.reset_cursor();
        debug!(dataset = %self.name, instances = count, "promoted outputs");
        count
    }

    /// Reads one input scalar.
    pub fn read(&self, column: usize, instance: usize) -> Result<u32> {
        let col = self.input_column(column)?;
        col.get(instance)
            .copied()
            .ok_or_else(|| Error::instance_out_of_bounds(instance, col.len()))
    }

    /// Writes one input scalar.
    pub fn write(&mut self, column: usize, instance: usize, bits: u32) -> Result<()> {
        let columns = self.prev.len();
        let col = self
            .prev
            .get_mut(column)
            .ok_or_else(|| Error::instance_out_of_bounds(column, columns))?;
        let length = col.len();
        let slot = col
            .get_mut(instance)
            .ok_or_else(|| Error::instance_out_of_bounds(instance, length))?;
        *slot = bits;
        Ok(())
    }

    /// Reads one input scalar as a float.
    pub fn read_f32(&self, column: usize, instance: usize) -> Result<f32> {
        self.read(column, instance).map(f32::from_bits)
    }

    /// Writes one input scalar as a float.
    pub fn write_f32(&mut self, column: usize, instance: usize, value: f32) -> Result<()> {
        self.write(column, instance, value.to_bits())
    }

    /// Reads one output scalar.
    pub fn read_output(&self, column: usize, instance: usize) -> Result<u32> {
        let col = self.output_column(column)?;
        col.get(instance)
            .map(|slot| slot.load(Ordering::Relaxed))
            .ok_or_else(|| Error::instance_out_of_bounds(instance, col.len()))
    }

    /// Reads one output scalar as a float.
    pub fn read_output_f32(&self, column: usize, instance: usize) -> Result<f32> {
        self.read_output(column, instance).map(f32::from_bits)
    }

    /// Writes one output scalar.
    pub fn write_output(&self, column: usize, instance: usize, bits: u32) -> Result<()> {
        let col = self.output_column(column)?;
        col.get(instance)
            .map(|slot| slot.store(bits, Ordering::Relaxed))
            .ok_or_else(|| Error::instance_out_of_bounds(instance, col.len()))
    }

    /// Returns one input column.
    pub fn input_column(&self, column: usize) -> Result<&[u32]> {
        self.prev
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::instance_out_of_bounds(column, self.prev.len()))
    }

    /// Returns one output column.
    pub fn output_column(&self, column: usize) -> Result<&[AtomicU32]> {
        self.curr
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::instance_out_of_bounds(column, self.curr.len()))
    }

    /// Returns every input column in register order.
    #[must_use]
    pub fn input_columns(&self) -> Vec<&[u32]> {
        self.prev.iter().map(Vec::as_slice).collect()
    }

    /// Returns every output column in register order.
    #[must_use]
    pub fn output_columns(&self) -> Vec<&[AtomicU32]> {
        self.curr.iter().map(Vec::as_slice).collect()
    }

    /// Hands out a stable ID from this dataset's table.
    pub fn acquire_id(&self) -> Result<InstanceId> {
        self.meta.acquire_id()
    }

    /// Returns an ID to this dataset's free stack.
    pub fn free_id(&self, id: i32) -> Result<()> {
        self.meta.free_id(id)
    }

    /// Records the slot of a live ID; `INDEX_NONE` frees it.
    pub fn update_id(&self, id: i32, index: i32) -> Result<()> {
        self.meta.update_id(id, index)
    }

    /// Reserves one output slot.
    pub fn acquire_index(&self, is_valid: bool) -> i32 {
        self.meta.acquire_index(is_valid)
    }

    /// Clears this dataset's IDs and any fault left by ID misuse.
    pub fn reset_ids(&mut self) -> Result<()> {
        self.meta.reset_ids()?;
        debug!(dataset = %self.name, "reset instance IDs");
        Ok(())
    }
}
