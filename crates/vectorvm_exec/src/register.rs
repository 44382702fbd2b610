//! Register address space and the per-chunk register file.
//!
//! Register operands are 16-bit indices into one flat address space split
//! into three disjoint ranges:
//!
//! | Range | Storage |
//! |-------|---------|
//! | `[0, T)` | temporaries, one lane buffer per register owned by the executing thread |
//! | `[T, T + I)` | input columns, read at the instance position |
//! | `[T + I, T + I + O)` | output columns, written at the instance position |
//!
//! Constants are not registers; computational ops address them through the
//! operand-type byte. `0xFFFF` is the unused sentinel and never resolves.

#![allow(clippy::cast_possible_truncation)]

use std::sync::atomic::{AtomicU32, Ordering};

use vectorvm_foundation::{Error, ErrorKind, LANE_WIDTH, Lanes, RegisterId, Result};

/// Sizes of the three register ranges.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterLayout {
    /// Number of temporary registers.
    pub num_temps: usize,
    /// Number of input column registers.
    pub num_inputs: usize,
    /// Number of output column registers.
    pub num_outputs: usize,
}

/// Where a register operand lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterSlot {
    /// Temporary register index.
    Temp(usize),
    /// Input column index.
    Input(usize),
    /// Output column index.
    Output(usize),
}

impl RegisterLayout {
    /// Creates a layout.
    #[must_use]
    pub fn new(num_temps: usize, num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_temps,
            num_inputs,
            num_outputs,
        }
    }

    /// Returns the number of addressable registers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.num_temps + self.num_inputs + self.num_outputs
    }

    /// Returns the operand addressing temporary `index`.
    pub fn temp_register(&self, index: usize) -> Result<RegisterId> {
        if index >= self.num_temps {
            return Err(out_of_range(index, self.num_temps));
        }
        self.register_id(index)
    }

    /// Returns the operand addressing input column `index`.
    pub fn input_register(&self, index: usize) -> Result<RegisterId> {
        if index >= self.num_inputs {
            return Err(out_of_range(index, self.num_inputs));
        }
        self.register_id(self.num_temps.saturating_add(index))
    }

    /// Returns the operand addressing output column `index`.
    pub fn output_register(&self, index: usize) -> Result<RegisterId> {
        if index >= self.num_outputs {
            return Err(out_of_range(index, self.num_outputs));
        }
        self.register_id(
            self.num_temps
                .saturating_add(self.num_inputs)
                .saturating_add(index),
        )
    }

    /// Encodes an absolute register index; indices that collide with the
    /// unused sentinel or do not fit in 16 bits are rejected.
    fn register_id(&self, index: usize) -> Result<RegisterId> {
        match u16::try_from(index) {
            Ok(raw) if raw != RegisterId::UNUSED.0 => Ok(RegisterId(raw)),
            _ => Err(out_of_range(index, self.total())),
        }
    }

    /// Maps a register index to its range.
    pub fn resolve(&self, reg: RegisterId) -> Result<RegisterSlot> {
        let index = reg.index();
        if reg.is_unused() || index >= self.total() {
            return Err(Error::register_out_of_bounds(reg.0, self.total()));
        }
        Ok(if index < self.num_temps {
            RegisterSlot::Temp(index)
        } else if index < self.num_temps + self.num_inputs {
            RegisterSlot::Input(index - self.num_temps)
        } else {
            RegisterSlot::Output(index - self.num_temps - self.num_inputs)
        })
    }

    /// Resolves a source operand; the unused sentinel resolves to `None`.
    pub fn resolve_source(&self, reg: RegisterId) -> Result<Option<RegisterSlot>> {
        if reg.is_unused() {
            return Ok(None);
        }
        self.resolve(reg).map(Some)
    }

    /// Resolves a destination operand; the unused sentinel resolves to `None`.
    ///
    /// Input registers are read-only.
    pub fn resolve_dest(&self, reg: RegisterId) -> Result<Option<RegisterSlot>> {
        match self.resolve_source(reg)? {
            Some(RegisterSlot::Input(_)) => Err(Error::new(ErrorKind::InvalidDestination(reg.0))),
            slot => Ok(slot),
        }
    }
}

fn out_of_range(index: usize, limit: usize) -> Error {
    Error::register_out_of_bounds(u16::try_from(index).unwrap_or(u16::MAX), limit)
}

/// Register storage for one chunk of instances.
///
/// Temporaries hold `stride` lanes each; input and output registers are
/// borrowed attribute columns addressed at `base + lane`. Only the first `len`
/// lanes of a chunk are live: reads past them yield zero and writes past them
/// are dropped for columns.
#[derive(Debug)]
pub struct RegisterFile<'a> {
    temps: Vec<u32>,
    num_temps: usize,
    stride: usize,
    inputs: &'a [&'a [u32]],
    outputs: &'a [&'a [AtomicU32]],
    base: usize,
    len: usize,
    /// Sink for writes to the unused destination.
    scratch: Lanes,
}

impl<'a> RegisterFile<'a> {
    /// Creates a register file for chunks of up to `stride` instances.
    ///
    /// `stride` is rounded up to a whole number of lane groups.
    #[must_use]
    pub fn new(
        num_temps: usize,
        stride: usize,
        inputs: &'a [&'a [u32]],
        outputs: &'a [&'a [AtomicU32]],
    ) -> Self {
        let stride = stride.div_ceil(LANE_WIDTH).max(1) * LANE_WIDTH;
        Self {
            temps: vec![0; num_temps * stride],
            num_temps,
            stride,
            inputs,
            outputs,
            base: 0,
            len: 0,
            scratch: [0; LANE_WIDTH],
        }
    }

    /// Returns the register layout with this file's temporaries and columns.
    #[must_use]
    pub fn layout(&self) -> RegisterLayout {
        RegisterLayout::new(self.num_temps, self.inputs.len(), self.outputs.len())
    }

    /// Returns the maximum chunk length.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Points the column registers at a new chunk.
    pub fn bind_chunk(&mut self, base: usize, len: usize) -> Result<()> {
        if len > self.stride {
            return Err(Error::internal(format!(
                "chunk of {len} instances exceeds register stride {}",
                self.stride
            )));
        }
        self.base = base;
        self.len = len;
        Ok(())
    }

    /// Returns the absolute instance index of lane zero.
    #[must_use]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Returns the number of live instances in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the chunk has no live instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of lane groups covering the chunk.
    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.len.div_ceil(LANE_WIDTH)
    }

    /// Returns how many lanes of `group` hold live instances.
    #[must_use]
    pub fn active_lanes(&self, group: usize) -> usize {
        self.len.saturating_sub(group * LANE_WIDTH).min(LANE_WIDTH)
    }

    /// Reads one lane group.
    pub fn read(&self, slot: RegisterSlot, group: usize) -> Result<Lanes> {
        match slot {
            RegisterSlot::Temp(r) => {
                let start = r * self.stride + group * LANE_WIDTH;
                self.temps
                    .get(start..start + LANE_WIDTH)
                    .and_then(|lanes| lanes.try_into().ok())
                    .ok_or_else(|| self.temp_out_of_bounds(r))
            }
            RegisterSlot::Input(i) => {
                let column = self
                    .inputs
                    .get(i)
                    .ok_or_else(|| self.column_out_of_bounds(self.num_temps + i))?;
                let mut lanes = [0; LANE_WIDTH];
                for (lane, out) in lanes.iter_mut().enumerate().take(self.active_lanes(group)) {
                    let index = self.base + group * LANE_WIDTH + lane;
                    *out = *column
                        .get(index)
                        .ok_or_else(|| Error::instance_out_of_bounds(index, column.len()))?;
                }
                Ok(lanes)
            }
            RegisterSlot::Output(o) => {
                let column = self.outputs.get(o).ok_or_else(|| {
                    self.column_out_of_bounds(self.num_temps + self.inputs.len() + o)
                })?;
                let mut lanes = [0; LANE_WIDTH];
                for (lane, out) in lanes.iter_mut().enumerate().take(self.active_lanes(group)) {
                    let index = self.base + group * LANE_WIDTH + lane;
                    *out = column
                        .get(index)
                        .ok_or_else(|| Error::instance_out_of_bounds(index, column.len()))?
                        .load(Ordering::Relaxed);
                }
                Ok(lanes)
            }
        }
    }

    /// Writes one lane group.
    pub fn write(&mut self, slot: RegisterSlot, group: usize, lanes: Lanes) -> Result<()> {
        match slot {
            RegisterSlot::Temp(r) => {
                let start = r * self.stride + group * LANE_WIDTH;
                if r >= self.num_temps || start + LANE_WIDTH > self.temps.len() {
                    return Err(self.temp_out_of_bounds(r));
                }
                self.temps[start..start + LANE_WIDTH].copy_from_slice(&lanes);
                Ok(())
            }
            RegisterSlot::Input(i) => Err(Error::new(ErrorKind::InvalidDestination(
                (self.num_temps + i) as u16,
            ))),
            RegisterSlot::Output(o) => {
                let column = self.outputs.get(o).ok_or_else(|| {
                    self.column_out_of_bounds(self.num_temps + self.inputs.len() + o)
                })?;
                for (lane, bits) in lanes.iter().enumerate().take(self.active_lanes(group)) {
                    let index = self.base + group * LANE_WIDTH + lane;
                    column
                        .get(index)
                        .ok_or_else(|| Error::instance_out_of_bounds(index, column.len()))?
                        .store(*bits, Ordering::Relaxed);
                }
                Ok(())
            }
        }
    }

    /// Sends a lane group to the scratch sink.
    pub fn discard(&mut self, lanes: Lanes) {
        self.scratch = lanes;
    }

    /// Returns the last lane group written to the unused destination.
    #[must_use]
    pub fn scratch(&self) -> Lanes {
        self.scratch
    }

    /// Returns the live lanes of a temporary register.
    #[must_use]
    pub fn temp(&self, r: usize) -> Option<&[u32]> {
        let start = r.checked_mul(self.stride)?;
        self.temps.get(start..start + self.len)
    }

    fn temp_out_of_bounds(&self, r: usize) -> Error {
        Error::register_out_of_bounds(r as u16, self.num_temps)
    }

    fn column_out_of_bounds(&self, r: usize) -> Error {
        Error::register_out_of_bounds(r as u16, self.layout().total())
    }
}
