//! Dataset access, append, and ID instructions.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use std::sync::atomic::{AtomicU32, Ordering};

use vectorvm_dataset::DataSetMeta;
use vectorvm_foundation::{
    Error, INDEX_NONE, LANE_WIDTH, Lanes, Result, TRUE_BITS, bits_to_bool, lanes_from_i32,
    lanes_to_i32, splat,
};

use crate::context::ExecContext;
use crate::cursor::{LaneCursor, RegisterCursor};
use crate::decoder::BytecodeReader;

impl<'a> ExecContext<'a> {
    /// `inputdata_32bit` and `inputdata_noadvance_32bit`.
    ///
    /// Advancing reads take each lane's own instance past the dataset's read
    /// position; non-advancing reads broadcast the value at the read position.
    pub(super) fn input_data(
        &mut self,
        reader: &mut BytecodeReader<'a>,
        advance: bool,
    ) -> Result<()> {
        let dataset = self.dataset(reader.decode_u16()?)?;
        let variable = reader.decode_u16()?;
        let mut dest = self.dest(reader)?;
        let column = self.input_column(dataset, variable)?;

        for group in 0..self.regs.num_groups() {
            let lanes = if advance {
                let mut lanes = [0; LANE_WIDTH];
                let first = dataset.instance_offset + self.regs.base() + group * LANE_WIDTH;
                let active = self.regs.active_lanes(group);
                for (lane, out) in lanes.iter_mut().enumerate().take(active) {
                    *out = read_column(column, first + lane)?;
                }
                lanes
            } else {
                splat(read_column(column, dataset.instance_offset)?)
            };
            dest.store_and_advance(&mut self.regs, lanes)?;
        }
        Ok(())
    }

    /// `outputdata_32bit`: stores a source into one dataset column at the
    /// slot in the index operand. Negative indices mark lanes that were not
    /// admitted and are skipped.
    pub(super) fn output_data(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let optype = reader.decode_u8()?;
        let dataset = self.dataset(reader.decode_u16()?)?;
        let mut index = self.source(reader, optype & 1 != 0, splat(INDEX_NONE as u32))?;
        let mut value = self.source(reader, optype & 2 != 0, splat(0))?;
        let variable = reader.decode_u16()?;
        let column = self.output_column(dataset, variable)?;

        for group in 0..self.regs.num_groups() {
            let slots = lanes_to_i32(index.get_and_advance(&self.regs)?);
            let bits = value.get_and_advance(&self.regs)?;
            for lane in 0..self.regs.active_lanes(group) {
                let Ok(slot) = usize::try_from(slots[lane]) else {
                    continue;
                };
                column
                    .get(slot)
                    .ok_or_else(|| Error::instance_out_of_bounds(slot, column.len()))?
                    .store(bits[lane], Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// `acquireindex`: reserves consecutive output slots for the lanes whose
    /// valid operand is true, in lane order. Other lanes, and lanes that find
    /// the dataset full, receive `INDEX_NONE`.
    pub(super) fn acquire_index(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let optype = reader.decode_u8()?;
        let dataset = self.dataset(reader.decode_u16()?)?;
        let mut valid = self.source(reader, optype & 1 != 0, splat(TRUE_BITS))?;
        let mut dest = self.dest(reader)?;

        let mut admitted = Vec::with_capacity(self.regs.len());
        for group in 0..self.regs.num_groups() {
            let mask = valid.get_and_advance(&self.regs)?;
            admitted.extend(
                mask.iter()
                    .take(self.regs.active_lanes(group))
                    .map(|&bits| bits_to_bool(bits)),
            );
        }

        let count = admitted.iter().filter(|&&ok| ok).count();
        dataset.ensure_healthy()?;
        let mut slots = dataset.acquire_indices(count);

        let mut lanes = admitted.iter().map(|&ok| {
            if ok {
                slots.next().map_or(INDEX_NONE, |slot| slot as i32)
            } else {
                INDEX_NONE
            }
        });
        for _ in 0..self.regs.num_groups() {
            let group: [i32; LANE_WIDTH] =
                std::array::from_fn(|_| lanes.next().unwrap_or(INDEX_NONE));
            dest.store_and_advance(&mut self.regs, lanes_from_i32(group))?;
        }
        Ok(())
    }

    /// `exec_index`: the absolute instance index of every lane.
    pub(super) fn exec_index(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let mut dest = self.dest(reader)?;
        for group in 0..self.regs.num_groups() {
            let first = self.regs.base() + group * LANE_WIDTH;
            let lanes: Lanes = std::array::from_fn(|lane| (first + lane) as u32);
            dest.store_and_advance(&mut self.regs, lanes)?;
        }
        Ok(())
    }

    /// `acquire_id`: hands out one stable ID per live instance, writing the ID
    /// and its acquire tag to two registers.
    pub(super) fn acquire_id(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let dataset = self.dataset(reader.decode_u16()?)?;
        let mut id_dest = self.dest(reader)?;
        let mut tag_dest = self.dest(reader)?;

        let mut table = dataset.lock_ids()?;
        for group in 0..self.regs.num_groups() {
            let mut ids = [INDEX_NONE; LANE_WIDTH];
            let mut tags = [0; LANE_WIDTH];
            for lane in 0..self.regs.active_lanes(group) {
                let id = table.acquire().map_err(|err| dataset.track_id_error(err))?;
                ids[lane] = id.index;
                tags[lane] = id.tag;
            }
            id_dest.store_and_advance(&mut self.regs, lanes_from_i32(ids))?;
            tag_dest.store_and_advance(&mut self.regs, lanes_from_i32(tags))?;
        }
        Ok(())
    }

    /// `update_id`: records the final slot of each lane's ID. Negative IDs are
    /// skipped; a slot of `INDEX_NONE` frees the ID. Updating a free or unknown
    /// ID faults the dataset.
    pub(super) fn update_id(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let dataset = self.dataset(reader.decode_u16()?)?;
        let mut ids = self.register_source(reader, splat(INDEX_NONE as u32))?;
        let mut slots = self.register_source(reader, splat(INDEX_NONE as u32))?;

        let mut table = dataset.lock_ids()?;
        for group in 0..self.regs.num_groups() {
            let id_lanes = lanes_to_i32(ids.get_and_advance(&self.regs)?);
            let slot_lanes = lanes_to_i32(slots.get_and_advance(&self.regs)?);
            for lane in 0..self.regs.active_lanes(group) {
                if id_lanes[lane] >= 0 {
                    table
                        .update(id_lanes[lane], slot_lanes[lane])
                        .map_err(|err| dataset.track_id_error(err))?;
                }
            }
        }
        Ok(())
    }

    fn register_source(
        &self,
        reader: &mut BytecodeReader<'_>,
        default: Lanes,
    ) -> Result<RegisterCursor> {
        let reg = reader.decode_register()?;
        Ok(RegisterCursor::new(self.layout.resolve_source(reg)?, default))
    }

    fn input_column(&self, dataset: &DataSetMeta, variable: u16) -> Result<&'a [u32]> {
        if variable >= dataset.num_variables {
            return Err(Error::register_out_of_bounds(
                variable,
                usize::from(dataset.num_variables),
            ));
        }
        let index = usize::from(dataset.input_register_offset) + usize::from(variable);
        self.args
            .inputs
            .get(index)
            .copied()
            .ok_or_else(|| Error::register_out_of_bounds(index as u16, self.args.inputs.len()))
    }

    fn output_column(&self, dataset: &DataSetMeta, variable: u16) -> Result<&'a [AtomicU32]> {
        if variable >= dataset.num_variables {
            return Err(Error::register_out_of_bounds(
                variable,
                usize::from(dataset.num_variables),
            ));
        }
        let index = usize::from(dataset.output_register_offset) + usize::from(variable);
        self.args
            .outputs
            .get(index)
            .copied()
            .ok_or_else(|| Error::register_out_of_bounds(index as u16, self.args.outputs.len()))
    }
}

fn read_column(column: &[u32], index: usize) -> Result<u32> {
    column
        .get(index)
        .copied()
        .ok_or_else(|| Error::instance_out_of_bounds(index, column.len()))
}
