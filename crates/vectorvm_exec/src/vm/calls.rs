//! Native function calls and stat scopes.

use std::time::Instant;

use tracing::trace_span;
use vectorvm_foundation::{Error, ErrorKind, LANE_WIDTH, RegisterId, Result, splat};

use crate::constants::read_constant;
use crate::context::{ExecContext, OpenScope};
use crate::cursor::{ConstantCursor, LaneCursor, Operand, RegisterCursor};
use crate::decoder::BytecodeReader;
use crate::external::{CALL_CONSTANT_FLAG, ExternalCall};

impl<'a> ExecContext<'a> {
    /// `external_func_call`: gathers every input operand over the chunk, runs
    /// the bound function once, and scatters its outputs.
    pub(super) fn external_call(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let function = self.args.functions.get(reader.decode_u16()?)?;
        let user_data = if function.needs_user_ptr {
            Some(self.user_ptr(reader.decode_u16()?)?)
        } else {
            None
        };

        let mut operands = Vec::with_capacity(usize::from(function.num_inputs));
        for _ in 0..function.num_inputs {
            operands.push(self.call_operand(reader)?);
        }
        let mut dests = Vec::with_capacity(usize::from(function.num_outputs));
        for _ in 0..function.num_outputs {
            dests.push(self.dest(reader)?);
        }

        let len = self.regs.len();
        let mut inputs = Vec::with_capacity(operands.len());
        for operand in &mut operands {
            let mut column = Vec::with_capacity(self.regs.num_groups() * LANE_WIDTH);
            for _ in 0..self.regs.num_groups() {
                column.extend_from_slice(&operand.get_and_advance(&self.regs)?);
            }
            column.truncate(len);
            inputs.push(column);
        }
        let mut outputs = vec![vec![0; len]; dests.len()];

        let mut call = ExternalCall::new(
            &inputs,
            &mut outputs,
            user_data,
            &mut self.rng,
            self.regs.base(),
            len,
        );
        function.call(&mut call)?;

        for (dest, column) in dests.iter_mut().zip(&outputs) {
            for values in column.chunks(LANE_WIDTH) {
                let mut lanes = [0; LANE_WIDTH];
                lanes[..values.len()].copy_from_slice(values);
                dest.store_and_advance(&mut self.regs, lanes)?;
            }
        }
        Ok(())
    }

    /// `enter_stat_scope`: opens a timing scope and its tracing span.
    pub(super) fn enter_stat_scope(&mut self, reader: &mut BytecodeReader<'a>) -> Result<()> {
        let scope = reader.decode_u16()?;
        self.scopes.push(OpenScope {
            scope,
            started: Instant::now(),
            _span: trace_span!("vm_stat_scope", scope).entered(),
        });
        Ok(())
    }

    /// `exit_stat_scope`: closes the innermost scope and records its time.
    pub(super) fn exit_stat_scope(&mut self) -> Result<()> {
        let open = self
            .scopes
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::UnbalancedStatScope))?;
        self.stats.record_scope(open.scope, open.started.elapsed());
        Ok(())
    }

    fn call_operand(&self, reader: &mut BytecodeReader<'_>) -> Result<Operand> {
        let raw = reader.decode_u16()?;
        if raw != u16::MAX && raw & CALL_CONSTANT_FLAG != 0 {
            let offset = raw & !CALL_CONSTANT_FLAG;
            let bits = read_constant(self.args.constants, offset)?;
            return Ok(Operand::Constant(ConstantCursor::new(bits)));
        }
        let slot = self.layout.resolve_source(RegisterId(raw))?;
        Ok(Operand::Register(RegisterCursor::new(slot, splat(0))))
    }
}
