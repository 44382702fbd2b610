//! The dispatch loop.
//!
//! [`exec`] runs a program over a contiguous range of instances. The range is
//! cut into sub-chunks of [`VmConfig::chunk_instances`] instances; each
//! sub-chunk decodes the whole program once and runs every instruction across
//! all of its lane groups before moving to the next instruction.
//!
//! A failing instruction aborts the call. Output columns and dataset state
//! written by earlier sub-chunks, or by earlier instructions of the failing
//! sub-chunk, are left as they are.

mod calls;
mod data;
pub(crate) mod kernels;


use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};
use vectorvm_foundation::{Error, ErrorContext, ErrorKind, LANE_WIDTH, Lanes, Result, splat};

use crate::config::VmConfig;
use crate::context::{ExecArgs, ExecContext};
use crate::cursor::{ConstantCursor, LaneCursor, Operand};
use crate::decoder::BytecodeReader;
use crate::opcode::Opcode;
use crate::stats::ExecStats;
use crate::validate::{ValidationEnv, validate_bytecode};

use kernels::{convert, integer, math, noise};

/// Runs `args.code` over `args.num_instances` instances.
///
/// Returns counters for the call, or the first error with the sub-chunk,
/// instance, and instruction it happened at.
pub fn exec(args: &ExecArgs<'_>, config: &VmConfig) -> Result<ExecStats> {
    config.validate()?;

    let mut ctx = ExecContext::new(args, config);
    if config.validate_bytecode {
        let env = ValidationEnv::for_args(args, ctx.layout());
        validate_bytecode(args.code, &env)?;
    }

    debug!(
        start = args.start_instance,
        instances = args.num_instances,
        code_bytes = args.code.len(),
        "exec start"
    );

    let chunk = config.chunk_instances();
    for (index, offset) in (0..args.num_instances).step_by(chunk).enumerate() {
        let start = args.start_instance + offset;
        let len = chunk.min(args.num_instances - offset);
        trace!(chunk = index, start, len, "exec chunk");
        ctx.run_chunk(start, len).map_err(|mut err| {
            let context = err
                .context
                .take()
                .unwrap_or_default()
                .with_chunk(index)
                .with_start_instance(start);
            err.with_context(context)
        })?;
        ctx.stats.chunks += 1;
        ctx.stats.instances += len;
    }

    debug!(
        instances = ctx.stats.instances,
        chunks = ctx.stats.chunks,
        instructions = ctx.stats.instructions,
        "exec finished"
    );
    Ok(ctx.into_stats())
}

impl<'a> ExecContext<'a> {
    /// Runs the whole program over one sub-chunk.
    pub(crate) fn run_chunk(&mut self, start: usize, len: usize) -> Result<()> {
        self.regs.bind_chunk(start, len)?;
        self.scopes.clear();

        let mut reader = BytecodeReader::new(self.args.code);
        loop {
            let offset = reader.offset();
            let op = reader
                .decode_op()
                .map_err(|err| err.with_context(ErrorContext::new().with_instruction(offset, None)))?;
            if op == Opcode::Done {
                break;
            }
            self.step(&mut reader, op).map_err(|err| {
                err.with_context(ErrorContext::new().with_instruction(offset, Some(op.mnemonic())))
            })?;
            self.stats.instructions += 1;
        }

        if self.scopes.is_empty() {
            Ok(())
        } else {
            let offset = reader.offset().saturating_sub(1);
            self.scopes.clear();
            Err(Error::new(ErrorKind::UnbalancedStatScope)
                .with_context(ErrorContext::new().with_instruction(offset, Some("done"))))
        }
    }

    fn step(&mut self, reader: &mut BytecodeReader<'a>, op: Opcode) -> Result<()> {
        match op {
            // run_chunk stops before dispatching `done`
            Opcode::Done => Ok(()),

            Opcode::Add => self.binary(reader, math::add),
            Opcode::Sub => self.binary(reader, math::sub),
            Opcode::Mul => self.binary(reader, math::mul),
            Opcode::Div => self.binary(reader, math::div),
            Opcode::Mad => self.ternary(reader, math::mad),
            Opcode::Lerp => self.ternary(reader, math::lerp),
            Opcode::Rcp => self.unary(reader, math::rcp),
            Opcode::Rsq => self.unary(reader, math::rsq),
            Opcode::Sqrt => self.unary(reader, math::sqrt),
            Opcode::Neg => self.unary(reader, math::neg),
            Opcode::Abs => self.unary(reader, math::abs),
            Opcode::Exp => self.unary(reader, math::exp),
            Opcode::Exp2 => self.unary(reader, math::exp2),
            Opcode::Log => self.unary(reader, math::log),
            Opcode::Log2 => self.unary(reader, math::log2),
            Opcode::Sin => self.unary(reader, math::sin),
            Opcode::Cos => self.unary(reader, math::cos),
            Opcode::Tan => self.unary(reader, math::tan),
            Opcode::Asin => self.unary(reader, math::asin),
            Opcode::Acos => self.unary(reader, math::acos),
            Opcode::Atan => self.unary(reader, math::atan),
            Opcode::Atan2 => self.binary(reader, math::atan2),
            Opcode::Ceil => self.unary(reader, math::ceil),
            Opcode::Floor => self.unary(reader, math::floor),
            Opcode::Fmod => self.binary(reader, math::fmod),
            Opcode::Frac => self.unary(reader, math::frac),
            Opcode::Trunc => self.unary(reader, math::trunc),
            Opcode::Clamp => self.ternary(reader, math::clamp),
            Opcode::Min => self.binary(reader, math::min),
            Opcode::Max => self.binary(reader, math::max),
            Opcode::Pow => self.binary(reader, math::pow),
            Opcode::Round => self.unary(reader, math::round),
            Opcode::Sign => self.unary(reader, math::sign),
            Opcode::Step => self.binary(reader, math::step),
            Opcode::Random => self.unary_rng(reader, math::random),
            Opcode::Noise => self.unary(reader, noise::noise1),
            Opcode::Noise2D => self.binary(reader, noise::noise2),
            Opcode::Noise3D => self.ternary(reader, noise::noise3),

            Opcode::CmpLt => self.binary(reader, math::cmplt),
            Opcode::CmpLe => self.binary(reader, math::cmple),
            Opcode::CmpGt => self.binary(reader, math::cmpgt),
            Opcode::CmpGe => self.binary(reader, math::cmpge),
            Opcode::CmpEq => self.binary(reader, math::cmpeq),
            Opcode::CmpNeq => self.binary(reader, math::cmpneq),
            Opcode::Select => self.ternary(reader, math::select),

            Opcode::AddI => self.binary(reader, integer::addi),
            Opcode::SubI => self.binary(reader, integer::subi),
            Opcode::MulI => self.binary(reader, integer::muli),
            Opcode::ClampI => self.ternary(reader, integer::clampi),
            Opcode::MinI => self.binary(reader, integer::mini),
            Opcode::MaxI => self.binary(reader, integer::maxi),
            Opcode::AbsI => self.unary(reader, integer::absi),
            Opcode::NegI => self.unary(reader, integer::negi),
            Opcode::SignI => self.unary(reader, integer::signi),
            Opcode::RandomI => self.unary_rng(reader, integer::randomi),
            Opcode::CmpLtI => self.binary(reader, integer::cmplti),
            Opcode::CmpLeI => self.binary(reader, integer::cmplei),
            Opcode::CmpGtI => self.binary(reader, integer::cmpgti),
            Opcode::CmpGeI => self.binary(reader, integer::cmpgei),
            Opcode::CmpEqI => self.binary(reader, integer::cmpeqi),
            Opcode::CmpNeqI => self.binary(reader, integer::cmpneqi),

            Opcode::BitAnd => self.binary(reader, integer::bit_and),
            Opcode::BitOr => self.binary(reader, integer::bit_or),
            Opcode::BitXor => self.binary(reader, integer::bit_xor),
            Opcode::BitNot => self.unary(reader, integer::bit_not),
            Opcode::BitLShift => self.binary(reader, integer::bit_lshift),
            Opcode::BitRShift => self.binary(reader, integer::bit_rshift),

            Opcode::LogicAnd => self.binary(reader, integer::logic_and),
            Opcode::LogicOr => self.binary(reader, integer::logic_or),
            Opcode::LogicXor => self.binary(reader, integer::logic_xor),
            Opcode::LogicNot => self.unary(reader, integer::logic_not),

            Opcode::F2I => self.unary(reader, convert::f2i),
            Opcode::I2F => self.unary(reader, convert::i2f),
            Opcode::F2B => self.unary(reader, convert::f2b),
            Opcode::B2F => self.unary(reader, convert::b2f),
            Opcode::I2B => self.unary(reader, convert::i2b),
            Opcode::B2I => self.unary(reader, convert::b2i),

            Opcode::InputData32 => self.input_data(reader, true),
            Opcode::InputDataNoAdvance32 => self.input_data(reader, false),
            Opcode::OutputData32 => self.output_data(reader),
            Opcode::AcquireIndex => self.acquire_index(reader),
            Opcode::ExecIndex => self.exec_index(reader),
            Opcode::AcquireId => self.acquire_id(reader),
            Opcode::UpdateId => self.update_id(reader),

            Opcode::ExternalFuncCall => self.external_call(reader),
            Opcode::EnterStatScope => self.enter_stat_scope(reader),
            Opcode::ExitStatScope => self.exit_stat_scope(),
        }
    }

    /// Decodes a computational instruction and applies `kernel` to every lane
    /// group of the chunk.
    fn compute<const N: usize>(
        &mut self,
        reader: &mut BytecodeReader<'a>,
        mut kernel: impl FnMut([Lanes; N], &mut ChaCha8Rng) -> Lanes,
    ) -> Result<()> {
        let optype = reader.decode_u8()?;
        let mut sources = [Operand::Constant(ConstantCursor::new(0)); N];
        for (i, source) in sources.iter_mut().enumerate() {
            *source = self.source(reader, optype & (1 << i) != 0, splat(0))?;
        }
        let mut dest = self.dest(reader)?;

        for _ in 0..self.regs.num_groups() {
            let mut lanes = [[0; LANE_WIDTH]; N];
            for (lane, source) in lanes.iter_mut().zip(sources.iter_mut()) {
                *lane = source.get_and_advance(&self.regs)?;
            }
            let result = kernel(lanes, &mut self.rng);
            dest.store_and_advance(&mut self.regs, result)?;
        }
        Ok(())
    }

    fn unary(&mut self, reader: &mut BytecodeReader<'a>, op: fn(Lanes) -> Lanes) -> Result<()> {
        self.compute(reader, |[a], _| op(a))
    }

    fn unary_rng(
        &mut self,
        reader: &mut BytecodeReader<'a>,
        op: fn(Lanes, &mut ChaCha8Rng) -> Lanes,
    ) -> Result<()> {
        self.compute(reader, |[a], rng| op(a, rng))
    }

    fn binary(
        &mut self,
        reader: &mut BytecodeReader<'a>,
        op: fn(Lanes, Lanes) -> Lanes,
    ) -> Result<()> {
        self.compute(reader, |[a, b], _| op(a, b))
    }

    fn ternary(
        &mut self,
        reader: &mut BytecodeReader<'a>,
        op: fn(Lanes, Lanes, Lanes) -> Lanes,
    ) -> Result<()> {
        self.compute(reader, |[a, b, c], _| op(a, b, c))
    }
}
