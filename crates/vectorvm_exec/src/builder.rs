//! Programmatic bytecode assembly.
//!
//! `BytecodeBuilder` writes byte-exact instruction streams: hosts use it to
//! produce programs without a compiler, and the tests use it everywhere.
//! Methods chain on `&mut self`; an encoding error is remembered and returned
//! by [`BytecodeBuilder::build`].
//!
//! # Example
//!
//! ```
//! use vectorvm_exec::{BytecodeBuilder, ConstantTable, Opcode, Src};
//! use vectorvm_foundation::RegisterId;
//!
//! let mut constants = ConstantTable::new();
//! let two = constants.push_f32(2.0).unwrap();
//! let three = constants.push_f32(3.0).unwrap();
//!
//! let code = BytecodeBuilder::new()
//!     .compute(Opcode::Add, &[Src::Const(two), Src::Const(three)], RegisterId(0))
//!     .done()
//!     .build()
//!     .unwrap();
//! assert_eq!(code[0], Opcode::Add.byte());
//! ```

use vectorvm_foundation::{Error, ErrorKind, RegisterId, Result};

use crate::external::CALL_CONSTANT_FLAG;
use crate::opcode::{Opcode, Shape};

/// A source operand: a register or a constant-table byte offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Src {
    /// Register, possibly [`RegisterId::UNUSED`].
    Reg(RegisterId),
    /// Constant-table byte offset.
    Const(u16),
}

impl Src {
    /// The unused register operand.
    pub const UNUSED: Self = Self::Reg(RegisterId::UNUSED);

    fn is_constant(self) -> bool {
        matches!(self, Self::Const(_))
    }

    fn raw(self) -> u16 {
        match self {
            Self::Reg(r) => r.0,
            Self::Const(offset) => offset,
        }
    }
}

impl From<RegisterId> for Src {
    fn from(r: RegisterId) -> Self {
        Self::Reg(r)
    }
}

/// Builds an instruction stream.
#[derive(Clone, Debug, Default)]
pub struct BytecodeBuilder {
    code: Vec<u8>,
    error: Option<String>,
}

impl BytecodeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the byte offset the next instruction will start at.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Emits a computational instruction.
    pub fn compute(&mut self, op: Opcode, sources: &[Src], dst: RegisterId) -> &mut Self {
        let Shape::Compute(n) = op.shape() else {
            return self.fail(format!("{op} is not a computational op"));
        };
        if sources.len() != usize::from(n) {
            return self.fail(format!("{op} takes {n} sources, got {}", sources.len()));
        }
        let optype = sources
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_constant())
            .fold(0u8, |bits, (i, _)| bits | (1 << i));
        self.op(op).u8(optype);
        for source in sources {
            self.u16(source.raw());
        }
        self.u16(dst.0)
    }

    /// Emits `exec_index`.
    pub fn exec_index(&mut self, dst: RegisterId) -> &mut Self {
        self.op(Opcode::ExecIndex).u16(dst.0)
    }

    /// Emits `inputdata_32bit`.
    pub fn input_data(&mut self, dataset: u16, variable: u16, dst: RegisterId) -> &mut Self {
        self.op(Opcode::InputData32)
            .u16(dataset)
            .u16(variable)
            .u16(dst.0)
    }

    /// Emits `inputdata_noadvance_32bit`.
    pub fn input_data_no_advance(
        &mut self,
        dataset: u16,
        variable: u16,
        dst: RegisterId,
    ) -> &mut Self {
        self.op(Opcode::InputDataNoAdvance32)
            .u16(dataset)
            .u16(variable)
            .u16(dst.0)
    }

    /// Emits `outputdata_32bit`.
    pub fn output_data(
        &mut self,
        dataset: u16,
        index: Src,
        value: Src,
        variable: u16,
    ) -> &mut Self {
        let optype = u8::from(index.is_constant()) | (u8::from(value.is_constant()) << 1);
        self.op(Opcode::OutputData32)
            .u8(optype)
            .u16(dataset)
            .u16(index.raw())
            .u16(value.raw())
            .u16(variable)
    }

    /// Emits `acquireindex`.
    pub fn acquire_index(&mut self, dataset: u16, valid: Src, dst: RegisterId) -> &mut Self {
        self.op(Opcode::AcquireIndex)
            .u8(u8::from(valid.is_constant()))
            .u16(dataset)
            .u16(valid.raw())
            .u16(dst.0)
    }

    /// Emits `acquire_id`.
    pub fn acquire_id(
        &mut self,
        dataset: u16,
        id_dst: RegisterId,
        tag_dst: RegisterId,
    ) -> &mut Self {
        self.op(Opcode::AcquireId)
            .u16(dataset)
            .u16(id_dst.0)
            .u16(tag_dst.0)
    }

    /// Emits `update_id`.
    pub fn update_id(&mut self, dataset: u16, id: RegisterId, index: RegisterId) -> &mut Self {
        self.op(Opcode::UpdateId).u16(dataset).u16(id.0).u16(index.0)
    }

    /// Emits `external_func_call`.
    ///
    /// Constant inputs must sit below byte offset `0x8000`.
    pub fn external_call(
        &mut self,
        slot: u16,
        user_ptr: Option<u16>,
        inputs: &[Src],
        outputs: &[RegisterId],
    ) -> &mut Self {
        self.op(Opcode::ExternalFuncCall).u16(slot);
        if let Some(index) = user_ptr {
            self.u16(index);
        }
        for input in inputs {
            match *input {
                Src::Const(offset) if offset & CALL_CONSTANT_FLAG != 0 => {
                    return self.fail(format!("constant offset {offset} too large for a call"));
                }
                Src::Const(offset) => self.u16(offset | CALL_CONSTANT_FLAG),
                Src::Reg(r) if !r.is_unused() && r.0 & CALL_CONSTANT_FLAG != 0 => {
                    return self.fail(format!("register {r} too large for a call"));
                }
                Src::Reg(r) => self.u16(r.0),
            };
        }
        for output in outputs {
            self.u16(output.0);
        }
        self
    }

    /// Emits `enter_stat_scope`.
    pub fn enter_stat_scope(&mut self, scope: u16) -> &mut Self {
        self.op(Opcode::EnterStatScope).u16(scope)
    }

    /// Emits `exit_stat_scope`.
    pub fn exit_stat_scope(&mut self) -> &mut Self {
        self.op(Opcode::ExitStatScope)
    }

    /// Emits `done`.
    pub fn done(&mut self) -> &mut Self {
        self.op(Opcode::Done)
    }

    /// Appends raw bytes.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Returns the assembled stream, or the first encoding error.
    pub fn build(&self) -> Result<Vec<u8>> {
        match &self.error {
            Some(message) => Err(Error::new(ErrorKind::InvalidConfig(message.clone()))),
            None => Ok(self.code.clone()),
        }
    }

    fn op(&mut self, op: Opcode) -> &mut Self {
        self.u8(op.byte())
    }

    fn u8(&mut self, value: u8) -> &mut Self {
        self.code.push(value);
        self
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn fail(&mut self, message: String) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(message);
        }
        self
    }
}
