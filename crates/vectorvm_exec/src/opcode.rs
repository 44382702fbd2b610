//! Instruction set of the VM.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) table holds the canonical definitions: opcode byte,
//! mnemonic, and operand shape. Everything else that needs to know about the
//! instruction set (decoding, the builder, the validator, the disassembler)
//! goes through the generated [`Opcode`] enum and its [`Shape`].
//!
//! # Encoding
//!
//! Every instruction starts with its opcode byte. Operands follow in the order
//! given by the shape:
//! - Computational ops: one operand-type byte, one `u16` per source, then the
//!   `u16` destination register. Bit `i` of the operand-type byte marks source
//!   `i` as a constant-table byte offset rather than a register.
//! - Data, ID, and call ops: fixed `u16` fields documented on each [`Shape`].
//!
//! All multi-byte fields are little-endian.

use vectorvm_foundation::{Error, Result};

/// Operand layout of an instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Shape {
    /// No operands.
    Done,
    /// `[optype u8][src u16; N][dst u16]`.
    Compute(u8),
    /// `[dst u16]`: writes the absolute instance index.
    ExecIndex,
    /// `[dataset u16][input register u16][dst u16]`.
    InputData,
    /// `[optype u8][dataset u16][index u16][src u16][output register u16]`.
    OutputData,
    /// `[optype u8][dataset u16][valid u16][dst u16]`.
    AcquireIndex,
    /// `[dataset u16][id dst u16][tag dst u16]`.
    AcquireId,
    /// `[dataset u16][id u16][index u16]`.
    UpdateId,
    /// `[function u16]`, then `[user pointer u16]` if the binding takes one,
    /// then one `u16` per input and one per output as declared by the binding.
    ExternalCall,
    /// `[scope u16]`.
    EnterStatScope,
    /// No operands.
    ExitStatScope,
}

impl Shape {
    /// Returns the encoded operand size in bytes, or `None` if it depends on
    /// the external function table.
    #[must_use]
    pub const fn operand_bytes(self) -> Option<usize> {
        match self {
            Self::Done | Self::ExitStatScope => Some(0),
            Self::Compute(n) => Some(1 + 2 * (n as usize) + 2),
            Self::ExecIndex | Self::EnterStatScope => Some(2),
            Self::InputData | Self::AcquireId | Self::UpdateId => Some(6),
            Self::OutputData => Some(9),
            Self::AcquireIndex => Some(7),
            Self::ExternalCall => None,
        }
    }
}

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Control
            // =========================
            /// Ends the program for the current chunk.
            Done = 0, "done" => Shape::Done,

            // =========================
            // Float math
            // =========================
            /// `a + b`
            Add = 1, "add" => Shape::Compute(2),
            /// `a - b`
            Sub = 2, "sub" => Shape::Compute(2),
            /// `a * b`
            Mul = 3, "mul" => Shape::Compute(2),
            /// `a / b`, zero where `b` is exactly zero
            Div = 4, "div" => Shape::Compute(2),
            /// `a * b + c`
            Mad = 5, "mad" => Shape::Compute(3),
            /// `a + t * (b - a)`
            Lerp = 6, "lerp" => Shape::Compute(3),
            /// `1 / a`, zero where `a` is exactly zero
            Rcp = 7, "rcp" => Shape::Compute(1),
            /// `1 / sqrt(a)`, zero where `a` is exactly zero
            Rsq = 8, "rsq" => Shape::Compute(1),
            /// `sqrt(a)`
            Sqrt = 9, "sqrt" => Shape::Compute(1),
            /// `-a`
            Neg = 10, "neg" => Shape::Compute(1),
            /// `|a|`
            Abs = 11, "abs" => Shape::Compute(1),
            /// `e^a`
            Exp = 12, "exp" => Shape::Compute(1),
            /// `2^a`
            Exp2 = 13, "exp2" => Shape::Compute(1),
            /// `ln(a)`
            Log = 14, "log" => Shape::Compute(1),
            /// `log2(a)`
            Log2 = 15, "log2" => Shape::Compute(1),
            /// `sin(a)`
            Sin = 16, "sin" => Shape::Compute(1),
            /// `cos(a)`
            Cos = 17, "cos" => Shape::Compute(1),
            /// `tan(a)`
            Tan = 18, "tan" => Shape::Compute(1),
            /// `asin(a)`
            Asin = 19, "asin" => Shape::Compute(1),
            /// `acos(a)`
            Acos = 20, "acos" => Shape::Compute(1),
            /// `atan(a)`
            Atan = 21, "atan" => Shape::Compute(1),
            /// `atan2(a, b)`
            Atan2 = 22, "atan2" => Shape::Compute(2),
            /// `ceil(a)`
            Ceil = 23, "ceil" => Shape::Compute(1),
            /// `floor(a)`
            Floor = 24, "floor" => Shape::Compute(1),
            /// Truncating remainder of `a / b`, zero where `b` is zero
            Fmod = 25, "fmod" => Shape::Compute(2),
            /// `a - trunc(a)`
            Frac = 26, "frac" => Shape::Compute(1),
            /// `trunc(a)`
            Trunc = 27, "trunc" => Shape::Compute(1),
            /// `min(max(a, lo), hi)`
            Clamp = 28, "clamp" => Shape::Compute(3),
            /// `min(a, b)`
            Min = 29, "min" => Shape::Compute(2),
            /// `max(a, b)`
            Max = 30, "max" => Shape::Compute(2),
            /// `a^b`
            Pow = 31, "pow" => Shape::Compute(2),
            /// `floor(a + 0.5)`
            Round = 32, "round" => Shape::Compute(1),
            /// `-1`, `0`, or `1`
            Sign = 33, "sign" => Shape::Compute(1),
            /// `1` where `b >= a`, else `0`
            Step = 34, "step" => Shape::Compute(2),
            /// Uniform draw in `[0, a)`
            Random = 35, "random" => Shape::Compute(1),
            /// Gradient noise of `a`
            Noise = 36, "noise" => Shape::Compute(1),

            // =========================
            // Float comparison
            // =========================
            /// `a < b` mask
            CmpLt = 37, "cmplt" => Shape::Compute(2),
            /// `a <= b` mask
            CmpLe = 38, "cmple" => Shape::Compute(2),
            /// `a > b` mask
            CmpGt = 39, "cmpgt" => Shape::Compute(2),
            /// `a >= b` mask
            CmpGe = 40, "cmpge" => Shape::Compute(2),
            /// `a == b` mask
            CmpEq = 41, "cmpeq" => Shape::Compute(2),
            /// `a != b` mask
            CmpNeq = 42, "cmpneq" => Shape::Compute(2),
            /// Per lane `mask ? a : b`
            Select = 43, "select" => Shape::Compute(3),

            // =========================
            // Integer math
            // =========================
            /// Wrapping `a + b`
            AddI = 44, "addi" => Shape::Compute(2),
            /// Wrapping `a - b`
            SubI = 45, "subi" => Shape::Compute(2),
            /// Wrapping `a * b`
            MulI = 46, "muli" => Shape::Compute(2),
            /// `min(max(a, lo), hi)`
            ClampI = 47, "clampi" => Shape::Compute(3),
            /// `min(a, b)`
            MinI = 48, "mini" => Shape::Compute(2),
            /// `max(a, b)`
            MaxI = 49, "maxi" => Shape::Compute(2),
            /// Wrapping `|a|`
            AbsI = 50, "absi" => Shape::Compute(1),
            /// Wrapping `-a`
            NegI = 51, "negi" => Shape::Compute(1),
            /// `-1`, `0`, or `1`
            SignI = 52, "signi" => Shape::Compute(1),
            /// Uniform draw in `[0, a)`
            RandomI = 53, "randomi" => Shape::Compute(1),
            /// `a < b` mask
            CmpLtI = 54, "cmplti" => Shape::Compute(2),
            /// `a <= b` mask
            CmpLeI = 55, "cmplei" => Shape::Compute(2),
            /// `a > b` mask
            CmpGtI = 56, "cmpgti" => Shape::Compute(2),
            /// `a >= b` mask
            CmpGeI = 57, "cmpgei" => Shape::Compute(2),
            /// `a == b` mask
            CmpEqI = 58, "cmpeqi" => Shape::Compute(2),
            /// `a != b` mask
            CmpNeqI = 59, "cmpneqi" => Shape::Compute(2),

            // =========================
            // Bitwise
            // =========================
            /// `a & b`
            BitAnd = 60, "bit_and" => Shape::Compute(2),
            /// `a | b`
            BitOr = 61, "bit_or" => Shape::Compute(2),
            /// `a ^ b`
            BitXor = 62, "bit_xor" => Shape::Compute(2),
            /// `!a`
            BitNot = 63, "bit_not" => Shape::Compute(1),
            /// `a << (b & 31)`
            BitLShift = 64, "bit_lshift" => Shape::Compute(2),
            /// Arithmetic `a >> (b & 31)`
            BitRShift = 65, "bit_rshift" => Shape::Compute(2),

            // =========================
            // Boolean logic
            // =========================
            /// `a && b`
            LogicAnd = 66, "logic_and" => Shape::Compute(2),
            /// `a || b`
            LogicOr = 67, "logic_or" => Shape::Compute(2),
            /// `a != b`
            LogicXor = 68, "logic_xor" => Shape::Compute(2),
            /// `!a`
            LogicNot = 69, "logic_not" => Shape::Compute(1),

            // =========================
            // Conversions
            // =========================
            /// Float to int, truncating
            F2I = 70, "f2i" => Shape::Compute(1),
            /// Int to float
            I2F = 71, "i2f" => Shape::Compute(1),
            /// `a > 0.0`
            F2B = 72, "f2b" => Shape::Compute(1),
            /// `1.0` for true, `0.0` otherwise
            B2F = 73, "b2f" => Shape::Compute(1),
            /// `a > 0`
            I2B = 74, "i2b" => Shape::Compute(1),
            /// `1` for true, `0` otherwise
            B2I = 75, "b2i" => Shape::Compute(1),

            // =========================
            // Dataset access
            // =========================
            /// Reads one attribute column at the instance position.
            InputData32 = 76, "inputdata_32bit" => Shape::InputData,
            /// Broadcasts the attribute at the dataset's read position.
            InputDataNoAdvance32 = 77, "inputdata_noadvance_32bit" => Shape::InputData,
            /// Writes one attribute column at an acquired index.
            OutputData32 = 78, "outputdata_32bit" => Shape::OutputData,
            /// Reserves output slots for valid lanes.
            AcquireIndex = 79, "acquireindex" => Shape::AcquireIndex,
            /// Calls a bound native function.
            ExternalFuncCall = 80, "external_func_call" => Shape::ExternalCall,
            /// Absolute index of the instance.
            ExecIndex = 81, "exec_index" => Shape::ExecIndex,
            /// Gradient noise of `(a, b)`
            Noise2D = 82, "noise2d" => Shape::Compute(2),
            /// Gradient noise of `(a, b, c)`
            Noise3D = 83, "noise3d" => Shape::Compute(3),
            /// Opens a timing scope.
            EnterStatScope = 84, "enter_stat_scope" => Shape::EnterStatScope,
            /// Closes the innermost timing scope.
            ExitStatScope = 85, "exit_stat_scope" => Shape::ExitStatScope,
            /// Records the final slot of an ID; `INDEX_NONE` frees it.
            UpdateId = 86, "update_id" => Shape::UpdateId,
            /// Hands out one stable ID per instance.
            AcquireId = 87, "acquire_id" => Shape::AcquireId,
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:literal, $mnemonic:literal => $shape:expr
        ),* $(,)?
    ) => {
        /// One VM opcode.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $code,
            )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = Error;

            fn try_from(value: u8) -> Result<Self> {
                match value {
                    $( $code => Ok(Opcode::$name), )*
                    _ => Err(Error::invalid_opcode(value)),
                }
            }
        }

        impl Opcode {
            /// Every opcode in encoding order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Returns the mnemonic used by the disassembler.
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the operand layout.
            #[must_use]
            pub const fn shape(self) -> Shape {
                match self {
                    $( Opcode::$name => $shape, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Returns the encoded byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Returns the number of source operands of a computational op.
    #[must_use]
    pub const fn num_sources(self) -> usize {
        match self.shape() {
            Shape::Compute(n) => n as usize,
            _ => 0,
        }
    }

    /// Looks up an opcode by mnemonic.
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
