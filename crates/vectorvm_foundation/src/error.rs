//! Error types for VectorVM.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout VectorVM.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for VectorVM operations.
#[derive(Debug, Error)]
#[error("{kind}{}", .context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error, replacing any existing context.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the chunk index, keeping any other context already attached.
    #[must_use]
    pub fn in_chunk(mut self, chunk: usize) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_chunk(chunk));
        self
    }

    /// Creates an invalid opcode error.
    #[must_use]
    pub fn invalid_opcode(opcode: u8) -> Self {
        Self::new(ErrorKind::InvalidOpcode(opcode))
    }

    /// Creates an unexpected end of bytecode error.
    #[must_use]
    pub fn unexpected_end(offset: usize) -> Self {
        Self::new(ErrorKind::UnexpectedEndOfBytecode { offset })
    }

    /// Creates a register out of bounds error.
    #[must_use]
    pub fn register_out_of_bounds(index: u16, limit: usize) -> Self {
        Self::new(ErrorKind::RegisterOutOfBounds { index, limit })
    }

    /// Creates a constant out of bounds error.
    #[must_use]
    pub fn constant_out_of_bounds(offset: usize, length: usize) -> Self {
        Self::new(ErrorKind::ConstantOutOfBounds { offset, length })
    }

    /// Creates an instance out of bounds error.
    #[must_use]
    pub fn instance_out_of_bounds(index: usize, length: usize) -> Self {
        Self::new(ErrorKind::InstanceOutOfBounds { index, length })
    }

    /// Creates an ID not found error.
    #[must_use]
    pub fn id_not_found(id: i32) -> Self {
        Self::new(ErrorKind::IdNotFound(id))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opcode byte outside the instruction set.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// Bytecode ended in the middle of an instruction or before `done`.
    #[error("unexpected end of bytecode at offset {offset}")]
    UnexpectedEndOfBytecode {
        /// Byte offset where more input was needed.
        offset: usize,
    },

    /// Register operand outside the register file.
    #[error("register r{index} out of bounds (register file holds {limit})")]
    RegisterOutOfBounds {
        /// The decoded register index.
        index: u16,
        /// Number of addressable registers.
        limit: usize,
    },

    /// Register operand that cannot be written.
    #[error("register r{0} is read-only")]
    InvalidDestination(u16),

    /// Constant operand past the end of the constant table.
    #[error("constant offset {offset} out of bounds (table is {length} bytes)")]
    ConstantOutOfBounds {
        /// Byte offset that was decoded.
        offset: usize,
        /// Size of the constant table in bytes.
        length: usize,
    },

    /// Dataset index past the end of the dataset table.
    #[error("dataset {index} out of bounds ({count} datasets bound)")]
    DataSetOutOfBounds {
        /// The decoded dataset index.
        index: u16,
        /// Number of bound datasets.
        count: usize,
    },

    /// Instance index past the end of an attribute column.
    #[error("instance {index} out of bounds (column holds {length})")]
    InstanceOutOfBounds {
        /// The instance that was accessed.
        index: usize,
        /// Length of the column.
        length: usize,
    },

    /// External function slot with nothing bound to it.
    #[error("external function slot {0} is unbound")]
    UnboundExternalFunction(u16),

    /// User pointer index past the end of the user pointer table.
    #[error("user pointer {index} out of bounds ({count} bound)")]
    UserPtrOutOfBounds {
        /// The decoded user pointer index.
        index: u16,
        /// Number of bound user pointers.
        count: usize,
    },

    /// ID was never handed out by the table.
    #[error("instance ID {0} not found")]
    IdNotFound(i32),

    /// ID freed while already free.
    #[error("instance ID {0} is already free")]
    IdAlreadyFree(i32),

    /// ID carries a tag from an earlier table generation.
    #[error("stale instance ID {index}: tag {tag}, table is at tag {current}")]
    StaleId {
        /// The ID slot.
        index: i32,
        /// The tag carried by the reference.
        tag: i32,
        /// The tag currently stamped on the slot.
        current: i32,
    },

    /// No more IDs can be minted.
    #[error("instance ID table exhausted")]
    IdTableExhausted,

    /// Dataset whose ID table was corrupted by earlier misuse; reset it first.
    #[error("dataset ID table is faulted")]
    DataSetFaulted,

    /// `exit_stat_scope` without a matching `enter_stat_scope`, or a scope left open.
    #[error("unbalanced stat scope")]
    UnbalancedStatScope,

    /// Configuration rejected before execution.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// True for errors caused by a malformed instruction stream.
    #[must_use]
    pub fn is_malformed_bytecode(&self) -> bool {
        matches!(
            self,
            Self::InvalidOpcode(_) | Self::UnexpectedEndOfBytecode { .. } | Self::UnbalancedStatScope
        )
    }

    /// True for register, constant, dataset, instance, and binding index errors.
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Self::RegisterOutOfBounds { .. }
                | Self::InvalidDestination(_)
                | Self::ConstantOutOfBounds { .. }
                | Self::DataSetOutOfBounds { .. }
                | Self::InstanceOutOfBounds { .. }
                | Self::UnboundExternalFunction(_)
                | Self::UserPtrOutOfBounds { .. }
        )
    }

    /// True for misuse of a dataset's ID table.
    #[must_use]
    pub fn is_id_misuse(&self) -> bool {
        matches!(
            self,
            Self::IdNotFound(_)
                | Self::IdAlreadyFree(_)
                | Self::StaleId { .. }
                | Self::IdTableExhausted
                | Self::DataSetFaulted
        )
    }

    /// True for ID misuse that leaves the table in an inconsistent state.
    #[must_use]
    pub fn corrupts_id_table(&self) -> bool {
        matches!(self, Self::IdNotFound(_) | Self::IdAlreadyFree(_))
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Index of the chunk being executed.
    pub chunk: Option<usize>,
    /// First instance of the chunk.
    pub start_instance: Option<usize>,
    /// Byte offset of the failing instruction.
    pub offset: Option<usize>,
    /// Mnemonic of the failing instruction.
    pub opcode: Option<&'static str>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk index.
    #[must_use]
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = Some(chunk);
        self
    }

    /// Sets the first instance of the chunk.
    #[must_use]
    pub fn with_start_instance(mut self, start: usize) -> Self {
        self.start_instance = Some(start);
        self
    }

    /// Sets the failing instruction.
    #[must_use]
    pub fn with_instruction(mut self, offset: usize, opcode: Option<&'static str>) -> Self {
        self.offset = Some(offset);
        self.opcode = opcode;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(chunk) = self.chunk {
            parts.push(format!("chunk {chunk}"));
        }
        if let Some(start) = self.start_instance {
            parts.push(format!("instance {start}"));
        }
        if let Some(offset) = self.offset {
            match self.opcode {
                Some(op) => parts.push(format!("{op} at byte {offset}")),
                None => parts.push(format!("byte {offset}")),
            }
        }
        write!(f, "{}", parts.join(", "))
    }
}
