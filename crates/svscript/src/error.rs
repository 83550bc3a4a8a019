use crate::interpreter::{CheckMultiSigError, CheckSigError};
use crate::num::NumError;
use crate::opcode::Opcode;
use crate::parser::ParseError;
use crate::sighash::SigHashError;
use crate::stack::StackError;
use crate::value::StackValue;
use std::fmt;

/// Top level error: the script bytes are malformed, or executing them failed.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("failed to parse script: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Execution(#[from] Box<ExecutionError>),
}

impl Error {
    /// The execution failure reason, if the script got as far as executing.
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            Self::Parse(_) => None,
            Self::Execution(err) => Some(&err.reason),
        }
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        Self::Execution(Box::new(err))
    }
}

/// Reason a script failed during execution.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// The script evaluated without error but terminated with a false or
    /// empty top stack element.
    #[error("script terminated with a false stack element")]
    EvalFalse,
    #[error("OP_RETURN was encountered")]
    OpReturn,

    // Max sizes.
    #[error("script size exceeds the limit")]
    ScriptSize,
    #[error("push size exceeds the maximum element size")]
    PushSize,
    #[error("operation count exceeds the limit")]
    OpCount,
    /// Stack and altstack combined depth is over the limit.
    #[error("stack size exceeds the limit")]
    StackSize,
    #[error("stack memory usage exceeds the limit")]
    StackMemoryUsage,

    // Failed verify operations.
    #[error("{0} failed")]
    Verify(Opcode),

    // Logical/Format/Canonical errors.
    #[error("{0} is not a valid opcode")]
    BadOpcode(Opcode),
    #[error("attempt to execute disabled opcode {0}")]
    DisabledOpcode(Opcode),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error("invalid alt stack operation")]
    InvalidAltStackOperation,
    /// An OP_ELSE or OP_ENDIF without an opening OP_IF/OP_NOTIF, or an
    /// OP_IF/OP_NOTIF still open at the end of the script.
    #[error("unbalanced conditional")]
    UnbalancedConditional,
    #[error("operands must have the same size")]
    InvalidOperandSize,
    #[error("number out of the valid range")]
    InvalidNumberRange,
    #[error("split position out of range")]
    InvalidSplitRange,
    #[error("value does not fit in the requested size")]
    ImpossibleEncoding,
    #[error("division by zero")]
    DivByZero,
    #[error("modulo by zero")]
    ModByZero,

    // CHECKLOCKTIMEVERIFY
    #[error("negative lock time")]
    NegativeLocktime,
    #[error("lock time requirement not satisfied")]
    UnsatisfiedLocktime,

    // Malleability
    #[error("data push is not minimally encoded")]
    MinimalData,
    #[error("stack is not clean after evaluation")]
    CleanStack,
    #[error("signature script is not push only")]
    SigPushOnly,

    // Softfork safeness.
    #[error("{0} reserved for soft-fork upgrades")]
    DiscourageUpgradableNops(Opcode),

    #[error(transparent)]
    Num(#[from] NumError),
    #[error(transparent)]
    SigHash(#[from] SigHashError),
    #[error(transparent)]
    CheckSig(#[from] CheckSigError),
    #[error(transparent)]
    CheckMultiSig(#[from] CheckMultiSigError),
}

/// Where and in what state execution stopped.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FailureContext {
    /// Opcode being executed, `None` for failures outside the opcode loop.
    pub opcode: Option<Opcode>,
    /// Byte offset of that opcode in the script.
    pub offset: Option<usize>,
    pub stack: Vec<StackValue>,
    pub alt_stack: Vec<StackValue>,
    pub op_count: u64,
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(opcode), Some(offset)) = (self.opcode, self.offset) {
            write!(f, "at {opcode} (offset {offset}), ")?;
        }
        write!(f, "stack: [")?;
        for (i, item) in self.stack.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "]")
    }
}

/// A [`ScriptError`] together with a snapshot of the execution state.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{reason}, {context}")]
pub struct ExecutionError {
    pub reason: ScriptError,
    pub context: FailureContext,
}

impl ExecutionError {
    pub fn new(reason: impl Into<ScriptError>, context: FailureContext) -> Self {
        Self {
            reason: reason.into(),
            context,
        }
    }

    /// An error raised outside of any opcode, with no stack to report.
    pub fn bare(reason: impl Into<ScriptError>) -> Self {
        Self::new(reason, FailureContext::default())
    }
}
