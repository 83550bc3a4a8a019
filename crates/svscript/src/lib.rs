//! Bitcoin SV script verification.
//!
//! Scripts are parsed into a [`Program`], evaluated by the stack machine in
//! [`interpreter`] under a [`RuleSet`], and signatures are checked against the
//! legacy or fork-id transaction digest from [`sighash`].

pub mod constants;
mod error;
mod flags;
pub mod interpreter;
mod num;
pub mod opcode;
mod parser;
pub mod sighash;
mod signature_checker;
mod stack;
mod value;


const LOG_TARGET: &str = "svscript";

pub use self::error::{Error, ExecutionError, FailureContext, ScriptError};
pub use self::flags::{Epoch, RuleSet, ScriptLimits, StackBound, UnknownEpoch, VerifyFlags};
pub use self::interpreter::{ExecutionOutcome, eval_script, execute, verify_script};
pub use self::num::{NumError, ScriptNum};
pub use self::opcode::Opcode;
pub use self::parser::{
    Builder, Chunk, ParseError, Program, find_and_delete, push_encoding, remove_code_separators,
};
pub use self::sighash::{SigHashError, SigHashType};
pub use self::signature_checker::{
    NoSignatureCheck, SignatureChecker, TransactionSignatureChecker,
};
pub use self::stack::{Stack, StackError, cast_to_bool};
pub use self::value::{Provenance, StackValue, ValueKind};
