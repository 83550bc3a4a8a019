mod arithmetic;
mod bitwise;
mod control;
mod crypto;
mod handlers;
mod multisig;
mod sig;
mod splice;
mod stack_ops;
mod verify;

use self::handlers::HANDLERS;
use crate::LOG_TARGET;
use crate::constants::STACK_ELEMENT_OVERHEAD;
use crate::error::{Error, ExecutionError, FailureContext, ScriptError};
use crate::flags::{RuleSet, ScriptLimits, StackBound, VerifyFlags};
use crate::num::ScriptNum;
use crate::opcode::{Opcode, all::*};
use crate::parser::{Chunk, Program};
use crate::signature_checker::SignatureChecker;
use crate::stack::Stack;
use crate::value::StackValue;

pub use self::multisig::CheckMultiSigError;
pub use self::sig::{
    CheckSigError, SignatureEncodingError, check_pubkey_encoding, check_signature_encoding,
};
pub use self::verify::verify_script;

/// What the run loop does after an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Stop executing successfully, OP_RETURN under the genesis rules.
    Return,
}

/// Execution state of a single script.
struct Machine<'a> {
    stack: &'a mut Stack,
    alt_stack: Stack,
    /// One entry per open IF/NOTIF, whether its current branch executes.
    exec_stack: Vec<bool>,
    op_count: u64,
    /// Offset just past the last executed OP_CODESEPARATOR.
    begincode: usize,
    flags: VerifyFlags,
    limits: ScriptLimits,
    program: &'a Program,
    checker: &'a dyn SignatureChecker,
}

impl<'a> Machine<'a> {
    fn executing(&self) -> bool {
        self.exec_stack.iter().all(|x| *x)
    }

    fn push(&mut self, value: StackValue) {
        self.stack.push(value);
    }

    /// Decodes the `i`-th item from the top as a number, without popping it.
    fn top_num(&self, i: usize) -> Result<ScriptNum, ScriptError> {
        self.top_num_with_max(i, self.limits.max_num_size)
    }

    fn top_num_with_max(&self, i: usize, max_size: usize) -> Result<ScriptNum, ScriptError> {
        let item = self.stack.top(i)?;
        Ok(ScriptNum::from_bytes(
            item.as_bytes(),
            self.flags.verify_minimaldata(),
            max_size,
        )?)
    }

    /// Script bytes signatures commit to, from the last OP_CODESEPARATOR on.
    fn script_code(&self) -> &'a [u8] {
        &self.program.as_bytes()[self.begincode..]
    }

    fn step(&mut self, chunk: &Chunk) -> Result<Flow, ScriptError> {
        let opcode = chunk.opcode();

        if chunk
            .payload()
            .is_some_and(|data| data.len() > self.limits.max_element_size)
        {
            return Err(ScriptError::PushSize);
        }

        // Note how OP_RESERVED does not count towards the opcode limit.
        if opcode.counts_towards_limit() {
            self.op_count += 1;
            if self.op_count > self.limits.max_ops {
                return Err(ScriptError::OpCount);
            }
        }

        if is_disabled(opcode, &self.flags) {
            return Err(ScriptError::DisabledOpcode(opcode));
        }

        let executing = self.executing();

        let flow = match chunk.payload() {
            Some(data) => {
                if executing {
                    if self.flags.verify_minimaldata() && !chunk.is_minimal_push() {
                        return Err(ScriptError::MinimalData);
                    }
                    self.push(StackValue::literal(data));
                }
                Flow::Continue
            }
            None if executing || opcode.is_conditional() => {
                tracing::trace!(
                    target: LOG_TARGET,
                    "Executing {opcode} at offset {}, stack: {}",
                    chunk.offset(),
                    self.stack,
                );
                HANDLERS[opcode.to_u8() as usize](self, chunk)?
            }
            None => Flow::Continue,
        };

        self.check_stack_bound()?;

        Ok(flow)
    }

    fn check_stack_bound(&self) -> Result<(), ScriptError> {
        match self.limits.stack {
            StackBound::Depth(max) => {
                if self.stack.len() + self.alt_stack.len() > max {
                    return Err(ScriptError::StackSize);
                }
            }
            StackBound::Memory(max) => {
                if self.memory_usage() > max {
                    return Err(ScriptError::StackMemoryUsage);
                }
            }
        }
        Ok(())
    }

    /// Bytes charged against the memory budget by both stacks.
    fn memory_usage(&self) -> u64 {
        let usage = |stack: &Stack| {
            stack
                .iter()
                .map(|item| STACK_ELEMENT_OVERHEAD + item.len() as u64)
                .sum::<u64>()
        };
        usage(&*self.stack) + usage(&self.alt_stack)
    }

    /// Fails before an opcode replaces the top `consumed` items with a new
    /// item of `len` bytes that would not fit in the memory budget.
    fn reserve(&self, consumed: usize, len: usize) -> Result<(), ScriptError> {
        let StackBound::Memory(max) = self.limits.stack else {
            return Ok(());
        };
        let released = self
            .stack
            .iter()
            .rev()
            .take(consumed)
            .map(|item| STACK_ELEMENT_OVERHEAD + item.len() as u64)
            .sum::<u64>();
        let usage = (self.memory_usage() - released)
            .saturating_add(STACK_ELEMENT_OVERHEAD)
            .saturating_add(len as u64);
        if usage > max {
            return Err(ScriptError::StackMemoryUsage);
        }
        Ok(())
    }

    fn failure_context(&self, chunk: Option<&Chunk>) -> FailureContext {
        FailureContext {
            opcode: chunk.map(Chunk::opcode),
            offset: chunk.map(Chunk::offset),
            stack: self.stack.to_vec(),
            alt_stack: self.alt_stack.to_vec(),
            op_count: self.op_count,
        }
    }

    fn fail(&self, reason: ScriptError, chunk: Option<&Chunk>) -> ExecutionError {
        match chunk {
            Some(chunk) => tracing::debug!(
                target: LOG_TARGET,
                "Script execution failed at {} (offset {}): {reason}",
                chunk.opcode(),
                chunk.offset(),
            ),
            None => tracing::debug!(target: LOG_TARGET, "Script execution failed: {reason}"),
        }
        ExecutionError::new(reason, self.failure_context(chunk))
    }
}

/// Opcodes that fail as soon as they are encountered, executed or not.
fn is_disabled(opcode: Opcode, flags: &VerifyFlags) -> bool {
    match opcode {
        OP_2MUL | OP_2DIV => true,
        OP_CAT | OP_SPLIT | OP_NUM2BIN | OP_BIN2NUM | OP_INVERT | OP_AND | OP_OR | OP_XOR
        | OP_MUL | OP_DIV | OP_MOD | OP_LSHIFT | OP_RSHIFT => !flags.monolith_opcodes(),
        _ => false,
    }
}

/// Executes `program` on top of `stack`.
///
/// Returns whether the script left a true value on top of the stack. The
/// stack is left as it was when execution stopped, successfully or not.
pub fn eval_script(
    stack: &mut Stack,
    program: &Program,
    flags: &VerifyFlags,
    checker: &dyn SignatureChecker,
) -> Result<bool, ExecutionError> {
    let limits = ScriptLimits::from_flags(flags);

    if program.len() > limits.max_script_size {
        return Err(ExecutionError::bare(ScriptError::ScriptSize));
    }

    let mut machine = Machine {
        stack,
        alt_stack: Stack::default(),
        exec_stack: Vec::new(),
        op_count: 0,
        begincode: 0,
        flags: *flags,
        limits,
        program,
        checker,
    };

    let mut returned = false;

    for chunk in program.chunks() {
        match machine.step(chunk) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Return) => {
                returned = true;
                break;
            }
            Err(reason) => return Err(machine.fail(reason, Some(chunk))),
        }
    }

    // A returning script may leave branches open.
    if !returned && !machine.exec_stack.is_empty() {
        return Err(machine.fail(ScriptError::UnbalancedConditional, None));
    }

    Ok(machine.stack.peek_bool().unwrap_or(false))
}

/// Outcome of [`execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Whether the script ended with a true value on top of the stack.
    pub success: bool,
    pub stack: Stack,
}

/// Parses `script` and evaluates it from an empty stack.
pub fn execute(
    script: &[u8],
    rules: &RuleSet,
    checker: &dyn SignatureChecker,
) -> Result<ExecutionOutcome, Error> {
    let program = Program::parse(script)?;
    let mut stack = Stack::default();
    let success = eval_script(&mut stack, &program, &rules.flags(), checker)?;
    Ok(ExecutionOutcome { success, stack })
}
