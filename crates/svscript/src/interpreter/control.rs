use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::num::ScriptNum;
use crate::opcode::all::*;
use crate::parser::Chunk;
use crate::stack::cast_to_bool;

/// Reserved and unassigned opcodes, OP_VERIF and OP_VERNOTIF fail even in
/// an unexecuted branch.
pub(super) fn op_bad(_m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    Err(ScriptError::BadOpcode(chunk.opcode()))
}

pub(super) fn op_nop(_m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    Ok(Flow::Continue)
}

/// NOPs reserved for soft-fork upgrades.
pub(super) fn op_upgradable_nop(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    if m.flags.verify_discourage_upgradable_nops() {
        return Err(ScriptError::DiscourageUpgradableNops(chunk.opcode()));
    }
    Ok(Flow::Continue)
}

pub(super) fn op_if(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    let mut value = false;

    if m.executing() {
        let top = m
            .stack
            .last()
            .map_err(|_| ScriptError::UnbalancedConditional)?;

        value = cast_to_bool(top.as_bytes());

        if chunk.opcode() == OP_NOTIF {
            value = !value;
        }

        m.stack.pop()?;
    }

    m.exec_stack.push(value);

    Ok(Flow::Continue)
}

pub(super) fn op_else(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    // Toggle top.
    let last = m
        .exec_stack
        .last_mut()
        .ok_or(ScriptError::UnbalancedConditional)?;
    *last = !*last;
    Ok(Flow::Continue)
}

pub(super) fn op_endif(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.exec_stack
        .pop()
        .ok_or(ScriptError::UnbalancedConditional)?;
    Ok(Flow::Continue)
}

pub(super) fn op_verify(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    if !m.stack.peek_bool()? {
        return Err(ScriptError::Verify(chunk.opcode()));
    }
    m.stack.pop()?;
    Ok(Flow::Continue)
}

pub(super) fn op_return(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    if m.flags.is_genesis() {
        Ok(Flow::Return)
    } else {
        Err(ScriptError::OpReturn)
    }
}

/// BIP65, the top item stays on the stack.
pub(super) fn op_checklocktimeverify(
    m: &mut Machine<'_>,
    chunk: &Chunk,
) -> Result<Flow, ScriptError> {
    // Not enabled, or reverted by genesis: treat as NOP2.
    if !m.flags.verify_locktime() || m.flags.is_genesis() {
        return op_upgradable_nop(m, chunk);
    }

    // Lock times reach 2^32-1, hence the fifth byte.
    let lock_time = m.top_num_with_max(0, ScriptNum::LOCKTIME_NUM_SIZE)?;

    // In the rare event that the argument may be < 0 due to some arithmetic
    // being done first, you can always use 0 MAX CHECKLOCKTIMEVERIFY.
    if lock_time.is_negative() {
        return Err(ScriptError::NegativeLocktime);
    }

    if !m.checker.check_lock_time(&lock_time) {
        return Err(ScriptError::UnsatisfiedLocktime);
    }

    Ok(Flow::Continue)
}
