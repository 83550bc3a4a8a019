use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::num::ScriptNum;
use crate::opcode::all::*;
use crate::parser::Chunk;
use crate::stack::StackError;
use crate::value::{Provenance, StackValue};

/// OP_1NEGATE and OP_1 to OP_16.
pub(super) fn op_small_int(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    let value = chunk
        .opcode()
        .small_int()
        .ok_or(ScriptError::BadOpcode(chunk.opcode()))?;
    m.push(StackValue::num(&ScriptNum::from(value), Provenance::Literal));
    Ok(Flow::Continue)
}

pub(super) fn op_toaltstack(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let value = m.stack.pop()?;
    m.alt_stack.push(value);
    Ok(Flow::Continue)
}

pub(super) fn op_fromaltstack(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let value = m
        .alt_stack
        .pop()
        .map_err(|_| ScriptError::InvalidAltStackOperation)?;
    m.push(value);
    Ok(Flow::Continue)
}

pub(super) fn op_2drop(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.drop(2)?;
    Ok(Flow::Continue)
}

pub(super) fn op_2dup(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.dup(2)?;
    Ok(Flow::Continue)
}

pub(super) fn op_3dup(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.dup(3)?;
    Ok(Flow::Continue)
}

pub(super) fn op_2over(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.over(2)?;
    Ok(Flow::Continue)
}

pub(super) fn op_2rot(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.rot(2)?;
    Ok(Flow::Continue)
}

pub(super) fn op_2swap(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.swap(2)?;
    Ok(Flow::Continue)
}

pub(super) fn op_ifdup(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    if m.stack.peek_bool()? {
        m.stack.dup(1)?;
    }
    Ok(Flow::Continue)
}

/// Pushes the stack depth, which the spender controls.
pub(super) fn op_depth(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let depth = ScriptNum::from(m.stack.len() as i64);
    m.push(StackValue::num(&depth, Provenance::Derived));
    Ok(Flow::Continue)
}

pub(super) fn op_drop(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.drop(1)?;
    Ok(Flow::Continue)
}

pub(super) fn op_dup(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.dup(1)?;
    Ok(Flow::Continue)
}

pub(super) fn op_nip(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.nip()?;
    Ok(Flow::Continue)
}

pub(super) fn op_over(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.over(1)?;
    Ok(Flow::Continue)
}

/// `[... xn ... x0 n] -> [... xn ... x0 xn]`, OP_ROLL moves the item instead
/// of copying it.
pub(super) fn op_pick_roll(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    let n = m.top_num(0)?;
    let depth = m.stack.len() - 1;
    let n = n
        .to_usize()
        .filter(|n| *n < depth)
        .ok_or(StackError::InvalidOperation)?;

    let index = m.stack.pop()?;

    let mut value = if chunk.opcode() == OP_PICK {
        m.stack.top(n)?.clone()
    } else {
        m.stack.remove(n)?
    };
    value.merge_provenance(index.provenance());

    m.push(value);

    Ok(Flow::Continue)
}

pub(super) fn op_rot(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.rot(1)?;
    Ok(Flow::Continue)
}

pub(super) fn op_swap(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.swap(1)?;
    Ok(Flow::Continue)
}

pub(super) fn op_tuck(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.stack.tuck()?;
    Ok(Flow::Continue)
}
