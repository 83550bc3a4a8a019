use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::num::ScriptNum;
use crate::parser::Chunk;
use crate::value::{Provenance, StackValue, ValueKind};

/// `[x1 x2] -> [x1 || x2]`
pub(super) fn op_cat(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let len = m.stack.top(1)?.len() + m.stack.top(0)?.len();
    if len > m.limits.max_element_size {
        return Err(ScriptError::PushSize);
    }

    let tail = m.stack.pop()?;
    let head = m.stack.top_mut(0)?;
    head.bytes_mut().extend_from_slice(tail.as_bytes());
    head.merge_provenance(tail.provenance());

    Ok(Flow::Continue)
}

/// `[x n] -> [x[..n] x[n..]]`
pub(super) fn op_split(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let position = m.top_num(0)?;
    let data = m.stack.top(1)?;

    let position = position
        .to_usize()
        .filter(|position| *position <= data.len())
        .ok_or(ScriptError::InvalidSplitRange)?;

    let provenance = Provenance::union([data, m.stack.top(0)?]);

    m.stack.drop(1)?;
    let data = m.stack.pop()?.into_bytes();
    let (left, right) = data.split_at(position);

    m.push(StackValue::bytes(left, provenance));
    m.push(StackValue::bytes(right, provenance));

    Ok(Flow::Continue)
}

/// `[x size] -> [x as a number padded to size bytes]`
pub(super) fn op_num2bin(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let size = m
        .top_num(0)?
        .to_usize()
        .filter(|size| *size <= m.limits.max_element_size)
        .ok_or(ScriptError::PushSize)?;

    m.reserve(2, size)?;

    let provenance = Provenance::union([m.stack.top(1)?, m.stack.top(0)?]);

    let mut raw = ScriptNum::minimally_encode(m.stack.top(1)?.as_bytes());
    if raw.len() > size {
        return Err(ScriptError::ImpossibleEncoding);
    }

    if raw.len() < size {
        // Move the sign bit from the last byte of the minimal encoding to the
        // last byte of the padded one.
        let sign = match raw.last_mut() {
            Some(last) => {
                let sign = *last & 0x80;
                *last &= 0x7f;
                sign
            }
            None => 0x00,
        };
        raw.resize(size - 1, 0x00);
        raw.push(sign);
    }

    m.stack.drop(2)?;
    m.push(StackValue::bytes(raw, provenance).with_kind(ValueKind::Int));

    Ok(Flow::Continue)
}

/// `[x] -> [x minimally encoded]`
pub(super) fn op_bin2num(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let top = m.stack.top(0)?;
    let raw = ScriptNum::minimally_encode(top.as_bytes());
    if raw.len() > m.limits.max_num_size {
        return Err(ScriptError::InvalidNumberRange);
    }

    let provenance = top.provenance();

    m.stack.drop(1)?;
    m.push(StackValue::bytes(raw, provenance).with_kind(ValueKind::Int));

    Ok(Flow::Continue)
}

/// Pushes the size of the top item, leaving it in place.
pub(super) fn op_size(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let top = m.stack.top(0)?;
    let size = ScriptNum::from(top.len() as i64);
    let provenance = top.provenance();
    m.push(StackValue::num(&size, provenance));
    Ok(Flow::Continue)
}
