use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::opcode::all::*;
use crate::parser::Chunk;
use crate::value::{Provenance, StackValue};

pub(super) fn op_invert(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let top = m.stack.top_mut(0)?;
    top.bytes_mut().iter_mut().for_each(|byte| *byte = !*byte);
    Ok(Flow::Continue)
}

/// `[x1 x2] -> [x1 op x2]`, operands must have the same length.
fn bitwise_binary(m: &mut Machine<'_>, op: fn(u8, u8) -> u8) -> Result<Flow, ScriptError> {
    if m.stack.top(1)?.len() != m.stack.top(0)?.len() {
        return Err(ScriptError::InvalidOperandSize);
    }

    let rhs = m.stack.pop()?;
    let lhs = m.stack.top_mut(0)?;
    lhs.bytes_mut()
        .iter_mut()
        .zip(rhs.as_bytes())
        .for_each(|(a, b)| *a = op(*a, *b));
    lhs.merge_provenance(rhs.provenance());

    Ok(Flow::Continue)
}

pub(super) fn op_and(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    bitwise_binary(m, |a, b| a & b)
}

pub(super) fn op_or(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    bitwise_binary(m, |a, b| a | b)
}

pub(super) fn op_xor(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    bitwise_binary(m, |a, b| a ^ b)
}

pub(super) fn op_equal(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let (x1, x2) = (m.stack.top(1)?, m.stack.top(0)?);
    let equal = x1.as_bytes() == x2.as_bytes();
    let provenance = Provenance::union([x1, x2]);

    m.stack.drop(2)?;
    m.push(StackValue::bool(equal, provenance));

    Ok(Flow::Continue)
}

pub(super) fn op_equalverify(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let equal = m.stack.top(1)?.as_bytes() == m.stack.top(0)?.as_bytes();
    if !equal {
        return Err(ScriptError::Verify(OP_EQUALVERIFY));
    }
    m.stack.drop(2)?;
    Ok(Flow::Continue)
}

/// `[x n] -> [x shifted by n bits]`, the length of `x` is preserved and bits
/// shifted out are lost.
fn shift(m: &mut Machine<'_>, f: fn(&[u8], usize) -> Vec<u8>) -> Result<Flow, ScriptError> {
    let n = m.top_num(0)?;
    if n.is_negative() {
        return Err(ScriptError::InvalidNumberRange);
    }
    // Anything past the operand width clears it, saturate.
    let n = n.to_usize().unwrap_or(usize::MAX);

    let index = m.stack.pop()?;
    let top = m.stack.top_mut(0)?;
    let shifted = f(top.as_bytes(), n);
    *top.bytes_mut() = shifted;
    top.merge_provenance(index.provenance());

    Ok(Flow::Continue)
}

pub(super) fn op_lshift(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    shift(m, lshift)
}

pub(super) fn op_rshift(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    shift(m, rshift)
}

/// Big endian left shift of the whole byte string.
fn lshift(data: &[u8], n: usize) -> Vec<u8> {
    const MASKS: [u8; 8] = [0xff, 0x7f, 0x3f, 0x1f, 0x0f, 0x07, 0x03, 0x01];

    let byte_shift = n / 8;
    let bit_shift = (n % 8) as u32;
    let mask = MASKS[bit_shift as usize];
    let overflow_mask = !mask;

    let mut result = vec![0u8; data.len()];

    for i in (0..data.len()).rev() {
        if byte_shift > i {
            continue;
        }
        let k = i - byte_shift;
        let value = data[i] as u32;
        result[k] |= (((value & mask as u32) << bit_shift) & 0xff) as u8;
        if k >= 1 && bit_shift > 0 {
            result[k - 1] |= ((value & overflow_mask as u32) >> (8 - bit_shift)) as u8;
        }
    }

    result
}

/// Big endian right shift of the whole byte string.
fn rshift(data: &[u8], n: usize) -> Vec<u8> {
    const MASKS: [u8; 8] = [0xff, 0xfe, 0xfc, 0xf8, 0xf0, 0xe0, 0xc0, 0x80];

    let byte_shift = n / 8;
    let bit_shift = (n % 8) as u32;
    let mask = MASKS[bit_shift as usize];
    let overflow_mask = !mask;

    let mut result = vec![0u8; data.len()];

    for (i, byte) in data.iter().enumerate() {
        let Some(k) = i.checked_add(byte_shift).filter(|k| *k < data.len()) else {
            break;
        };
        let value = *byte as u32;
        result[k] |= ((value & mask as u32) >> bit_shift) as u8;
        if k + 1 < data.len() && bit_shift > 0 {
            result[k + 1] |= (((value & overflow_mask as u32) << (8 - bit_shift)) & 0xff) as u8;
        }
    }

    result
}
