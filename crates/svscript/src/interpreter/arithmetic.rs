use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::num::ScriptNum;
use crate::opcode::all::*;
use crate::parser::Chunk;
use crate::value::{Provenance, StackValue};

/// Result of a numeric opcode.
trait IntoStackValue {
    fn into_stack_value(self, provenance: Provenance) -> StackValue;
}

impl IntoStackValue for ScriptNum {
    fn into_stack_value(self, provenance: Provenance) -> StackValue {
        StackValue::num(&self, provenance)
    }
}

impl IntoStackValue for bool {
    fn into_stack_value(self, provenance: Provenance) -> StackValue {
        StackValue::bool(self, provenance)
    }
}

/// Reads `[a b]` from the top of the stack without popping.
fn peek_pair(m: &Machine<'_>) -> Result<(ScriptNum, ScriptNum, Provenance), ScriptError> {
    let a = m.top_num(1)?;
    let b = m.top_num(0)?;
    let provenance = Provenance::union([m.stack.top(1)?, m.stack.top(0)?]);
    Ok((a, b, provenance))
}

fn replace_top(m: &mut Machine<'_>, n: usize, value: StackValue) -> Result<Flow, ScriptError> {
    m.stack.drop(n)?;
    m.push(value);
    Ok(Flow::Continue)
}

macro_rules! numeric_unary {
    ($($name:ident => |$a:ident| $body:expr;)+) => {
        $(
            pub(super) fn $name(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
                let $a = m.top_num(0)?;
                let provenance = m.stack.top(0)?.provenance();
                replace_top(m, 1, ($body).into_stack_value(provenance))
            }
        )+
    };
}

macro_rules! numeric_binary {
    ($($name:ident => |$a:ident, $b:ident| $body:expr;)+) => {
        $(
            pub(super) fn $name(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
                let ($a, $b, provenance) = peek_pair(m)?;
                replace_top(m, 2, ($body).into_stack_value(provenance))
            }
        )+
    };
}

numeric_unary! {
    op_1add => |a| a + ScriptNum::from(1);
    op_1sub => |a| a - ScriptNum::from(1);
    op_negate => |a| -a;
    op_abs => |a| a.abs();
    op_not => |a| ScriptNum::from(a.is_zero() as i64);
    op_0notequal => |a| ScriptNum::from(!a.is_zero() as i64);
}

numeric_binary! {
    op_add => |a, b| a + b;
    op_sub => |a, b| a - b;
    op_mul => |a, b| a * b;
    op_booland => |a, b| !a.is_zero() && !b.is_zero();
    op_boolor => |a, b| !a.is_zero() || !b.is_zero();
    op_numequal => |a, b| a == b;
    op_numnotequal => |a, b| a != b;
    op_lessthan => |a, b| a < b;
    op_greaterthan => |a, b| a > b;
    op_lessthanorequal => |a, b| a <= b;
    op_greaterthanorequal => |a, b| a >= b;
    op_min => |a, b| a.min(b);
    op_max => |a, b| a.max(b);
}

/// Truncating division, the quotient rounds towards zero.
pub(super) fn op_div(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let (a, b, provenance) = peek_pair(m)?;
    let quotient = a.checked_div(&b).ok_or(ScriptError::DivByZero)?;
    replace_top(m, 2, quotient.into_stack_value(provenance))
}

/// The remainder takes the sign of the dividend.
pub(super) fn op_mod(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let (a, b, provenance) = peek_pair(m)?;
    let remainder = a.checked_rem(&b).ok_or(ScriptError::ModByZero)?;
    replace_top(m, 2, remainder.into_stack_value(provenance))
}

pub(super) fn op_numequalverify(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let (a, b, _) = peek_pair(m)?;
    if a != b {
        return Err(ScriptError::Verify(OP_NUMEQUALVERIFY));
    }
    m.stack.drop(2)?;
    Ok(Flow::Continue)
}

/// `[x min max] -> [min <= x < max]`
pub(super) fn op_within(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    let x = m.top_num(2)?;
    let min = m.top_num(1)?;
    let max = m.top_num(0)?;
    let provenance = Provenance::union([m.stack.top(2)?, m.stack.top(1)?, m.stack.top(0)?]);
    replace_top(m, 3, (min <= x && x < max).into_stack_value(provenance))
}
