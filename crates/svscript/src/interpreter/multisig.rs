use super::sig::{check_pubkey_encoding, check_signature_encoding};
use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::opcode::all::*;
use crate::parser::{Chunk, find_and_delete, push_encoding};
use crate::value::{Provenance, StackValue};

/// Multisig error type.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CheckMultiSigError {
    #[error("Invalid number of pubkeys")]
    PubkeyCount,
    #[error("Invalid number of signatures")]
    SigCount,
    #[error("Multisig dummy argument has length {0} instead of 0")]
    SigNullDummy(usize),
}

/// `[dummy sig... n_sigs key... n_keys] -> [valid]`
///
/// Signatures must appear in the same order as their keys, each key is tried
/// at most once.
pub(super) fn op_checkmultisig(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    let mut i = 1;

    let keys_count = m
        .top_num(i - 1)?
        .to_usize()
        .filter(|n| *n <= m.limits.max_pubkeys_per_multisig)
        .ok_or(CheckMultiSigError::PubkeyCount)?;

    // Every key counts as an operation.
    m.op_count = m.op_count.saturating_add(keys_count as u64);
    if m.op_count > m.limits.max_ops {
        return Err(ScriptError::OpCount);
    }

    let mut ikey = i + 1;
    i += 1 + keys_count;

    let sigs_count = m
        .top_num(i - 1)?
        .to_usize()
        .filter(|n| *n <= keys_count)
        .ok_or(CheckMultiSigError::SigCount)?;

    let mut isig = i + 1;
    i += 1 + sigs_count;

    // One more item than the counts account for, the dummy.
    m.stack.require(i)?;

    let mut script_code = m.script_code().to_vec();
    for k in 0..sigs_count {
        let sig = m.stack.top(isig - 1 + k)?;
        script_code = find_and_delete(&script_code, &push_encoding(sig.as_bytes()));
    }

    let mut success = true;
    let mut sigs_left = sigs_count;
    let mut keys_left = keys_count;

    while success && sigs_left > 0 {
        let sig = m.stack.top(isig - 1)?;
        let key = m.stack.top(ikey - 1)?;

        check_signature_encoding(sig.as_bytes(), &m.flags)?;
        check_pubkey_encoding(key.as_bytes(), &m.flags)?;

        if !sig.is_empty()
            && m.checker
                .check_signature(sig.as_bytes(), key.as_bytes(), &script_code, &m.flags)?
        {
            isig += 1;
            sigs_left -= 1;
        }

        ikey += 1;
        keys_left -= 1;

        // More signatures left than keys means the remaining ones cannot match.
        if sigs_left > keys_left {
            success = false;
        }
    }

    let provenance = Provenance::union(m.stack.iter().rev().take(i));

    let dummy = m.stack.top(i - 1)?;
    if m.flags.verify_nulldummy() && !dummy.is_empty() {
        return Err(CheckMultiSigError::SigNullDummy(dummy.len()).into());
    }

    m.stack.drop(i)?;

    if chunk.opcode() == OP_CHECKMULTISIGVERIFY {
        if !success {
            return Err(ScriptError::Verify(OP_CHECKMULTISIGVERIFY));
        }
    } else {
        m.push(StackValue::bool(success, provenance));
    }

    Ok(Flow::Continue)
}
