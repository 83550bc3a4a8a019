//! Transaction digests committed to by signatures.

use crate::LOG_TARGET;
use crate::constants::{SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_NONE, SIGHASH_SINGLE};
use crate::flags::VerifyFlags;
use crate::parser::remove_code_separators;
use bitcoin::consensus::encode::{Encodable, VarInt};
use bitcoin::hashes::{Hash, sha256d};
use bitcoin::{Amount, ScriptBuf, Sequence, Transaction, TxOut};
use std::fmt;

/// Hash type byte appended to a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigHashType(u32);

impl SigHashType {
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// ALL, NONE or SINGLE, with the modifier bits masked off.
    pub const fn base_type(self) -> u32 {
        self.0 & 0x1f
    }

    pub const fn anyone_can_pay(self) -> bool {
        self.0 & SIGHASH_ANYONECANPAY != 0
    }

    pub const fn has_fork_id(self) -> bool {
        self.0 & SIGHASH_FORKID != 0
    }

    /// Whether the base type is one of ALL, NONE or SINGLE once both
    /// modifiers are stripped.
    pub const fn is_defined(self) -> bool {
        let base = self.0 & !(SIGHASH_ANYONECANPAY | SIGHASH_FORKID);
        base >= 1 && base <= 3
    }
}

impl From<u8> for SigHashType {
    fn from(byte: u8) -> Self {
        Self(byte as u32)
    }
}

impl fmt::Display for SigHashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base_type() {
            1 => "ALL",
            2 => "NONE",
            3 => "SINGLE",
            _ => return write!(f, "{:#04x}", self.0),
        };
        f.write_str(base)?;
        if self.has_fork_id() {
            f.write_str("|FORKID")?;
        }
        if self.anyone_can_pay() {
            f.write_str("|ANYONECANPAY")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigHashError {
    #[error("input index {index} out of range, transaction has {inputs} inputs")]
    InputIndexOutOfRange { index: usize, inputs: usize },
}

/// Encodes `value` into an in-memory buffer.
fn encode_into<T: Encodable + ?Sized>(value: &T, buf: &mut Vec<u8>) {
    value
        .consensus_encode(buf)
        .expect("Writing to a Vec never fails; qed");
}

fn encode_script_code(script_code: &[u8], buf: &mut Vec<u8>) {
    encode_into(&VarInt(script_code.len() as u64), buf);
    buf.extend_from_slice(script_code);
}

fn check_input_index(tx: &Transaction, input_index: usize) -> Result<(), SigHashError> {
    if input_index >= tx.input.len() {
        return Err(SigHashError::InputIndexOutOfRange {
            index: input_index,
            inputs: tx.input.len(),
        });
    }
    Ok(())
}

/// Digest of the original signature scheme.
///
/// A SINGLE signature on an input without a matching output signs the
/// constant `01 00 .. 00` instead of failing.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    hash_type: SigHashType,
) -> Result<sha256d::Hash, SigHashError> {
    check_input_index(tx, input_index)?;

    let base_type = hash_type.base_type();

    if base_type == SIGHASH_SINGLE && input_index >= tx.output.len() {
        let mut one = [0u8; 32];
        one[0] = 1;
        return Ok(sha256d::Hash::from_byte_array(one));
    }

    let script_code = ScriptBuf::from_bytes(remove_code_separators(script_code));

    let mut tx_copy = tx.clone();

    for (i, input) in tx_copy.input.iter_mut().enumerate() {
        input.witness.clear();
        if i == input_index {
            input.script_sig = script_code.clone();
        } else {
            input.script_sig = ScriptBuf::new();
            if base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
                input.sequence = Sequence::ZERO;
            }
        }
    }

    if base_type == SIGHASH_NONE {
        tx_copy.output.clear();
    } else if base_type == SIGHASH_SINGLE {
        tx_copy.output.truncate(input_index + 1);
        for output in tx_copy.output.iter_mut().take(input_index) {
            *output = TxOut {
                value: Amount::from_sat(u64::MAX),
                script_pubkey: ScriptBuf::new(),
            };
        }
    }

    if hash_type.anyone_can_pay() {
        let signing_input = tx_copy.input.swap_remove(input_index);
        tx_copy.input = vec![signing_input];
    }

    let mut preimage = Vec::new();
    encode_into(&tx_copy.version, &mut preimage);
    encode_into(&tx_copy.input, &mut preimage);
    encode_into(&tx_copy.output, &mut preimage);
    encode_into(&tx_copy.lock_time, &mut preimage);
    preimage.extend_from_slice(&hash_type.to_u32().to_le_bytes());

    Ok(sha256d::Hash::hash(&preimage))
}

/// Digest committing to the spent amount, in the BIP143 preimage layout.
pub fn fork_id_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    hash_type: SigHashType,
) -> Result<sha256d::Hash, SigHashError> {
    check_input_index(tx, input_index)?;

    let base_type = hash_type.base_type();
    let anyone_can_pay = hash_type.anyone_can_pay();
    let zero = sha256d::Hash::all_zeros();

    let hash_prevouts = if anyone_can_pay {
        zero
    } else {
        let mut buf = Vec::with_capacity(tx.input.len() * 36);
        for input in &tx.input {
            encode_into(&input.previous_output, &mut buf);
        }
        sha256d::Hash::hash(&buf)
    };

    let hash_sequence =
        if anyone_can_pay || base_type == SIGHASH_SINGLE || base_type == SIGHASH_NONE {
            zero
        } else {
            let mut buf = Vec::with_capacity(tx.input.len() * 4);
            for input in &tx.input {
                encode_into(&input.sequence, &mut buf);
            }
            sha256d::Hash::hash(&buf)
        };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        let mut buf = Vec::new();
        for output in &tx.output {
            encode_into(output, &mut buf);
        }
        sha256d::Hash::hash(&buf)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.output.len() {
        let mut buf = Vec::new();
        encode_into(&tx.output[input_index], &mut buf);
        sha256d::Hash::hash(&buf)
    } else {
        zero
    };

    let input = &tx.input[input_index];

    let mut preimage = Vec::with_capacity(156 + script_code.len());
    encode_into(&tx.version, &mut preimage);
    preimage.extend_from_slice(hash_prevouts.as_byte_array());
    preimage.extend_from_slice(hash_sequence.as_byte_array());
    encode_into(&input.previous_output, &mut preimage);
    encode_script_code(script_code, &mut preimage);
    preimage.extend_from_slice(&amount.to_le_bytes());
    encode_into(&input.sequence, &mut preimage);
    preimage.extend_from_slice(hash_outputs.as_byte_array());
    encode_into(&tx.lock_time, &mut preimage);
    preimage.extend_from_slice(&hash_type.to_u32().to_le_bytes());

    Ok(sha256d::Hash::hash(&preimage))
}

/// Digest a signature with `hash_type` commits to under `flags`.
///
/// The fork-id scheme applies when the hash type carries the fork-id bit and
/// the rules enable it, the legacy scheme otherwise.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    hash_type: SigHashType,
    flags: &VerifyFlags,
) -> Result<sha256d::Hash, SigHashError> {
    let use_fork_id = hash_type.has_fork_id() && flags.enable_sighash_forkid();

    tracing::debug!(
        target: LOG_TARGET,
        "Computing {} digest for input {input_index}, hash type {hash_type}",
        if use_fork_id { "fork-id" } else { "legacy" },
    );

    if use_fork_id {
        fork_id_signature_hash(tx, input_index, script_code, amount, hash_type)
    } else {
        legacy_signature_hash(tx, input_index, script_code, hash_type)
    }
}
