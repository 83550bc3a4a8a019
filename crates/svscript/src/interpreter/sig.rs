use super::{Flow, Machine};
use crate::constants::HALF_ORDER;
use crate::error::ScriptError;
use crate::flags::VerifyFlags;
use crate::opcode::all::*;
use crate::parser::{Chunk, find_and_delete, push_encoding};
use crate::sighash::SigHashType;
use crate::value::{Provenance, StackValue};
use num_bigint::BigUint;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureEncodingError {
    #[error("DER encoded signature is too short")]
    TooShort,
    #[error("DER encoded signature is too long")]
    TooLong,
    #[error("signature does not have the expected ASN.1 sequence ID")]
    InvalidSequenceId,
    #[error("signature length")]
    InvalidDataLength,
    #[error("R integer marker")]
    InvalidIntegerIdR,
    #[error("R length is zero")]
    ZeroLengthR,
    #[error("R is negative")]
    NegativeR,
    #[error("R value has too much padding")]
    TooMuchPaddingR,
    #[error("S integer marker")]
    InvalidIntegerIdS,
    #[error("S length is zero")]
    ZeroLengthS,
    #[error("S is negative")]
    NegativeS,
    #[error("S value has too much padding")]
    TooMuchPaddingS,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckSigError {
    #[error("invalid signature encoding: {0:?}")]
    SignatureEncoding(#[from] SignatureEncodingError),
    #[error("Signature violates low-S requirement")]
    HighS,
    #[error("Unsupported signature hash type")]
    SigHashType,
    #[error("Signature uses SIGHASH_FORKID before it is enabled")]
    IllegalForkId,
    #[error("Signature must use SIGHASH_FORKID")]
    MustUseForkId,
    #[error("public key type")]
    PubkeyEncoding,
}

/// `[sig pubkey] -> [valid]`, OP_CHECKSIGVERIFY fails instead of pushing false.
pub(super) fn op_checksig(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    let sig = m.stack.top(1)?;
    let pubkey = m.stack.top(0)?;

    // A signature cannot sign itself.
    let script_code = find_and_delete(m.script_code(), &push_encoding(sig.as_bytes()));

    check_signature_encoding(sig.as_bytes(), &m.flags)?;
    check_pubkey_encoding(pubkey.as_bytes(), &m.flags)?;

    let success = !sig.is_empty()
        && m.checker
            .check_signature(sig.as_bytes(), pubkey.as_bytes(), &script_code, &m.flags)?;

    let provenance = Provenance::union([sig, pubkey]);

    m.stack.drop(2)?;

    if chunk.opcode() == OP_CHECKSIGVERIFY {
        if !success {
            return Err(ScriptError::Verify(OP_CHECKSIGVERIFY));
        }
    } else {
        m.push(StackValue::bool(success, provenance));
    }

    Ok(Flow::Continue)
}

/// Checks `sig`, the DER signature followed by its hash type byte, against
/// the encoding rules enabled in `flags`.
pub fn check_signature_encoding(sig: &[u8], flags: &VerifyFlags) -> Result<(), CheckSigError> {
    // Empty signature. Not strictly DER encoded, but allowed to provide a
    // compact way to provide an invalid signature for use with CHECK(MULTI)SIG
    let Some(&hash_type) = sig.last() else {
        return Ok(());
    };

    if flags.intersects(VerifyFlags::DERSIG | VerifyFlags::LOW_S | VerifyFlags::STRICTENC) {
        let encoded_s = is_valid_signature_encoding(sig)?;

        if flags.verify_low_s() {
            let s = &sig[encoded_s.offset..encoded_s.offset + encoded_s.length];
            // The complement of a high S verifies too, malleating the txid.
            if BigUint::from_bytes_be(s) > *HALF_ORDER {
                return Err(CheckSigError::HighS);
            }
        }
    }

    if flags.verify_strictenc() {
        let hash_type = SigHashType::from(hash_type);

        if !hash_type.is_defined() {
            return Err(CheckSigError::SigHashType);
        }

        match (hash_type.has_fork_id(), flags.enable_sighash_forkid()) {
            (true, false) => return Err(CheckSigError::IllegalForkId),
            (false, true) => return Err(CheckSigError::MustUseForkId),
            _ => {}
        }
    }

    Ok(())
}

/// Checks whether or not the passed public key adheres to the strict
/// encoding requirements if enabled.
pub fn check_pubkey_encoding(pubkey: &[u8], flags: &VerifyFlags) -> Result<(), CheckSigError> {
    if flags.verify_strictenc() && !is_public_key(pubkey) {
        return Err(CheckSigError::PubkeyEncoding);
    }
    Ok(())
}

fn is_public_key(v: &[u8]) -> bool {
    match v.len() {
        33 if v[0] == 2 || v[0] == 3 => true, // Compressed
        65 if v[0] == 4 => true,              // Uncompressed
        _ => false,
    }
}

struct EncodedS {
    /// S offset
    offset: usize,
    /// S length.
    length: usize,
}

// 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S] [sighash-type]
//
// https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#der-encoding
fn is_valid_signature_encoding(sig: &[u8]) -> Result<EncodedS, SignatureEncodingError> {
    // Minimum and maximum size constraints
    if sig.len() < 9 {
        return Err(SignatureEncodingError::TooShort);
    }

    if sig.len() > 73 {
        return Err(SignatureEncodingError::TooLong);
    }

    // A signature is of type 0x30 (compound)
    if sig[0] != 0x30 {
        return Err(SignatureEncodingError::InvalidSequenceId);
    }

    // Make sure the length covers the entire signature
    if sig[1] as usize != sig.len() - 3 {
        return Err(SignatureEncodingError::InvalidDataLength);
    }

    let len_r = sig[3] as usize;

    // Make sure the length of the S element is still inside the signature
    if 5 + len_r >= sig.len() {
        return Err(SignatureEncodingError::InvalidDataLength);
    }

    let len_s = sig[5 + len_r] as usize;

    if len_r + len_s + 7 != sig.len() {
        return Err(SignatureEncodingError::InvalidDataLength);
    }

    if sig[2] != 0x02 {
        return Err(SignatureEncodingError::InvalidIntegerIdR);
    }

    if len_r == 0 {
        return Err(SignatureEncodingError::ZeroLengthR);
    }

    if sig[4] & 0x80 != 0 {
        return Err(SignatureEncodingError::NegativeR);
    }

    // Null bytes at the start of R are not allowed, unless R would otherwise
    // be interpreted as a negative number
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return Err(SignatureEncodingError::TooMuchPaddingR);
    }

    if sig[len_r + 4] != 0x02 {
        return Err(SignatureEncodingError::InvalidIntegerIdS);
    }

    if len_s == 0 {
        return Err(SignatureEncodingError::ZeroLengthS);
    }

    if sig[len_r + 6] & 0x80 != 0 {
        return Err(SignatureEncodingError::NegativeS);
    }

    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return Err(SignatureEncodingError::TooMuchPaddingS);
    }

    Ok(EncodedS {
        offset: len_r + 6,
        length: len_s,
    })
}
