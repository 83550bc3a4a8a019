use crate::constants::{LOCKTIME_THRESHOLD, SEQUENCE_FINAL};
use crate::flags::VerifyFlags;
use crate::num::ScriptNum;
use crate::sighash::{SigHashError, SigHashType, signature_hash};
use bitcoin::Transaction;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly, ecdsa};
use std::sync::LazyLock;

static SECP: LazyLock<Secp256k1<VerifyOnly>> = LazyLock::new(Secp256k1::verification_only);

/// Checks transaction signature
pub trait SignatureChecker {
    /// Verifies `sig`, the DER signature followed by its hash type byte,
    /// against `pubkey` over the digest of `script_code`.
    ///
    /// Malformed keys or signatures simply do not verify, while a digest that
    /// cannot be computed for this transaction is an error.
    fn check_signature(
        &self,
        sig: &[u8],
        pubkey: &[u8],
        script_code: &[u8],
        flags: &VerifyFlags,
    ) -> Result<bool, SigHashError>;

    fn check_lock_time(&self, lock_time: &ScriptNum) -> bool;
}

/// Evaluates scripts outside of any transaction, every check fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignatureCheck;

impl SignatureChecker for NoSignatureCheck {
    fn check_signature(
        &self,
        _sig: &[u8],
        _pubkey: &[u8],
        _script_code: &[u8],
        _flags: &VerifyFlags,
    ) -> Result<bool, SigHashError> {
        Ok(false)
    }

    fn check_lock_time(&self, _lock_time: &ScriptNum) -> bool {
        false
    }
}

/// Checks signatures of one input of `tx`, which spends `amount` satoshis.
#[derive(Debug, Clone, Copy)]
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: u64,
}

impl<'a> TransactionSignatureChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize, amount: u64) -> Self {
        Self {
            tx,
            input_index,
            amount,
        }
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_signature(
        &self,
        sig: &[u8],
        pubkey: &[u8],
        script_code: &[u8],
        flags: &VerifyFlags,
    ) -> Result<bool, SigHashError> {
        let Some((&hash_type, der)) = sig.split_last() else {
            return Ok(false);
        };

        let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
            return Ok(false);
        };

        let Ok(mut signature) = ecdsa::Signature::from_der_lax(der) else {
            return Ok(false);
        };
        // libsecp256k1 only accepts low S, whether high S is allowed is up to
        // the encoding checks.
        signature.normalize_s();

        let digest = signature_hash(
            self.tx,
            self.input_index,
            script_code,
            self.amount,
            SigHashType::from(hash_type),
            flags,
        )?;

        let msg = Message::from_digest(digest.to_byte_array());

        Ok(SECP.verify_ecdsa(&msg, &signature, &pubkey).is_ok())
    }

    fn check_lock_time(&self, lock_time: &ScriptNum) -> bool {
        let Some(lock_time) = lock_time.to_i64() else {
            return false;
        };
        let tx_lock_time = self.tx.lock_time.to_consensus_u32() as i64;

        // Both must be block heights or both timestamps.
        let same_domain = (tx_lock_time < LOCKTIME_THRESHOLD && lock_time < LOCKTIME_THRESHOLD)
            || (tx_lock_time >= LOCKTIME_THRESHOLD && lock_time >= LOCKTIME_THRESHOLD);
        if !same_domain || lock_time > tx_lock_time {
            return false;
        }

        // A final input disables the transaction lock time altogether.
        self.tx
            .input
            .get(self.input_index)
            .is_some_and(|input| input.sequence.0 != SEQUENCE_FINAL)
    }
}
