use crate::interpreter::CheckSigError;
use crate::opcode::all::*;
use crate::sighash::signature_hash;
use crate::{
    Builder, Epoch, Error, NoSignatureCheck, RuleSet, ScriptError, SigHashError, SigHashType,
    TransactionSignatureChecker, VerifyFlags, verify_script,
};
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::deserialize;
use bitcoin::hashes::{Hash, hash160};
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

// https://www.blockchain.com/explorer/transactions/btc/12b5633bad1f9c167d523ad1aa1947b2732a865bf5414eab2f9e5ae5d5c191ba
const P2PK_SPEND_TX: &str = "010000000173805864da01f15093f7837607ab8be7c3705e29a9d4a12c9116d709f8911e590100000049483045022052ffc1929a2d8bd365c6a2a4e3421711b4b1e1b8781698ca9075807b4227abcb0221009984107ddb9e3813782b095d0d84361ed4c76e5edaf6561d252ae162c2341cfb01ffffffff0200e1f50500000000434104baa9d36653155627c740b3409a734d4eaf5dcca9fb4f736622ee18efcf0aec2b758b2ec40db18fbae708f691edb2d4a2a3775eb413d16e2e3c0f8d4c69119fd1ac009ce4a60000000043410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3ac00000000";

const P2PK_PUBKEY: &str = "0411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3";

const AMOUNT: u64 = 50_000;

const FORKID_ALL: u8 = 0x41;

fn verify_p2pk_spend(flags: VerifyFlags) -> Result<(), Error> {
    super::init_logger();

    let tx: Transaction = deserialize(&hex::decode(P2PK_SPEND_TX).unwrap()).unwrap();
    let script_pubkey = Builder::new()
        .push_slice(&hex::decode(P2PK_PUBKEY).unwrap())
        .push_opcode(OP_CHECKSIG)
        .into_bytes();

    // The amount does not enter the legacy digest.
    let checker = TransactionSignatureChecker::new(&tx, 0, 0);
    verify_script(
        tx.input[0].script_sig.as_bytes(),
        &script_pubkey,
        &flags,
        &checker,
    )
}

#[test]
fn test_basic_p2pk() {
    verify_p2pk_spend(RuleSet::for_epoch(Epoch::P2sh).flags()).expect("Verify p2pk");
    verify_p2pk_spend(RuleSet::for_epoch(Epoch::Bip65).flags()).expect("Verify p2pk");
}

#[test]
fn test_p2pk_high_s_rejected_under_low_s() {
    let err = verify_p2pk_spend(VerifyFlags::P2SH | VerifyFlags::LOW_S).unwrap_err();
    assert_eq!(
        err.script_error(),
        Some(&ScriptError::CheckSig(CheckSigError::HighS))
    );
}

#[test]
fn test_p2pk_without_fork_id_rejected_after_uahf() {
    let err = verify_p2pk_spend(RuleSet::for_epoch(Epoch::Uahf).flags()).unwrap_err();
    assert_eq!(
        err.script_error(),
        Some(&ScriptError::CheckSig(CheckSigError::MustUseForkId))
    );
}

#[test]
fn test_p2pk_wrong_key_is_false() {
    super::init_logger();

    let tx: Transaction = deserialize(&hex::decode(P2PK_SPEND_TX).unwrap()).unwrap();
    let other_key = PublicKey::from_secret_key(&Secp256k1::new(), &secret_key(9));
    let script_pubkey = Builder::new()
        .push_slice(&other_key.serialize())
        .push_opcode(OP_CHECKSIG)
        .into_bytes();

    let checker = TransactionSignatureChecker::new(&tx, 0, 0);
    let err = verify_script(
        tx.input[0].script_sig.as_bytes(),
        &script_pubkey,
        &VerifyFlags::P2SH,
        &checker,
    )
    .unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::EvalFalse));
}

fn secret_key(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).expect("Valid secret key")
}

fn pubkey(seed: u8) -> Vec<u8> {
    PublicKey::from_secret_key(&Secp256k1::new(), &secret_key(seed))
        .serialize()
        .to_vec()
}

fn spending_tx() -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(AMOUNT - 1_000),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

/// Signs input 0 of `tx` over `script_code` with the fork-id digest.
fn sign(tx: &Transaction, script_code: &[u8], seed: u8) -> Vec<u8> {
    let flags = RuleSet::chronicle().flags();
    let digest = signature_hash(
        tx,
        0,
        script_code,
        AMOUNT,
        SigHashType::from(FORKID_ALL),
        &flags,
    )
    .unwrap();
    let msg = Message::from_digest(digest.to_byte_array());
    let mut sig = Secp256k1::new()
        .sign_ecdsa(&msg, &secret_key(seed))
        .serialize_der()
        .to_vec();
    sig.push(FORKID_ALL);
    sig
}

fn one_of_two() -> Vec<u8> {
    Builder::new()
        .push_int(1)
        .push_slice(&pubkey(1))
        .push_slice(&pubkey(2))
        .push_int(2)
        .push_opcode(OP_CHECKMULTISIG)
        .into_bytes()
}

#[test]
fn test_checkmultisig_one_of_two() {
    super::init_logger();

    let tx = spending_tx();
    let checker = TransactionSignatureChecker::new(&tx, 0, AMOUNT);
    let flags = RuleSet::chronicle().flags();
    let script_pubkey = one_of_two();

    for seed in [1, 2] {
        let script_sig = Builder::new()
            .push_int(0)
            .push_slice(&sign(&tx, &script_pubkey, seed))
            .into_bytes();
        verify_script(&script_sig, &script_pubkey, &flags, &checker)
            .unwrap_or_else(|err| panic!("Key {seed} must satisfy 1-of-2: {err}"));
    }

    let script_sig = Builder::new()
        .push_int(0)
        .push_slice(&sign(&tx, &script_pubkey, 3))
        .into_bytes();
    let err = verify_script(&script_sig, &script_pubkey, &flags, &checker).unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::EvalFalse));
}

#[test]
fn test_checkmultisig_signature_order() {
    super::init_logger();

    let tx = spending_tx();
    let checker = TransactionSignatureChecker::new(&tx, 0, AMOUNT);
    let flags = RuleSet::chronicle().flags();
    let script_pubkey = Builder::new()
        .push_int(2)
        .push_slice(&pubkey(1))
        .push_slice(&pubkey(2))
        .push_int(2)
        .push_opcode(OP_CHECKMULTISIG)
        .into_bytes();

    let sig1 = sign(&tx, &script_pubkey, 1);
    let sig2 = sign(&tx, &script_pubkey, 2);

    let in_order = Builder::new()
        .push_int(0)
        .push_slice(&sig1)
        .push_slice(&sig2)
        .into_bytes();
    verify_script(&in_order, &script_pubkey, &flags, &checker).expect("2-of-2 in key order");

    let swapped = Builder::new()
        .push_int(0)
        .push_slice(&sig2)
        .push_slice(&sig1)
        .into_bytes();
    let err = verify_script(&swapped, &script_pubkey, &flags, &checker).unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::EvalFalse));
}

#[test]
fn test_checksig_fork_id() {
    super::init_logger();

    let tx = spending_tx();
    let flags = RuleSet::chronicle().flags();
    let script_pubkey = Builder::new()
        .push_slice(&pubkey(7))
        .push_opcode(OP_CHECKSIG)
        .into_bytes();
    let script_sig = Builder::new()
        .push_slice(&sign(&tx, &script_pubkey, 7))
        .into_bytes();

    let checker = TransactionSignatureChecker::new(&tx, 0, AMOUNT);
    verify_script(&script_sig, &script_pubkey, &flags, &checker).expect("Signed with key 7");

    // The fork-id digest commits to the spent amount.
    let checker = TransactionSignatureChecker::new(&tx, 0, AMOUNT + 1);
    let err = verify_script(&script_sig, &script_pubkey, &flags, &checker).unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::EvalFalse));
}

#[test]
fn test_signature_hash_failure_is_reported() {
    super::init_logger();

    let tx = spending_tx();
    let flags = RuleSet::chronicle().flags();
    let expected = ScriptError::SigHash(SigHashError::InputIndexOutOfRange {
        index: 1,
        inputs: 1,
    });
    // The transaction has a single input.
    let checker = TransactionSignatureChecker::new(&tx, 1, AMOUNT);

    let script_pubkey = Builder::new()
        .push_slice(&pubkey(7))
        .push_opcode(OP_CHECKSIG)
        .into_bytes();
    let script_sig = Builder::new()
        .push_slice(&sign(&tx, &script_pubkey, 7))
        .into_bytes();
    let err = verify_script(&script_sig, &script_pubkey, &flags, &checker).unwrap_err();
    assert_eq!(err.script_error(), Some(&expected));

    let script_pubkey = one_of_two();
    let script_sig = Builder::new()
        .push_int(0)
        .push_slice(&sign(&tx, &script_pubkey, 1))
        .into_bytes();
    let err = verify_script(&script_sig, &script_pubkey, &flags, &checker).unwrap_err();
    assert_eq!(err.script_error(), Some(&expected));
}

#[test]
fn test_code_separator_moves_script_code() {
    super::init_logger();

    let tx = spending_tx();
    let flags = RuleSet::chronicle().flags();
    let tail = Builder::new()
        .push_slice(&pubkey(4))
        .push_opcode(OP_CHECKSIG)
        .into_bytes();
    let script_pubkey = Builder::new()
        .push_opcode(OP_NOP)
        .push_opcode(OP_CODESEPARATOR)
        .push_raw(&tail)
        .into_bytes();
    let checker = TransactionSignatureChecker::new(&tx, 0, AMOUNT);

    // Only the part after the separator is signed.
    let script_sig = Builder::new().push_slice(&sign(&tx, &tail, 4)).into_bytes();
    verify_script(&script_sig, &script_pubkey, &flags, &checker).expect("Tail signature");

    let script_sig = Builder::new()
        .push_slice(&sign(&tx, &script_pubkey, 4))
        .into_bytes();
    assert!(verify_script(&script_sig, &script_pubkey, &flags, &checker).is_err());
}

fn p2sh(redeem_script: &[u8]) -> Vec<u8> {
    Builder::new()
        .push_opcode(OP_HASH160)
        .push_slice(&hash160::Hash::hash(redeem_script).to_byte_array())
        .push_opcode(OP_EQUAL)
        .into_bytes()
}

#[test]
fn test_p2sh() {
    super::init_logger();

    let redeem_script = Builder::new().push_int(5).push_opcode(OP_EQUAL).into_bytes();
    let script_pubkey = p2sh(&redeem_script);
    let spend = |n: i64| {
        Builder::new()
            .push_int(n)
            .push_slice(&redeem_script)
            .into_bytes()
    };

    for epoch in [Epoch::P2sh, Epoch::Magnetic] {
        let flags = RuleSet::for_epoch(epoch).flags();
        verify_script(&spend(5), &script_pubkey, &flags, &NoSignatureCheck)
            .unwrap_or_else(|err| panic!("Redeem script must pass under {epoch}: {err}"));

        let err = verify_script(&spend(6), &script_pubkey, &flags, &NoSignatureCheck).unwrap_err();
        assert_eq!(err.script_error(), Some(&ScriptError::EvalFalse));
    }

    // Without P2SH only the hash is checked.
    verify_script(&spend(6), &script_pubkey, &VerifyFlags::NONE, &NoSignatureCheck)
        .expect("Hash matches");
}

#[test]
fn test_p2sh_requires_push_only_script_sig() {
    let redeem_script = Builder::new().push_int(1).into_bytes();
    let script_pubkey = p2sh(&redeem_script);
    let script_sig = Builder::new()
        .push_int(1)
        .push_opcode(OP_DROP)
        .push_slice(&redeem_script)
        .into_bytes();

    let err = verify_script(
        &script_sig,
        &script_pubkey,
        &VerifyFlags::P2SH,
        &NoSignatureCheck,
    )
    .unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::SigPushOnly));
}

#[test]
fn test_genesis_retires_p2sh() {
    let redeem_script = Builder::new().push_int(5).push_opcode(OP_EQUAL).into_bytes();
    let script_pubkey = p2sh(&redeem_script);
    let script_sig = Builder::new()
        .push_int(6)
        .push_slice(&redeem_script)
        .into_bytes();

    // The redeem script never runs, the leftover item breaks the clean stack.
    let err = verify_script(
        &script_sig,
        &script_pubkey,
        &RuleSet::genesis().flags(),
        &NoSignatureCheck,
    )
    .unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::CleanStack));

    let flags = RuleSet::genesis().flags() - VerifyFlags::CLEANSTACK;
    verify_script(&script_sig, &script_pubkey, &flags, &NoSignatureCheck)
        .expect("Only the hash is checked");
}

#[test]
fn test_genesis_script_sig_push_only() {
    let script_sig = Builder::new().push_int(1).push_opcode(OP_DUP).into_bytes();
    let script_pubkey = Builder::new().push_opcode(OP_DROP).into_bytes();

    let err = verify_script(
        &script_sig,
        &script_pubkey,
        &RuleSet::genesis().flags(),
        &NoSignatureCheck,
    )
    .unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::SigPushOnly));

    verify_script(
        &script_sig,
        &script_pubkey,
        &RuleSet::legacy().flags(),
        &NoSignatureCheck,
    )
    .expect("Non-push scriptSig allowed before genesis");
}

#[test]
fn test_cleanstack() {
    let script_sig = Builder::new().push_int(1).push_int(1).into_bytes();
    let script_pubkey = Builder::new().push_opcode(OP_NOP).into_bytes();

    let err = verify_script(
        &script_sig,
        &script_pubkey,
        &RuleSet::chronicle().flags(),
        &NoSignatureCheck,
    )
    .unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::CleanStack));
    let Error::Execution(err) = err else {
        panic!("Clean stack is an execution failure");
    };
    assert_eq!(err.context.stack.len(), 2);

    verify_script(
        &script_sig,
        &script_pubkey,
        &RuleSet::legacy().flags(),
        &NoSignatureCheck,
    )
    .expect("Clean stack not enforced before magnetic");
}

#[test]
fn test_scripts_run_on_separate_machines() {
    // An open branch in the scriptSig does not carry over.
    let script_sig = Builder::new().push_int(1).push_opcode(OP_IF).into_bytes();
    let script_pubkey = Builder::new().push_int(1).push_opcode(OP_ENDIF).into_bytes();

    let err = verify_script(
        &script_sig,
        &script_pubkey,
        &RuleSet::legacy().flags(),
        &NoSignatureCheck,
    )
    .unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::UnbalancedConditional));
}
