use super::eval_script;
use crate::LOG_TARGET;
use crate::error::{Error, ExecutionError, FailureContext, ScriptError};
use crate::flags::VerifyFlags;
use crate::parser::Program;
use crate::signature_checker::SignatureChecker;
use crate::stack::Stack;

/// Failure after evaluation, reporting the final stack.
fn final_state_error(reason: ScriptError, stack: &Stack) -> ExecutionError {
    ExecutionError::new(
        reason,
        FailureContext {
            stack: stack.to_vec(),
            ..Default::default()
        },
    )
}

/// Fails unless the script left a true value on top of the stack.
fn require_true_top(success: bool, stack: &Stack) -> Result<(), ExecutionError> {
    if success {
        Ok(())
    } else {
        Err(final_state_error(ScriptError::EvalFalse, stack))
    }
}

/// Verifies that `script_sig` satisfies `script_pubkey`.
///
/// - Ok(()): the spend is valid.
/// - Err(err): the first rule violated, with the state at that point.
pub fn verify_script(
    script_sig: &[u8],
    script_pubkey: &[u8],
    flags: &VerifyFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), Error> {
    let script_sig = Program::parse(script_sig)?;
    let script_pubkey = Program::parse(script_pubkey)?;

    if flags.is_genesis() && !script_sig.is_push_only() {
        return Err(ExecutionError::bare(ScriptError::SigPushOnly).into());
    }

    // scriptSig and scriptPubKey must be evaluated sequentially on the same
    // stack rather than being simply concatenated (see CVE-2010-5141).
    let mut stack = Stack::default();

    eval_script(&mut stack, &script_sig, flags, checker)?;

    let stack_copy = flags.verify_p2sh().then(|| stack.clone());

    let success = eval_script(&mut stack, &script_pubkey, flags, checker)?;
    require_true_top(success, &stack)?;

    // Additional validation for spend-to-script-hash transactions, which
    // genesis retires.
    if let Some(mut stack_copy) = stack_copy.filter(|_| !flags.is_genesis() && script_pubkey.is_p2sh())
    {
        if !script_sig.is_push_only() {
            return Err(ExecutionError::bare(ScriptError::SigPushOnly).into());
        }

        // The copy cannot be empty, the P2SH template would have failed on
        // an empty stack above.
        let redeem_script = stack_copy.pop().map_err(ExecutionError::bare)?.into_bytes();
        let redeem_script = Program::parse(&redeem_script)?;

        tracing::trace!(target: LOG_TARGET, "Evaluating redeem script {redeem_script}");

        let success = eval_script(&mut stack_copy, &redeem_script, flags, checker)?;
        require_true_top(success, &stack_copy)?;

        stack = stack_copy;
    }

    // Performed after the P2SH evaluation, the non-P2SH evaluation of a P2SH
    // script leaves the redeem script inputs behind.
    if flags.verify_cleanstack() && stack.len() != 1 {
        return Err(final_state_error(ScriptError::CleanStack, &stack).into());
    }

    Ok(())
}
