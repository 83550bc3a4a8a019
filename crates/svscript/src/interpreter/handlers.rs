//! Opcode dispatch table.

use super::{Flow, Machine, arithmetic, bitwise, control, crypto, multisig, sig, splice, stack_ops};
use crate::error::ScriptError;
use crate::opcode::all::*;
use crate::parser::Chunk;

/// Executes one non-push opcode.
///
/// Handlers validate every operand before touching the stacks.
pub(super) type OpHandler = fn(&mut Machine<'_>, &Chunk) -> Result<Flow, ScriptError>;

/// Handler of each opcode byte, unassigned bytes fail with a bad opcode.
pub(super) static HANDLERS: [OpHandler; 256] = build_table();

const fn build_table() -> [OpHandler; 256] {
    let mut table: [OpHandler; 256] = [control::op_bad as OpHandler; 256];

    macro_rules! op {
        ($($opcode:ident)|+ => $handler:path) => {
            $(table[$opcode.to_u8() as usize] = $handler;)+
        };
    }

    // Constants.
    op!(OP_1NEGATE | OP_1 | OP_2 | OP_3 | OP_4 | OP_5 | OP_6 | OP_7 | OP_8 | OP_9 | OP_10
        | OP_11 | OP_12 | OP_13 | OP_14 | OP_15 | OP_16 => stack_ops::op_small_int);

    // Flow control.
    op!(OP_NOP => control::op_nop);
    op!(OP_IF | OP_NOTIF => control::op_if);
    op!(OP_ELSE => control::op_else);
    op!(OP_ENDIF => control::op_endif);
    op!(OP_VERIFY => control::op_verify);
    op!(OP_RETURN => control::op_return);

    // Stack.
    op!(OP_TOALTSTACK => stack_ops::op_toaltstack);
    op!(OP_FROMALTSTACK => stack_ops::op_fromaltstack);
    op!(OP_2DROP => stack_ops::op_2drop);
    op!(OP_2DUP => stack_ops::op_2dup);
    op!(OP_3DUP => stack_ops::op_3dup);
    op!(OP_2OVER => stack_ops::op_2over);
    op!(OP_2ROT => stack_ops::op_2rot);
    op!(OP_2SWAP => stack_ops::op_2swap);
    op!(OP_IFDUP => stack_ops::op_ifdup);
    op!(OP_DEPTH => stack_ops::op_depth);
    op!(OP_DROP => stack_ops::op_drop);
    op!(OP_DUP => stack_ops::op_dup);
    op!(OP_NIP => stack_ops::op_nip);
    op!(OP_OVER => stack_ops::op_over);
    op!(OP_PICK | OP_ROLL => stack_ops::op_pick_roll);
    op!(OP_ROT => stack_ops::op_rot);
    op!(OP_SWAP => stack_ops::op_swap);
    op!(OP_TUCK => stack_ops::op_tuck);

    // Splice.
    op!(OP_CAT => splice::op_cat);
    op!(OP_SPLIT => splice::op_split);
    op!(OP_NUM2BIN => splice::op_num2bin);
    op!(OP_BIN2NUM => splice::op_bin2num);
    op!(OP_SIZE => splice::op_size);

    // Bitwise logic.
    op!(OP_INVERT => bitwise::op_invert);
    op!(OP_AND => bitwise::op_and);
    op!(OP_OR => bitwise::op_or);
    op!(OP_XOR => bitwise::op_xor);
    op!(OP_EQUAL => bitwise::op_equal);
    op!(OP_EQUALVERIFY => bitwise::op_equalverify);
    op!(OP_LSHIFT => bitwise::op_lshift);
    op!(OP_RSHIFT => bitwise::op_rshift);

    // Arithmetic.
    op!(OP_1ADD => arithmetic::op_1add);
    op!(OP_1SUB => arithmetic::op_1sub);
    op!(OP_NEGATE => arithmetic::op_negate);
    op!(OP_ABS => arithmetic::op_abs);
    op!(OP_NOT => arithmetic::op_not);
    op!(OP_0NOTEQUAL => arithmetic::op_0notequal);
    op!(OP_ADD => arithmetic::op_add);
    op!(OP_SUB => arithmetic::op_sub);
    op!(OP_MUL => arithmetic::op_mul);
    op!(OP_DIV => arithmetic::op_div);
    op!(OP_MOD => arithmetic::op_mod);
    op!(OP_BOOLAND => arithmetic::op_booland);
    op!(OP_BOOLOR => arithmetic::op_boolor);
    op!(OP_NUMEQUAL => arithmetic::op_numequal);
    op!(OP_NUMEQUALVERIFY => arithmetic::op_numequalverify);
    op!(OP_NUMNOTEQUAL => arithmetic::op_numnotequal);
    op!(OP_LESSTHAN => arithmetic::op_lessthan);
    op!(OP_GREATERTHAN => arithmetic::op_greaterthan);
    op!(OP_LESSTHANOREQUAL => arithmetic::op_lessthanorequal);
    op!(OP_GREATERTHANOREQUAL => arithmetic::op_greaterthanorequal);
    op!(OP_MIN => arithmetic::op_min);
    op!(OP_MAX => arithmetic::op_max);
    op!(OP_WITHIN => arithmetic::op_within);

    // Crypto.
    op!(OP_RIPEMD160 => crypto::op_ripemd160);
    op!(OP_SHA1 => crypto::op_sha1);
    op!(OP_SHA256 => crypto::op_sha256);
    op!(OP_HASH160 => crypto::op_hash160);
    op!(OP_HASH256 => crypto::op_hash256);
    op!(OP_CODESEPARATOR => crypto::op_codeseparator);
    op!(OP_CHECKSIG | OP_CHECKSIGVERIFY => sig::op_checksig);
    op!(OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => multisig::op_checkmultisig);

    // Expansion.
    op!(OP_CHECKLOCKTIMEVERIFY => control::op_checklocktimeverify);
    op!(OP_NOP1 | OP_NOP3 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9
        | OP_NOP10 => control::op_upgradable_nop);

    table
}
