use num_traits::Num;
use std::sync::LazyLock;

/// Maximum size in bytes of a single pushed element before genesis.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum size in bytes of a script before genesis.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// The maximum combined height of stack and alt stack during script execution.
pub const MAX_STACK_SIZE: usize = 1000;

/// Stack memory budget once genesis applies.
pub const MAX_STACK_MEMORY_USAGE: u64 = 100_000_000;

/// Accounting overhead charged per stack item against [`MAX_STACK_MEMORY_USAGE`].
pub const STACK_ELEMENT_OVERHEAD: u64 = 32;

/// Maximum number of public keys per multisig.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: u64 = 201;

/// Maximum number of non-push operations per script once magnetic applies.
pub const MAX_OPS_PER_SCRIPT_MAGNETIC: u64 = 500;

/// Lock times below this are block heights, from it on Unix timestamps.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000;

/// Sequence number marking an input as final.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_FORKID: u32 = 0x40;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Half of the secp256k1 group order, the upper bound of a low S value.
pub static HALF_ORDER: LazyLock<num_bigint::BigUint> = LazyLock::new(|| {
    const HALF_N: &str = "7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0";
    num_bigint::BigUint::from_str_radix(HALF_N, 16).expect("Static value must be valid")
});
