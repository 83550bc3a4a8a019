pub mod disasm;
pub mod eval;
pub mod sighash;
pub mod verify;
