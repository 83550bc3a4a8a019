use super::{Flow, Machine};
use crate::error::ScriptError;
use crate::parser::Chunk;
use bitcoin::hashes::{Hash, hash160, ripemd160, sha1, sha256, sha256d};

/// Replaces the top item with its digest, keeping its provenance.
fn hash_top(m: &mut Machine<'_>, hash: fn(&[u8]) -> Vec<u8>) -> Result<Flow, ScriptError> {
    let top = m.stack.top_mut(0)?;
    let digest = hash(top.as_bytes());
    *top.bytes_mut() = digest;
    Ok(Flow::Continue)
}

pub(super) fn op_ripemd160(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    hash_top(m, |data| ripemd160::Hash::hash(data).to_byte_array().to_vec())
}

pub(super) fn op_sha1(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    hash_top(m, |data| sha1::Hash::hash(data).to_byte_array().to_vec())
}

pub(super) fn op_sha256(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    hash_top(m, |data| sha256::Hash::hash(data).to_byte_array().to_vec())
}

pub(super) fn op_hash160(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    hash_top(m, |data| hash160::Hash::hash(data).to_byte_array().to_vec())
}

pub(super) fn op_hash256(m: &mut Machine<'_>, _chunk: &Chunk) -> Result<Flow, ScriptError> {
    hash_top(m, |data| sha256d::Hash::hash(data).to_byte_array().to_vec())
}

/// Signatures after this point commit only to the script following it.
pub(super) fn op_codeseparator(m: &mut Machine<'_>, chunk: &Chunk) -> Result<Flow, ScriptError> {
    m.begincode = chunk.offset() + 1;
    Ok(Flow::Continue)
}
