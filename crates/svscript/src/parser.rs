//! Script byte format: parsing raw bytes into chunks and emitting them back.

use crate::num::ScriptNum;
use crate::opcode::{Opcode, all::*};
use std::fmt;

/// Malformed push framing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{opcode} at offset {offset} has a truncated length prefix")]
    TruncatedPushLength { opcode: Opcode, offset: usize },
    #[error("{opcode} at offset {offset} declares {declared} bytes but only {available} remain")]
    TruncatedPushData {
        opcode: Opcode,
        offset: usize,
        declared: usize,
        available: usize,
    },
}

/// One parsed script element.
///
/// `payload` is present iff the opcode is a push (`OP_0` to `OP_PUSHDATA4`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    opcode: Opcode,
    payload: Option<Vec<u8>>,
    offset: usize,
}

impl Chunk {
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Byte offset of the opcode within the original script.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the push uses the smallest possible encoding for its data.
    ///
    /// Non-push chunks are trivially minimal.
    pub fn is_minimal_push(&self) -> bool {
        let Some(data) = self.payload.as_deref() else {
            return true;
        };

        let op = self.opcode.to_u8();
        match data {
            [] => self.opcode == OP_0,
            [n @ 1..=16] => op == OP_1.to_u8() + n - 1,
            [0x81] => self.opcode == OP_1NEGATE,
            _ if data.len() <= 75 => op as usize == data.len(),
            _ if data.len() <= 0xff => self.opcode == OP_PUSHDATA1,
            _ if data.len() <= 0xffff => self.opcode == OP_PUSHDATA2,
            _ => true,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode.to_u8());
        let Some(data) = self.payload.as_deref() else {
            return;
        };
        match self.opcode {
            OP_PUSHDATA1 => out.push(data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(data);
    }
}

/// Reads the chunk starting at `offset`, returning it with the offset of the
/// next chunk.
fn read_chunk(bytes: &[u8], offset: usize) -> Result<(Chunk, usize), ParseError> {
    let opcode = Opcode::from_u8(bytes[offset]);
    let mut pc = offset + 1;

    if !opcode.is_push() {
        return Ok((
            Chunk {
                opcode,
                payload: None,
                offset,
            },
            pc,
        ));
    }

    let prefix_len = match opcode {
        OP_PUSHDATA1 => 1,
        OP_PUSHDATA2 => 2,
        OP_PUSHDATA4 => 4,
        _ => 0,
    };

    let declared = if prefix_len == 0 {
        opcode.to_u8() as usize
    } else {
        let prefix = bytes
            .get(pc..pc + prefix_len)
            .ok_or(ParseError::TruncatedPushLength { opcode, offset })?;
        pc += prefix_len;
        prefix
            .iter()
            .rev()
            .fold(0usize, |acc, &byte| (acc << 8) | byte as usize)
    };

    let available = bytes.len() - pc;
    if declared > available {
        return Err(ParseError::TruncatedPushData {
            opcode,
            offset,
            declared,
            available,
        });
    }

    let payload = bytes[pc..pc + declared].to_vec();

    Ok((
        Chunk {
            opcode,
            payload: Some(payload),
            offset,
        },
        pc + declared,
    ))
}

/// End offset of the opcode at `pc`, `None` at the end of the script or if the
/// remaining bytes are malformed.
fn next_op_end(bytes: &[u8], pc: usize) -> Option<usize> {
    if pc >= bytes.len() {
        return None;
    }
    read_chunk(bytes, pc).ok().map(|(_, next)| next)
}

/// A parsed script, the original bytes are kept as the authoritative form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    chunks: Vec<Chunk>,
    bytes: Vec<u8>,
}

impl Program {
    /// Parses raw script bytes into chunks.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut chunks = Vec::new();
        let mut pc = 0;

        while pc < bytes.len() {
            let (chunk, next) = read_chunk(bytes, pc)?;
            chunks.push(chunk);
            pc = next;
        }

        Ok(Self {
            chunks,
            bytes: bytes.to_vec(),
        })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The verbatim script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Re-emits the script from its chunks.
    pub fn serialize_chunks(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len());
        for chunk in &self.chunks {
            chunk.encode_into(&mut out);
        }
        out
    }

    /// Whether the script only contains pushes, `OP_RESERVED` included.
    pub fn is_push_only(&self) -> bool {
        self.chunks
            .iter()
            .all(|chunk| chunk.opcode.to_u8() <= OP_16.to_u8())
    }

    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    pub fn is_p2sh(&self) -> bool {
        self.bytes.len() == 23
            && self.bytes[0] == OP_HASH160.to_u8()
            && self.bytes[1] == 0x14
            && self.bytes[22] == OP_EQUAL.to_u8()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            match chunk.payload() {
                Some([]) => f.write_str("0")?,
                Some(data) => f.write_str(&hex::encode(data))?,
                None => write!(f, "{}", chunk.opcode)?,
            }
        }
        Ok(())
    }
}

/// Encodes `data` as a single push using the smallest framing, without the
/// small integer shortcuts.
pub fn push_encoding(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 5);
    match data.len() {
        len @ 0..=0x4b => out.push(len as u8),
        len @ 0x4c..=0xff => {
            out.push(OP_PUSHDATA1.to_u8());
            out.push(len as u8);
        }
        len @ 0x100..=0xffff => {
            out.push(OP_PUSHDATA2.to_u8());
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        len => {
            out.push(OP_PUSHDATA4.to_u8());
            out.extend_from_slice(&(len as u32).to_le_bytes());
        }
    }
    out.extend_from_slice(data);
    out
}

/// Removes every occurrence of `pattern` that starts at an opcode boundary.
///
/// Matches are removed repeatedly at the same position, a malformed tail is
/// kept as is.
pub fn find_and_delete(script: &[u8], pattern: &[u8]) -> Vec<u8> {
    if pattern.is_empty() {
        return script.to_vec();
    }

    let mut result = Vec::with_capacity(script.len());
    let mut pc = 0;
    let mut copied_from = 0;

    loop {
        result.extend_from_slice(&script[copied_from..pc]);
        while script[pc..].starts_with(pattern) {
            pc += pattern.len();
        }
        copied_from = pc;

        match next_op_end(script, pc) {
            Some(next) => pc = next,
            None => break,
        }
    }

    result.extend_from_slice(&script[copied_from..]);
    result
}

/// Drops every `OP_CODESEPARATOR` opcode, leaving push data untouched.
pub fn remove_code_separators(script: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(script.len());
    let mut pc = 0;

    while let Some(next) = next_op_end(script, pc) {
        if script[pc] != OP_CODESEPARATOR.to_u8() {
            result.extend_from_slice(&script[pc..next]);
        }
        pc = next;
    }

    result.extend_from_slice(&script[pc..]);
    result
}

/// Script assembler.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    bytes: Vec<u8>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_opcode(mut self, opcode: Opcode) -> Self {
        self.bytes.push(opcode.to_u8());
        self
    }

    pub fn push_slice(mut self, data: &[u8]) -> Self {
        self.bytes.extend(push_encoding(data));
        self
    }

    /// Pushes a number, using `OP_1NEGATE` and `OP_0` to `OP_16` when possible.
    pub fn push_int(self, value: i64) -> Self {
        match value {
            0 => self.push_opcode(OP_0),
            -1 => self.push_opcode(OP_1NEGATE),
            1..=16 => self.push_opcode(Opcode::from_u8(OP_1.to_u8() + value as u8 - 1)),
            _ => self.push_slice(&ScriptNum::from(value).to_bytes()),
        }
    }

    /// Appends raw bytes, which may be a partial chunk.
    pub fn push_raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn into_program(self) -> Result<Program, ParseError> {
        Program::parse(&self.bytes)
    }
}
