//! Stack values and their provenance.

use crate::num::ScriptNum;
use std::ops::{BitOr, BitOrAssign};

/// Whether a value came straight from pushed script data or was computed
/// from something else on the stack.
///
/// Combining two provenances yields [`Provenance::Derived`] if either side is
/// derived, with [`Provenance::Literal`] as the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Provenance {
    #[default]
    Literal,
    Derived,
}

impl Provenance {
    pub fn is_derived(self) -> bool {
        matches!(self, Self::Derived)
    }

    /// Combine the provenance of all given values.
    pub fn union<'a>(values: impl IntoIterator<Item = &'a StackValue>) -> Self {
        values
            .into_iter()
            .fold(Self::Literal, |acc, value| acc | value.provenance)
    }
}

impl BitOr for Provenance {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        if self.is_derived() || rhs.is_derived() {
            Self::Derived
        } else {
            Self::Literal
        }
    }
}

impl BitOrAssign for Provenance {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Advisory hint of how a value was produced, it never affects execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValueKind {
    #[default]
    Bytes,
    Int,
    Bool,
    String,
}

/// An item on the script stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StackValue {
    bytes: Vec<u8>,
    kind: ValueKind,
    provenance: Provenance,
}

impl StackValue {
    /// Raw data pushed by the script itself.
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            kind: ValueKind::Bytes,
            provenance: Provenance::Literal,
        }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>, provenance: Provenance) -> Self {
        Self {
            bytes: bytes.into(),
            kind: ValueKind::Bytes,
            provenance,
        }
    }

    pub fn num(num: &ScriptNum, provenance: Provenance) -> Self {
        Self {
            bytes: num.to_bytes(),
            kind: ValueKind::Int,
            provenance,
        }
    }

    pub fn bool(value: bool, provenance: Provenance) -> Self {
        Self {
            bytes: if value { vec![1] } else { Vec::new() },
            kind: ValueKind::Bool,
            provenance,
        }
    }

    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn merge_provenance(&mut self, provenance: Provenance) {
        self.provenance |= provenance;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_derived(&self) -> bool {
        self.provenance.is_derived()
    }
}

impl AsRef<[u8]> for StackValue {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for StackValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::literal(bytes)
    }
}

impl std::fmt::Display for StackValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bytes.is_empty() {
            write!(f, "<empty>")?;
        } else {
            write!(f, "{}", hex::encode(&self.bytes))?;
        }
        if self.is_derived() {
            write!(f, "*")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_is_monotonic() {
        use Provenance::*;
        assert_eq!(Literal | Literal, Literal);
        assert_eq!(Literal | Derived, Derived);
        assert_eq!(Derived | Literal, Derived);
        assert_eq!(Derived | Derived, Derived);

        let mut p = Literal;
        p |= Derived;
        p |= Literal;
        assert_eq!(p, Derived);
    }

    #[test]
    fn union_of_values() {
        let a = StackValue::literal(vec![1]);
        let b = StackValue::bytes(vec![2], Provenance::Derived);
        assert_eq!(Provenance::union([&a, &a]), Provenance::Literal);
        assert_eq!(Provenance::union([&a, &b]), Provenance::Derived);
        assert_eq!(Provenance::union(Vec::<&StackValue>::new()), Provenance::Literal);
    }

    #[test]
    fn typed_constructors() {
        let t = StackValue::bool(true, Provenance::Literal);
        assert_eq!(t.as_bytes(), &[1]);
        assert_eq!(t.kind(), ValueKind::Bool);
        assert!(StackValue::bool(false, Provenance::Literal).is_empty());

        let n = StackValue::num(&ScriptNum::from(-1), Provenance::Derived);
        assert_eq!(n.as_bytes(), &[0x81]);
        assert!(n.is_derived());
        assert_eq!(n.to_string(), "81*");
    }
}
