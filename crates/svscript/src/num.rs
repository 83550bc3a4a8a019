//! Script numeric

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use std::ops::{Add, Mul, Neg, Sub};

/// Script number error type.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum NumError {
    #[error("Script number overflow")]
    Overflow,
    #[error("Non-minimally encoded script number")]
    NotMinimallyEncoded,
}

/// A numeric type used in Bitcoin Script operations.
///
/// Backed by an arbitrary precision integer, the byte length of an operand is
/// bounded by the caller at decode time rather than by the representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptNum {
    value: BigInt,
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        Self {
            value: BigInt::from(value),
        }
    }
}

impl From<BigInt> for ScriptNum {
    fn from(value: BigInt) -> Self {
        Self { value }
    }
}

impl ScriptNum {
    /// Maximum script number length in bytes.
    pub const MAX_NUM_SIZE: usize = 4;

    /// Maximum length of the OP_CHECKLOCKTIMEVERIFY operand.
    ///
    /// Lock times can reach 2^32-1, which needs a fifth byte for the sign.
    pub const LOCKTIME_NUM_SIZE: usize = 5;

    /// Maximum script number length once the genesis rules apply.
    pub const GENESIS_MAX_NUM_SIZE: usize = 750_000;

    /// Construct a [`ScriptNum`] with size validation.
    pub fn from_bytes(data: &[u8], require_minimal: bool, max_size: usize) -> Result<Self, NumError> {
        if data.len() > max_size {
            return Err(NumError::Overflow);
        }

        if data.is_empty() {
            return Ok(Self::default());
        }

        if require_minimal && !Self::is_minimally_encoded(data) {
            return Err(NumError::NotMinimallyEncoded);
        }

        let mut magnitude = data.to_vec();
        let last = magnitude.len() - 1;
        let negative = magnitude[last] & 0x80 != 0;
        magnitude[last] &= 0x7f;

        let value = BigInt::from_bytes_le(Sign::Plus, &magnitude);

        Ok(Self {
            value: if negative { -value } else { value },
        })
    }

    /// Convert the number to a minimally encoded byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.value.is_zero() {
            return Vec::new();
        }

        let negative = self.value.is_negative();
        let mut result = self.value.magnitude().to_bytes_le();

        let last = result.len() - 1;
        if result[last] & 0x80 != 0 {
            result.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            result[last] |= 0x80;
        }

        result
    }

    /// Check if the byte array is minimally encoded.
    ///
    /// The most significant byte may only be zero (ignoring the sign bit) when
    /// the byte below it has its high bit set, otherwise it could be dropped.
    pub fn is_minimally_encoded(data: &[u8]) -> bool {
        let Some(&last) = data.last() else {
            return true;
        };

        if last & 0x7f == 0 && (data.len() <= 1 || data[data.len() - 2] & 0x80 == 0) {
            return false;
        }

        true
    }

    /// Returns the minimal encoding of the number represented by `data`.
    ///
    /// Unlike [`ScriptNum::from_bytes`] there is no length bound, the sign bit
    /// is carried over to the new most significant byte.
    pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
        let Some(&last) = data.last() else {
            return Vec::new();
        };

        if Self::is_minimally_encoded(data) {
            return data.to_vec();
        }

        let sign = last & 0x80;

        // Scan past the redundant zero bytes below the sign byte.
        match data[..data.len() - 1].iter().rposition(|&byte| byte != 0) {
            Some(index) => {
                let mut result = data[..=index].to_vec();
                if result[index] & 0x80 != 0 {
                    result.push(sign);
                } else {
                    result[index] |= sign;
                }
                result
            }
            None => Vec::new(),
        }
    }

    /// Get the underlying value.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.value.to_i64()
    }

    pub fn to_usize(&self) -> Option<usize> {
        self.value.to_usize()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    pub fn abs(&self) -> Self {
        self.value.abs().into()
    }

    /// Truncating division, `None` if `other` is zero.
    pub fn checked_div(&self, other: &Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        Some((&self.value / &other.value).into())
    }

    /// Remainder carrying the sign of the dividend, `None` if `other` is zero.
    pub fn checked_rem(&self, other: &Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        Some((&self.value % &other.value).into())
    }
}

impl Add for ScriptNum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        (self.value + other.value).into()
    }
}

impl Sub for ScriptNum {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        (self.value - other.value).into()
    }
}

impl Mul for ScriptNum {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        (self.value * other.value).into()
    }
}

impl Neg for ScriptNum {
    type Output = Self;

    fn neg(self) -> Self {
        (-self.value).into()
    }
}

impl std::fmt::Display for ScriptNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}
