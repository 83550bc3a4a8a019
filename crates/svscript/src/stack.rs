use crate::value::StackValue;
use std::fmt::Display;
use std::ops::{Deref, DerefMut};

/// Stack error type.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum StackError {
    #[error("invalid stack operation")]
    InvalidOperation,
}

/// Stack for the script execution.
pub type Stack = GenericStack<StackValue>;

impl Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;

        for (i, item) in self.data.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }

        write!(f, "]")
    }
}

type Result<T> = std::result::Result<T, StackError>;

/// A stack used for managing script execution data with various operations.
#[derive(Debug, PartialEq, Clone)]
pub struct GenericStack<T = StackValue> {
    data: Vec<T>,
}

impl<T> Default for GenericStack<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T> From<Vec<T>> for GenericStack<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> Deref for GenericStack<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for GenericStack<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<T> GenericStack<T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    // Ensure there are at least `n` elements on the stack.
    #[inline]
    pub fn require(&self, len: usize) -> Result<()> {
        if self.data.len() < len {
            return Err(StackError::InvalidOperation);
        }
        Ok(())
    }

    /// Returns the last element of the stack.
    #[inline]
    pub fn last(&self) -> Result<&T> {
        self.data.last().ok_or(StackError::InvalidOperation)
    }

    /// Removes and returns the last element of the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<T> {
        self.data.pop().ok_or(StackError::InvalidOperation)
    }

    /// Push an element onto the stack.
    #[inline]
    pub fn push(&mut self, value: T) -> &mut Self {
        self.data.push(value);
        self
    }

    /// Returns the element at the specified position from the top of the stack.
    ///
    /// `self.top(0)` is equalant to `self.last()`.
    #[inline]
    pub fn top(&self, i: usize) -> Result<&T> {
        let pos = i + 1;
        self.require(pos)?;
        Ok(&self.data[self.data.len() - pos])
    }

    /// Mutable access to the element at the specified position from the top.
    #[inline]
    pub fn top_mut(&mut self, i: usize) -> Result<&mut T> {
        let pos = i + 1;
        self.require(pos)?;
        let len = self.data.len();
        Ok(&mut self.data[len - pos])
    }

    /// Peeks the top element and converts it to a boolean.
    #[inline]
    pub fn peek_bool(&self) -> Result<bool>
    where
        T: AsRef<[u8]>,
    {
        Ok(cast_to_bool(self.last()?.as_ref()))
    }

    /// Removes the element at the given index.
    #[inline]
    pub fn remove(&mut self, i: usize) -> Result<T> {
        let pos = i + 1;
        self.require(pos)?;
        let to_remove = self.data.len() - pos;
        Ok(self.data.remove(to_remove))
    }

    /// Removes the top `n` stack items.
    #[inline]
    pub fn drop(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        let len = self.data.len();
        self.data.truncate(len - n);
        Ok(())
    }

    /// Duplicates the top N items on the stack.
    ///
    /// dup(1): [x1 x2] -> [x1 x2 x2]
    /// dup(2): [x1 x2] -> [x1 x2 x1 x2]
    #[inline]
    pub fn dup(&mut self, n: usize) -> Result<()>
    where
        T: Clone,
    {
        self.require(n)?;
        let len = self.data.len();
        self.data.extend_from_within(len - n..);
        Ok(())
    }

    /// Copies N items N items back to the top of the stack.
    ///
    /// over(1): [... x1 x2 x3] -> [... x1 x2 x3 x2]
    /// over(2): [... x1 x2 x3 x4] -> [... x1 x2 x3 x4 x1 x2]
    #[inline]
    pub fn over(&mut self, n: usize) -> Result<()>
    where
        T: Clone,
    {
        let count = n * 2;
        self.require(count)?;

        let len = self.data.len();
        self.data.extend_from_within(len - count..len - count + n);

        Ok(())
    }

    /// Rotates the top 3N items on the stack to the left N times.
    ///
    /// - rot(1): [x1 x2 x3] -> [x2 x3 x1]
    /// - rot(2): [x1 x2 x3 x4 x5 x6] -> [x3 x4 x5 x6 x1 x2]
    #[inline]
    pub fn rot(&mut self, n: usize) -> Result<()> {
        let count = n * 3;
        self.require(count)?;

        let len = self.data.len();
        self.data[len - count..].rotate_left(n);

        Ok(())
    }

    // Swaps the top N items on the stack with those below them.
    //
    // - swap(1): [x1 x2] -> [x2 x1]
    // - swap(2): [x1 x2 x3 x4] -> [x3 x4 x1 x2]
    #[inline]
    pub fn swap(&mut self, n: usize) -> Result<()> {
        let count = n * 2;
        self.require(count)?;
        let len = self.data.len();
        let (lower, upper) = self.data.split_at_mut(len - count + n);
        lower[len - count..].swap_with_slice(&mut upper[..n]);
        Ok(())
    }

    /// Removes the second-to-top stack item.
    ///
    /// nip: [x1 x2 x3] -> [x1 x3]
    #[inline]
    pub fn nip(&mut self) -> Result<()> {
        self.require(2)?;
        let len = self.data.len();
        self.data.swap_remove(len - 2);
        Ok(())
    }

    // Copies the item at the top of the stack and inserts it before the 2nd
    // to top item.
    //
    // [... x1 x2] -> [... x2 x1 x2]
    #[inline]
    pub fn tuck(&mut self) -> Result<()>
    where
        T: Clone,
    {
        self.require(2)?;
        let len = self.data.len();
        let v = self.data[len - 1].clone();
        self.data.insert(len - 2, v);
        Ok(())
    }
}

impl Stack {
    /// Raw bytes of every item, bottom first.
    pub fn to_bytes_vec(&self) -> Vec<Vec<u8>> {
        self.data.iter().map(|item| item.as_bytes().to_vec()).collect()
    }

    /// Total payload bytes held by the stack.
    pub fn total_bytes(&self) -> usize {
        self.data.iter().map(StackValue::len).sum()
    }
}

/// Converts a byte slice to a boolean.
///
/// Any non-zero byte makes the value true, except a lone sign bit in the most
/// significant byte (negative zero).
pub fn cast_to_bool(data: &[u8]) -> bool {
    match data.split_last() {
        Some((&last, rest)) => rest.iter().any(|&x| x != 0) || (last != 0 && last != 0x80),
        None => false,
    }
}
