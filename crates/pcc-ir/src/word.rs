//! Context word width types.
//!
//! These are generic "32 vs 64 bit" marker types; the context value is
//! one machine word wide and all arithmetic on it wraps.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Marker type for 32-bit context words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct W32;

/// Marker type for 64-bit context words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct W64;

/// Trait for word-width-dependent operations.
///
/// Uses marker types (W32/W64) with an associated integer type instead of
/// const generics because the integer type changes with the width.
pub trait Word: Copy + Clone + Send + Sync + Default + Debug + 'static {
    /// Unsigned integer type (u32 for W32, u64 for W64).
    type Int: Copy
        + Clone
        + Default
        + Eq
        + Ord
        + Hash
        + Debug
        + Display
        + Send
        + Sync;

    /// Word width in bits (32 or 64).
    const BITS: u8;

    /// Bytes per word (4 or 8).
    const BYTES: usize;

    /// Convert a u64 to word width (truncating).
    fn from_u64(val: u64) -> Self::Int;

    /// Convert a word to u64 (zero-extending).
    fn to_u64(val: Self::Int) -> u64;

    /// Multiplication over the word, mod 2^BITS.
    fn wrapping_mul(lhs: Self::Int, rhs: Self::Int) -> Self::Int;

    /// Addition over the word, mod 2^BITS.
    fn wrapping_add(lhs: Self::Int, rhs: Self::Int) -> Self::Int;
}

impl Word for W32 {
    type Int = u32;

    const BITS: u8 = 32;
    const BYTES: usize = 4;

    #[inline]
    fn from_u64(val: u64) -> u32 {
        val as u32
    }

    #[inline]
    fn to_u64(val: u32) -> u64 {
        u64::from(val)
    }

    #[inline]
    fn wrapping_mul(lhs: u32, rhs: u32) -> u32 {
        lhs.wrapping_mul(rhs)
    }

    #[inline]
    fn wrapping_add(lhs: u32, rhs: u32) -> u32 {
        lhs.wrapping_add(rhs)
    }
}

impl Word for W64 {
    type Int = u64;

    const BITS: u8 = 64;
    const BYTES: usize = 8;

    #[inline]
    fn from_u64(val: u64) -> u64 {
        val
    }

    #[inline]
    fn to_u64(val: u64) -> u64 {
        val
    }

    #[inline]
    fn wrapping_mul(lhs: u64, rhs: u64) -> u64 {
        lhs.wrapping_mul(rhs)
    }

    #[inline]
    fn wrapping_add(lhs: u64, rhs: u64) -> u64 {
        lhs.wrapping_add(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_w32() {
        assert_eq!(W32::BITS, 32);
        assert_eq!(W32::BYTES, 4);
        // Truncating conversion
        assert_eq!(W32::from_u64(0x1_0000_0003), 3);
        assert_eq!(W32::wrapping_mul(0x8000_0000, 2), 0);
        assert_eq!(W32::wrapping_add(u32::MAX, 1), 0);
    }

    #[test]
    fn test_word_w64() {
        assert_eq!(W64::BITS, 64);
        assert_eq!(W64::BYTES, 8);
        assert_eq!(W64::to_u64(u64::MAX), u64::MAX);
        assert_eq!(W64::wrapping_add(u64::MAX, 2), 1);
    }
}
