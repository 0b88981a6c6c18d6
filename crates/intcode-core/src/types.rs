//! Cell value types for the machine.
//!
//! Every memory cell, queue entry and operand is a [`Word`]. Three variants
//! are provided: `i32` for the small early programs, `i64` for most
//! programs, and [`BigInt`] for programs whose intermediate values do not
//! fit in 64 bits.

use num_bigint::BigInt;
use num_traits::{CheckedAdd, CheckedMul, FromPrimitive, Num, Signed, ToPrimitive};
use std::fmt::{Debug, Display};

/// A tape cell.
///
/// `/` and `%` come from the underlying type. For all provided
/// implementations they truncate toward zero, so the remainder takes the
/// sign of the dividend.
pub trait Word:
    Num
    + Signed
    + CheckedAdd
    + CheckedMul
    + ToPrimitive
    + FromPrimitive
    + From<i32>
    + Clone
    + Ord
    + Debug
    + Display
    + Send
    + Sync
    + 'static
{
    /// Short name used in diagnostics.
    const KIND: &'static str;

    /// Parse one comma-separated literal.
    fn parse_cell(token: &str) -> std::result::Result<Self, String>;

    /// Checked conversion to a memory address or program counter value.
    fn to_address(&self) -> Option<usize> {
        self.to_usize()
    }

    /// Checked conversion to a native signed integer.
    fn to_native(&self) -> Option<i64> {
        self.to_i64()
    }

    fn from_char(c: char) -> Self {
        Self::from(c as i32)
    }

    /// The character this value encodes, if it is a valid code point.
    fn to_char(&self) -> Option<char> {
        self.to_u32().and_then(char::from_u32)
    }

    fn from_bool(b: bool) -> Self {
        if b {
            Self::one()
        } else {
            Self::zero()
        }
    }
}

macro_rules! impl_word {
    ($ty:ty, $kind:literal) => {
        impl Word for $ty {
            const KIND: &'static str = $kind;

            fn parse_cell(token: &str) -> std::result::Result<Self, String> {
                token.parse::<$ty>().map_err(|e| e.to_string())
            }
        }
    };
}

impl_word!(i32, "i32");
impl_word!(i64, "i64");
impl_word!(BigInt, "bigint");
