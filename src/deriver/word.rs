//! Accumulator word types
//!
//! The accumulator runs on a plain unsigned integer. Its width decides how much
//! scaling headroom the deriver may use.

use std::convert::TryFrom;
use std::fmt;

use num_traits::{PrimInt, Unsigned};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Accumulator bit width selectable at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AccumulatorWidth {
    /// 8-bit accumulator (`u8`)
    W8,
    /// 16-bit accumulator (`u16`)
    W16,
    /// 32-bit accumulator (`u32`)
    W32,
    /// 64-bit accumulator (`u64`)
    W64,
}

impl AccumulatorWidth {
    /// Number of bits in the accumulator word
    pub const fn bits(self) -> u32 {
        match self {
            AccumulatorWidth::W8 => 8,
            AccumulatorWidth::W16 => 16,
            AccumulatorWidth::W32 => 32,
            AccumulatorWidth::W64 => 64,
        }
    }

    /// Largest admissible limit, 2^(bits-1)
    ///
    /// With `error < limit` and `increment <= limit`, the sum
    /// `error + increment` stays below 2^bits.
    pub const fn safe_limit(self) -> u64 {
        1u64 << (self.bits() - 1)
    }
}

impl TryFrom<u32> for AccumulatorWidth {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(AccumulatorWidth::W8),
            16 => Ok(AccumulatorWidth::W16),
            32 => Ok(AccumulatorWidth::W32),
            64 => Ok(AccumulatorWidth::W64),
            other => Err(ConfigError::UnsupportedWidth(other)),
        }
    }
}

impl From<AccumulatorWidth> for u32 {
    fn from(width: AccumulatorWidth) -> Self {
        width.bits()
    }
}

impl fmt::Display for AccumulatorWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Unsigned integer usable as accumulator word
pub trait Word: PrimInt + Unsigned + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Width of this word
    const WIDTH: AccumulatorWidth;

    /// Largest admissible limit for this word
    #[inline]
    fn safe_limit() -> Self {
        Self::one() << (Self::WIDTH.bits() as usize - 1)
    }
}

impl Word for u8 {
    const WIDTH: AccumulatorWidth = AccumulatorWidth::W8;
}

impl Word for u16 {
    const WIDTH: AccumulatorWidth = AccumulatorWidth::W16;
}

impl Word for u32 {
    const WIDTH: AccumulatorWidth = AccumulatorWidth::W32;
}

impl Word for u64 {
    const WIDTH: AccumulatorWidth = AccumulatorWidth::W64;
}
