//! # Fixed-Point Decimal
//!
//! Parameters such as `slash_meter_replenish_fraction` travel as decimal
//! strings (`"0.05"`). `Dec` stores them as an `i128` scaled by 10^18 so that
//! power arithmetic stays exact and deterministic across chains.
//!
//! | Operation | Rounding |
//! |-----------|----------|
//! | `mul_int_ceil` | toward +inf |
//! | `mul_int_trunc` | toward zero |
//! | `exceeded_by_ratio` | exact (cross-multiplied) |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits.
pub const DEC_PRECISION: u32 = 18;

const SCALE: i128 = 10i128.pow(DEC_PRECISION);

/// Decimal parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecError {
    #[error("empty decimal string")]
    Empty,

    #[error("invalid character in decimal: {0}")]
    InvalidCharacter(String),

    #[error("too many fractional digits: {digits} > 18")]
    TooPrecise { digits: usize },

    #[error("decimal out of range: {0}")]
    Overflow(String),
}

/// Signed fixed-point decimal with 18 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(i128);

impl Dec {
    pub const ZERO: Dec = Dec(0);
    pub const ONE: Dec = Dec(SCALE);

    /// Build `num / 10^exp`, e.g. `Dec::from_parts(5, 2)` is `0.05`.
    pub const fn from_parts(num: i64, exp: u32) -> Self {
        let exp = if exp > DEC_PRECISION { DEC_PRECISION } else { exp };
        Dec(num as i128 * 10i128.pow(DEC_PRECISION - exp))
    }

    pub fn from_int(n: i64) -> Self {
        Dec(n as i128 * SCALE)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `ceil(self * n)`, saturating at the `i64` bounds.
    pub fn mul_int_ceil(&self, n: i64) -> i64 {
        let product = self.0.saturating_mul(n as i128);
        let quotient = product.div_euclid(SCALE);
        let ceil = if product.rem_euclid(SCALE) == 0 {
            quotient
        } else {
            quotient + 1
        };
        clamp_i64(ceil)
    }

    /// `trunc(self * n)`, saturating at the `i64` bounds.
    pub fn mul_int_trunc(&self, n: i64) -> i64 {
        clamp_i64(self.0.saturating_mul(n as i128) / SCALE)
    }

    /// True when `num / den > self`. A non-positive denominator is never
    /// considered to exceed anything.
    pub fn exceeded_by_ratio(&self, num: i64, den: i64) -> bool {
        if den <= 0 {
            return false;
        }
        (num as i128).saturating_mul(SCALE) > self.0.saturating_mul(den as i128)
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

impl FromStr for Dec {
    type Err = DecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecError::Empty);
        }
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DecError::InvalidCharacter(s.to_string()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(DecError::InvalidCharacter(s.to_string()));
        }
        if frac_part.len() > DEC_PRECISION as usize {
            return Err(DecError::TooPrecise {
                digits: frac_part.len(),
            });
        }

        let int_value: i128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| DecError::Overflow(s.to_string()))?
        };
        let frac_value: i128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = DEC_PRECISION as usize);
            padded
                .parse()
                .map_err(|_| DecError::Overflow(s.to_string()))?
        };

        let raw = int_value
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| DecError::Overflow(s.to_string()))?;
        Ok(Dec(if negative { -raw } else { raw }))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let int_part = abs / SCALE as u128;
        let frac_part = abs % SCALE as u128;
        if frac_part == 0 {
            return write!(f, "{sign}{int_part}");
        }
        let frac = format!("{:0>width$}", frac_part, width = DEC_PRECISION as usize);
        write!(f, "{sign}{int_part}.{}", frac.trim_end_matches('0'))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
