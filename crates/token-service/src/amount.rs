//! Decimal token quantities.
//!
//! A [`TokenAmount`] is an exact decimal: an unsigned integer of digits plus a
//! scale. Conversion to base units happens in big-integer arithmetic, so
//! `floor(amount * 10^decimals)` is exact for every decimal count a mint can
//! have.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use thiserror::Error;

use crate::error::TokenServiceError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("amount must be a finite number")]
    NotFinite,

    #[error("malformed amount `{0}`")]
    Malformed(String),

    #[error("amount is smaller than one base unit at {decimals} decimals")]
    BelowBaseUnit { decimals: u8 },

    #[error("amount does not fit in a u64 at {decimals} decimals")]
    Overflow { decimals: u8 },
}

impl From<AmountError> for TokenServiceError {
    fn from(e: AmountError) -> Self {
        TokenServiceError::Validation(e.to_string())
    }
}

/// A strictly positive decimal quantity of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    digits: BigUint,
    scale: u32,
}

impl TokenAmount {
    /// Convert through the shortest decimal string that round-trips to
    /// `value`, never through binary multiplication.
    pub fn from_f64(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        if value <= 0.0 {
            return Err(AmountError::NotPositive);
        }
        format!("{value}").parse()
    }

    /// `floor(self * 10^decimals)`.
    pub fn to_base_units(&self, decimals: u8) -> Result<u64, AmountError> {
        let decimals_u32 = u32::from(decimals);
        let units = if decimals_u32 >= self.scale {
            &self.digits * pow10(decimals_u32 - self.scale)
        } else {
            &self.digits / pow10(self.scale - decimals_u32)
        };

        if units.is_zero() {
            return Err(AmountError::BelowBaseUnit { decimals });
        }
        units.to_u64().ok_or(AmountError::Overflow { decimals })
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(AmountError::NotPositive);
        }
        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };
        let well_formed = !(whole.is_empty() && fraction.is_empty())
            && whole.bytes().all(|b| b.is_ascii_digit())
            && fraction.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(AmountError::Malformed(s.to_string()));
        }

        let fraction = fraction.trim_end_matches('0');
        let joined = format!("{whole}{fraction}");
        let digits = BigUint::parse_bytes(joined.as_bytes(), 10).unwrap_or_default();
        if digits.is_zero() {
            return Err(AmountError::NotPositive);
        }

        let scale =
            u32::try_from(fraction.len()).map_err(|_| AmountError::Malformed(s.to_string()))?;
        Ok(Self { digits, scale })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_scaled(&self.digits.to_string(), self.scale as usize))
    }
}

/// Render a base-unit amount as a decimal string, dropping trailing zeros.
pub fn format_base_units(amount: u64, decimals: u8) -> String {
    format_scaled(&amount.to_string(), usize::from(decimals))
}

fn format_scaled(digits: &str, scale: usize) -> String {
    if scale == 0 {
        return digits.to_string();
    }
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}
