//! Fixed-point monetary amounts
//!
//! Amounts are integers of the smallest unit with 8 implied decimal places.
//! All arithmetic is checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places in a displayed amount
pub const DECIMALS: u32 = 8;

/// Smallest units per whole coin
pub const UNITS_PER_COIN: i64 = 100_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Amount overflow")]
    Overflow,
}

/// A non-negative fixed-point amount
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(units: i64) -> Result<Self, Self::Error> {
        Amount::from_units(units)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> i64 {
        amount.0
    }
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Construct from smallest units; negative values are rejected
    pub fn from_units(units: i64) -> Result<Self, AmountError> {
        if units < 0 {
            return Err(AmountError::Invalid(format!("negative amount {}", units)));
        }
        Ok(Self(units))
    }

    pub fn units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Subtraction that never goes below zero
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0).max(0))
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).filter(|v| *v >= 0).map(Amount)
    }

    /// Checked sum of an iterator of amounts
    pub fn sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Result<Amount, AmountError> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_COIN;
        let frac = self.0 % UNITS_PER_COIN;
        write!(f, "{}.{:08}", whole, frac)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse decimal text such as `1`, `0.5` or `12.00000001`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AmountError::Invalid(s.to_string());

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > DECIMALS as usize {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountError::Overflow)?
        };
        let frac_units: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(UNITS_PER_COIN)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let a: Amount = "1.5".parse().unwrap();
        assert_eq!(a.units(), 150_000_000);
        assert_eq!(a.to_string(), "1.50000000");

        let b: Amount = "0.00000001".parse().unwrap();
        assert_eq!(b.units(), 1);

        let c: Amount = "42".parse().unwrap();
        assert_eq!(c.units(), 42 * UNITS_PER_COIN);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", ".", "-1", "1.123456789", "abc", "1,5", "1.2.3"] {
            assert!(bad.parse::<Amount>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_serde_rejects_negative_units() {
        let amount = Amount::from_units(1_234).unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "1234");
        assert_eq!(serde_json::from_str::<Amount>("1234").unwrap(), amount);
        assert!(serde_json::from_str::<Amount>("-5").is_err());
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(
            "99999999999999999999".parse::<Amount>(),
            Err(AmountError::Overflow)
        );
        assert_eq!("100000000000".parse::<Amount>(), Err(AmountError::Overflow));
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [Amount(1), Amount(2), Amount(3)];
        assert_eq!(Amount::sum(amounts).unwrap(), Amount(6));

        let overflow = [Amount(i64::MAX), Amount(1)];
        assert_eq!(Amount::sum(overflow), Err(AmountError::Overflow));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(Amount::from_units(-1).is_err());
        assert_eq!(Amount(5).checked_sub(Amount(6)), None);
        assert_eq!(Amount(5).saturating_sub(Amount(6)), Amount::ZERO);
    }
}
