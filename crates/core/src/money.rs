//! Fixed-point money value object.
//!
//! Amounts are stored as an integer count of minor units (cents), two
//! fractional digits. Value semantics: two `Money` values with the same
//! minor-unit count are equal.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A monetary amount in minor units (cents).
///
/// `Money` is signed: balances and deltas may be negative, posted amounts
/// are validated positive at the posting boundary.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// From a raw minor-unit count (e.g. `12345` == `123.45`).
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// From whole major units (e.g. `Money::from_major(500)` == `500.00`).
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Negation; minor-unit counts never reach `i64::MIN` in practice but
    /// overflow still maps to `None` rather than wrapping.
    pub fn checked_neg(self) -> Option<Money> {
        self.0.checked_neg().map(Money)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Parse `"123.45"`, `"-7.50"`, or `"42"` (at most two fractional digits).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DomainError::validation(format!("malformed amount: {s:?}"));

        let (sign, body) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };

        let (major_str, minor_str) = match body.split_once('.') {
            Some((maj, min)) => (maj, min),
            None => (body, ""),
        };

        if major_str.is_empty() || minor_str.len() > 2 {
            return Err(err());
        }

        // Unsigned component parses; the sign was consumed above, so a
        // second "-" (or a "+") is malformed.
        let major: i64 = major_str
            .parse::<u64>()
            .ok()
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(err)?;
        let minor: i64 = if minor_str.is_empty() {
            0
        } else {
            let parsed = i64::from(minor_str.parse::<u8>().map_err(|_| err())?);
            // "5" in the fractional position means 50 cents.
            if minor_str.len() == 1 { parsed * 10 } else { parsed }
        };

        major
            .checked_mul(100)
            .and_then(|m| m.checked_add(minor))
            .map(|m| Money(sign * m))
            .ok_or_else(err)
    }
}
