//! Reference numbers and business back-references.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kind::TxnKind;
use crate::scope::Scope;

/// Human-readable transaction number, unique per scope.
///
/// Format: `{SCOPE}-{KIND}-{YYYYMMDD}-{seq}`, e.g. `HOS-INC-20240110-0007`.
/// The sequence component is allocated atomically per (scope, kind, date);
/// uniqueness is the invariant, gaplessness is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionNo(String);

impl TransactionNo {
    pub fn new(scope: Scope, kind: TxnKind, date: NaiveDate, seq: u64) -> Self {
        Self(format!(
            "{}-{}-{}-{:04}",
            scope.code(),
            kind.code(),
            date.format("%Y%m%d"),
            seq
        ))
    }

    /// Rebuild from a stored string (storage round-trip, not validation).
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TransactionNo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Central-ledger voucher number: zero-padded monotonic integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherNo(String);

impl VoucherNo {
    pub fn new(seq: u64) -> Self {
        Self(format!("{seq:06}"))
    }

    /// Rebuild from a stored string (storage round-trip, not validation).
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for VoucherNo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Back-reference to the originating business event (payment, purchase,
/// fund transfer, ...).
///
/// The core never dereferences this; it exists so collaborators can detect
/// and suppress duplicate postings after a retried call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRef {
    /// Collaborator-defined discriminator, e.g. `"payment"`, `"purchase"`.
    pub ref_type: String,
    pub ref_id: Uuid,
}

impl BusinessRef {
    pub fn new(ref_type: impl Into<String>, ref_id: Uuid) -> Self {
        Self {
            ref_type: ref_type.into(),
            ref_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_no_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let no = TransactionNo::new(Scope::Hospital, TxnKind::Income, date, 7);
        assert_eq!(no.as_str(), "HOS-INC-20240110-0007");
    }

    #[test]
    fn transaction_no_sequence_widens_past_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let no = TransactionNo::new(Scope::Optics, TxnKind::FundOut, date, 123_456);
        assert_eq!(no.as_str(), "OPT-FOUT-20240110-123456");
    }

    #[test]
    fn voucher_no_is_zero_padded() {
        assert_eq!(VoucherNo::new(42).as_str(), "000042");
        assert_eq!(VoucherNo::new(1_234_567).as_str(), "1234567");
    }
}
