//! Central-ledger vouchers mirroring department postings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use curafin_core::{DomainError, DomainResult, Money, TransactionId, UserId, VoucherId};

use crate::kind::TxnKind;
use crate::reference::{TransactionNo, VoucherNo};
use crate::scope::Scope;
use crate::transaction::Transaction;

/// Direction of a central-ledger voucher.
///
/// Debit = money into the main ledger, Credit = money out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherType {
    Debit,
    Credit,
}

impl VoucherType {
    pub const fn sign(self) -> i64 {
        match self {
            VoucherType::Debit => 1,
            VoucherType::Credit => -1,
        }
    }

    /// Wire/storage name, matching the serde representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            VoucherType::Debit => "debit",
            VoucherType::Credit => "credit",
        }
    }
}

impl core::fmt::Display for VoucherType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for VoucherType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(VoucherType::Debit),
            "credit" => Ok(VoucherType::Credit),
            other => Err(DomainError::validation(format!(
                "unknown voucher type: {other:?}"
            ))),
        }
    }
}

/// Back-reference to the department posting a voucher mirrors.
///
/// A voucher never outlives the transaction it mirrors; the reverse link is
/// informational (a transaction has at most one voucher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherSource {
    pub scope: Scope,
    pub kind: TxnKind,
    pub transaction_no: TransactionNo,
    pub transaction_id: TransactionId,
}

/// One row of the central ledger.
///
/// Created once per mirrored posting, or amount-incremented in place when
/// the same-day aggregation policy collapses several postings into one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    /// Unique, monotonic across the whole central ledger.
    pub voucher_no: VoucherNo,
    pub voucher_type: VoucherType,
    pub date: NaiveDate,
    pub narration: String,
    pub amount: Money,
    pub source: VoucherSource,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Build the voucher mirroring `txn` into the central ledger.
    pub fn mirror(txn: &Transaction, voucher_no: VoucherNo) -> DomainResult<Self> {
        if !txn.amount.is_positive() {
            return Err(DomainError::invariant("mirrored amount must be positive"));
        }

        Ok(Self {
            id: VoucherId::new(),
            voucher_no,
            voucher_type: txn.kind.voucher_type(),
            date: txn.occurred_on,
            narration: txn.narration(),
            amount: txn.amount,
            source: VoucherSource {
                scope: txn.scope,
                kind: txn.kind,
                transaction_no: txn.transaction_no.clone(),
                transaction_id: txn.id,
            },
            created_by: txn.created_by,
            created_at: Utc::now(),
        })
    }

    /// Same-day aggregation: fold another posting of the same (scope, kind,
    /// date) into this voucher, growing the amount and the narration.
    pub fn merge(&mut self, amount: Money, narration_fragment: &str) -> DomainResult<()> {
        if !amount.is_positive() {
            return Err(DomainError::invariant("merged amount must be positive"));
        }
        self.amount = self
            .amount
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("voucher amount overflow"))?;
        self.narration.push_str("; ");
        self.narration.push_str(narration_fragment);
        Ok(())
    }

    /// Amount with the voucher direction applied (Debit positive).
    pub fn signed_amount(&self) -> Money {
        Money::from_minor(self.voucher_type.sign() * self.amount.minor())
    }

    /// Whether the aggregation rule would fold a posting of the given
    /// (scope, kind, date) into this voucher.
    pub fn aggregates(&self, scope: Scope, kind: TxnKind, date: NaiveDate) -> bool {
        self.source.scope == scope && self.source.kind == kind && self.date == date
    }
}
