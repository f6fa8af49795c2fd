//! Department transaction records (immutable once written).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use curafin_core::{DomainError, DomainResult, Money, TransactionId, UserId};

use crate::kind::TxnKind;
use crate::reference::{BusinessRef, TransactionNo};
use crate::scope::Scope;

/// What a posting was for.
///
/// Operating postings (income/expense) carry a category; capital postings
/// (fund in/out) carry a purpose instead. The variant must agree with the
/// transaction kind; `Transaction::new` enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnDetail {
    Operating { category: String },
    Capital { purpose: String },
}

impl TxnDetail {
    /// Build the detail variant matching `kind`, from the caller's label.
    pub fn for_kind(kind: TxnKind, label: impl Into<String>) -> Self {
        let label = label.into();
        if kind.is_capital() {
            TxnDetail::Capital { purpose: label }
        } else {
            TxnDetail::Operating { category: label }
        }
    }

    /// Category or purpose, whichever this detail carries.
    pub fn label(&self) -> &str {
        match self {
            TxnDetail::Operating { category } => category,
            TxnDetail::Capital { purpose } => purpose,
        }
    }

    fn agrees_with(&self, kind: TxnKind) -> bool {
        matches!(self, TxnDetail::Capital { .. }) == kind.is_capital()
    }
}

/// One posting in a department ledger.
///
/// Immutable after creation: corrections are new offsetting transactions,
/// never edits. The running department balance must always equal the signed
/// sum of these rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub scope: Scope,
    /// Unique per scope.
    pub transaction_no: TransactionNo,
    pub kind: TxnKind,
    /// Positive; the sign lives in `kind`.
    pub amount: Money,
    pub detail: TxnDetail,
    pub description: String,
    pub business_ref: Option<BusinessRef>,
    /// Business date of the underlying event.
    pub occurred_on: NaiveDate,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: Scope,
        transaction_no: TransactionNo,
        kind: TxnKind,
        amount: Money,
        detail: TxnDetail,
        description: impl Into<String>,
        business_ref: Option<BusinessRef>,
        occurred_on: NaiveDate,
        created_by: UserId,
    ) -> DomainResult<Self> {
        if !scope.is_department() {
            return Err(DomainError::validation(
                "transactions belong to a department scope, not main",
            ));
        }
        if !amount.is_positive() {
            return Err(DomainError::validation("amount must be positive"));
        }
        if detail.label().trim().is_empty() {
            return Err(DomainError::validation("category/purpose must not be empty"));
        }
        if !detail.agrees_with(kind) {
            return Err(DomainError::invariant(
                "capital kinds carry a purpose, operating kinds a category",
            ));
        }

        Ok(Self {
            id: TransactionId::new(),
            scope,
            transaction_no,
            kind,
            amount,
            detail,
            description: description.into(),
            business_ref,
            occurred_on,
            created_by,
            created_at: Utc::now(),
        })
    }

    /// Category or purpose.
    pub fn label(&self) -> &str {
        self.detail.label()
    }

    /// Amount with the kind's sign applied (income/fund_in positive).
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }

    /// Narration fragment used when this posting is mirrored into main.
    pub fn narration(&self) -> String {
        if self.description.is_empty() {
            self.label().to_string()
        } else {
            format!("{} - {}", self.label(), self.description)
        }
    }
}
