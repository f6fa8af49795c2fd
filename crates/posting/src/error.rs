use thiserror::Error;

use curafin_core::{DomainError, Money};
use curafin_ledger::Scope;
use curafin_store::StoreError;

/// Posting failure taxonomy.
///
/// `Validation` and `InsufficientFunds` are deterministic rejections with no
/// side effects. `RetriesExhausted` is transient: the caller may retry the
/// whole call, using its business reference to dedup against a post that
/// actually landed.
#[derive(Debug, Error)]
pub enum PostError {
    /// Rejected before any write (non-positive amount, bad scope/kind/label).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The posting would drive the department balance below zero.
    #[error("insufficient funds in {scope}: balance {balance}, attempted {amount}")]
    InsufficientFunds {
        scope: Scope,
        balance: Money,
        amount: Money,
    },

    /// Every commit attempt hit a serialization conflict.
    #[error("posting conflicted {attempts} times without committing; retry the call")]
    RetriesExhausted { attempts: u32 },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for PostError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => PostError::Validation(msg),
            DomainError::Conflict(msg) => PostError::Store(StoreError::Conflict(msg)),
            DomainError::NotFound => PostError::Validation("not found".to_string()),
        }
    }
}

impl From<StoreError> for PostError {
    fn from(value: StoreError) -> Self {
        PostError::Store(value)
    }
}
