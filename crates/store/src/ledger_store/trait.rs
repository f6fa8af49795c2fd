use chrono::NaiveDate;
use thiserror::Error;

use curafin_core::{ExpectedRevision, Money, VoucherId};
use curafin_ledger::{Scope, Transaction, TxnKind, Voucher, VoucherNo};
use std::sync::Arc;

/// Consistent pre-commit view of the rows a posting will touch.
///
/// Produced by `LedgerStore::prepare` in a single snapshot. The revisions
/// carried here are the optimistic-concurrency expectations for the commit;
/// if either row moves in between, the commit fails with `Conflict` and the
/// caller re-prepares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingView {
    pub scope_revision: u64,
    pub scope_balance: Money,
    pub main_revision: u64,
    pub main_balance: Money,
    /// Existing voucher for (scope, kind, date), if any: the target of the
    /// same-day aggregation rule.
    pub open_voucher: Option<OpenVoucher>,
}

/// The voucher a same-day posting may merge into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenVoucher {
    pub id: VoucherId,
    pub voucher_no: VoucherNo,
    pub amount: Money,
}

/// Central-ledger side of a posting batch.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOp {
    /// Append a fresh voucher row.
    Create(Voucher),
    /// Fold into an existing same-day voucher.
    Merge {
        voucher_id: VoucherId,
        amount: Money,
        narration_fragment: String,
    },
}

/// Everything one `post` call writes, committed atomically.
///
/// The department balance delta is derived from the transaction's signed
/// amount; the main delta from the mirror op. Carrying expected revisions
/// (rather than letting callers read-modify-write) is what serializes
/// concurrent postings to the same scope.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingBatch {
    pub transaction: Transaction,
    pub expected_scope_revision: ExpectedRevision,
    /// Present when the scope mirrors into the central ledger.
    pub mirror: Option<MirrorWrite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorWrite {
    pub op: MirrorOp,
    pub expected_main_revision: ExpectedRevision,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedPosting {
    pub scope_revision: u64,
    pub scope_balance: Money,
    /// New main balance, when the posting mirrored.
    pub main_balance: Option<Money>,
    /// Voucher the posting landed in (created or merged), when mirrored.
    pub voucher_no: Option<VoucherNo>,
}

/// Ledger store operation error.
///
/// `Conflict` is the retryable case: a concurrent commit moved a row this
/// batch expected. Everything else is deterministic or an infrastructure
/// failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed; re-prepare and retry.
    #[error("serialization conflict: {0}")]
    Conflict(String),

    /// The batch itself is malformed (merge target missing, overflow, ...).
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// Underlying storage failure (pool, IO, lock poisoning).
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Atomic posting storage.
///
/// Implementations must guarantee, for `commit`:
/// - all-or-nothing application of the whole batch
/// - revision checks against *both* rows the batch names before any write
/// - per-scope serialization (two commits to one scope cannot interleave),
///   while commits to different scopes may run fully in parallel
/// - transaction-number and voucher-number uniqueness as a final line of
///   defense (a duplicate is a `Conflict`, never a silent overwrite)
///
/// Snapshot reads (`transactions`, `vouchers`) must observe a single
/// consistent state, never a half-applied commit.
pub trait LedgerStore: Send + Sync {
    /// One consistent view of the rows `commit` will check.
    fn prepare(&self, scope: Scope, kind: TxnKind, date: NaiveDate)
        -> Result<PostingView, StoreError>;

    /// Apply a posting batch atomically.
    fn commit(&self, batch: PostingBatch) -> Result<CommittedPosting, StoreError>;

    /// Current balance of a scope (including `Main`).
    fn balance(&self, scope: Scope) -> Result<Money, StoreError>;

    /// Snapshot of a department's transaction log, in commit order.
    fn transactions(&self, scope: Scope) -> Result<Vec<Transaction>, StoreError>;

    /// Snapshot of the central voucher ledger, in commit order.
    fn vouchers(&self) -> Result<Vec<Voucher>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn prepare(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<PostingView, StoreError> {
        (**self).prepare(scope, kind, date)
    }

    fn commit(&self, batch: PostingBatch) -> Result<CommittedPosting, StoreError> {
        (**self).commit(batch)
    }

    fn balance(&self, scope: Scope) -> Result<Money, StoreError> {
        (**self).balance(scope)
    }

    fn transactions(&self, scope: Scope) -> Result<Vec<Transaction>, StoreError> {
        (**self).transactions(scope)
    }

    fn vouchers(&self) -> Result<Vec<Voucher>, StoreError> {
        (**self).vouchers()
    }
}
