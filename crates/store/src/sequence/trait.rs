use chrono::NaiveDate;
use std::sync::Arc;

use curafin_ledger::{Scope, TransactionNo, TxnKind, VoucherNo};

use crate::ledger_store::StoreError;

/// Collision-free allocator for human-readable reference codes.
///
/// Transaction numbers count per (scope, kind, date); voucher numbers are a
/// single monotonic series. Uniqueness is the contract; an allocated code
/// that is never committed (a posting that later fails) leaves a gap, which
/// is fine.
pub trait Sequencer: Send + Sync {
    fn next_transaction_no(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<TransactionNo, StoreError>;

    fn next_voucher_no(&self) -> Result<VoucherNo, StoreError>;
}

impl<S> Sequencer for Arc<S>
where
    S: Sequencer + ?Sized,
{
    fn next_transaction_no(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<TransactionNo, StoreError> {
        (**self).next_transaction_no(scope, kind, date)
    }

    fn next_voucher_no(&self) -> Result<VoucherNo, StoreError> {
        (**self).next_voucher_no()
    }
}
