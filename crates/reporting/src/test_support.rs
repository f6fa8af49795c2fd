//! Shared helpers for reporting tests: seed a store through raw commits.

use chrono::NaiveDate;

use curafin_core::{ExpectedRevision, Money, UserId};
use curafin_ledger::{Scope, Transaction, TransactionNo, TxnDetail, TxnKind, Voucher, VoucherNo};
use curafin_store::{InMemoryLedgerStore, LedgerStore, MirrorOp, MirrorWrite, PostingBatch};

pub(crate) fn seeded_store() -> InMemoryLedgerStore {
    InMemoryLedgerStore::new()
}

pub(crate) fn parse_date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn transaction(
    scope: Scope,
    kind: TxnKind,
    amount_major: i64,
    date: NaiveDate,
    seq: u64,
) -> Transaction {
    Transaction::new(
        scope,
        TransactionNo::new(scope, kind, date, seq),
        kind,
        Money::from_major(amount_major),
        TxnDetail::for_kind(kind, "Consultation"),
        "",
        None,
        date,
        UserId::new(),
    )
    .unwrap()
}

/// Commit a hospital posting without mirroring.
pub(crate) fn post(store: &InMemoryLedgerStore, kind: TxnKind, amount_major: i64, date: &str) {
    let date = parse_date(date);
    let view = store.prepare(Scope::Hospital, kind, date).unwrap();
    let txn = transaction(Scope::Hospital, kind, amount_major, date, view.scope_revision + 1);
    store
        .commit(PostingBatch {
            transaction: txn,
            expected_scope_revision: ExpectedRevision::Exact(view.scope_revision),
            mirror: None,
        })
        .unwrap();
}

/// Commit a mirrored posting (fresh voucher, no aggregation).
pub(crate) fn post_mirrored(
    store: &InMemoryLedgerStore,
    scope: Scope,
    kind: TxnKind,
    amount_major: i64,
    date: &str,
    voucher_seq: u64,
) {
    let date = parse_date(date);
    let view = store.prepare(scope, kind, date).unwrap();
    let txn = transaction(scope, kind, amount_major, date, view.scope_revision + 1);
    let voucher = Voucher::mirror(&txn, VoucherNo::new(voucher_seq)).unwrap();
    store
        .commit(PostingBatch {
            transaction: txn,
            expected_scope_revision: ExpectedRevision::Exact(view.scope_revision),
            mirror: Some(MirrorWrite {
                op: MirrorOp::Create(voucher),
                expected_main_revision: ExpectedRevision::Exact(view.main_revision),
            }),
        })
        .unwrap();
}
