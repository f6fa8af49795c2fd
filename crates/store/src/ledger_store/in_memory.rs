use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use curafin_core::{ExpectedRevision, Money};
use curafin_ledger::{Scope, Transaction, TxnKind, Voucher};

use super::r#trait::{
    CommittedPosting, LedgerStore, MirrorOp, OpenVoucher, PostingBatch, PostingView, StoreError,
};

#[derive(Debug, Default)]
struct ScopeShard {
    revision: u64,
    balance: Money,
    log: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct MainShard {
    revision: u64,
    balance: Money,
    vouchers: Vec<Voucher>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. One shard per department scope plus the main
/// shard; a commit locks the department shard and, when mirroring, the main
/// shard, always in that order, so commits to different departments run in
/// parallel and the lock order cannot deadlock.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    shards: HashMap<Scope, RwLock<ScopeShard>>,
    main: RwLock<MainShard>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        // Every department row exists up front; there is no lazy "first or
        // create" path to race on.
        let shards = Scope::departments()
            .into_iter()
            .map(|scope| (scope, RwLock::new(ScopeShard::default())))
            .collect();

        Self {
            shards,
            main: RwLock::new(MainShard::default()),
        }
    }

    fn shard(&self, scope: Scope) -> Result<&RwLock<ScopeShard>, StoreError> {
        self.shards.get(&scope).ok_or_else(|| {
            StoreError::InvalidCommit(format!("scope {scope} has no department shard"))
        })
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

impl LedgerStore for InMemoryLedgerStore {
    fn prepare(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<PostingView, StoreError> {
        let shard = self.shard(scope)?.read().map_err(|_| poisoned())?;
        let main = self.main.read().map_err(|_| poisoned())?;

        let open_voucher = main
            .vouchers
            .iter()
            .rev()
            .find(|v| v.aggregates(scope, kind, date))
            .map(|v| OpenVoucher {
                id: v.id,
                voucher_no: v.voucher_no.clone(),
                amount: v.amount,
            });

        Ok(PostingView {
            scope_revision: shard.revision,
            scope_balance: shard.balance,
            main_revision: main.revision,
            main_balance: main.balance,
            open_voucher,
        })
    }

    fn commit(&self, batch: PostingBatch) -> Result<CommittedPosting, StoreError> {
        let scope = batch.transaction.scope;
        let mut shard = self.shard(scope)?.write().map_err(|_| poisoned())?;

        if !batch.expected_scope_revision.matches(shard.revision) {
            return Err(StoreError::Conflict(format!(
                "scope {scope} at revision {}, batch expected {:?}",
                shard.revision, batch.expected_scope_revision
            )));
        }
        if shard
            .log
            .iter()
            .any(|t| t.transaction_no == batch.transaction.transaction_no)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate transaction number {}",
                batch.transaction.transaction_no
            )));
        }

        let new_balance = shard
            .balance
            .checked_add(batch.transaction.signed_amount())
            .ok_or_else(|| StoreError::InvalidCommit("balance overflow".to_string()))?;

        // Validate the mirror side completely before mutating anything, so a
        // failed batch leaves both shards untouched.
        let mut main_guard = None;
        let mut mirror_apply = None;

        if let Some(mirror) = &batch.mirror {
            let main = self.main.write().map_err(|_| poisoned())?;

            if !mirror.expected_main_revision.matches(main.revision) {
                return Err(StoreError::Conflict(format!(
                    "main at revision {}, batch expected {:?}",
                    main.revision, mirror.expected_main_revision
                )));
            }

            let (delta, voucher_no, merged_voucher) = match &mirror.op {
                MirrorOp::Create(voucher) => {
                    if main.vouchers.iter().any(|v| v.voucher_no == voucher.voucher_no) {
                        return Err(StoreError::Conflict(format!(
                            "duplicate voucher number {}",
                            voucher.voucher_no
                        )));
                    }
                    (voucher.signed_amount(), voucher.voucher_no.clone(), None)
                }
                MirrorOp::Merge { voucher_id, amount, narration_fragment } => {
                    let target = main
                        .vouchers
                        .iter()
                        .find(|v| v.id == *voucher_id)
                        .ok_or_else(|| {
                            StoreError::InvalidCommit(format!(
                                "merge target voucher {voucher_id} not found"
                            ))
                        })?;
                    // Merge a clone first; the swap below cannot fail.
                    let mut merged = target.clone();
                    merged
                        .merge(*amount, narration_fragment)
                        .map_err(|e| StoreError::InvalidCommit(e.to_string()))?;
                    (
                        Money::from_minor(target.voucher_type.sign() * amount.minor()),
                        target.voucher_no.clone(),
                        Some(merged),
                    )
                }
            };

            let new_main_balance = main
                .balance
                .checked_add(delta)
                .ok_or_else(|| StoreError::InvalidCommit("main balance overflow".to_string()))?;

            mirror_apply = Some((new_main_balance, voucher_no, merged_voucher));
            main_guard = Some(main);
        }

        // Point of no return: every check passed, apply both sides.
        shard.log.push(batch.transaction);
        shard.balance = new_balance;
        shard.revision += 1;

        let mut main_balance = None;
        let mut voucher_no = None;

        if let (Some(mut main), Some((new_main_balance, no, merged_voucher)), Some(mirror)) =
            (main_guard, mirror_apply, batch.mirror)
        {
            match mirror.op {
                MirrorOp::Create(voucher) => main.vouchers.push(voucher),
                MirrorOp::Merge { voucher_id, .. } => {
                    if let (Some(slot), Some(merged)) = (
                        main.vouchers.iter_mut().find(|v| v.id == voucher_id),
                        merged_voucher,
                    ) {
                        *slot = merged;
                    }
                }
            }
            main.balance = new_main_balance;
            main.revision += 1;
            main_balance = Some(new_main_balance);
            voucher_no = Some(no);
        }

        Ok(CommittedPosting {
            scope_revision: shard.revision,
            scope_balance: shard.balance,
            main_balance,
            voucher_no,
        })
    }

    fn balance(&self, scope: Scope) -> Result<Money, StoreError> {
        if scope == Scope::Main {
            let main = self.main.read().map_err(|_| poisoned())?;
            return Ok(main.balance);
        }
        let shard = self.shard(scope)?.read().map_err(|_| poisoned())?;
        Ok(shard.balance)
    }

    fn transactions(&self, scope: Scope) -> Result<Vec<Transaction>, StoreError> {
        if scope == Scope::Main {
            return Ok(Vec::new());
        }
        let shard = self.shard(scope)?.read().map_err(|_| poisoned())?;
        Ok(shard.log.clone())
    }

    fn vouchers(&self) -> Result<Vec<Voucher>, StoreError> {
        let main = self.main.read().map_err(|_| poisoned())?;
        Ok(main.vouchers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger_store::r#trait::MirrorWrite;
    use curafin_core::UserId;
    use curafin_ledger::{TransactionNo, TxnDetail, Voucher, VoucherNo};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn income(scope: Scope, amount_major: i64, seq: u64) -> Transaction {
        Transaction::new(
            scope,
            TransactionNo::new(scope, TxnKind::Income, date(), seq),
            TxnKind::Income,
            Money::from_major(amount_major),
            TxnDetail::for_kind(TxnKind::Income, "Consultation"),
            "",
            None,
            date(),
            UserId::new(),
        )
        .unwrap()
    }

    #[test]
    fn commit_applies_balance_and_log_together() {
        let store = InMemoryLedgerStore::new();
        let view = store.prepare(Scope::Hospital, TxnKind::Income, date()).unwrap();

        let committed = store
            .commit(PostingBatch {
                transaction: income(Scope::Hospital, 500, 1),
                expected_scope_revision: ExpectedRevision::Exact(view.scope_revision),
                mirror: None,
            })
            .unwrap();

        assert_eq!(committed.scope_balance, Money::from_major(500));
        assert_eq!(committed.scope_revision, 1);
        assert_eq!(store.balance(Scope::Hospital).unwrap(), Money::from_major(500));
        assert_eq!(store.transactions(Scope::Hospital).unwrap().len(), 1);
    }

    #[test]
    fn stale_scope_revision_applies_nothing() {
        let store = InMemoryLedgerStore::new();
        store
            .commit(PostingBatch {
                transaction: income(Scope::Hospital, 100, 1),
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: None,
            })
            .unwrap();

        let err = store
            .commit(PostingBatch {
                transaction: income(Scope::Hospital, 100, 2),
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: None,
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.balance(Scope::Hospital).unwrap(), Money::from_major(100));
        assert_eq!(store.transactions(Scope::Hospital).unwrap().len(), 1);
    }

    #[test]
    fn stale_main_revision_leaves_scope_untouched_too() {
        let store = InMemoryLedgerStore::new();
        let txn = income(Scope::Hospital, 500, 1);
        let voucher = Voucher::mirror(&txn, VoucherNo::new(1)).unwrap();

        let err = store
            .commit(PostingBatch {
                transaction: txn,
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: Some(MirrorWrite {
                    op: MirrorOp::Create(voucher),
                    expected_main_revision: ExpectedRevision::Exact(7),
                }),
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.balance(Scope::Hospital).unwrap(), Money::ZERO);
        assert_eq!(store.balance(Scope::Main).unwrap(), Money::ZERO);
        assert!(store.transactions(Scope::Hospital).unwrap().is_empty());
        assert!(store.vouchers().unwrap().is_empty());
    }

    #[test]
    fn mirrored_commit_moves_main_balance() {
        let store = InMemoryLedgerStore::new();
        let txn = income(Scope::Hospital, 500, 1);
        let voucher = Voucher::mirror(&txn, VoucherNo::new(1)).unwrap();

        let committed = store
            .commit(PostingBatch {
                transaction: txn,
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: Some(MirrorWrite {
                    op: MirrorOp::Create(voucher),
                    expected_main_revision: ExpectedRevision::Exact(0),
                }),
            })
            .unwrap();

        assert_eq!(committed.main_balance, Some(Money::from_major(500)));
        assert_eq!(store.balance(Scope::Main).unwrap(), Money::from_major(500));
        assert_eq!(store.vouchers().unwrap().len(), 1);
    }

    #[test]
    fn merge_increments_existing_voucher_in_place() {
        let store = InMemoryLedgerStore::new();
        let first = income(Scope::Hospital, 500, 1);
        let voucher = Voucher::mirror(&first, VoucherNo::new(1)).unwrap();
        let voucher_id = voucher.id;

        store
            .commit(PostingBatch {
                transaction: first,
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: Some(MirrorWrite {
                    op: MirrorOp::Create(voucher),
                    expected_main_revision: ExpectedRevision::Exact(0),
                }),
            })
            .unwrap();

        store
            .commit(PostingBatch {
                transaction: income(Scope::Hospital, 300, 2),
                expected_scope_revision: ExpectedRevision::Exact(1),
                mirror: Some(MirrorWrite {
                    op: MirrorOp::Merge {
                        voucher_id,
                        amount: Money::from_major(300),
                        narration_fragment: "Consultation".to_string(),
                    },
                    expected_main_revision: ExpectedRevision::Exact(1),
                }),
            })
            .unwrap();

        let vouchers = store.vouchers().unwrap();
        assert_eq!(vouchers.len(), 1);
        assert_eq!(vouchers[0].amount, Money::from_major(800));
        assert_eq!(store.balance(Scope::Main).unwrap(), Money::from_major(800));
    }

    #[test]
    fn prepare_surfaces_open_voucher_for_same_day_kind() {
        let store = InMemoryLedgerStore::new();
        let txn = income(Scope::Hospital, 500, 1);
        let voucher = Voucher::mirror(&txn, VoucherNo::new(1)).unwrap();

        store
            .commit(PostingBatch {
                transaction: txn,
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: Some(MirrorWrite {
                    op: MirrorOp::Create(voucher),
                    expected_main_revision: ExpectedRevision::Exact(0),
                }),
            })
            .unwrap();

        let view = store.prepare(Scope::Hospital, TxnKind::Income, date()).unwrap();
        assert!(view.open_voucher.is_some());

        let other_day = store
            .prepare(
                Scope::Hospital,
                TxnKind::Income,
                NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            )
            .unwrap();
        assert!(other_day.open_voucher.is_none());
    }

    #[test]
    fn duplicate_transaction_no_is_a_conflict() {
        let store = InMemoryLedgerStore::new();
        store
            .commit(PostingBatch {
                transaction: income(Scope::Hospital, 100, 1),
                expected_scope_revision: ExpectedRevision::Exact(0),
                mirror: None,
            })
            .unwrap();

        let err = store
            .commit(PostingBatch {
                transaction: income(Scope::Hospital, 100, 1),
                expected_scope_revision: ExpectedRevision::Exact(1),
                mirror: None,
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
