use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;

use curafin_ledger::{Scope, TransactionNo, TxnKind, VoucherNo};

use super::r#trait::Sequencer;
use crate::ledger_store::StoreError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct SequenceKey {
    scope: Scope,
    kind: TxnKind,
    date: NaiveDate,
}

/// In-memory sequencer backed by per-key atomic counters.
///
/// The map write lock is held only to install a missing counter; the
/// increment itself is a lock-free `fetch_add`.
#[derive(Debug, Default)]
pub struct InMemorySequencer {
    counters: RwLock<HashMap<SequenceKey, AtomicU64>>,
    voucher_counter: AtomicU64,
}

impl InMemorySequencer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

impl Sequencer for InMemorySequencer {
    fn next_transaction_no(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<TransactionNo, StoreError> {
        let key = SequenceKey { scope, kind, date };

        {
            let counters = self.counters.read().map_err(|_| poisoned())?;
            if let Some(counter) = counters.get(&key) {
                let seq = counter.fetch_add(1, Ordering::Relaxed) + 1;
                return Ok(TransactionNo::new(scope, kind, date, seq));
            }
        }

        let mut counters = self.counters.write().map_err(|_| poisoned())?;
        let counter = counters.entry(key).or_insert_with(|| AtomicU64::new(0));
        let seq = counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(TransactionNo::new(scope, kind, date, seq))
    }

    fn next_voucher_no(&self) -> Result<VoucherNo, StoreError> {
        let seq = self.voucher_counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(VoucherNo::new(seq))
    }
}
