use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use curafin_ledger::{Scope, TransactionNo, TxnKind, VoucherNo};

use super::r#trait::Sequencer;
use crate::ledger_store::StoreError;

/// Postgres-backed sequencer.
///
/// Each allocation is a single atomic upsert-and-return statement against
/// the `ledger_sequences` table, so concurrent callers serialize on the row
/// and can never read the same value.
#[derive(Debug, Clone)]
pub struct PostgresSequencer {
    pool: Arc<PgPool>,
}

impl PostgresSequencer {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn next_value(&self, key: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_sequences (key, value)
            VALUES ($1, 1)
            ON CONFLICT (key)
            DO UPDATE SET value = ledger_sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(key)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("sequence allocation failed: {e}")))?;

        let value: i64 = row
            .try_get("value")
            .map_err(|e| StoreError::Storage(format!("failed to read sequence value: {e}")))?;
        Ok(value as u64)
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Storage(
            "PostgresSequencer requires an async runtime (tokio). Ensure you're calling from \
             within a tokio runtime context."
                .to_string(),
        )
    })
}

impl Sequencer for PostgresSequencer {
    fn next_transaction_no(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<TransactionNo, StoreError> {
        let key = format!("txn:{}:{}:{}", scope, kind, date.format("%Y%m%d"));
        let seq = runtime_handle()?.block_on(self.next_value(&key))?;
        Ok(TransactionNo::new(scope, kind, date, seq))
    }

    fn next_voucher_no(&self) -> Result<VoucherNo, StoreError> {
        let seq = runtime_handle()?.block_on(self.next_value("voucher"))?;
        Ok(VoucherNo::new(seq))
    }
}
