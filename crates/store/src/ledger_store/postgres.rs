//! Postgres-backed ledger store.
//!
//! One posting batch is one SQL transaction: the account rows are locked
//! with `SELECT .. FOR UPDATE`, revisions are checked against the batch's
//! expectations, and the transaction/voucher rows are written under unique
//! constraints as the last line of defense.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent commit raced a reference number |
//! | Database (check constraint violation) | `23514` | `InvalidCommit` | Invalid data (e.g., amount <= 0) |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed / network | N/A | `Storage` | Infrastructure failure |
//!
//! ## Thread Safety
//!
//! `PostgresLedgerStore` is `Send + Sync`; all operations go through the
//! SQLx connection pool. The synchronous `LedgerStore` impl bridges into
//! async via the ambient tokio runtime handle.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction as PgTransaction};
use tracing::instrument;

use curafin_core::{Money, TransactionId, UserId, VoucherId};
use curafin_ledger::{
    BusinessRef, Scope, Transaction, TransactionNo, TxnDetail, TxnKind, Voucher, VoucherNo,
    VoucherSource, VoucherType,
};

use super::r#trait::{
    CommittedPosting, LedgerStore, MirrorOp, OpenVoucher, PostingBatch, PostingView, StoreError,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ledger_accounts (
        scope       TEXT PRIMARY KEY,
        balance     BIGINT NOT NULL DEFAULT 0,
        revision    BIGINT NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_transactions (
        id              UUID PRIMARY KEY,
        scope           TEXT NOT NULL,
        transaction_no  TEXT NOT NULL,
        kind            TEXT NOT NULL,
        amount          BIGINT NOT NULL CHECK (amount > 0),
        label           TEXT NOT NULL,
        description     TEXT NOT NULL,
        ref_type        TEXT,
        ref_id          UUID,
        occurred_on     DATE NOT NULL,
        created_by      UUID NOT NULL,
        created_at      TIMESTAMPTZ NOT NULL,
        UNIQUE (scope, transaction_no)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_vouchers (
        id                      UUID PRIMARY KEY,
        voucher_no              TEXT NOT NULL UNIQUE,
        voucher_type            TEXT NOT NULL,
        date                    DATE NOT NULL,
        narration               TEXT NOT NULL,
        amount                  BIGINT NOT NULL CHECK (amount > 0),
        source_scope            TEXT NOT NULL,
        source_kind             TEXT NOT NULL,
        source_transaction_no   TEXT NOT NULL,
        source_transaction_id   UUID NOT NULL,
        created_by              UUID NOT NULL,
        created_at              TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_sequences (
        key     TEXT PRIMARY KEY,
        value   BIGINT NOT NULL
    )
    "#,
];

/// Postgres-backed atomic posting storage.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger tables if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(scope = %scope, kind = %kind), err)]
    pub async fn prepare_view(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<PostingView, StoreError> {
        let (scope_balance, scope_revision) = self.read_account(scope).await?;
        let (main_balance, main_revision) = self.read_account(Scope::Main).await?;

        let row = sqlx::query(
            r#"
            SELECT id, voucher_no, amount
            FROM ledger_vouchers
            WHERE source_scope = $1 AND source_kind = $2 AND date = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(scope.to_string())
        .bind(kind.as_str())
        .bind(date)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("prepare_view", e))?;

        let open_voucher = match row {
            Some(row) => Some(OpenVoucher {
                id: VoucherId::from_uuid(
                    row.try_get("id").map_err(|e| corrupt_row("voucher id", e))?,
                ),
                voucher_no: VoucherNo::from_raw(
                    row.try_get::<String, _>("voucher_no")
                        .map_err(|e| corrupt_row("voucher_no", e))?,
                ),
                amount: Money::from_minor(
                    row.try_get("amount").map_err(|e| corrupt_row("amount", e))?,
                ),
            }),
            None => None,
        };

        Ok(PostingView {
            scope_revision,
            scope_balance,
            main_revision,
            main_balance,
            open_voucher,
        })
    }

    #[instrument(
        skip(self, batch),
        fields(
            scope = %batch.transaction.scope,
            transaction_no = %batch.transaction.transaction_no,
            mirrored = batch.mirror.is_some()
        ),
        err
    )]
    pub async fn commit_posting(
        &self,
        batch: PostingBatch,
    ) -> Result<CommittedPosting, StoreError> {
        let scope = batch.transaction.scope;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the department row and check the batch's expectation.
        let (balance, revision) = lock_account(&mut tx, scope).await?;
        if !batch.expected_scope_revision.matches(revision) {
            return Err(StoreError::Conflict(format!(
                "scope {scope} at revision {revision}, batch expected {:?}",
                batch.expected_scope_revision
            )));
        }
        let scope_revision = revision + 1;

        let new_balance = balance
            .checked_add(batch.transaction.signed_amount())
            .ok_or_else(|| StoreError::InvalidCommit("balance overflow".to_string()))?;

        insert_transaction(&mut tx, &batch.transaction).await?;
        update_account(&mut tx, scope, new_balance, scope_revision).await?;

        let mut main_balance = None;
        let mut voucher_no = None;

        if let Some(mirror) = batch.mirror {
            // Main is always locked after the department row; commits never
            // take the locks in the other order.
            let (balance, revision) = lock_account(&mut tx, Scope::Main).await?;
            if !mirror.expected_main_revision.matches(revision) {
                return Err(StoreError::Conflict(format!(
                    "main at revision {revision}, batch expected {:?}",
                    mirror.expected_main_revision
                )));
            }

            let (delta, no) = match mirror.op {
                MirrorOp::Create(voucher) => {
                    let delta = voucher.signed_amount();
                    let no = voucher.voucher_no.clone();
                    insert_voucher(&mut tx, &voucher).await?;
                    (delta, no)
                }
                MirrorOp::Merge { voucher_id, amount, narration_fragment } => {
                    merge_voucher(&mut tx, voucher_id, amount, &narration_fragment).await?
                }
            };

            let new_main_balance = balance
                .checked_add(delta)
                .ok_or_else(|| StoreError::InvalidCommit("main balance overflow".to_string()))?;
            update_account(&mut tx, Scope::Main, new_main_balance, revision + 1).await?;

            main_balance = Some(new_main_balance);
            voucher_no = Some(no);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(CommittedPosting {
            scope_revision,
            scope_balance: new_balance,
            main_balance,
            voucher_no,
        })
    }

    pub async fn read_balance(&self, scope: Scope) -> Result<Money, StoreError> {
        Ok(self.read_account(scope).await?.0)
    }

    pub async fn load_transactions(&self, scope: Scope) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, scope, transaction_no, kind, amount, label, description,
                   ref_type, ref_id, occurred_on, created_by, created_at
            FROM ledger_transactions
            WHERE scope = $1
            ORDER BY created_at ASC, transaction_no ASC
            "#,
        )
        .bind(scope.to_string())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_transactions", e))?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let raw = TransactionRow::from_row(&row)
                .map_err(|e| corrupt_row("ledger_transactions", e))?;
            transactions.push(raw.try_into()?);
        }
        Ok(transactions)
    }

    pub async fn load_vouchers(&self) -> Result<Vec<Voucher>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, voucher_no, voucher_type, date, narration, amount,
                   source_scope, source_kind, source_transaction_no,
                   source_transaction_id, created_by, created_at
            FROM ledger_vouchers
            ORDER BY created_at ASC, voucher_no ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_vouchers", e))?;

        let mut vouchers = Vec::with_capacity(rows.len());
        for row in rows {
            let raw = VoucherRow::from_row(&row).map_err(|e| corrupt_row("ledger_vouchers", e))?;
            vouchers.push(raw.try_into()?);
        }
        Ok(vouchers)
    }

    async fn read_account(&self, scope: Scope) -> Result<(Money, u64), StoreError> {
        let row = sqlx::query("SELECT balance, revision FROM ledger_accounts WHERE scope = $1")
            .bind(scope.to_string())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("read_account", e))?;

        match row {
            Some(row) => {
                let balance: i64 = row.try_get("balance").map_err(|e| corrupt_row("balance", e))?;
                let revision: i64 =
                    row.try_get("revision").map_err(|e| corrupt_row("revision", e))?;
                Ok((Money::from_minor(balance), revision as u64))
            }
            // Absent rows read as zero; they are created lazily on first commit.
            None => Ok((Money::ZERO, 0)),
        }
    }
}

/// Lock an account row for the duration of the commit, creating it lazily.
async fn lock_account(
    tx: &mut PgTransaction<'_, Postgres>,
    scope: Scope,
) -> Result<(Money, u64), StoreError> {
    sqlx::query("INSERT INTO ledger_accounts (scope) VALUES ($1) ON CONFLICT (scope) DO NOTHING")
        .bind(scope.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("ensure_account", e))?;

    let row = sqlx::query(
        "SELECT balance, revision FROM ledger_accounts WHERE scope = $1 FOR UPDATE",
    )
    .bind(scope.to_string())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_account", e))?;

    let balance: i64 = row.try_get("balance").map_err(|e| corrupt_row("balance", e))?;
    let revision: i64 = row.try_get("revision").map_err(|e| corrupt_row("revision", e))?;
    Ok((Money::from_minor(balance), revision as u64))
}

async fn update_account(
    tx: &mut PgTransaction<'_, Postgres>,
    scope: Scope,
    balance: Money,
    revision: u64,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE ledger_accounts SET balance = $2, revision = $3 WHERE scope = $1")
        .bind(scope.to_string())
        .bind(balance.minor())
        .bind(revision as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_account", e))?;
    Ok(())
}

async fn insert_transaction(
    tx: &mut PgTransaction<'_, Postgres>,
    transaction: &Transaction,
) -> Result<(), StoreError> {
    let (ref_type, ref_id) = match &transaction.business_ref {
        Some(r) => (Some(r.ref_type.as_str()), Some(r.ref_id)),
        None => (None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO ledger_transactions (
            id, scope, transaction_no, kind, amount, label, description,
            ref_type, ref_id, occurred_on, created_by, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(transaction.id.as_uuid())
    .bind(transaction.scope.to_string())
    .bind(transaction.transaction_no.as_str())
    .bind(transaction.kind.as_str())
    .bind(transaction.amount.minor())
    .bind(transaction.label())
    .bind(&transaction.description)
    .bind(ref_type)
    .bind(ref_id)
    .bind(transaction.occurred_on)
    .bind(transaction.created_by.as_uuid())
    .bind(transaction.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!(
                "duplicate transaction number {}",
                transaction.transaction_no
            ))
        } else {
            map_sqlx_error("insert_transaction", e)
        }
    })?;
    Ok(())
}

async fn insert_voucher(
    tx: &mut PgTransaction<'_, Postgres>,
    voucher: &Voucher,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO ledger_vouchers (
            id, voucher_no, voucher_type, date, narration, amount,
            source_scope, source_kind, source_transaction_no,
            source_transaction_id, created_by, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(voucher.id.as_uuid())
    .bind(voucher.voucher_no.as_str())
    .bind(voucher.voucher_type.as_str())
    .bind(voucher.date)
    .bind(&voucher.narration)
    .bind(voucher.amount.minor())
    .bind(voucher.source.scope.to_string())
    .bind(voucher.source.kind.as_str())
    .bind(voucher.source.transaction_no.as_str())
    .bind(voucher.source.transaction_id.as_uuid())
    .bind(voucher.created_by.as_uuid())
    .bind(voucher.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!("duplicate voucher number {}", voucher.voucher_no))
        } else {
            map_sqlx_error("insert_voucher", e)
        }
    })?;
    Ok(())
}

/// Fold an amount into an existing voucher row; returns the signed main
/// delta and the voucher number.
async fn merge_voucher(
    tx: &mut PgTransaction<'_, Postgres>,
    voucher_id: VoucherId,
    amount: Money,
    narration_fragment: &str,
) -> Result<(Money, VoucherNo), StoreError> {
    if !amount.is_positive() {
        return Err(StoreError::InvalidCommit("merged amount must be positive".to_string()));
    }

    let row = sqlx::query(
        "SELECT voucher_no, voucher_type, amount FROM ledger_vouchers WHERE id = $1 FOR UPDATE",
    )
    .bind(voucher_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_voucher", e))?
    .ok_or_else(|| {
        StoreError::InvalidCommit(format!("merge target voucher {voucher_id} not found"))
    })?;

    let voucher_no: String =
        row.try_get("voucher_no").map_err(|e| corrupt_row("voucher_no", e))?;
    let voucher_type: String =
        row.try_get("voucher_type").map_err(|e| corrupt_row("voucher_type", e))?;
    let current: i64 = row.try_get("amount").map_err(|e| corrupt_row("amount", e))?;

    let voucher_type = VoucherType::from_str(&voucher_type)
        .map_err(|e| StoreError::Storage(format!("corrupt voucher row: {e}")))?;
    let merged = Money::from_minor(current)
        .checked_add(amount)
        .ok_or_else(|| StoreError::InvalidCommit("voucher amount overflow".to_string()))?;

    sqlx::query(
        "UPDATE ledger_vouchers SET amount = $2, narration = narration || '; ' || $3 WHERE id = $1",
    )
    .bind(voucher_id.as_uuid())
    .bind(merged.minor())
    .bind(narration_fragment)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("merge_voucher", e))?;

    Ok((
        Money::from_minor(voucher_type.sign() * amount.minor()),
        VoucherNo::from_raw(voucher_no),
    ))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: a concurrent commit raced this one.
                Some("23505") => StoreError::Conflict(msg),
                // Check constraint violation: invalid data.
                Some("23514") => StoreError::InvalidCommit(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn corrupt_row(column: &str, err: sqlx::Error) -> StoreError {
    StoreError::Storage(format!("failed to read {column}: {err}"))
}

// SQLx row types

#[derive(Debug)]
struct TransactionRow {
    id: uuid::Uuid,
    scope: String,
    transaction_no: String,
    kind: String,
    amount: i64,
    label: String,
    description: String,
    ref_type: Option<String>,
    ref_id: Option<uuid::Uuid>,
    occurred_on: NaiveDate,
    created_by: uuid::Uuid,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TransactionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            scope: row.try_get("scope")?,
            transaction_no: row.try_get("transaction_no")?,
            kind: row.try_get("kind")?,
            amount: row.try_get("amount")?,
            label: row.try_get("label")?,
            description: row.try_get("description")?,
            ref_type: row.try_get("ref_type")?,
            ref_id: row.try_get("ref_id")?,
            occurred_on: row.try_get("occurred_on")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let scope = Scope::from_str(&row.scope)
            .map_err(|e| StoreError::Storage(format!("corrupt transaction row: {e}")))?;
        let kind = TxnKind::from_str(&row.kind)
            .map_err(|e| StoreError::Storage(format!("corrupt transaction row: {e}")))?;

        let business_ref = match (row.ref_type, row.ref_id) {
            (Some(ref_type), Some(ref_id)) => Some(BusinessRef::new(ref_type, ref_id)),
            _ => None,
        };

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            scope,
            transaction_no: TransactionNo::from_raw(row.transaction_no),
            kind,
            amount: Money::from_minor(row.amount),
            detail: TxnDetail::for_kind(kind, row.label),
            description: row.description,
            business_ref,
            occurred_on: row.occurred_on,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct VoucherRow {
    id: uuid::Uuid,
    voucher_no: String,
    voucher_type: String,
    date: NaiveDate,
    narration: String,
    amount: i64,
    source_scope: String,
    source_kind: String,
    source_transaction_no: String,
    source_transaction_id: uuid::Uuid,
    created_by: uuid::Uuid,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for VoucherRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(VoucherRow {
            id: row.try_get("id")?,
            voucher_no: row.try_get("voucher_no")?,
            voucher_type: row.try_get("voucher_type")?,
            date: row.try_get("date")?,
            narration: row.try_get("narration")?,
            amount: row.try_get("amount")?,
            source_scope: row.try_get("source_scope")?,
            source_kind: row.try_get("source_kind")?,
            source_transaction_no: row.try_get("source_transaction_no")?,
            source_transaction_id: row.try_get("source_transaction_id")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = StoreError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        let voucher_type = VoucherType::from_str(&row.voucher_type)
            .map_err(|e| StoreError::Storage(format!("corrupt voucher row: {e}")))?;
        let source_scope = Scope::from_str(&row.source_scope)
            .map_err(|e| StoreError::Storage(format!("corrupt voucher row: {e}")))?;
        let source_kind = TxnKind::from_str(&row.source_kind)
            .map_err(|e| StoreError::Storage(format!("corrupt voucher row: {e}")))?;

        Ok(Voucher {
            id: VoucherId::from_uuid(row.id),
            voucher_no: VoucherNo::from_raw(row.voucher_no),
            voucher_type,
            date: row.date,
            narration: row.narration,
            amount: Money::from_minor(row.amount),
            source: VoucherSource {
                scope: source_scope,
                kind: source_kind,
                transaction_no: TransactionNo::from_raw(row.source_transaction_no),
                transaction_id: TransactionId::from_uuid(row.source_transaction_id),
            },
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
        })
    }
}

// Implement the synchronous LedgerStore trait.
//
// The trait is synchronous, but Postgres operations require async. We use
// tokio::runtime::Handle to run async code in a sync context; this works
// when called from within a tokio runtime.

fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Storage(
            "PostgresLedgerStore requires an async runtime (tokio). Ensure you're calling from \
             within a tokio runtime context."
                .to_string(),
        )
    })
}

impl LedgerStore for PostgresLedgerStore {
    fn prepare(
        &self,
        scope: Scope,
        kind: TxnKind,
        date: NaiveDate,
    ) -> Result<PostingView, StoreError> {
        runtime_handle()?.block_on(self.prepare_view(scope, kind, date))
    }

    fn commit(&self, batch: PostingBatch) -> Result<CommittedPosting, StoreError> {
        runtime_handle()?.block_on(self.commit_posting(batch))
    }

    fn balance(&self, scope: Scope) -> Result<Money, StoreError> {
        runtime_handle()?.block_on(self.read_balance(scope))
    }

    fn transactions(&self, scope: Scope) -> Result<Vec<Transaction>, StoreError> {
        runtime_handle()?.block_on(self.load_transactions(scope))
    }

    fn vouchers(&self) -> Result<Vec<Voucher>, StoreError> {
        runtime_handle()?.block_on(self.load_vouchers())
    }
}
