//! The posting service: validate, sequence, mirror, commit.

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use curafin_core::{ExpectedRevision, Money, UserId};
use curafin_ledger::{
    BusinessRef, MirrorConfig, MirrorPolicy, Scope, Transaction, TransactionNo, TxnDetail, TxnKind,
    Voucher, VoucherNo,
};
use curafin_store::{
    LedgerStore, MirrorOp, MirrorWrite, PostingBatch, PostingView, Sequencer, StoreError,
};

use crate::error::PostError;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// One posting, as a business collaborator describes it.
///
/// `label` is the category for income/expense and the purpose for fund
/// movements. `business_ref` identifies the originating domain event so a
/// retried call can be deduplicated by the caller.
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub scope: Scope,
    pub kind: TxnKind,
    pub amount: Money,
    pub label: String,
    pub description: String,
    pub occurred_on: NaiveDate,
    pub business_ref: Option<BusinessRef>,
    pub created_by: UserId,
}

/// What a successful posting committed.
#[derive(Debug, Clone)]
pub struct PostReceipt {
    pub transaction: Transaction,
    /// Department balance after the posting.
    pub balance: Money,
    /// Main balance after the posting, when the scope mirrors.
    pub main_balance: Option<Money>,
    /// Voucher the posting landed in (created or merged), when mirrored.
    pub voucher_no: Option<VoucherNo>,
}

/// Orchestrates one posting as a single atomic unit of work.
///
/// The service is the only writer of balances and logs. Concurrent calls
/// for the same scope serialize through the store's revision checks; a
/// bounded number of conflicts is absorbed here by re-reading and
/// re-deciding the mirror side, after which the failure surfaces as
/// transient.
#[derive(Debug)]
pub struct PostingService<S, Q> {
    store: S,
    sequencer: Q,
    config: MirrorConfig,
    max_attempts: u32,
}

impl<S, Q> PostingService<S, Q> {
    pub fn new(store: S, sequencer: Q) -> Self {
        Self {
            store,
            sequencer,
            config: MirrorConfig::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_config(mut self, config: MirrorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn into_parts(self) -> (S, Q) {
        (self.store, self.sequencer)
    }
}

impl<S, Q> PostingService<S, Q>
where
    S: LedgerStore,
    Q: Sequencer,
{
    /// Record one financial event.
    ///
    /// Rejections (`Validation`, `InsufficientFunds`) happen before any
    /// write and before a reference number is allocated; a rejected call
    /// changes nothing.
    #[instrument(
        skip(self, request),
        fields(
            scope = %request.scope,
            kind = %request.kind,
            amount = %request.amount,
        ),
        err
    )]
    pub fn post(&self, request: PostRequest) -> Result<PostReceipt, PostError> {
        if !request.amount.is_positive() {
            return Err(PostError::Validation("amount must be positive".to_string()));
        }
        if !request.scope.is_department() {
            return Err(PostError::Validation(
                "postings target a department scope, not main".to_string(),
            ));
        }
        if request.label.trim().is_empty() {
            return Err(PostError::Validation(
                "category/purpose must not be empty".to_string(),
            ));
        }

        let policy = self.config.policy(request.scope);

        let mut view = self
            .store
            .prepare(request.scope, request.kind, request.occurred_on)?;
        self.check_sufficiency(&request, &view)?;

        // The number is allocated once the posting is accepted and reused
        // across conflict retries; gaps only appear for postings that never
        // commit.
        let transaction_no = self.sequencer.next_transaction_no(
            request.scope,
            request.kind,
            request.occurred_on,
        )?;
        let transaction = self.build_transaction(&request, transaction_no)?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let mirror = if policy.enabled {
                Some(MirrorWrite {
                    op: self.mirror_op(&view, &transaction, &policy)?,
                    expected_main_revision: ExpectedRevision::Exact(view.main_revision),
                })
            } else {
                None
            };

            let batch = PostingBatch {
                transaction: transaction.clone(),
                expected_scope_revision: ExpectedRevision::Exact(view.scope_revision),
                mirror,
            };

            match self.store.commit(batch) {
                Ok(committed) => {
                    info!(
                        transaction_no = %transaction.transaction_no,
                        balance = %committed.scope_balance,
                        voucher_no = committed.voucher_no.as_ref().map(|v| v.as_str()),
                        "posting committed"
                    );
                    return Ok(PostReceipt {
                        transaction,
                        balance: committed.scope_balance,
                        main_balance: committed.main_balance,
                        voucher_no: committed.voucher_no,
                    });
                }
                Err(StoreError::Conflict(reason)) => {
                    if attempts >= self.max_attempts {
                        warn!(attempts, %reason, "posting conflicted on every attempt");
                        return Err(PostError::RetriesExhausted { attempts });
                    }
                    debug!(attempt = attempts, %reason, "commit conflicted, re-preparing");
                    view = self
                        .store
                        .prepare(request.scope, request.kind, request.occurred_on)?;
                    // The balance may have moved under us; re-validate.
                    self.check_sufficiency(&request, &view)?;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Current balance of any scope, including `main`.
    pub fn balance(&self, scope: Scope) -> Result<Money, PostError> {
        Ok(self.store.balance(scope)?)
    }

    fn check_sufficiency(
        &self,
        request: &PostRequest,
        view: &PostingView,
    ) -> Result<(), PostError> {
        if request.kind.sign() < 0 && view.scope_balance < request.amount {
            return Err(PostError::InsufficientFunds {
                scope: request.scope,
                balance: view.scope_balance,
                amount: request.amount,
            });
        }
        Ok(())
    }

    fn build_transaction(
        &self,
        request: &PostRequest,
        transaction_no: TransactionNo,
    ) -> Result<Transaction, PostError> {
        Ok(Transaction::new(
            request.scope,
            transaction_no,
            request.kind,
            request.amount,
            TxnDetail::for_kind(request.kind, request.label.clone()),
            request.description.clone(),
            request.business_ref.clone(),
            request.occurred_on,
            request.created_by,
        )?)
    }

    /// Decide how the central ledger absorbs this posting: fold into the
    /// same-day voucher when the aggregation policy applies and one exists,
    /// otherwise open a fresh voucher.
    fn mirror_op(
        &self,
        view: &PostingView,
        transaction: &Transaction,
        policy: &MirrorPolicy,
    ) -> Result<MirrorOp, PostError> {
        if policy.aggregates(transaction.kind) {
            if let Some(open) = &view.open_voucher {
                debug!(voucher_no = open.voucher_no.as_str(), "merging into same-day voucher");
                return Ok(MirrorOp::Merge {
                    voucher_id: open.id,
                    amount: transaction.amount,
                    narration_fragment: transaction.narration(),
                });
            }
        }

        let voucher_no = self.sequencer.next_voucher_no()?;
        let voucher = Voucher::mirror(transaction, voucher_no)?;
        Ok(MirrorOp::Create(voucher))
    }
}
