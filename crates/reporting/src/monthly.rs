//! Monthly income/expense report per scope.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use curafin_core::Money;
use curafin_ledger::{Scope, TxnKind};
use curafin_store::LedgerStore;

use crate::error::ReportError;

/// One month of a department's operating activity.
///
/// `income`/`expense` cover the operating kinds only; `balance` is the
/// replayed signed sum of *all* postings (fund movements included) dated up
/// to the end of the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub scope: Scope,
    pub year: i32,
    pub month: u32,
    pub income: Money,
    pub expense: Money,
    pub profit: Money,
    pub balance: Money,
}

/// Compute the report from one snapshot of the scope's transaction log.
pub fn monthly_report<S: LedgerStore>(
    store: &S,
    scope: Scope,
    year: i32,
    month: u32,
) -> Result<MonthlyReport, ReportError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ReportError::validation(format!("invalid month: {year}-{month}")))?;
    let end = month_end(year, month)
        .ok_or_else(|| ReportError::validation(format!("invalid month: {year}-{month}")))?;

    let transactions = store.transactions(scope)?;

    let mut income: i128 = 0;
    let mut expense: i128 = 0;
    let mut balance: i128 = 0;

    for txn in &transactions {
        if txn.occurred_on <= end {
            balance += i128::from(txn.signed_amount().minor());
        }
        if txn.occurred_on < start || txn.occurred_on > end {
            continue;
        }
        match txn.kind {
            TxnKind::Income => income += i128::from(txn.amount.minor()),
            TxnKind::Expense => expense += i128::from(txn.amount.minor()),
            TxnKind::FundIn | TxnKind::FundOut => {}
        }
    }

    Ok(MonthlyReport {
        scope,
        year,
        month,
        income: to_money(income)?,
        expense: to_money(expense)?,
        profit: to_money(income - expense)?,
        balance: to_money(balance)?,
    })
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt())
}

pub(crate) fn to_money(total: i128) -> Result<Money, ReportError> {
    i64::try_from(total)
        .map(Money::from_minor)
        .map_err(|_| ReportError::validation("total overflows the amount range"))
}
