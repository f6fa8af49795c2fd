//! Lifetime account summary per scope.

use serde::{Deserialize, Serialize};

use curafin_core::Money;
use curafin_ledger::{Scope, TxnKind};
use curafin_store::LedgerStore;

use crate::error::ReportError;
use crate::monthly::to_money;

/// Lifetime operating totals plus the live balance.
///
/// `net_balance` is operating (income − expense); `current_balance` is the
/// live balance row and also reflects fund movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub scope: Scope,
    pub total_income: Money,
    pub total_expense: Money,
    pub net_balance: Money,
    pub current_balance: Money,
}

pub fn account_summary<S: LedgerStore>(
    store: &S,
    scope: Scope,
) -> Result<AccountSummary, ReportError> {
    let transactions = store.transactions(scope)?;

    let mut income: i128 = 0;
    let mut expense: i128 = 0;

    for txn in &transactions {
        match txn.kind {
            TxnKind::Income => income += i128::from(txn.amount.minor()),
            TxnKind::Expense => expense += i128::from(txn.amount.minor()),
            TxnKind::FundIn | TxnKind::FundOut => {}
        }
    }

    Ok(AccountSummary {
        scope,
        total_income: to_money(income)?,
        total_expense: to_money(expense)?,
        net_balance: to_money(income - expense)?,
        current_balance: store.balance(scope)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{post, seeded_store};

    #[test]
    fn summary_separates_operating_totals_from_funds() {
        let store = seeded_store();
        post(&store, TxnKind::FundIn, 1000, "2024-01-01");
        post(&store, TxnKind::Income, 500, "2024-01-10");
        post(&store, TxnKind::Expense, 200, "2024-01-12");

        let summary = account_summary(&store, Scope::Hospital).unwrap();
        assert_eq!(summary.total_income, Money::from_major(500));
        assert_eq!(summary.total_expense, Money::from_major(200));
        assert_eq!(summary.net_balance, Money::from_major(300));
        assert_eq!(summary.current_balance, Money::from_major(1300));
    }

    #[test]
    fn empty_scope_reads_as_zero() {
        let store = seeded_store();
        let summary = account_summary(&store, Scope::Optics).unwrap();
        assert_eq!(summary.total_income, Money::ZERO);
        assert_eq!(summary.total_expense, Money::ZERO);
        assert_eq!(summary.current_balance, Money::ZERO);
    }
}
