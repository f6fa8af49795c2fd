//! Point-in-time balance replay (audit).

use chrono::NaiveDate;

use curafin_core::Money;
use curafin_ledger::Scope;
use curafin_store::LedgerStore;

use crate::error::ReportError;
use crate::monthly::to_money;

/// Running balance of a scope at end of `date`, replayed purely from the
/// logs.
///
/// For department scopes this folds the transaction log; for `Main` it
/// folds the voucher ledger. With `date` today, the result must equal the
/// live balance row; that equality is the audit check for the
/// incrementally-maintained balance.
pub fn balance_as_of<S: LedgerStore>(
    store: &S,
    scope: Scope,
    date: NaiveDate,
) -> Result<Money, ReportError> {
    let total: i128 = if scope == Scope::Main {
        store
            .vouchers()?
            .iter()
            .filter(|v| v.date <= date)
            .map(|v| i128::from(v.signed_amount().minor()))
            .sum()
    } else {
        store
            .transactions(scope)?
            .iter()
            .filter(|t| t.occurred_on <= date)
            .map(|t| i128::from(t.signed_amount().minor()))
            .sum()
    };

    to_money(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{parse_date, post, post_mirrored, seeded_store};
    use curafin_ledger::TxnKind;

    #[test]
    fn replay_stops_at_the_requested_date() {
        let store = seeded_store();
        post(&store, TxnKind::Income, 500, "2024-01-10");
        post(&store, TxnKind::Expense, 200, "2024-01-15");
        post(&store, TxnKind::Income, 100, "2024-02-01");

        assert_eq!(
            balance_as_of(&store, Scope::Hospital, parse_date("2024-01-09")).unwrap(),
            Money::ZERO
        );
        assert_eq!(
            balance_as_of(&store, Scope::Hospital, parse_date("2024-01-10")).unwrap(),
            Money::from_major(500)
        );
        assert_eq!(
            balance_as_of(&store, Scope::Hospital, parse_date("2024-01-31")).unwrap(),
            Money::from_major(300)
        );
    }

    #[test]
    fn replay_agrees_with_the_live_balance() {
        let store = seeded_store();
        post(&store, TxnKind::Income, 500, "2024-01-10");
        post(&store, TxnKind::FundOut, 100, "2024-01-11");

        let replayed =
            balance_as_of(&store, Scope::Hospital, parse_date("2024-12-31")).unwrap();
        assert_eq!(replayed, store.balance(Scope::Hospital).unwrap());
    }

    #[test]
    fn main_replays_the_voucher_ledger() {
        let store = seeded_store();
        post_mirrored(&store, Scope::Hospital, TxnKind::Income, 500, "2024-01-10", 1);
        post_mirrored(&store, Scope::Hospital, TxnKind::Expense, 200, "2024-01-11", 2);

        assert_eq!(
            balance_as_of(&store, Scope::Main, parse_date("2024-01-10")).unwrap(),
            Money::from_major(500)
        );
        assert_eq!(
            balance_as_of(&store, Scope::Main, parse_date("2024-01-11")).unwrap(),
            Money::from_major(300)
        );
        assert_eq!(
            balance_as_of(&store, Scope::Main, parse_date("2024-01-11")).unwrap(),
            store.balance(Scope::Main).unwrap()
        );
    }
}
