//! Central-ledger voucher totals grouped by origin.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use curafin_core::Money;
use curafin_ledger::{Scope, TxnKind, VoucherType};
use curafin_store::LedgerStore;

use crate::error::ReportError;
use crate::monthly::to_money;

/// Total mirrored into main from one (scope, kind) origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherGroupTotal {
    pub scope: Scope,
    pub kind: TxnKind,
    pub voucher_type: VoucherType,
    pub total: Money,
    pub voucher_count: usize,
}

/// Group the voucher ledger by (source scope, source kind), in stable
/// scope/kind order.
pub fn voucher_totals<S: LedgerStore>(store: &S) -> Result<Vec<VoucherGroupTotal>, ReportError> {
    let vouchers = store.vouchers()?;

    let mut groups: HashMap<(Scope, TxnKind), (VoucherType, i128, usize)> = HashMap::new();
    for voucher in &vouchers {
        let entry = groups
            .entry((voucher.source.scope, voucher.source.kind))
            .or_insert((voucher.voucher_type, 0, 0));
        entry.1 += i128::from(voucher.amount.minor());
        entry.2 += 1;
    }

    let mut totals = Vec::with_capacity(groups.len());
    for scope in Scope::departments() {
        for kind in TxnKind::all() {
            if let Some((voucher_type, total, count)) = groups.remove(&(scope, kind)) {
                totals.push(VoucherGroupTotal {
                    scope,
                    kind,
                    voucher_type,
                    total: to_money(total)?,
                    voucher_count: count,
                });
            }
        }
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{post_mirrored, seeded_store};

    #[test]
    fn totals_group_by_scope_and_kind() {
        let store = seeded_store();
        post_mirrored(&store, Scope::Hospital, TxnKind::Income, 500, "2024-01-10", 1);
        post_mirrored(&store, Scope::Hospital, TxnKind::Income, 300, "2024-01-11", 2);
        post_mirrored(&store, Scope::Hospital, TxnKind::Expense, 200, "2024-01-12", 3);

        let totals = voucher_totals(&store).unwrap();
        assert_eq!(totals.len(), 2);

        let income = totals
            .iter()
            .find(|t| t.kind == TxnKind::Income)
            .unwrap();
        assert_eq!(income.total, Money::from_major(800));
        assert_eq!(income.voucher_count, 2);
        assert_eq!(income.voucher_type, VoucherType::Debit);

        let expense = totals
            .iter()
            .find(|t| t.kind == TxnKind::Expense)
            .unwrap();
        assert_eq!(expense.total, Money::from_major(200));
        assert_eq!(expense.voucher_type, VoucherType::Credit);
    }

    #[test]
    fn empty_ledger_yields_no_groups() {
        let store = seeded_store();
        assert!(voucher_totals(&store).unwrap().is_empty());
    }
}
