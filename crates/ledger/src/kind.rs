//! Posting kinds and their signs.

use serde::{Deserialize, Serialize};

use curafin_core::Money;

use crate::voucher::VoucherType;

/// Kind of a department posting (determines the balance sign).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnKind {
    Income,
    Expense,
    FundIn,
    FundOut,
}

impl TxnKind {
    /// +1 for money into the department, -1 for money out.
    pub const fn sign(self) -> i64 {
        match self {
            TxnKind::Income | TxnKind::FundIn => 1,
            TxnKind::Expense | TxnKind::FundOut => -1,
        }
    }

    /// Capital movements (fund in/out) carry a `purpose` instead of a category.
    pub const fn is_capital(self) -> bool {
        matches!(self, TxnKind::FundIn | TxnKind::FundOut)
    }

    /// Central-ledger direction when this kind is mirrored: money into the
    /// department becomes a Debit on main, money out becomes a Credit.
    pub const fn voucher_type(self) -> VoucherType {
        match self {
            TxnKind::Income | TxnKind::FundIn => VoucherType::Debit,
            TxnKind::Expense | TxnKind::FundOut => VoucherType::Credit,
        }
    }

    /// Stable short code used in reference numbers.
    pub const fn code(self) -> &'static str {
        match self {
            TxnKind::Income => "INC",
            TxnKind::Expense => "EXP",
            TxnKind::FundIn => "FIN",
            TxnKind::FundOut => "FOUT",
        }
    }

    /// Apply this kind's sign to a (positive) posted amount.
    pub fn signed(self, amount: Money) -> Money {
        Money::from_minor(self.sign() * amount.minor())
    }

    /// Wire/storage name, matching the serde representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            TxnKind::Income => "income",
            TxnKind::Expense => "expense",
            TxnKind::FundIn => "fund_in",
            TxnKind::FundOut => "fund_out",
        }
    }

    pub const fn all() -> [TxnKind; 4] {
        [TxnKind::Income, TxnKind::Expense, TxnKind::FundIn, TxnKind::FundOut]
    }
}

impl core::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TxnKind {
    type Err = curafin_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TxnKind::Income),
            "expense" => Ok(TxnKind::Expense),
            "fund_in" => Ok(TxnKind::FundIn),
            "fund_out" => Ok(TxnKind::FundOut),
            other => Err(curafin_core::DomainError::validation(format!(
                "unknown transaction kind: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TxnKind::FundIn).unwrap(), "\"fund_in\"");
        assert_eq!(serde_json::to_string(&TxnKind::Income).unwrap(), "\"income\"");
    }

    #[test]
    fn signs_match_direction() {
        assert_eq!(TxnKind::Income.sign(), 1);
        assert_eq!(TxnKind::FundIn.sign(), 1);
        assert_eq!(TxnKind::Expense.sign(), -1);
        assert_eq!(TxnKind::FundOut.sign(), -1);
    }

    #[test]
    fn voucher_direction_follows_sign() {
        for kind in TxnKind::all() {
            let expected = if kind.sign() > 0 { VoucherType::Debit } else { VoucherType::Credit };
            assert_eq!(kind.voucher_type(), expected);
        }
    }

    #[test]
    fn signed_negates_outflows() {
        let amount = Money::from_major(200);
        assert_eq!(TxnKind::Expense.signed(amount), Money::from_major(-200));
        assert_eq!(TxnKind::Income.signed(amount), amount);
    }
}
