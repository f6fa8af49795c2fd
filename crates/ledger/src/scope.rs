//! Ledger scopes: the four department sub-accounts plus the central ledger.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use curafin_core::DomainError;

/// One of the independent departmental ledgers, or the central (`Main`) ledger.
///
/// The set is closed: every balance row, transaction and voucher belongs to
/// exactly one of these. Transactions live in department scopes only;
/// vouchers live in `Main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Hospital,
    Medicine,
    Operation,
    Optics,
    Main,
}

impl Scope {
    /// Stable short code used in reference numbers.
    pub const fn code(self) -> &'static str {
        match self {
            Scope::Hospital => "HOS",
            Scope::Medicine => "MED",
            Scope::Operation => "OPR",
            Scope::Optics => "OPT",
            Scope::Main => "MAIN",
        }
    }

    pub const fn is_department(self) -> bool {
        !matches!(self, Scope::Main)
    }

    /// The four non-main scopes, in stable order.
    pub const fn departments() -> [Scope; 4] {
        [Scope::Hospital, Scope::Medicine, Scope::Operation, Scope::Optics]
    }

    /// Every scope including `Main`, in stable order.
    pub const fn all() -> [Scope; 5] {
        [
            Scope::Hospital,
            Scope::Medicine,
            Scope::Operation,
            Scope::Optics,
            Scope::Main,
        ]
    }

    const fn name(self) -> &'static str {
        match self {
            Scope::Hospital => "hospital",
            Scope::Medicine => "medicine",
            Scope::Operation => "operation",
            Scope::Optics => "optics",
            Scope::Main => "main",
        }
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hospital" => Ok(Scope::Hospital),
            "medicine" => Ok(Scope::Medicine),
            "operation" => Ok(Scope::Operation),
            "optics" => Ok(Scope::Optics),
            "main" => Ok(Scope::Main),
            other => Err(DomainError::validation(format!("unknown scope: {other:?}"))),
        }
    }
}
