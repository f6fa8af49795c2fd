//! Reconciliation and reporting queries.
//!
//! Every function here is a pure read over a single log snapshot: nothing
//! mutates state, and results are derived from the transaction/voucher logs
//! rather than the live balance rows (which exist for the write path). The
//! replay queries are the audit tool for the balance invariant.

pub mod error;
pub mod monthly;
pub mod replay;
pub mod summary;
pub mod vouchers;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::ReportError;
pub use monthly::{MonthlyReport, monthly_report};
pub use replay::balance_as_of;
pub use summary::{AccountSummary, account_summary};
pub use vouchers::{VoucherGroupTotal, voucher_totals};
