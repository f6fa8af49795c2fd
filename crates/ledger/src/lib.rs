//! Ledger domain model (department sub-accounts + central voucher ledger).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod kind;
pub mod policy;
pub mod reference;
pub mod scope;
pub mod transaction;
pub mod voucher;

pub use kind::TxnKind;
pub use policy::{MirrorConfig, MirrorPolicy};
pub use reference::{BusinessRef, TransactionNo, VoucherNo};
pub use scope::Scope;
pub use transaction::{Transaction, TxnDetail};
pub use voucher::{Voucher, VoucherSource, VoucherType};
