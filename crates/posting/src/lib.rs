//! Posting orchestration: the single write path into the ledger core.
//!
//! Business collaborators (booking, payment, purchase, fund-transfer flows)
//! call [`PostingService::post`]; everything else in the ledger is derived
//! from the rows that call writes.

pub mod error;
pub mod service;

pub use error::PostError;
pub use service::{PostReceipt, PostRequest, PostingService};
