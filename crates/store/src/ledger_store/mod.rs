//! Ledger storage boundary.
//!
//! One posting is one atomic commit: the department balance delta, the
//! transaction append, and (when mirroring) the voucher write plus the main
//! balance delta either all apply or none do.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{
    CommittedPosting, LedgerStore, MirrorOp, MirrorWrite, OpenVoucher, PostingBatch, PostingView,
    StoreError,
};
