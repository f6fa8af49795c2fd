//! Storage boundary for the ledger core.
//!
//! This crate defines the atomic commit unit for postings (balance update +
//! transaction append + voucher create-or-merge + main update, all or
//! nothing) and the reference-number sequencer, without making storage
//! assumptions. Two backends: in-memory (tests/dev) and Postgres.

pub mod ledger_store;
pub mod sequence;

pub use ledger_store::{
    CommittedPosting, InMemoryLedgerStore, LedgerStore, MirrorOp, MirrorWrite, OpenVoucher,
    PostgresLedgerStore, PostingBatch, PostingView, StoreError,
};
pub use sequence::{InMemorySequencer, PostgresSequencer, Sequencer};
