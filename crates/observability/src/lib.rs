//! Tracing/logging setup shared by every process embedding the ledger core.

pub mod tracing;

pub use self::tracing::{init, init_plain};
