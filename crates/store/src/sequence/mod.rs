//! Reference-number sequencing.
//!
//! Numbers are allocated by atomic increment primitives, never by
//! count-rows-plus-one reads; two concurrent callers can never receive the
//! same code.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemorySequencer;
pub use postgres::PostgresSequencer;
pub use r#trait::Sequencer;
