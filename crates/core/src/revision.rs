//! Optimistic concurrency expectation for a ledger account row.

use crate::error::{DomainError, DomainResult};

/// Expected revision of an account row at commit time.
///
/// Every successful commit against a scope bumps that scope's revision by
/// one. A commit carrying a stale expectation fails with a conflict and
/// applies nothing; the caller re-reads and retries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip revision checking (migrations, replay tooling).
    Any,
    /// Require the account row to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
