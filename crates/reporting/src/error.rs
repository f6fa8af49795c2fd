use thiserror::Error;

use curafin_store::StoreError;

/// Reporting query error.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The query itself is malformed (bad month, overflowing totals).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Reading the underlying snapshot failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
