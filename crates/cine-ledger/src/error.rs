//! Ledger error types.

use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from ledger persistence.
///
/// Persist failures propagate to the caller: a recorded cost that cannot
/// be made durable is reported rather than silently dropped.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger persist failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger state corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
