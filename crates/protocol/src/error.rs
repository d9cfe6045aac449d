//! Error taxonomy.
//!
//! [`ConnectorError`] covers setup faults that abort a whole batch call
//! before any transfer event is emitted. [`TransferError`] covers faults of
//! a single transfer; it only ever reaches the caller inside that
//! transfer's FAILED or CORRUPTED event.

use std::time::Duration;

/// Batch-level fault returned synchronously from a connector call.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("no connector available for repository {repository}: {reason}")]
    NoConnector { repository: String, reason: String },

    #[error("invalid transfer request: {0}")]
    InvalidRequest(String),

    #[error("connector for repository {0} is closed")]
    Closed(String),

    #[error("transport setup failed: {0}")]
    Transport(String),
}

/// Fault of one transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Unauthorized(String),

    #[error("checksum mismatch: expected {expected}, actual {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("checksum missing for {0}")]
    ChecksumMissing(String),

    #[error("transfer truncated: expected {expected} bytes, received {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),
}

impl TransferError {
    /// Whether repeating the same idempotent step may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferError::Io(_) | TransferError::Timeout(_))
    }

    /// Whether the payload arrived but failed integrity verification.
    pub fn is_corruption(&self) -> bool {
        matches!(self, TransferError::ChecksumMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let io = TransferError::Io(std::io::Error::other("reset"));
        assert!(io.is_transient());
        assert!(TransferError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!TransferError::NotFound("a".into()).is_transient());
        assert!(!TransferError::Cancelled.is_transient());
    }

    #[test]
    fn only_mismatch_is_corruption() {
        let mismatch = TransferError::ChecksumMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(mismatch.is_corruption());
        assert!(!TransferError::ChecksumMissing("x".into()).is_corruption());
    }
}
