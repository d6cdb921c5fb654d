//! Error types for the mirror store.

use quemirror_model::{MessageId, QueueId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in mirror store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying backend failed.
    #[error("store backend error: {message}")]
    Backend {
        /// Backend-reported detail.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A transaction could not be committed.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for the abort.
        reason: String,
    },

    /// A record with the same identity already exists.
    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    /// The queue referenced by a counter operation does not exist.
    #[error("queue not found: {0}")]
    QueueNotFound(QueueId),

    /// The message referenced by an update does not exist.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),
}

impl StoreError {
    /// Creates a retryable backend error.
    pub fn backend_retryable(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable backend error.
    pub fn backend_fatal(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a transaction-aborted error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Returns true if retrying the same operation may succeed.
    ///
    /// Transaction aborts are retryable: the buffered statements can be
    /// replayed in a fresh transaction. Missing or duplicate records are
    /// not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Backend { retryable, .. } => *retryable,
            StoreError::TransactionAborted { .. } => true,
            _ => false,
        }
    }
}
