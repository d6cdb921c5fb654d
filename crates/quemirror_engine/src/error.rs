//! Error taxonomy for engine operations.

use quemirror_broker::AdapterError;
use quemirror_model::{BrokerId, ExchangeId, MessageId, QueueId};
use quemirror_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engines.
///
/// No broker or store fault crosses the engine boundary raw: every I/O
/// error is converted into one of these kinds at the call site. A
/// requeue-routine null result is not represented here at all; it folds
/// into the success count.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller is unauthenticated or lacks access to the broker,
    /// queue, or exchange. No partial state change has occurred.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Why access was refused.
        reason: String,
    },

    /// The named queue does not exist in the mirror.
    #[error("queue not found: {0}")]
    QueueNotFound(QueueId),

    /// The named broker does not exist, or is not visible to the caller.
    #[error("broker not found: {0}")]
    BrokerNotFound(BrokerId),

    /// The named exchange does not exist in the mirror.
    #[error("exchange not found: {0}")]
    ExchangeNotFound(ExchangeId),

    /// The broker record carries no connection settings.
    #[error("broker {0} has no connection settings")]
    BrokerNotConfigured(BrokerId),

    /// Broker connectivity failed; the current operation is aborted.
    /// Mirror changes already committed by prior messages in the same
    /// batch are retained.
    #[error("broker connectivity: {0}")]
    Broker(#[from] AdapterError),

    /// The mirror store failed.
    #[error("mirror store: {0}")]
    Store(#[from] StoreError),

    /// A message body is in a representation the republish path cannot
    /// serialize. Fatal for the batch, not skipped.
    #[error("unsupported body representation '{kind}' on message {message_id}")]
    UnsupportedBody {
        /// The offending message.
        message_id: MessageId,
        /// The body representation name.
        kind: &'static str,
    },
}

impl EngineError {
    /// Creates an access-denied error.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }
}
