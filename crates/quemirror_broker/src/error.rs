//! Error types for broker adapters.

use thiserror::Error;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors that can occur talking to a broker or the requeue transport.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Opening the connection failed (socket, TLS handshake, auth).
    #[error("broker connection failed: {0}")]
    Connect(String),

    /// Opening a channel on an established connection failed.
    #[error("channel open failed: {0}")]
    Channel(String),

    /// A fetch from a queue failed.
    #[error("fetch from queue '{queue}' failed: {message}")]
    Fetch {
        /// The queue being fetched from.
        queue: String,
        /// Broker-reported detail.
        message: String,
    },

    /// A publish to an exchange failed or was rejected.
    #[error("publish to exchange '{exchange}' failed: {message}")]
    Publish {
        /// The target exchange.
        exchange: String,
        /// Broker-reported detail.
        message: String,
    },

    /// The requeue transport failed (connection loss, timeout).
    #[error("requeue transport error: {0}")]
    RequeueTransport(String),

    /// The connection or channel was already closed.
    #[error("connection closed")]
    Closed,

    /// The broker call exceeded its time bound.
    #[error("broker call timed out")]
    Timeout,
}

impl AdapterError {
    /// Creates a fetch error.
    pub fn fetch(queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            queue: queue.into(),
            message: message.into(),
        }
    }

    /// Creates a publish error.
    pub fn publish(exchange: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            exchange: exchange.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_detail() {
        let err = AdapterError::fetch("orders", "precondition failed");
        assert_eq!(
            err.to_string(),
            "fetch from queue 'orders' failed: precondition failed"
        );
        assert_eq!(
            AdapterError::Connect("refused".into()).to_string(),
            "broker connection failed: refused"
        );
    }
}
