//! Broker connection contracts.

use crate::delivery::Delivery;
use crate::error::AdapterResult;
use quemirror_model::{BasicProperties, ConnectionSettings};
use std::time::Duration;

/// Opens protocol-level connections to a broker.
///
/// Connectors are cheap, shareable handles; the connections they open
/// are not. Each engine invocation opens its own connection and releases
/// it before returning.
pub trait BrokerConnector: Send + Sync {
    /// The connection type this connector produces.
    type Connection: BrokerConnection;

    /// Opens a connection using the given settings.
    ///
    /// `timeout` bounds the connection attempt; implementations should
    /// also apply it to subsequent per-call broker I/O. A TLS, auth, or
    /// socket failure fails the whole operation immediately; there is no
    /// partial-connection retry at this layer.
    fn connect(
        &self,
        settings: &ConnectionSettings,
        timeout: Duration,
    ) -> AdapterResult<Self::Connection>;
}

/// An open broker connection.
pub trait BrokerConnection {
    /// The channel type this connection produces.
    type Channel: BrokerChannel;

    /// Opens a channel.
    fn open_channel(&mut self) -> AdapterResult<Self::Channel>;

    /// Eagerly closes the connection. Dropping has the same effect.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// An open channel on a broker connection.
pub trait BrokerChannel {
    /// Fetches a single message from `queue`, or `None` when the queue
    /// has no message to give.
    ///
    /// With `ack = false` the fetch is non-destructive: no
    /// acknowledgement is sent, so the broker still owns the message and
    /// may redeliver it once the channel closes. The ingestion engine
    /// always fetches this way.
    fn fetch_one(&mut self, queue: &str, ack: bool) -> AdapterResult<Option<Delivery>>;

    /// Publishes a message to `exchange` with the given routing key.
    ///
    /// Only the property fields that are set are transmitted; unset
    /// fields stay at protocol defaults.
    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        properties: &BasicProperties,
        body: &[u8],
    ) -> AdapterResult<()>;

    /// Eagerly closes the channel. Dropping has the same effect.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// Verifies that a broker is reachable with the given settings.
///
/// Connects, opens a channel, and closes both. Fails fast on the first
/// TLS, auth, or socket error.
pub fn verify<C: BrokerConnector>(
    connector: &C,
    settings: &ConnectionSettings,
    timeout: Duration,
) -> AdapterResult<()> {
    let mut connection = connector.connect(settings, timeout)?;
    let channel = connection.open_channel()?;
    channel.close();
    connection.close();
    Ok(())
}
