//! The republish engine: mirrored messages back onto the broker.

use crate::access::connection_settings;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::request::{PublishReport, PublishRequest};
use quemirror_broker::{BrokerChannel, BrokerConnection, BrokerConnector};
use quemirror_model::{Message, MessageBody, Timestamp};
use quemirror_store::MirrorStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Republishes mirrored messages to a broker exchange.
///
/// Messages are processed in strictly ascending order so the batch
/// preserves its original relative ordering. For each message the
/// engine overlays only the metadata fields present in the mirror onto
/// a fresh publish (absent fields stay at protocol defaults), then
/// stamps the mirrored copy deleted.
///
/// Publish and soft-delete are two sequential steps with no shared
/// transaction: a crash between them leaves the message delivered on
/// the broker and still active in the mirror. That window is the
/// documented at-least-once / best-effort-cleanup trade-off of this
/// engine, not a defect.
pub struct RepublishEngine<S, C> {
    store: Arc<S>,
    connector: C,
    config: EngineConfig,
}

impl<S: MirrorStore, C: BrokerConnector> RepublishEngine<S, C> {
    /// Creates a republish engine.
    pub fn new(store: Arc<S>, connector: C, config: EngineConfig) -> Self {
        Self {
            store,
            connector,
            config,
        }
    }

    /// Republishes the messages named by `request` to its exchange.
    ///
    /// Preconditions are checked against the mirror before any broker
    /// I/O: the exchange must exist, and the caller must own its broker.
    /// A broker owned by someone else is reported as missing rather than
    /// forbidden, so callers cannot probe for record existence.
    pub fn publish(&self, request: &PublishRequest) -> EngineResult<PublishReport> {
        let exchange = self
            .store
            .exchange(request.exchange_id)?
            .ok_or(EngineError::ExchangeNotFound(request.exchange_id))?;
        let broker = self
            .store
            .broker(exchange.broker_id)?
            .ok_or(EngineError::BrokerNotFound(exchange.broker_id))?;
        if broker.user_id != request.user_id {
            return Err(EngineError::BrokerNotFound(broker.id));
        }
        let settings = connection_settings(&broker)?;

        let mut messages = self.store.messages(&request.message_ids)?;
        messages.retain(Message::is_active);
        messages.sort_by_key(|message| message.message_order);

        let mut connection = self.connector.connect(settings, self.config.broker_timeout)?;
        let mut channel = connection.open_channel()?;

        let mut published = 0u64;
        for message in &messages {
            let body = body_bytes(message)?;
            let properties = message.properties();
            channel.publish(&exchange.name, "", &properties, &body)?;
            published += 1;

            // Step two of two; see the type docs for the crash window.
            self.store.soft_delete_message(message.id, Timestamp::now())?;
        }

        channel.close();
        connection.close();

        info!(exchange = %exchange.id, published, "republish batch complete");
        Ok(PublishReport { published })
    }
}

/// Serializes a mirrored body for publishing.
///
/// Documents are re-encoded to canonical JSON text; binary bodies pass
/// through untouched. Anything else is fatal for the whole batch.
fn body_bytes(message: &Message) -> EngineResult<Vec<u8>> {
    match &message.body {
        MessageBody::Document(value) => serde_json::to_vec(value).map_err(|err| {
            warn!(message = %message.id, "document body failed to serialize: {err}");
            EngineError::UnsupportedBody {
                message_id: message.id,
                kind: "document",
            }
        }),
        MessageBody::Binary(bytes) => Ok(bytes.clone()),
        MessageBody::Other(_) => Err(EngineError::UnsupportedBody {
            message_id: message.id,
            kind: message.body.kind(),
        }),
    }
}
