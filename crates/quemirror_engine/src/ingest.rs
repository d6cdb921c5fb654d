//! The ingestion engine: non-destructive queue drain into the mirror.

use crate::access::{connection_settings, require_listed};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::request::{IngestReport, SyncRequest};
use quemirror_broker::{BrokerChannel, BrokerConnection, BrokerConnector, Delivery};
use quemirror_model::{Message, MessageBody, MessageMeta, MessageOrder, QueueId, UserId};
use quemirror_store::MirrorStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drains a broker queue into the mirror.
///
/// For each delivery the engine: takes the next order value through the
/// store's atomic increment-and-fetch, builds the mirror record, and
/// commits the insert together with a clamped decrement of the queue's
/// cached depth in one per-message transaction. The fetch never
/// acknowledges, so the broker keeps the message and may redeliver it to
/// a later run; the resulting duplicate mirror entries are expected.
pub struct IngestionEngine<S, C> {
    store: Arc<S>,
    connector: C,
    config: EngineConfig,
}

impl<S: MirrorStore, C: BrokerConnector> IngestionEngine<S, C> {
    /// Creates an ingestion engine.
    pub fn new(store: Arc<S>, connector: C, config: EngineConfig) -> Self {
        Self {
            store,
            connector,
            config,
        }
    }

    /// Mirrors the current contents of the queue named by `request`.
    ///
    /// Authorization and record resolution happen before any broker I/O.
    /// A broker fetch error aborts the remaining drain but keeps the
    /// messages already committed; the cached depth stays advisory
    /// either way.
    pub fn sync(&self, request: &SyncRequest) -> EngineResult<IngestReport> {
        let queue = self
            .store
            .queue(request.queue_id)?
            .ok_or(EngineError::QueueNotFound(request.queue_id))?;
        let broker = self
            .store
            .broker(queue.broker_id)?
            .ok_or(EngineError::BrokerNotFound(queue.broker_id))?;
        require_listed(&broker, request.user_id)?;
        let settings = connection_settings(&broker)?;

        let started = Instant::now();
        let mut connection = self.connector.connect(settings, self.config.broker_timeout)?;
        let mut channel = connection.open_channel()?;

        // On any error below the channel and connection are dropped,
        // which releases them; the eager closes on the success path just
        // make the release visible.
        let mut mirrored = 0u64;
        loop {
            if let Some(max) = self.config.max_messages {
                if mirrored >= max {
                    debug!(queue = %queue.id, max, "run cap reached");
                    break;
                }
            }

            let Some(delivery) = channel.fetch_one(&queue.name, false)? else {
                break;
            };

            let order = self.store.take_next_order(queue.id)?;
            let message = mirror_message(request.user_id, queue.id, order, delivery);
            self.commit_with_retry(queue.id, message)?;
            mirrored += 1;
        }

        channel.close();
        connection.close();

        info!(queue = %queue.id, mirrored, "queue drain complete");
        Ok(IngestReport {
            mirrored,
            duration: started.elapsed(),
        })
    }

    /// Commits one mirrored message, retrying the transaction alone on
    /// transient store failures.
    ///
    /// The broker fetch that produced the message already consumed
    /// broker-side state, so it is never reissued; only the buffered
    /// store statements are replayed.
    fn commit_with_retry(&self, queue_id: QueueId, message: Message) -> EngineResult<()> {
        let retry = &self.config.store_retry;
        let mut attempt = 0u32;
        loop {
            let mut tx = self.store.begin()?;
            tx.insert_message(message.clone())?;
            tx.decrement_ready(queue_id)?;
            match tx.commit() {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    warn!(queue = %queue_id, attempt, "mirror commit failed, retrying: {err}");
                    std::thread::sleep(retry.delay_for_attempt(attempt));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Builds the mirror record for one fetched delivery.
///
/// Bodies declaring a JSON content type that parse cleanly are captured
/// as documents; everything else is kept as opaque bytes.
fn mirror_message(
    user_id: UserId,
    queue_id: QueueId,
    order: MessageOrder,
    delivery: Delivery,
) -> Message {
    let body = if delivery.properties.is_json() {
        match serde_json::from_slice(&delivery.body) {
            Ok(value) => MessageBody::Document(value),
            Err(_) => MessageBody::Binary(delivery.body),
        }
    } else {
        MessageBody::Binary(delivery.body)
    };

    let meta = MessageMeta {
        exchange: delivery.exchange,
        routing_key: delivery.routing_key,
        redelivered: delivery.redelivered,
        properties: delivery.properties,
    };

    Message::new(user_id, queue_id, order, body, Some(meta))
}
