//! Operation request and response shapes exposed to the handler layer.

use quemirror_broker::RequeueCall;
use quemirror_model::{DeliveryId, ExchangeId, MessageId, QueueId, QueueType, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to mirror a queue's current contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// The calling user.
    pub user_id: UserId,
    /// The mirrored queue to drain into the mirror.
    pub queue_id: QueueId,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Messages mirrored by this run.
    pub mirrored: u64,
    /// Wall-clock duration of the drain.
    pub duration: Duration,
}

/// Request to requeue a batch of broker-side deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequeueRequest {
    /// The deliveries to reinsert.
    pub delivery_ids: Vec<DeliveryId>,
    /// Which physical queue to reinsert into.
    pub queue_type: QueueType,
    /// Redelivery delay in seconds.
    pub delay_seconds: u32,
    /// Redelivery-count hint.
    pub redelivery_count: u32,
    /// All-or-nothing (`true`) versus best-effort (`false`) batching.
    pub transactional: bool,
}

impl RequeueRequest {
    /// Builds the routine call for one delivery of this batch.
    #[must_use]
    pub fn call_for(&self, delivery_id: DeliveryId) -> RequeueCall {
        RequeueCall {
            delivery_id,
            queue_type: self.queue_type,
            delay_seconds: self.delay_seconds,
            redelivery_count: self.redelivery_count,
        }
    }
}

/// Outcome of a requeue batch.
///
/// In transactional mode `succeeded` is always the full batch size; a
/// partial count can only come out of independent mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequeueOutcome {
    /// Number of deliveries requeued.
    pub succeeded: usize,
}

/// Request to republish mirrored messages to an exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    /// The calling user; must own the exchange's broker.
    pub user_id: UserId,
    /// The target exchange.
    pub exchange_id: ExchangeId,
    /// The mirrored messages to republish.
    pub message_ids: Vec<MessageId>,
}

/// Outcome of one republish run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// Messages published (and, barring a crash window, soft-deleted).
    pub published: u64,
}
