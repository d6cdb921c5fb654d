//! Mirrored queue records.

use crate::ids::{BrokerId, MessageOrder, QueueId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A mirrored representation of one broker queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    /// Record identity.
    pub id: QueueId,
    /// The broker this queue belongs to.
    pub broker_id: BrokerId,
    /// Broker-native queue name.
    pub name: String,
    /// Cached "ready" depth.
    ///
    /// Advisory only: decremented alongside each mirrored insert so the
    /// UI tracks "messages not yet pulled into the mirror", but the
    /// broker's reported depth remains the ground truth. Clamped at zero.
    pub ready: u64,
    /// Broker-reported depth counters from the last broker sync.
    pub counts: QueueCounts,
    /// The per-queue order counter.
    ///
    /// Advanced exactly once per ingested message via the store's atomic
    /// increment-and-fetch; never written directly.
    pub next_message_order: MessageOrder,
    /// Creation stamp.
    pub created_at: Timestamp,
    /// Last update stamp.
    pub updated_at: Timestamp,
    /// Soft-delete stamp.
    pub deleted_at: Option<Timestamp>,
}

impl Queue {
    /// Creates a mirrored queue with zero depth and order counter.
    #[must_use]
    pub fn new(broker_id: BrokerId, name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: QueueId::new(),
            broker_id,
            name: name.into(),
            ready: 0,
            counts: QueueCounts::default(),
            next_message_order: MessageOrder::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Sets the cached ready depth.
    #[must_use]
    pub fn with_ready(mut self, ready: u64) -> Self {
        self.ready = ready;
        self
    }

    /// Sets the order counter. Intended for restoring persisted state,
    /// not for order assignment.
    #[must_use]
    pub fn with_next_message_order(mut self, order: MessageOrder) -> Self {
        self.next_message_order = order;
        self
    }
}

/// Depth counters reported by the broker for one queue.
///
/// Snapshot data refreshed by the (out-of-scope) broker sync; carried on
/// the queue record for display purposes only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Messages scheduled for future delivery.
    pub scheduled: u64,
    /// Messages in the errored state.
    pub errored: u64,
    /// Dead-lettered messages.
    pub dead_lettered: u64,
    /// Messages locked by in-flight consumers.
    pub locked: u64,
}

/// Queue-type classifier passed to the server-side requeue routine.
///
/// Selects which of a logical queue's physical queues a delivery is
/// reinserted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueType {
    /// The primary delivery queue.
    Normal,
    /// The error queue.
    Error,
    /// The dead-letter queue.
    DeadLetter,
}
