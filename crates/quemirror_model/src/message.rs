//! Mirrored message records.

use crate::ids::{MessageId, MessageOrder, QueueId, UserId};
use crate::properties::BasicProperties;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// The captured body of a mirrored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    /// A structured document; republished as canonical JSON text.
    Document(serde_json::Value),
    /// Opaque bytes; republished verbatim.
    Binary(Vec<u8>),
    /// A body written into the mirror by external tooling in a shape the
    /// republish path does not understand. Kept readable for audit, but
    /// republishing it is a fatal error.
    Other(serde_json::Value),
}

impl MessageBody {
    /// Returns a short name for the body representation.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Document(_) => "document",
            MessageBody::Binary(_) => "binary",
            MessageBody::Other(_) => "other",
        }
    }
}

/// Broker-native metadata captured alongside a message at ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMeta {
    /// Exchange the delivery originally arrived through.
    pub exchange: String,
    /// Routing key of the original delivery.
    pub routing_key: String,
    /// Whether the broker marked the delivery as redelivered.
    pub redelivered: bool,
    /// Basic properties of the original delivery.
    pub properties: BasicProperties,
}

/// One broker message captured into the mirror.
///
/// Created by ingestion, mutated by review/edit and soft-delete, never
/// destroyed: deletion is always a `deleted_at` stamp so audit history
/// survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Record identity.
    pub id: MessageId,
    /// The user whose ingestion run captured the message.
    pub user_id: UserId,
    /// The mirrored queue the message was pulled from.
    pub queue_id: QueueId,
    /// Captured body.
    pub body: MessageBody,
    /// Broker-native metadata, if captured.
    pub meta: Option<MessageMeta>,
    /// Whether an operator has marked the message reviewed.
    pub is_reviewed: bool,
    /// Per-queue order assigned at ingestion; strictly increasing,
    /// never reused.
    pub message_order: MessageOrder,
    /// Creation stamp.
    pub created_at: Timestamp,
    /// Last update stamp, if ever updated.
    pub updated_at: Option<Timestamp>,
    /// Soft-delete stamp. A soft-deleted message is excluded from
    /// requeue/republish candidate sets but remains readable.
    pub deleted_at: Option<Timestamp>,
}

impl Message {
    /// Creates a mirrored message.
    #[must_use]
    pub fn new(
        user_id: UserId,
        queue_id: QueueId,
        message_order: MessageOrder,
        body: MessageBody,
        meta: Option<MessageMeta>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            user_id,
            queue_id,
            body,
            meta,
            is_reviewed: false,
            message_order,
            created_at: Timestamp::now(),
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Returns true if the message has not been soft-deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns the captured basic properties, or an empty set.
    #[must_use]
    pub fn properties(&self) -> BasicProperties {
        self.meta
            .as_ref()
            .map(|meta| meta.properties.clone())
            .unwrap_or_default()
    }
}
