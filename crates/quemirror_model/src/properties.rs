//! Sparse AMQP basic properties.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The AMQP basic-property set attached to a delivery.
///
/// Every field is optional. When the mirror republishes a message it
/// overlays only the fields that are `Some`, leaving absent fields at
/// the protocol defaults; this is a sparse overlay, not a full snapshot
/// restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicProperties {
    /// Application identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Cluster identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    /// MIME content type of the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// MIME content encoding of the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// Correlation identifier for request/reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Delivery mode (1 = transient, 2 = persistent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<u8>,
    /// Per-message TTL, as the protocol's string-encoded milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    /// Application headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, serde_json::Value>>,
    /// Application message identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Message priority (0-9).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Reply-to address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Sender-supplied timestamp, seconds since the UNIX epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Message type name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Sender user identifier, verified by the broker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl BasicProperties {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == BasicProperties::default()
    }

    /// Returns true if the content type declares a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.split(';').next().unwrap_or(ct).trim();
                ct.eq_ignore_ascii_case("application/json") || ct.to_ascii_lowercase().ends_with("+json")
            })
            .unwrap_or(false)
    }
}
