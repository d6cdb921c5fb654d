//! Mirrored exchange records.

use crate::ids::{BrokerId, ExchangeId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A mirrored representation of one broker exchange.
///
/// Republish resolves an [`ExchangeId`] to the broker-native `name`
/// through the mirror before any broker I/O happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// Record identity.
    pub id: ExchangeId,
    /// The broker this exchange belongs to.
    pub broker_id: BrokerId,
    /// Broker-native exchange name.
    pub name: String,
    /// Creation stamp.
    pub created_at: Timestamp,
    /// Soft-delete stamp.
    pub deleted_at: Option<Timestamp>,
}

impl Exchange {
    /// Creates a mirrored exchange.
    #[must_use]
    pub fn new(broker_id: BrokerId, name: impl Into<String>) -> Self {
        Self {
            id: ExchangeId::new(),
            broker_id,
            name: name.into(),
            created_at: Timestamp::now(),
            deleted_at: None,
        }
    }
}
