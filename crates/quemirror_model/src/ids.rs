//! Typed identifiers for mirror records.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(
    /// Identifier for a mirrored broker endpoint record.
    BrokerId,
    "broker"
);

uuid_id!(
    /// Identifier for a mirrored queue record.
    QueueId,
    "queue"
);

uuid_id!(
    /// Identifier for a mirrored exchange record.
    ExchangeId,
    "exchange"
);

uuid_id!(
    /// Identifier for a mirrored message record.
    ///
    /// Distinct from [`DeliveryId`]: a message may exist in the mirror
    /// long after the broker-side delivery it was captured from is gone.
    MessageId,
    "message"
);

uuid_id!(
    /// Identifier for the user on whose behalf an operation runs.
    UserId,
    "user"
);

/// Identifier of one broker-held delivery, as used by the server-side
/// requeue routine.
///
/// Delivery identifiers are assigned by the broker's transport layer and
/// are unrelated to mirror [`MessageId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub i64);

impl DeliveryId {
    /// Creates a delivery identifier from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delivery:{}", self.0)
    }
}

/// Per-queue ordering value assigned to a message at ingestion.
///
/// Order values are strictly increasing within a queue and never reused.
/// They are produced exclusively by the store's atomic increment-and-fetch
/// on `Queue::next_message_order`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageOrder(pub u64);

impl MessageOrder {
    /// Creates an order value from its raw counter value.
    #[must_use]
    pub const fn new(order: u64) -> Self {
        Self(order)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next order value.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
        assert_ne!(QueueId::new(), QueueId::new());
    }

    #[test]
    fn message_order_next_increments() {
        let order = MessageOrder::new(5);
        assert_eq!(order.next(), MessageOrder::new(6));
        assert!(order < order.next());
    }

    #[test]
    fn display_includes_kind_prefix() {
        let id = DeliveryId::new(42);
        assert_eq!(id.to_string(), "delivery:42");
        assert!(BrokerId::new().to_string().starts_with("broker:"));
    }
}
