//! Broker delivery and publish record types.

use quemirror_model::BasicProperties;

/// One message as fetched from a broker queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Channel-scoped delivery tag.
    pub delivery_tag: u64,
    /// Exchange the message arrived through.
    pub exchange: String,
    /// Routing key it was published with.
    pub routing_key: String,
    /// Whether the broker marked it redelivered.
    pub redelivered: bool,
    /// Basic properties.
    pub properties: BasicProperties,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl Delivery {
    /// Creates a delivery with the given body and default metadata.
    #[must_use]
    pub fn new(delivery_tag: u64, body: Vec<u8>) -> Self {
        Self {
            delivery_tag,
            exchange: String::new(),
            routing_key: String::new(),
            redelivered: false,
            properties: BasicProperties::default(),
            body,
        }
    }

    /// Sets the basic properties.
    #[must_use]
    pub fn with_properties(mut self, properties: BasicProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the routing key.
    #[must_use]
    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }
}

/// One message as published through a channel. Recorded by the mock
/// broker so tests can assert on publish order and content.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    /// Target exchange name.
    pub exchange: String,
    /// Routing key.
    pub routing_key: String,
    /// Properties as supplied by the caller.
    pub properties: BasicProperties,
    /// Body bytes as supplied by the caller.
    pub body: Vec<u8>,
}
