//! Mirror fixtures and delivery builders.

use quemirror_broker::Delivery;
use quemirror_model::{
    BasicProperties, Broker, BrokerId, ConnectionSettings, Exchange, ExchangeId, Message,
    MessageBody, MessageId, MessageOrder, Queue, QueueId, UserId,
};
use quemirror_store::{MemoryStore, MirrorStore};
use std::sync::Arc;

/// A populated in-memory mirror: one owner, one configured broker, one
/// queue, one exchange.
pub struct MirrorFixture {
    /// The backing store.
    pub store: Arc<MemoryStore>,
    /// The broker's owning user.
    pub owner: UserId,
    /// The seeded broker.
    pub broker_id: BrokerId,
    /// The seeded queue (broker-native name `"orders"`).
    pub queue_id: QueueId,
    /// The seeded exchange (broker-native name `"orders-exchange"`).
    pub exchange_id: ExchangeId,
}

impl MirrorFixture {
    /// Broker-native name of the seeded queue.
    pub const QUEUE_NAME: &'static str = "orders";
    /// Broker-native name of the seeded exchange.
    pub const EXCHANGE_NAME: &'static str = "orders-exchange";

    /// Builds the fixture with the given cached ready depth and order
    /// counter on the queue.
    #[must_use]
    pub fn with_queue_state(ready: u64, next_order: u64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let owner = UserId::new();

        let broker = Broker::new(
            owner,
            "fixture-broker",
            Some(ConnectionSettings::new("mq.fixture", "guest", "guest")),
        );
        let broker_id = broker.id;
        store.insert_broker(broker).expect("insert fixture broker");

        let queue = Queue::new(broker_id, Self::QUEUE_NAME)
            .with_ready(ready)
            .with_next_message_order(MessageOrder::new(next_order));
        let queue_id = queue.id;
        store.insert_queue(queue).expect("insert fixture queue");

        let exchange = Exchange::new(broker_id, Self::EXCHANGE_NAME);
        let exchange_id = exchange.id;
        store
            .insert_exchange(exchange)
            .expect("insert fixture exchange");

        Self {
            store,
            owner,
            broker_id,
            queue_id,
            exchange_id,
        }
    }

    /// Builds the fixture with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_state(0, 0)
    }

    /// Reads the fixture queue back from the store.
    #[must_use]
    pub fn queue(&self) -> Queue {
        self.store
            .queue(self.queue_id)
            .expect("read fixture queue")
            .expect("fixture queue exists")
    }

    /// Inserts an already-mirrored message with the given order and
    /// body, bypassing ingestion. Returns its id.
    pub fn insert_mirrored(&self, order: u64, body: MessageBody) -> MessageId {
        let message = Message::new(
            self.owner,
            self.queue_id,
            MessageOrder::new(order),
            body,
            None,
        );
        let id = message.id;
        let mut tx = self.store.begin().expect("begin fixture transaction");
        tx.insert_message(message).expect("buffer fixture message");
        tx.commit().expect("commit fixture message");
        id
    }
}

impl Default for MirrorFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a delivery carrying a JSON document body.
#[must_use]
pub fn json_delivery(delivery_tag: u64, value: serde_json::Value) -> Delivery {
    let properties = BasicProperties {
        content_type: Some("application/json".into()),
        ..Default::default()
    };
    Delivery::new(delivery_tag, serde_json::to_vec(&value).expect("encode delivery body"))
        .with_properties(properties)
}

/// Builds a delivery carrying opaque bytes.
#[must_use]
pub fn binary_delivery(delivery_tag: u64, body: &[u8]) -> Delivery {
    Delivery::new(delivery_tag, body.to_vec())
}
