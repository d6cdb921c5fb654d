//! Mock broker and requeue transport for tests.

use crate::connector::{BrokerChannel, BrokerConnection, BrokerConnector};
use crate::delivery::{Delivery, PublishedMessage};
use crate::error::{AdapterError, AdapterResult};
use crate::requeue::{RequeueCall, RequeueTransaction, RequeueTransport};
use parking_lot::Mutex;
use quemirror_model::{BasicProperties, ConnectionSettings, DeliveryId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<Delivery>>,
    published: Vec<PublishedMessage>,
    connect_error: Option<String>,
    fail_fetch_after: Option<u64>,
    fail_publish_after: Option<u64>,
    fetch_calls: u64,
    publish_calls: u64,
    connect_attempts: u64,
    open_connections: u64,
    open_channels: u64,
}

/// A scriptable in-memory broker.
///
/// Mimics the observable behavior the engines rely on:
///
/// - `fetch_one` with `ack = false` hands the message out but keeps it
///   owned by the broker: once the fetching channel closes, unacked
///   messages return to the front of their queue marked redelivered.
///   This is what makes ingestion non-destructive end to end.
/// - publishes are recorded in call order for assertions.
/// - connect/fetch/publish failures can be scripted, and connection /
///   channel lifecycles are counted so tests can assert that every exit
///   path released its resources.
#[derive(Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MockBroker {
    /// Creates a mock broker with no queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `queue` with deliveries, appended in order.
    pub fn seed_queue(&self, queue: impl Into<String>, deliveries: Vec<Delivery>) {
        self.state
            .lock()
            .queues
            .entry(queue.into())
            .or_default()
            .extend(deliveries);
    }

    /// Scripts the next connection attempts to fail with `message`.
    pub fn set_connect_error(&self, message: impl Into<String>) {
        self.state.lock().connect_error = Some(message.into());
    }

    /// Scripts fetches to fail after `count` successful calls.
    pub fn fail_fetch_after(&self, count: u64) {
        self.state.lock().fail_fetch_after = Some(count);
    }

    /// Scripts publishes to fail after `count` successful calls.
    pub fn fail_publish_after(&self, count: u64) {
        self.state.lock().fail_publish_after = Some(count);
    }

    /// Returns the messages published so far, in call order.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().published.clone()
    }

    /// Returns the current number of messages held in `queue`.
    #[must_use]
    pub fn queue_len(&self, queue: &str) -> usize {
        self.state
            .lock()
            .queues
            .get(queue)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Returns how many connection attempts were made.
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.state.lock().connect_attempts
    }

    /// Returns how many fetch calls were made.
    #[must_use]
    pub fn fetch_calls(&self) -> u64 {
        self.state.lock().fetch_calls
    }

    /// Returns the number of connections not yet released.
    #[must_use]
    pub fn open_connections(&self) -> u64 {
        self.state.lock().open_connections
    }

    /// Returns the number of channels not yet released.
    #[must_use]
    pub fn open_channels(&self) -> u64 {
        self.state.lock().open_channels
    }
}

impl BrokerConnector for MockBroker {
    type Connection = MockConnection;

    fn connect(
        &self,
        _settings: &ConnectionSettings,
        _timeout: Duration,
    ) -> AdapterResult<Self::Connection> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        if let Some(message) = &state.connect_error {
            return Err(AdapterError::Connect(message.clone()));
        }
        state.open_connections += 1;
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }
}

/// A connection handle to a [`MockBroker`].
pub struct MockConnection {
    state: Arc<Mutex<BrokerState>>,
}

impl BrokerConnection for MockConnection {
    type Channel = MockChannel;

    fn open_channel(&mut self) -> AdapterResult<Self::Channel> {
        let mut state = self.state.lock();
        state.open_channels += 1;
        Ok(MockChannel {
            state: Arc::clone(&self.state),
            unacked: Vec::new(),
        })
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_connections = state.open_connections.saturating_sub(1);
    }
}

/// A channel handle to a [`MockBroker`].
pub struct MockChannel {
    state: Arc<Mutex<BrokerState>>,
    unacked: Vec<(String, Delivery)>,
}

impl BrokerChannel for MockChannel {
    fn fetch_one(&mut self, queue: &str, ack: bool) -> AdapterResult<Option<Delivery>> {
        let mut state = self.state.lock();
        state.fetch_calls += 1;
        if let Some(limit) = state.fail_fetch_after {
            if state.fetch_calls > limit {
                return Err(AdapterError::fetch(queue, "scripted fetch failure"));
            }
        }

        let Some(delivery) = state.queues.get_mut(queue).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        if !ack {
            self.unacked.push((queue.to_string(), delivery.clone()));
        }
        Ok(Some(delivery))
    }

    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        properties: &BasicProperties,
        body: &[u8],
    ) -> AdapterResult<()> {
        let mut state = self.state.lock();
        state.publish_calls += 1;
        if let Some(limit) = state.fail_publish_after {
            if state.publish_calls > limit {
                return Err(AdapterError::publish(exchange, "scripted publish failure"));
            }
        }
        state.published.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties: properties.clone(),
            body: body.to_vec(),
        });
        Ok(())
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_channels = state.open_channels.saturating_sub(1);

        // Unacked deliveries go back to the broker, front of queue,
        // marked redelivered, oldest first.
        for (queue, mut delivery) in self.unacked.drain(..).rev() {
            delivery.redelivered = true;
            state.queues.entry(queue).or_default().push_front(delivery);
        }
    }
}

/// Scripted outcome for one delivery identifier on the mock requeue
/// transport.
#[derive(Debug, Clone)]
pub enum ScriptedRequeue {
    /// The routine reports this affected count.
    Affected(i64),
    /// The routine finds no matching delivery (a null result).
    NoMatch,
    /// The transport itself fails.
    Fail(String),
}

/// A scriptable requeue transport.
///
/// Unscripted delivery identifiers succeed with an affected count of 1.
/// Requeues made through a transaction become visible in
/// [`committed`](MockRequeueTransport::committed) only after the
/// transaction commits.
#[derive(Default)]
pub struct MockRequeueTransport {
    scripts: Mutex<HashMap<DeliveryId, ScriptedRequeue>>,
    committed: Mutex<Vec<DeliveryId>>,
    calls: Mutex<Vec<RequeueCall>>,
}

impl MockRequeueTransport {
    /// Creates a transport where every delivery requeues successfully.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outcome for `delivery_id`.
    pub fn script(&self, delivery_id: DeliveryId, outcome: ScriptedRequeue) {
        self.scripts.lock().insert(delivery_id, outcome);
    }

    /// Returns the deliveries whose requeue has taken effect.
    #[must_use]
    pub fn committed(&self) -> Vec<DeliveryId> {
        self.committed.lock().clone()
    }

    /// Returns every routine invocation made, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<RequeueCall> {
        self.calls.lock().clone()
    }

    fn evaluate(&self, call: &RequeueCall) -> AdapterResult<Option<i64>> {
        self.calls.lock().push(*call);
        match self.scripts.lock().get(&call.delivery_id) {
            None => Ok(Some(1)),
            Some(ScriptedRequeue::Affected(count)) => Ok(Some(*count)),
            Some(ScriptedRequeue::NoMatch) => Ok(None),
            Some(ScriptedRequeue::Fail(message)) => {
                Err(AdapterError::RequeueTransport(message.clone()))
            }
        }
    }
}

impl RequeueTransport for MockRequeueTransport {
    fn requeue(&self, call: &RequeueCall) -> AdapterResult<Option<i64>> {
        let result = self.evaluate(call);
        if let Ok(Some(count)) = &result {
            if *count > 0 {
                self.committed.lock().push(call.delivery_id);
            }
        }
        result
    }

    fn begin(&self) -> AdapterResult<Box<dyn RequeueTransaction + '_>> {
        Ok(Box::new(MockRequeueTransaction {
            transport: self,
            staged: Vec::new(),
        }))
    }
}

struct MockRequeueTransaction<'a> {
    transport: &'a MockRequeueTransport,
    staged: Vec<DeliveryId>,
}

impl RequeueTransaction for MockRequeueTransaction<'_> {
    fn requeue(&mut self, call: &RequeueCall) -> AdapterResult<Option<i64>> {
        let result = self.transport.evaluate(call);
        if let Ok(Some(count)) = &result {
            if *count > 0 {
                self.staged.push(call.delivery_id);
            }
        }
        result
    }

    fn commit(self: Box<Self>) -> AdapterResult<()> {
        self.transport.committed.lock().extend(self.staged);
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        // Staged requeues are discarded.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::verify;
    use quemirror_model::QueueType;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("mq.test", "guest", "guest")
    }

    fn call(id: i64) -> RequeueCall {
        RequeueCall {
            delivery_id: DeliveryId::new(id),
            queue_type: QueueType::Normal,
            delay_seconds: 0,
            redelivery_count: 0,
        }
    }

    #[test]
    fn unacked_fetch_returns_message_on_channel_close() {
        let broker = MockBroker::new();
        broker.seed_queue("orders", vec![Delivery::new(1, b"a".to_vec())]);

        let mut connection = broker.connect(&settings(), Duration::from_secs(1)).unwrap();
        {
            let mut channel = connection.open_channel().unwrap();
            let fetched = channel.fetch_one("orders", false).unwrap().unwrap();
            assert!(!fetched.redelivered);
            assert_eq!(broker.queue_len("orders"), 0);
        }

        // Channel dropped without ack: the broker owns the message again.
        assert_eq!(broker.queue_len("orders"), 1);
        drop(connection);
        assert_eq!(broker.open_connections(), 0);
        assert_eq!(broker.open_channels(), 0);
    }

    #[test]
    fn unacked_messages_keep_queue_order() {
        let broker = MockBroker::new();
        broker.seed_queue(
            "orders",
            vec![Delivery::new(1, b"a".to_vec()), Delivery::new(2, b"b".to_vec())],
        );

        let mut connection = broker.connect(&settings(), Duration::from_secs(1)).unwrap();
        {
            let mut channel = connection.open_channel().unwrap();
            channel.fetch_one("orders", false).unwrap().unwrap();
            channel.fetch_one("orders", false).unwrap().unwrap();
        }

        let mut channel = connection.open_channel().unwrap();
        let first = channel.fetch_one("orders", false).unwrap().unwrap();
        assert_eq!(first.body, b"a");
        assert!(first.redelivered);
    }

    #[test]
    fn acked_fetch_is_destructive() {
        let broker = MockBroker::new();
        broker.seed_queue("orders", vec![Delivery::new(1, b"a".to_vec())]);

        let mut connection = broker.connect(&settings(), Duration::from_secs(1)).unwrap();
        {
            let mut channel = connection.open_channel().unwrap();
            channel.fetch_one("orders", true).unwrap().unwrap();
        }
        assert_eq!(broker.queue_len("orders"), 0);
    }

    #[test]
    fn scripted_connect_failure() {
        let broker = MockBroker::new();
        broker.set_connect_error("TLS handshake failed");

        let err = verify(&broker, &settings(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AdapterError::Connect(_)));
        assert_eq!(broker.connect_attempts(), 1);
        assert_eq!(broker.open_connections(), 0);
    }

    #[test]
    fn verify_round_trip_releases_everything() {
        let broker = MockBroker::new();
        verify(&broker, &settings(), Duration::from_secs(1)).unwrap();
        assert_eq!(broker.open_connections(), 0);
        assert_eq!(broker.open_channels(), 0);
    }

    #[test]
    fn scripted_fetch_failure_after_limit() {
        let broker = MockBroker::new();
        broker.seed_queue("orders", vec![Delivery::new(1, b"a".to_vec())]);
        broker.fail_fetch_after(1);

        let mut connection = broker.connect(&settings(), Duration::from_secs(1)).unwrap();
        let mut channel = connection.open_channel().unwrap();
        assert!(channel.fetch_one("orders", false).unwrap().is_some());
        assert!(channel.fetch_one("orders", false).is_err());
    }

    #[test]
    fn transactional_requeue_takes_effect_on_commit_only() {
        let transport = MockRequeueTransport::new();
        let mut tx = transport.begin().unwrap();
        tx.requeue(&call(1)).unwrap();
        tx.requeue(&call(2)).unwrap();
        assert!(transport.committed().is_empty());
        tx.commit().unwrap();
        assert_eq!(
            transport.committed(),
            vec![DeliveryId::new(1), DeliveryId::new(2)]
        );
    }

    #[test]
    fn rolled_back_requeues_are_discarded() {
        let transport = MockRequeueTransport::new();
        let mut tx = transport.begin().unwrap();
        tx.requeue(&call(1)).unwrap();
        tx.rollback();
        assert!(transport.committed().is_empty());
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn scripted_no_match_is_a_null_result() {
        let transport = MockRequeueTransport::new();
        transport.script(DeliveryId::new(7), ScriptedRequeue::NoMatch);
        assert_eq!(transport.requeue(&call(7)).unwrap(), None);
        assert!(transport.committed().is_empty());
    }
}
