//! In-memory mirror store.

use crate::error::{StoreError, StoreResult};
use crate::store::{MirrorStore, MirrorTransaction};
use parking_lot::Mutex;
use quemirror_model::{
    Broker, BrokerId, Exchange, ExchangeId, Message, MessageId, MessageOrder, Queue, QueueId,
    Timestamp, UserId,
};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Default)]
struct Inner {
    brokers: HashMap<BrokerId, Broker>,
    queues: HashMap<QueueId, Queue>,
    exchanges: HashMap<ExchangeId, Exchange>,
    messages: HashMap<MessageId, Message>,
}

/// An in-memory [`MirrorStore`] for tests and embedded deployments.
///
/// All records live behind one lock; `take_next_order` and transaction
/// commits are therefore serialized, satisfying the atomicity the
/// contract requires. Faults can be scripted per commit with
/// [`inject_commit_failure`](MemoryStore::inject_commit_failure).
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    commit_faults: Mutex<VecDeque<StoreError>>,
    soft_delete_faults: Mutex<VecDeque<StoreError>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a failure for the next transaction commit.
    ///
    /// Each injected fault consumes exactly one commit attempt; commits
    /// after the queue drains behave normally.
    pub fn inject_commit_failure(&self, error: StoreError) {
        self.commit_faults.lock().push_back(error);
    }

    /// Scripts a failure for the next direct soft-delete call.
    ///
    /// Lets tests freeze the gap between a publish and its soft-delete,
    /// standing in for a crash in that window.
    pub fn inject_soft_delete_failure(&self, error: StoreError) {
        self.soft_delete_faults.lock().push_back(error);
    }

    fn take_commit_fault(&self) -> Option<StoreError> {
        self.commit_faults.lock().pop_front()
    }
}

impl MirrorStore for MemoryStore {
    fn insert_broker(&self, broker: Broker) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.brokers.contains_key(&broker.id) {
            return Err(StoreError::DuplicateRecord(broker.id.to_string()));
        }
        inner.brokers.insert(broker.id, broker);
        Ok(())
    }

    fn broker(&self, id: BrokerId) -> StoreResult<Option<Broker>> {
        Ok(self.inner.lock().brokers.get(&id).cloned())
    }

    fn brokers_for_user(&self, user_id: UserId) -> StoreResult<Vec<Broker>> {
        let inner = self.inner.lock();
        let mut brokers: Vec<Broker> = inner
            .brokers
            .values()
            .filter(|broker| !broker.is_deleted() && broker.access_for(user_id).is_some())
            .cloned()
            .collect();
        brokers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(brokers)
    }

    fn insert_queue(&self, queue: Queue) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.queues.contains_key(&queue.id) {
            return Err(StoreError::DuplicateRecord(queue.id.to_string()));
        }
        inner.queues.insert(queue.id, queue);
        Ok(())
    }

    fn queue(&self, id: QueueId) -> StoreResult<Option<Queue>> {
        Ok(self.inner.lock().queues.get(&id).cloned())
    }

    fn take_next_order(&self, queue_id: QueueId) -> StoreResult<MessageOrder> {
        let mut inner = self.inner.lock();
        let queue = inner
            .queues
            .get_mut(&queue_id)
            .ok_or(StoreError::QueueNotFound(queue_id))?;
        queue.next_message_order = queue.next_message_order.next();
        Ok(queue.next_message_order)
    }

    fn insert_exchange(&self, exchange: Exchange) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.exchanges.contains_key(&exchange.id) {
            return Err(StoreError::DuplicateRecord(exchange.id.to_string()));
        }
        inner.exchanges.insert(exchange.id, exchange);
        Ok(())
    }

    fn exchange(&self, id: ExchangeId) -> StoreResult<Option<Exchange>> {
        Ok(self.inner.lock().exchanges.get(&id).cloned())
    }

    fn message(&self, id: MessageId) -> StoreResult<Option<Message>> {
        Ok(self.inner.lock().messages.get(&id).cloned())
    }

    fn messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>> {
        let inner = self.inner.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.messages.get(id).cloned())
            .collect())
    }

    fn messages_for_queue(&self, queue_id: QueueId) -> StoreResult<Vec<Message>> {
        let inner = self.inner.lock();
        let mut messages: Vec<Message> = inner
            .messages
            .values()
            .filter(|message| message.queue_id == queue_id)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.message_order);
        Ok(messages)
    }

    fn soft_delete_message(&self, id: MessageId, deleted_at: Timestamp) -> StoreResult<()> {
        if let Some(fault) = self.soft_delete_faults.lock().pop_front() {
            return Err(fault);
        }
        let mut inner = self.inner.lock();
        let message = inner
            .messages
            .get_mut(&id)
            .ok_or(StoreError::MessageNotFound(id))?;
        message.deleted_at = Some(deleted_at);
        message.updated_at = Some(deleted_at);
        Ok(())
    }

    fn begin(&self) -> StoreResult<Box<dyn MirrorTransaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            store: self,
            ops: Vec::new(),
        }))
    }
}

enum TxOp {
    InsertMessage(Message),
    DecrementReady(QueueId),
    SoftDelete(MessageId, Timestamp),
}

/// A buffered transaction against a [`MemoryStore`].
struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    ops: Vec<TxOp>,
}

impl MirrorTransaction for MemoryTransaction<'_> {
    fn insert_message(&mut self, message: Message) -> StoreResult<()> {
        self.ops.push(TxOp::InsertMessage(message));
        Ok(())
    }

    fn decrement_ready(&mut self, queue_id: QueueId) -> StoreResult<()> {
        self.ops.push(TxOp::DecrementReady(queue_id));
        Ok(())
    }

    fn soft_delete_message(&mut self, id: MessageId, deleted_at: Timestamp) -> StoreResult<()> {
        self.ops.push(TxOp::SoftDelete(id, deleted_at));
        Ok(())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        if let Some(fault) = self.store.take_commit_fault() {
            debug!("commit failed with injected fault: {fault}");
            return Err(fault);
        }

        let mut inner = self.store.inner.lock();

        // Validate before applying so a failed commit changes nothing.
        for op in &self.ops {
            match op {
                TxOp::InsertMessage(message) => {
                    if inner.messages.contains_key(&message.id) {
                        return Err(StoreError::aborted(format!(
                            "duplicate message {}",
                            message.id
                        )));
                    }
                }
                TxOp::DecrementReady(queue_id) => {
                    if !inner.queues.contains_key(queue_id) {
                        return Err(StoreError::QueueNotFound(*queue_id));
                    }
                }
                TxOp::SoftDelete(id, _) => {
                    if !inner.messages.contains_key(id) {
                        return Err(StoreError::MessageNotFound(*id));
                    }
                }
            }
        }

        for op in self.ops {
            match op {
                TxOp::InsertMessage(message) => {
                    inner.messages.insert(message.id, message);
                }
                TxOp::DecrementReady(queue_id) => {
                    if let Some(queue) = inner.queues.get_mut(&queue_id) {
                        queue.ready = queue.ready.saturating_sub(1);
                        queue.updated_at = Timestamp::now();
                    }
                }
                TxOp::SoftDelete(id, deleted_at) => {
                    if let Some(message) = inner.messages.get_mut(&id) {
                        message.deleted_at = Some(deleted_at);
                        message.updated_at = Some(deleted_at);
                    }
                }
            }
        }

        Ok(())
    }

    fn rollback(self: Box<Self>) {
        // Buffered statements are simply dropped.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quemirror_model::{MessageBody, UserId};
    use std::sync::Arc;

    fn seeded_queue(store: &MemoryStore, ready: u64) -> Queue {
        let broker = Broker::new(UserId::new(), "test", None);
        let queue = Queue::new(broker.id, "orders").with_ready(ready);
        store.insert_broker(broker).unwrap();
        store.insert_queue(queue.clone()).unwrap();
        queue
    }

    fn message_for(queue: &Queue, order: u64) -> Message {
        Message::new(
            UserId::new(),
            queue.id,
            MessageOrder::new(order),
            MessageBody::Binary(vec![0x42]),
            None,
        )
    }

    #[test]
    fn take_next_order_increments_and_fetches() {
        let store = MemoryStore::new();
        let queue = seeded_queue(&store, 0);

        assert_eq!(store.take_next_order(queue.id).unwrap(), MessageOrder::new(1));
        assert_eq!(store.take_next_order(queue.id).unwrap(), MessageOrder::new(2));
        assert_eq!(
            store.queue(queue.id).unwrap().unwrap().next_message_order,
            MessageOrder::new(2)
        );
    }

    #[test]
    fn take_next_order_unknown_queue() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.take_next_order(QueueId::new()),
            Err(StoreError::QueueNotFound(_))
        ));
    }

    #[test]
    fn concurrent_order_assignment_never_collides() {
        let store = Arc::new(MemoryStore::new());
        let queue = seeded_queue(&store, 0);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let queue_id = queue.id;
            handles.push(std::thread::spawn(move || {
                (0..250)
                    .map(|_| store.take_next_order(queue_id).unwrap().as_u64())
                    .collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert_eq!(all.last(), Some(&1000));
    }

    #[test]
    fn commit_applies_insert_and_clamped_decrement() {
        let store = MemoryStore::new();
        let queue = seeded_queue(&store, 1);

        for round in 1..=2 {
            let mut tx = store.begin().unwrap();
            tx.insert_message(message_for(&queue, round)).unwrap();
            tx.decrement_ready(queue.id).unwrap();
            tx.commit().unwrap();
        }

        // Two decrements against depth 1: clamped at zero.
        assert_eq!(store.queue(queue.id).unwrap().unwrap().ready, 0);
        assert_eq!(store.messages_for_queue(queue.id).unwrap().len(), 2);
    }

    #[test]
    fn rollback_leaves_no_trace() {
        let store = MemoryStore::new();
        let queue = seeded_queue(&store, 5);

        let mut tx = store.begin().unwrap();
        tx.insert_message(message_for(&queue, 1)).unwrap();
        tx.decrement_ready(queue.id).unwrap();
        tx.rollback();

        assert_eq!(store.queue(queue.id).unwrap().unwrap().ready, 5);
        assert!(store.messages_for_queue(queue.id).unwrap().is_empty());
    }

    #[test]
    fn injected_fault_fails_one_commit_only() {
        let store = MemoryStore::new();
        let queue = seeded_queue(&store, 2);
        store.inject_commit_failure(StoreError::backend_retryable("lease expired"));

        let mut tx = store.begin().unwrap();
        tx.insert_message(message_for(&queue, 1)).unwrap();
        let err = tx.commit().unwrap_err();
        assert!(err.is_retryable());
        assert!(store.messages_for_queue(queue.id).unwrap().is_empty());

        let mut tx = store.begin().unwrap();
        tx.insert_message(message_for(&queue, 1)).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.messages_for_queue(queue.id).unwrap().len(), 1);
    }

    #[test]
    fn soft_delete_keeps_record() {
        let store = MemoryStore::new();
        let queue = seeded_queue(&store, 0);
        let message = message_for(&queue, 1);
        let id = message.id;

        let mut tx = store.begin().unwrap();
        tx.insert_message(message).unwrap();
        tx.commit().unwrap();

        store
            .soft_delete_message(id, Timestamp::from_millis(7))
            .unwrap();
        let stored = store.message(id).unwrap().unwrap();
        assert!(!stored.is_active());
        assert_eq!(stored.deleted_at, Some(Timestamp::from_millis(7)));
    }

    #[test]
    fn messages_skips_missing_ids() {
        let store = MemoryStore::new();
        let queue = seeded_queue(&store, 0);
        let message = message_for(&queue, 1);
        let id = message.id;

        let mut tx = store.begin().unwrap();
        tx.insert_message(message).unwrap();
        tx.commit().unwrap();

        let found = store.messages(&[id, MessageId::new()]).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn brokers_for_user_filters_deleted_and_unlisted() {
        let store = MemoryStore::new();
        let user = UserId::new();

        let mine = Broker::new(user, "mine", None);
        let mine_id = mine.id;
        store.insert_broker(mine).unwrap();

        let mut gone = Broker::new(user, "gone", None);
        gone.deleted_at = Some(Timestamp::now());
        store.insert_broker(gone).unwrap();

        store
            .insert_broker(Broker::new(UserId::new(), "theirs", None))
            .unwrap();

        let listed = store.brokers_for_user(user).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine_id);
    }

    proptest! {
        #[test]
        fn order_values_form_a_strict_sequence(count in 1usize..64) {
            let store = MemoryStore::new();
            let queue = seeded_queue(&store, 0);

            let orders: Vec<u64> = (0..count)
                .map(|_| store.take_next_order(queue.id).unwrap().as_u64())
                .collect();

            for (i, order) in orders.iter().enumerate() {
                prop_assert_eq!(*order, i as u64 + 1);
            }
        }
    }
}
