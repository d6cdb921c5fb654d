//! The mirror store contract.

use crate::error::StoreResult;
use quemirror_model::{
    Broker, BrokerId, Exchange, ExchangeId, Message, MessageId, MessageOrder, Queue, QueueId,
    Timestamp, UserId,
};

/// The durable side-store holding mirrored broker, queue, exchange, and
/// message records.
///
/// Implementations must be safe for concurrent use: in particular
/// [`take_next_order`](MirrorStore::take_next_order) is the
/// serialization point for order assignment and must be applied
/// atomically at the store layer.
pub trait MirrorStore: Send + Sync {
    /// Inserts a broker record.
    fn insert_broker(&self, broker: Broker) -> StoreResult<()>;

    /// Reads a broker by id.
    fn broker(&self, id: BrokerId) -> StoreResult<Option<Broker>>;

    /// Lists the active brokers on whose access list `user_id` appears,
    /// newest first.
    fn brokers_for_user(&self, user_id: UserId) -> StoreResult<Vec<Broker>>;

    /// Inserts a queue record.
    fn insert_queue(&self, queue: Queue) -> StoreResult<()>;

    /// Reads a queue by id.
    fn queue(&self, id: QueueId) -> StoreResult<Option<Queue>>;

    /// Atomically increments the queue's order counter and returns the
    /// incremented value.
    ///
    /// This is the only way order values are assigned. Two concurrent
    /// callers against the same queue must receive distinct, increasing
    /// values.
    fn take_next_order(&self, queue_id: QueueId) -> StoreResult<MessageOrder>;

    /// Inserts an exchange record.
    fn insert_exchange(&self, exchange: Exchange) -> StoreResult<()>;

    /// Reads an exchange by id.
    fn exchange(&self, id: ExchangeId) -> StoreResult<Option<Exchange>>;

    /// Reads a message by id.
    fn message(&self, id: MessageId) -> StoreResult<Option<Message>>;

    /// Reads the messages matching `ids`. Missing ids are skipped, not
    /// errors.
    fn messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>>;

    /// Reads all messages of a queue, ascending by order.
    fn messages_for_queue(&self, queue_id: QueueId) -> StoreResult<Vec<Message>>;

    /// Stamps a message as deleted. The record remains readable.
    fn soft_delete_message(&self, id: MessageId, deleted_at: Timestamp) -> StoreResult<()>;

    /// Begins a multi-statement transaction.
    fn begin(&self) -> StoreResult<Box<dyn MirrorTransaction + '_>>;
}

/// A multi-statement mirror transaction.
///
/// Statements are buffered and applied atomically on
/// [`commit`](MirrorTransaction::commit); a rolled-back or dropped
/// transaction leaves the store untouched.
pub trait MirrorTransaction {
    /// Buffers a message insert.
    fn insert_message(&mut self, message: Message) -> StoreResult<()>;

    /// Buffers a clamped decrement of the queue's cached ready depth.
    ///
    /// The depth never goes below zero; it is advisory, not
    /// authoritative.
    fn decrement_ready(&mut self, queue_id: QueueId) -> StoreResult<()>;

    /// Buffers a soft-delete stamp on a message.
    fn soft_delete_message(&mut self, id: MessageId, deleted_at: Timestamp) -> StoreResult<()>;

    /// Applies all buffered statements atomically.
    fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards all buffered statements.
    fn rollback(self: Box<Self>);
}
