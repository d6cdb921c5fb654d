//! # Quemirror Model
//!
//! Data model for the quemirror message mirror.
//!
//! This crate defines the records held in the mirror store:
//! - [`Broker`]: one broker endpoint with credentials and an access list
//! - [`Queue`]: a mirrored broker queue with a cached depth and the
//!   per-queue order counter
//! - [`Exchange`]: a mirrored broker exchange (republish target)
//! - [`Message`]: one broker message captured into the mirror
//!
//! plus the value types shared across the workspace: typed identifiers,
//! [`BasicProperties`] (the sparse AMQP property set), [`MessageBody`],
//! access levels, and millisecond timestamps.
//!
//! ## Key Invariants
//!
//! - `Queue::next_message_order` is advanced only through the store's
//!   atomic increment-and-fetch, never by plain field writes
//! - `Message::message_order` values are strictly increasing within a
//!   queue and never reused
//! - Records are never destroyed; deletion is a `deleted_at` stamp
//! - Viewer-level access never exposes connection credentials

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod broker;
mod exchange;
mod ids;
mod message;
mod properties;
mod queue;
mod time;

pub use access::{AccessLevel, BrokerAccess};
pub use broker::{Broker, BrokerView, ConnectionSettings};
pub use exchange::Exchange;
pub use ids::{BrokerId, DeliveryId, ExchangeId, MessageId, MessageOrder, QueueId, UserId};
pub use message::{Message, MessageBody, MessageMeta};
pub use properties::BasicProperties;
pub use queue::{Queue, QueueCounts, QueueType};
pub use time::Timestamp;
