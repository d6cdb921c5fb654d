//! # Quemirror Store
//!
//! Mirror store contract and in-memory implementation.
//!
//! The mirror store is the durable side-store holding [`Broker`],
//! [`Queue`], [`Exchange`], and [`Message`] records. The engines consume
//! it through the [`MirrorStore`] trait, which provides:
//!
//! - document reads, inserts, and updates
//! - an atomic increment-and-fetch on the per-queue order counter
//!   ([`MirrorStore::take_next_order`])
//! - multi-statement transactions with commit/rollback
//!   ([`MirrorTransaction`])
//!
//! ## Transactional contract
//!
//! `take_next_order` must be applied atomically at the store layer, not
//! as a read-modify-write in application code: concurrent ingestion runs
//! against the same queue must never observe duplicate order values.
//!
//! A [`MirrorTransaction`] buffers its statements and applies them
//! atomically on commit; a dropped or rolled-back transaction leaves no
//! trace. Ingestion scopes one transaction per message, not per batch,
//! so an interrupted drain keeps the messages already committed.
//!
//! [`Broker`]: quemirror_model::Broker
//! [`Queue`]: quemirror_model::Queue
//! [`Exchange`]: quemirror_model::Exchange
//! [`Message`]: quemirror_model::Message

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{MirrorStore, MirrorTransaction};
