//! # Quemirror Engine
//!
//! The message lifecycle engines of the quemirror mirror.
//!
//! Three engines own all broker I/O and mirror mutation:
//!
//! - [`IngestionEngine`]: drains a broker queue into the mirror with a
//!   non-destructive fetch loop, assigning strictly increasing per-queue
//!   order values through the store's atomic increment-and-fetch and
//!   committing one transaction per message
//! - [`RequeueEngine`]: invokes the server-side requeue routine per
//!   delivery, either all-or-nothing inside one transaction or
//!   best-effort with a partial success count
//! - [`RepublishEngine`]: overlays mirrored metadata onto fresh broker
//!   publishes in ascending order, then soft-deletes each mirrored copy
//!   as a separate second step
//!
//! ## Delivery semantics
//!
//! Ingestion never acknowledges what it fetches, so the broker may
//! redeliver the same messages to a later run; duplicated mirror entries
//! are an expected, documented property of the design, not a defect.
//! Republish likewise publishes first and soft-deletes second with no
//! shared transaction: a crash between the two steps leaves the message
//! delivered on the broker and still active in the mirror
//! (at-least-once delivery, best-effort cleanup).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod config;
mod error;
mod ingest;
mod republish;
mod request;
mod requeue;

pub use access::{connection_settings, list_brokers, require_listed};
pub use config::{EngineConfig, RetryConfig};
pub use error::{EngineError, EngineResult};
pub use ingest::IngestionEngine;
pub use republish::RepublishEngine;
pub use request::{
    IngestReport, PublishReport, PublishRequest, RequeueOutcome, RequeueRequest, SyncRequest,
};
pub use requeue::RequeueEngine;
