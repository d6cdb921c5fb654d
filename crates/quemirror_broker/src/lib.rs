//! # Quemirror Broker
//!
//! Broker adapter and requeue-routine contracts.
//!
//! This crate defines the narrow interfaces the engines use for all
//! broker I/O:
//!
//! - [`BrokerConnector`] / [`BrokerConnection`] / [`BrokerChannel`]:
//!   protocol-level connect, channel open, non-destructive fetch,
//!   publish, and scoped close
//! - [`RequeueTransport`] / [`RequeueTransaction`]: the atomic
//!   server-side requeue routine, callable inside or outside a
//!   caller-managed transaction
//!
//! plus mock implementations ([`MockBroker`], [`MockRequeueTransport`])
//! with scripted responses and call recording for tests.
//!
//! ## Resource scoping
//!
//! A connection or channel opened for one engine invocation belongs to
//! that invocation alone. Implementations release the underlying
//! resources on drop, so every exit path, success or failure, closes
//! them; the explicit `close` methods exist for the success path where
//! release should be eager and visible.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connector;
mod delivery;
mod error;
mod mock;
mod requeue;

pub use connector::{verify, BrokerChannel, BrokerConnection, BrokerConnector};
pub use delivery::{Delivery, PublishedMessage};
pub use error::{AdapterError, AdapterResult};
pub use mock::{MockBroker, MockChannel, MockConnection, MockRequeueTransport, ScriptedRequeue};
pub use requeue::{RequeueCall, RequeueTransaction, RequeueTransport};
