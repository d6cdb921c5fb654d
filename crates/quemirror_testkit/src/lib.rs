//! # Quemirror Testkit
//!
//! Shared fixtures for tests across the workspace: a pre-populated
//! in-memory mirror, delivery builders, and a seeded mock broker.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fixtures;

pub use fixtures::{binary_delivery, json_delivery, MirrorFixture};
