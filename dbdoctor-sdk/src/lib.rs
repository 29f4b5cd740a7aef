//! Shared types for the DB-Doctor real-time alert stream.
//!
//! This crate has no runtime dependencies: it only describes what travels
//! over the `/ws/alerts` socket, where that socket lives, and how a client
//! channel is tuned. The reconnecting client itself lives in `dbdoctor-core`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod config;
pub mod endpoint;
pub mod objects;
