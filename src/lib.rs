//! Trivia proxy library
//!
//! A caching, rate-limit-aware proxy in front of the Open Trivia DB API.
//! The binary in `main.rs` wires these modules into an HTTP server; they are
//! exposed here for integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod pagination;
pub mod query;
pub mod rate_limit;
pub mod retry;
pub mod server;
pub mod sweep;
pub mod transform;
