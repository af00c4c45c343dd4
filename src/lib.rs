//! Intake gateway
//!
//! Maps client session identifiers to backend keys, loads the session's
//! stage, asks a transition service for the next stage, persists it and
//! answers the client.

pub mod api;
pub mod config;
pub mod error;
pub mod invoke;
pub mod orchestrator;
pub mod policy;
pub mod session_key;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
