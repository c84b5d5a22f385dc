//! Shared helpers for unit tests: logger setup, fixtures and an in-memory
//! control server.
mod common;
mod fake_server;

pub use common::*;
pub use fake_server::*;
