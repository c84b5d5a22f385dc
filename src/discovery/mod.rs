//! Instance registration and heartbeat.
mod client;
mod instance;

pub use client::*;
pub use instance::*;
