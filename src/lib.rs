//! Client side of a dynamic thread-pool control plane.
//!
//! Two background loops keep an application in sync with a remote control
//! server:
//! - the long-polling configuration client ([`ClientWorker`]) watches
//!   thread-pool definitions and notifies [`Listener`]s when they change;
//! - the discovery client ([`DiscoveryClient`]) registers the instance and
//!   keeps it alive with heartbeats, re-registering when the server forgets
//!   it.
//!
//! [`AgentBuilder`] wires both together from a [`ClientConfig`].
mod agent;
pub mod cache;
mod config;
pub mod constants;
mod discovery;
mod errors;
mod health;
mod listener;
pub mod metrics;
mod pool;
mod transport;
pub mod utils;
mod worker;

pub use agent::*;
pub use config::*;
pub use discovery::*;
pub use errors::*;
pub use health::*;
pub use listener::*;
pub use pool::*;
pub use transport::*;
pub use utils::*;
pub use worker::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
