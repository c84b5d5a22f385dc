//! Long-polling configuration client.
mod client_worker;
mod fetcher;
mod long_poll;
mod probe;

pub use client_worker::*;
pub use fetcher::*;
pub(crate) use long_poll::*;
pub(crate) use probe::*;
