//! Local cache of watched thread-pool definitions.
//!
//! - [`GroupKey`] names one watched pool and knows its wire form
//! - [`CacheEntry`] holds content, fingerprint, listeners and the initializing flag
//! - [`CacheRegistry`] maps keys to entries with first-writer-wins creation

mod cache_entry;
mod group_key;
mod registry;

pub use cache_entry::*;
pub use group_key::*;
pub use registry::*;
