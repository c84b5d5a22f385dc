//! Thread-pool content model and the swappable pool handle.
mod dynamic_pool;
mod parameter;

pub use dynamic_pool::*;
pub use parameter::*;
