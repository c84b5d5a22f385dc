mod gate;
mod identity;
mod shutdown;
pub(crate) mod time;

pub use gate::*;
pub use identity::*;
pub use shutdown::*;
