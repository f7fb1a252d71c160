//! Sandbox runtime - namespaces, mounts, synchronization, and execution

mod exec;
mod launcher;
mod mount;
mod namespace;
mod sync;

pub use exec::*;
pub use launcher::*;
pub use mount::*;
pub use namespace::*;
pub use sync::*;
