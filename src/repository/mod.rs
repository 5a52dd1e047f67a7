//! Repository Layer
//!
//! Remote-store abstraction and the bundled implementations.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

#[cfg(all(test, feature = "sqlite"))]
mod tests;

pub use memory::{CallCounts, MemoryRemote, RemoteOp};
#[cfg(feature = "sqlite")]
pub use sqlite::{init_db, ItemPositioningOperations, SqliteRemote};
pub use traits::RemoteStore;
pub(crate) use traits::ensure_remote;
