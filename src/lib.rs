//! Agency Board editing core.
//!
//! Ordered collections (task content blocks, dashboard and member widgets)
//! edited optimistically in memory and synchronized to a remote store by
//! diffing against the last persisted baseline.

pub mod config;
pub mod domain;
pub mod editor;
pub mod repository;

pub use config::{ConfigError, EditorConfig};
pub use editor::{Editor, PersistPolicy, SyncError, SyncReport};
pub use repository::RemoteStore;
