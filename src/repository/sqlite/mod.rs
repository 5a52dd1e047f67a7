//! SQLite Backend Module
//!
//! Local implementation of the remote store, split into:
//! - db: Connection setup and migrations
//! - item_repo: Core CRUD operations
//! - item_positioning: Position management

mod db;
mod item_positioning;
mod item_repo;

pub use db::init_db;
pub use item_positioning::ItemPositioningOperations;
pub use item_repo::SqliteRemote;
