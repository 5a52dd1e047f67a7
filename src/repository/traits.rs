//! Repository Layer - Core Traits
//!
//! The remote store the editor persists to. Any backend with this shape
//! works: the hosted platform, the in-memory store, or local SQLite.

use async_trait::async_trait;

use crate::domain::{
    Item, ItemId, ItemPatch, OwnerId, Payload, RemoteError, RemoteResult, LOCAL_PREFIX,
};

/// CRUD access to the items of one payload family, keyed by owner
///
/// All operations are async to support various backends.
#[async_trait]
pub trait RemoteStore<P: Payload>: Send + Sync {
    /// List all items of an owner
    async fn list(&self, owner: &OwnerId) -> RemoteResult<Vec<Item<P>>>;

    /// Persist a new item; returns it with its remote id and timestamps
    async fn create(&self, owner: &OwnerId, payload: &P, position: u32) -> RemoteResult<Item<P>>;

    /// Apply a partial update to an existing item
    async fn update(&self, id: &ItemId, patch: &ItemPatch<P>) -> RemoteResult<Item<P>>;

    /// Delete item by ID
    async fn delete(&self, id: &ItemId) -> RemoteResult<()>;

    /// Rewrite all positions of an owner in one call.
    ///
    /// Backends without a batch call keep this default; callers then fall
    /// back to per-item position updates.
    async fn reorder(&self, _owner: &OwnerId, _ordered: &[ItemId]) -> RemoteResult<()> {
        Err(RemoteError::Unsupported("reorder".to_string()))
    }
}

/// Reject remote-issued items that would collide with the local id space
pub(crate) fn ensure_remote<P>(item: Item<P>) -> RemoteResult<Item<P>> {
    match item.id.as_remote() {
        Some(raw) if !raw.is_empty() && !raw.starts_with(LOCAL_PREFIX) => Ok(item),
        _ => Err(RemoteError::InvalidResponse(format!(
            "backend returned reserved id {:?}",
            item.id.to_string()
        ))),
    }
}
