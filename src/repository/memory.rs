//! In-Memory Remote Store
//!
//! Keeps rows in process memory and issues uuid ids. Counts every call and
//! can be told to fail specific upcoming operations, which makes it the
//! backend of choice for exercising save and reorder paths.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::{Item, ItemId, ItemPatch, OwnerId, Payload, RemoteError, RemoteResult};

use super::traits::RemoteStore;

/// Remote operation names, used for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    List,
    Create,
    Update,
    Delete,
    Reorder,
}

/// Number of calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub reorder: usize,
}

impl CallCounts {
    /// Calls that write to the store
    pub fn writes(&self) -> usize {
        self.create + self.update + self.delete + self.reorder
    }

    fn bump(&mut self, op: RemoteOp) {
        match op {
            RemoteOp::List => self.list += 1,
            RemoteOp::Create => self.create += 1,
            RemoteOp::Update => self.update += 1,
            RemoteOp::Delete => self.delete += 1,
            RemoteOp::Reorder => self.reorder += 1,
        }
    }
}

#[derive(Debug)]
struct Fault {
    op: RemoteOp,
    /// `None` matches any call of `op`
    target: Option<ItemId>,
    error: RemoteError,
}

#[derive(Debug)]
struct MemoryState<P> {
    rows: Vec<Item<P>>,
    faults: Vec<Fault>,
    calls: CallCounts,
}

/// Remote store backed by a vector
#[derive(Debug)]
pub struct MemoryRemote<P> {
    state: Mutex<MemoryState<P>>,
    batch_reorder: bool,
}

impl<P: Payload> Default for MemoryRemote<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> MemoryRemote<P> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                rows: Vec::new(),
                faults: Vec::new(),
                calls: CallCounts::default(),
            }),
            batch_reorder: true,
        }
    }

    /// A store without the batch `reorder` call
    pub fn without_batch_reorder() -> Self {
        Self {
            batch_reorder: false,
            ..Self::new()
        }
    }

    /// Insert persisted rows for an owner directly, bypassing call counting
    pub fn seed(&self, owner: &OwnerId, payloads: Vec<P>) -> Vec<Item<P>> {
        let mut state = self.state.lock();
        let start = state.rows.iter().filter(|r| &r.owner_id == owner).count() as u32;
        let now = Utc::now();
        let seeded: Vec<Item<P>> = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| Item {
                id: ItemId::Remote(uuid::Uuid::new_v4().to_string()),
                owner_id: owner.clone(),
                position: start + i as u32,
                payload,
                created_at: Some(now),
                updated_at: Some(now),
            })
            .collect();
        state.rows.extend(seeded.iter().cloned());
        seeded
    }

    /// Replace a stored row wholesale (simulates an edit by another client)
    pub fn overwrite(&self, item: Item<P>) {
        let mut state = self.state.lock();
        match state.rows.iter_mut().find(|r| r.id == item.id) {
            Some(row) => *row = item,
            None => state.rows.push(item),
        }
    }

    /// Current rows of an owner, ordered by position
    pub fn rows(&self, owner: &OwnerId) -> Vec<Item<P>> {
        let state = self.state.lock();
        sorted_rows(&state.rows, owner)
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls = CallCounts::default();
    }

    /// Make the next matching call fail with `error`
    pub fn fail_next(&self, op: RemoteOp, target: Option<ItemId>, error: RemoteError) {
        self.state.lock().faults.push(Fault { op, target, error });
    }

    /// Count the call and consume a matching fault, if any
    fn enter(&self, op: RemoteOp, id: Option<&ItemId>) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.bump(op);
        let hit = state.faults.iter().position(|f| {
            f.op == op && (f.target.is_none() || f.target.as_ref() == id)
        });
        match hit {
            Some(index) => Err(state.faults.remove(index).error),
            None => Ok(()),
        }
    }
}

fn sorted_rows<P: Clone>(rows: &[Item<P>], owner: &OwnerId) -> Vec<Item<P>> {
    let mut owned: Vec<Item<P>> = rows.iter().filter(|r| &r.owner_id == owner).cloned().collect();
    owned.sort_by_key(|r| r.position);
    owned
}

#[async_trait]
impl<P: Payload> RemoteStore<P> for MemoryRemote<P> {
    async fn list(&self, owner: &OwnerId) -> RemoteResult<Vec<Item<P>>> {
        self.enter(RemoteOp::List, None)?;
        Ok(self.rows(owner))
    }

    async fn create(&self, owner: &OwnerId, payload: &P, position: u32) -> RemoteResult<Item<P>> {
        self.enter(RemoteOp::Create, None)?;
        let now = Utc::now();
        let item = Item {
            id: ItemId::Remote(uuid::Uuid::new_v4().to_string()),
            owner_id: owner.clone(),
            position,
            payload: payload.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.state.lock().rows.push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch<P>) -> RemoteResult<Item<P>> {
        self.enter(RemoteOp::Update, Some(id))?;
        let mut state = self.state.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| RemoteError::NotFound(format!("Item {} not found", id)))?;
        patch.apply(row);
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }

    async fn delete(&self, id: &ItemId) -> RemoteResult<()> {
        self.enter(RemoteOp::Delete, Some(id))?;
        let mut state = self.state.lock();
        let before = state.rows.len();
        state.rows.retain(|r| &r.id != id);
        if state.rows.len() == before {
            return Err(RemoteError::NotFound(format!("Item {} not found", id)));
        }
        Ok(())
    }

    async fn reorder(&self, owner: &OwnerId, ordered: &[ItemId]) -> RemoteResult<()> {
        if !self.batch_reorder {
            return Err(RemoteError::Unsupported("reorder".to_string()));
        }
        self.enter(RemoteOp::Reorder, None)?;
        let mut state = self.state.lock();
        if let Some(unknown) = ordered
            .iter()
            .find(|id| !state.rows.iter().any(|r| &r.id == *id && &r.owner_id == owner))
        {
            return Err(RemoteError::Conflict(format!(
                "Item {} does not belong to {}",
                unknown, owner
            )));
        }
        let now = Utc::now();
        for row in state.rows.iter_mut().filter(|r| &r.owner_id == owner) {
            if let Some(index) = ordered.iter().position(|id| id == &row.id) {
                row.position = index as u32;
                row.updated_at = Some(now);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WidgetKind, WidgetPayload};

    fn owner() -> OwnerId {
        OwnerId::new("dash-1")
    }

    #[tokio::test]
    async fn test_create_assigns_remote_id() {
        let remote = MemoryRemote::<WidgetPayload>::new();
        let payload = WidgetPayload::empty(WidgetKind::Notes);
        let created = remote.create(&owner(), &payload, 0).await.unwrap();
        assert!(!created.id.is_local());
        assert!(created.created_at.is_some());
        assert_eq!(remote.rows(&owner()).len(), 1);
        assert_eq!(remote.calls().create, 1);
    }

    #[tokio::test]
    async fn test_fault_injection_targets_one_call() {
        let remote = MemoryRemote::<WidgetPayload>::new();
        let seeded = remote.seed(
            &owner(),
            vec![WidgetPayload::empty(WidgetKind::Metric), WidgetPayload::empty(WidgetKind::Chart)],
        );
        remote.fail_next(RemoteOp::Delete, Some(seeded[0].id.clone()), RemoteError::Timeout);

        assert_eq!(remote.delete(&seeded[1].id).await, Ok(()));
        assert_eq!(remote.delete(&seeded[0].id).await, Err(RemoteError::Timeout));
        assert_eq!(remote.delete(&seeded[0].id).await, Ok(()));
        assert_eq!(remote.calls().delete, 3);
    }

    #[tokio::test]
    async fn test_batch_reorder_and_fallback_flag() {
        let remote = MemoryRemote::<WidgetPayload>::new();
        let seeded = remote.seed(
            &owner(),
            vec![WidgetPayload::empty(WidgetKind::Metric), WidgetPayload::empty(WidgetKind::Chart)],
        );
        let order = vec![seeded[1].id.clone(), seeded[0].id.clone()];
        remote.reorder(&owner(), &order).await.unwrap();
        let rows = remote.rows(&owner());
        assert_eq!(rows[0].id, seeded[1].id);

        let plain = MemoryRemote::<WidgetPayload>::without_batch_reorder();
        let err = plain.reorder(&owner(), &[]).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let remote = MemoryRemote::<WidgetPayload>::new();
        let id = ItemId::remote("gone").unwrap();
        let err = remote.update(&id, &ItemPatch::position(1)).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }
}
