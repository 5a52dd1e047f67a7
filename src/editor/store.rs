//! Ordered Item Store
//!
//! In-memory, ordered items of one owner. Every structural change
//! renumbers positions so they stay exactly `0..n-1`.

use log::{debug, warn};

use crate::domain::{Item, ItemId, OwnerId, Payload, ValidationError};

/// Items of one owner plus the dirty flag
#[derive(Debug, Clone)]
pub struct ItemStore<P> {
    owner: OwnerId,
    items: Vec<Item<P>>,
    dirty: bool,
    /// Bumped on every mutation; lets a finished save tell whether edits raced it
    revision: u64,
}

impl<P: Payload> ItemStore<P> {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            items: Vec::new(),
            dirty: false,
            revision: 0,
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Items in position order
    pub fn items(&self) -> &[Item<P>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item<P>> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ========================
    // Mutations
    // ========================

    /// Append an empty item of `kind`; returns its local id
    pub fn add(&mut self, kind: P::Kind) -> ItemId {
        let item = Item::new_local(self.owner.clone(), kind, self.items.len() as u32);
        let id = item.id.clone();
        debug!("[{}] add {:?} as {}", self.owner, kind, id);
        self.items.push(item);
        self.touch();
        id
    }

    /// Append an item with prefilled content
    pub fn add_with(&mut self, payload: P) -> Result<ItemId, ValidationError> {
        payload.validate()?;
        let id = ItemId::new_local();
        debug!("[{}] add {:?} as {}", self.owner, payload.kind(), id);
        let position = self.items.len() as u32;
        let item = Item::with_payload(id.clone(), self.owner.clone(), payload, position);
        self.items.push(item);
        self.touch();
        Ok(id)
    }

    /// Edit the payload of `id`.
    ///
    /// Returns `Ok(false)` when the id is unknown or the edit changed nothing.
    /// An edit producing an invalid payload is rejected and not applied.
    pub fn update<F>(&mut self, id: &ItemId, edit: F) -> Result<bool, ValidationError>
    where
        F: FnOnce(&mut P),
    {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            debug!("[{}] update of unknown item {} ignored", self.owner, id);
            return Ok(false);
        };

        let mut draft = item.payload.clone();
        edit(&mut draft);
        draft.validate()?;
        if draft == item.payload {
            return Ok(false);
        }

        item.payload = draft;
        self.touch();
        Ok(true)
    }

    /// Delete `id` and close the gap
    pub fn remove(&mut self, id: &ItemId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.items.remove(index);
        self.renumber();
        debug!("[{}] removed {}", self.owner, id);
        self.touch();
        true
    }

    /// Move `id` to `new_index` (clamped to the last slot)
    pub fn reorder(&mut self, id: &ItemId, new_index: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let to = new_index.min(self.items.len().saturating_sub(1));
        if from == to {
            return false;
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.renumber();
        debug!("[{}] moved {} from {} to {}", self.owner, id, from, to);
        self.touch();
        true
    }

    /// Put items back into `order`; ids missing from `order` keep their relative order at the end
    pub fn restore_order(&mut self, order: &[ItemId]) -> bool {
        let before = self.ids();
        self.items.sort_by_key(|item| {
            order
                .iter()
                .position(|id| id == &item.id)
                .unwrap_or(usize::MAX)
        });
        self.renumber();
        if self.ids() == before {
            return false;
        }
        self.touch();
        true
    }

    /// Replace all items (initial fetch or reload).
    ///
    /// Items are ordered by position and renumbered. Returns true when
    /// renumbering had to fix gaps or duplicates; the store then stays dirty.
    pub fn replace_all(&mut self, mut items: Vec<Item<P>>) -> bool {
        let owner = self.owner.clone();
        items.retain(|item| {
            let mine = item.owner_id == owner;
            if !mine {
                warn!("[{}] dropping item {} owned by {}", owner, item.id, item.owner_id);
            }
            mine
        });
        items.sort_by_key(|item| item.position);

        self.items = items;
        let renumbered = self.renumber();
        self.dirty = renumbered;
        self.revision += 1;
        renumbered
    }

    // ========================
    // Sync Reconciliation
    // ========================

    /// Swap a local id for the id issued on create, taking remote timestamps
    pub fn adopt(&mut self, local: &ItemId, remote: &Item<P>) -> bool {
        match self.items.iter_mut().find(|item| &item.id == local) {
            Some(item) => {
                item.id = remote.id.clone();
                item.created_at = remote.created_at;
                item.updated_at = remote.updated_at;
                true
            }
            None => false,
        }
    }

    /// Copy remote timestamps onto the matching item
    pub fn absorb_timestamps(&mut self, remote: &Item<P>) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == remote.id) {
            item.created_at = remote.created_at;
            item.updated_at = remote.updated_at;
        }
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    /// Rewrite positions to `0..n-1`; returns whether anything changed
    fn renumber(&mut self) -> bool {
        let mut changed = false;
        for (index, item) in self.items.iter_mut().enumerate() {
            let position = index as u32;
            if item.position != position {
                item.position = position;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockKind, BlockPayload};
    use proptest::prelude::*;

    fn store_with(n: usize) -> (ItemStore<BlockPayload>, Vec<ItemId>) {
        let mut store = ItemStore::new(OwnerId::new("task-1"));
        let ids = (0..n).map(|_| store.add(BlockKind::Text)).collect();
        store.mark_clean();
        (store, ids)
    }

    fn positions(store: &ItemStore<BlockPayload>) -> Vec<u32> {
        store.items().iter().map(|i| i.position).collect()
    }

    #[test]
    fn test_add_appends_at_count() {
        let (mut store, _) = store_with(2);
        let id = store.add(BlockKind::Checklist);
        assert!(id.is_local());
        assert!(store.is_dirty());
        assert_eq!(store.get(&id).unwrap().position, 2);
        assert_eq!(store.get(&id).unwrap().kind(), BlockKind::Checklist);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let (mut store, _) = store_with(1);
        let changed = store
            .update(&ItemId::remote("nope").unwrap(), |p| *p = BlockPayload::empty(BlockKind::Code))
            .unwrap();
        assert!(!changed);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_invalid_update_is_not_applied() {
        let (mut store, ids) = store_with(1);
        let result = store.update(&ids[0], |p| {
            *p = BlockPayload::Heading {
                text: "x".into(),
                level: 9,
            }
        });
        assert!(result.is_err());
        assert_eq!(store.get(&ids[0]).unwrap().kind(), BlockKind::Text);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_remove_renumbers() {
        let (mut store, ids) = store_with(4);
        assert!(store.remove(&ids[1]));
        assert_eq!(positions(&store), vec![0, 1, 2]);
        assert!(store.is_dirty());
        assert!(!store.remove(&ids[1]));
    }

    #[test]
    fn test_reorder_stability() {
        let (mut store, ids) = store_with(5);
        assert!(store.reorder(&ids[2], 0));
        let expected: Vec<ItemId> = [2, 0, 1, 3, 4].iter().map(|&i| ids[i].clone()).collect();
        assert_eq!(store.ids(), expected);
        assert_eq!(positions(&store), vec![0, 1, 2, 3, 4]);

        assert!(store.reorder(&ids[2], 2));
        assert_eq!(store.ids(), ids);
    }

    #[test]
    fn test_reorder_same_index_is_noop() {
        let (mut store, ids) = store_with(3);
        assert!(!store.reorder(&ids[1], 1));
        assert!(!store.is_dirty());
        // Clamped past the end
        assert!(store.reorder(&ids[0], 99));
        assert_eq!(store.ids().last(), Some(&ids[0]));
    }

    #[test]
    fn test_replace_all_normalizes_positions() {
        let (mut store, _) = store_with(0);
        let owner = OwnerId::new("task-1");
        let item = |id: &str, pos: u32| {
            let payload = BlockPayload::empty(BlockKind::Text);
            Item::with_payload(ItemId::remote(id).unwrap(), owner.clone(), payload, pos)
        };
        let mut foreign = item("x", 1);
        foreign.owner_id = OwnerId::new("task-2");

        let fixed = store.replace_all(vec![item("b", 4), item("a", 1), foreign]);
        assert!(fixed);
        assert!(store.is_dirty());
        assert_eq!(store.len(), 2);
        assert_eq!(store.items()[0].id, ItemId::remote("a").unwrap());
        assert_eq!(positions(&store), vec![0, 1]);

        let fixed = store.replace_all(vec![item("a", 0), item("b", 1)]);
        assert!(!fixed);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_restore_order() {
        let (mut store, ids) = store_with(3);
        store.reorder(&ids[0], 2);
        store.mark_clean();
        assert!(store.restore_order(&ids));
        assert_eq!(store.ids(), ids);
        assert!(!store.restore_order(&ids));
    }

    #[test]
    fn test_adopt_swaps_id() {
        let (mut store, ids) = store_with(1);
        let mut remote = store.get(&ids[0]).unwrap().clone();
        remote.id = ItemId::remote("p9").unwrap();
        remote.created_at = Some(chrono::Utc::now());
        assert!(store.adopt(&ids[0], &remote));
        assert!(store.get(&ids[0]).is_none());
        assert!(store.get(&remote.id).unwrap().created_at.is_some());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Remove(usize),
        Reorder(usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            any::<usize>().prop_map(Op::Remove),
            (any::<usize>(), 0usize..12).prop_map(|(a, b)| Op::Reorder(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_positions_stay_dense(ops in proptest::collection::vec(op(), 0..40)) {
            let (mut store, _) = store_with(3);
            for op in ops {
                match op {
                    Op::Add => { store.add(BlockKind::Text); }
                    Op::Remove(pick) => {
                        if !store.is_empty() {
                            let id = store.items()[pick % store.len()].id.clone();
                            store.remove(&id);
                        }
                    }
                    Op::Reorder(pick, to) => {
                        if !store.is_empty() {
                            let id = store.items()[pick % store.len()].id.clone();
                            store.reorder(&id, to);
                        }
                    }
                }
                let expected: Vec<u32> = (0..store.len() as u32).collect();
                prop_assert_eq!(positions(&store), expected);
            }
        }
    }
}
