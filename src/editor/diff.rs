//! Diff Engine
//!
//! Partitions the current items against the last-synchronized baseline into
//! the creates, updates and deletes needed to make the remote match.

use std::collections::{HashMap, HashSet};

use crate::domain::{Item, ItemId, ItemPatch, Payload};

/// One pending update: the item as it is now and the fields to send
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate<P> {
    pub item: Item<P>,
    pub patch: ItemPatch<P>,
}

/// Disjoint insert/update/delete sets; order within each set carries no meaning
#[derive(Debug, Clone, PartialEq)]
pub struct Diff<P> {
    pub to_insert: Vec<Item<P>>,
    pub to_update: Vec<PendingUpdate<P>>,
    pub to_delete: Vec<ItemId>,
}

impl<P> Diff<P> {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Only positions of persisted items changed; a reorder call can carry it
    pub fn is_order_only(&self) -> bool {
        self.to_insert.is_empty()
            && self.to_delete.is_empty()
            && self.to_update.iter().all(|update| update.patch.payload.is_none())
    }

    /// Number of remote operations this diff turns into
    pub fn len(&self) -> usize {
        self.to_insert.len() + self.to_update.len() + self.to_delete.len()
    }
}

/// Compare `current` against `baseline` (both scoped to one owner).
///
/// A persisted id present in `current` but missing from `baseline` is
/// re-asserted as a full update. That happens after a partially failed save
/// adopted a created id without refreshing the baseline.
pub fn diff<P: Payload>(current: &[Item<P>], baseline: &[Item<P>]) -> Diff<P> {
    let base: HashMap<&ItemId, &Item<P>> = baseline.iter().map(|item| (&item.id, item)).collect();

    let mut to_insert = Vec::new();
    let mut to_update = Vec::new();
    let mut live: HashSet<&ItemId> = HashSet::with_capacity(current.len());

    for item in current {
        if item.id.is_local() {
            to_insert.push(item.clone());
            continue;
        }
        live.insert(&item.id);
        match base.get(&item.id) {
            Some(before) if item.same_content(before) => {}
            Some(before) => to_update.push(PendingUpdate {
                item: item.clone(),
                patch: ItemPatch::between(item, before),
            }),
            None => to_update.push(PendingUpdate {
                item: item.clone(),
                patch: ItemPatch::full(item),
            }),
        }
    }

    let to_delete = baseline
        .iter()
        .filter(|item| !live.contains(&item.id))
        .map(|item| item.id.clone())
        .collect();

    Diff {
        to_insert,
        to_update,
        to_delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockPayload, OwnerId};
    use proptest::prelude::*;

    fn block(id: ItemId, body: &str, position: u32) -> Item<BlockPayload> {
        let payload = BlockPayload::Text { text: body.into() };
        Item::with_payload(id, OwnerId::new("task-1"), payload, position)
    }

    fn remote(id: &str) -> ItemId {
        ItemId::remote(id).unwrap()
    }

    #[test]
    fn test_empty_baseline_inserts_everything() {
        let current = vec![
            block(ItemId::new_local(), "a", 0),
            block(ItemId::new_local(), "b", 1),
        ];
        let d = diff(&current, &[]);
        assert_eq!(d.to_insert.len(), 2);
        assert!(d.to_update.is_empty());
        assert!(d.to_delete.is_empty());
    }

    #[test]
    fn test_identical_is_empty() {
        let baseline = vec![block(remote("p1"), "a", 0), block(remote("p2"), "b", 1)];
        let d = diff(&baseline.clone(), &baseline);
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn test_update_carries_only_changed_fields() {
        let baseline = vec![block(remote("p1"), "a", 0), block(remote("p2"), "b", 1)];
        let current = vec![block(remote("p2"), "b", 0), block(remote("p1"), "A", 1)];
        let d = diff(&current, &baseline);
        assert_eq!(d.to_update.len(), 2);

        let p2 = d.to_update.iter().find(|u| u.item.id == remote("p2")).unwrap();
        assert_eq!(p2.patch.position, Some(0));
        assert!(p2.patch.payload.is_none());

        let p1 = d.to_update.iter().find(|u| u.item.id == remote("p1")).unwrap();
        assert_eq!(p1.patch.position, Some(1));
        assert!(p1.patch.payload.is_some());
    }

    #[test]
    fn test_order_only_diffs() {
        let baseline = vec![block(remote("p1"), "a", 0), block(remote("p2"), "b", 1)];

        let swapped = vec![block(remote("p2"), "b", 0), block(remote("p1"), "a", 1)];
        assert!(diff(&swapped, &baseline).is_order_only());

        let edited = vec![block(remote("p2"), "b", 0), block(remote("p1"), "A", 1)];
        assert!(!diff(&edited, &baseline).is_order_only());

        let removed = vec![block(remote("p2"), "b", 0)];
        assert!(!diff(&removed, &baseline).is_order_only());

        let mut added = baseline.clone();
        added.push(block(ItemId::new_local(), "c", 2));
        assert!(!diff(&added, &baseline).is_order_only());
    }

    #[test]
    fn test_missing_ids_are_deleted() {
        let baseline = vec![block(remote("p1"), "a", 0), block(remote("p2"), "b", 1)];
        let current = vec![block(remote("p2"), "b", 0)];
        let d = diff(&current, &baseline);
        assert_eq!(d.to_delete, vec![remote("p1")]);
    }

    #[test]
    fn test_orphaned_persisted_item_is_reasserted() {
        let current = vec![block(remote("p7"), "adopted", 0)];
        let d = diff(&current, &[]);
        assert!(d.to_insert.is_empty());
        assert_eq!(d.to_update.len(), 1);
        assert_eq!(d.to_update[0].patch, ItemPatch::full(&current[0]));
    }

    #[test]
    fn test_timestamps_alone_do_not_update() {
        let baseline = vec![block(remote("p1"), "a", 0)];
        let mut current = baseline.clone();
        current[0].updated_at = Some(chrono::Utc::now());
        assert!(diff(&current, &baseline).is_empty());
    }

    /// Build (current, baseline) from a shared pool of persisted ids plus fresh locals
    fn scenario() -> impl Strategy<Value = (Vec<Item<BlockPayload>>, Vec<Item<BlockPayload>>)> {
        (
            proptest::collection::vec((any::<bool>(), any::<bool>(), 0u8..3, 0u8..3), 0..12),
            0usize..4,
        )
            .prop_map(|(pool, locals)| {
                let mut current = Vec::new();
                let mut baseline = Vec::new();
                for (i, (in_current, in_base, now, then)) in pool.into_iter().enumerate() {
                    let id = ItemId::Remote(format!("p{}", i));
                    if in_current {
                        current.push(block(id.clone(), &now.to_string(), current.len() as u32));
                    }
                    if in_base {
                        baseline.push(block(id, &then.to_string(), baseline.len() as u32));
                    }
                }
                for _ in 0..locals {
                    current.push(block(ItemId::new_local(), "new", current.len() as u32));
                }
                (current, baseline)
            })
    }

    proptest! {
        #[test]
        fn prop_partition_is_complete_and_disjoint((current, baseline) in scenario()) {
            let d = diff(&current, &baseline);

            let inserted: HashSet<ItemId> = d.to_insert.iter().map(|i| i.id.clone()).collect();
            let updated: HashSet<ItemId> = d.to_update.iter().map(|u| u.item.id.clone()).collect();
            let deleted: HashSet<ItemId> = d.to_delete.iter().cloned().collect();

            prop_assert!(inserted.is_disjoint(&updated));
            prop_assert!(inserted.is_disjoint(&deleted));
            prop_assert!(updated.is_disjoint(&deleted));

            for item in &current {
                let unchanged = baseline.iter().any(|b| b.id == item.id && b.same_content(item));
                let hits = [inserted.contains(&item.id), updated.contains(&item.id), unchanged]
                    .iter()
                    .filter(|hit| **hit)
                    .count();
                prop_assert_eq!(hits, 1, "{} classified {} times", item.id, hits);
                prop_assert!(!deleted.contains(&item.id));
            }
            for item in &baseline {
                let live = current.iter().any(|c| c.id == item.id);
                prop_assert_eq!(deleted.contains(&item.id), !live);
            }
        }
    }
}
