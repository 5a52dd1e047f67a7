//! Reorder Controller
//!
//! Continuous drag and discrete up/down moves over the store's `reorder`
//! primitive. Both produce the same resulting order for the same move.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::{Item, ItemId, ItemPatch, OwnerId, Payload, RemoteError, RemoteResult};
use crate::repository::RemoteStore;

use super::store::ItemStore;

/// When a finished reorder reaches the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistPolicy {
    /// Reorders only mark the store dirty; the next explicit save sends them
    #[default]
    Deferred,
    /// Every completed reorder is persisted right away
    Immediate,
}

#[derive(Debug, Clone)]
struct DragState {
    id: ItemId,
    /// Order when the drag began, for cancel
    origin: Vec<ItemId>,
    moved: bool,
}

/// Result of a finished drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSummary {
    pub id: ItemId,
    pub moved: bool,
}

/// Drag state of one store; at most one drag at a time
#[derive(Debug, Clone, Default)]
pub struct ReorderController {
    drag: Option<DragState>,
}

impl ReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id being dragged, if any
    pub fn dragging(&self) -> Option<&ItemId> {
        self.drag.as_ref().map(|d| &d.id)
    }

    /// Begin dragging `id`. Refused while another drag is active or if `id` is unknown.
    pub fn drag_start<P: Payload>(&mut self, store: &ItemStore<P>, id: &ItemId) -> bool {
        if self.drag.is_some() || store.index_of(id).is_none() {
            return false;
        }
        self.drag = Some(DragState {
            id: id.clone(),
            origin: store.ids(),
            moved: false,
        });
        true
    }

    /// Move the dragged item live to the current index of `target`
    pub fn drag_over<P: Payload>(&mut self, store: &mut ItemStore<P>, target: &ItemId) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        if &drag.id == target {
            return false;
        }
        let Some(index) = store.index_of(target) else {
            return false;
        };
        let moved = store.reorder(&drag.id, index);
        drag.moved |= moved;
        moved
    }

    /// Finish the drag and clear its state
    pub fn drag_end(&mut self) -> Option<DragSummary> {
        self.drag.take().map(|drag| {
            debug!("drag of {} ended (moved: {})", drag.id, drag.moved);
            DragSummary {
                id: drag.id,
                moved: drag.moved,
            }
        })
    }

    /// Abort the drag, putting items back where they were when it started
    pub fn drag_cancel<P: Payload>(&mut self, store: &mut ItemStore<P>) -> bool {
        match self.drag.take() {
            Some(drag) if drag.moved => store.restore_order(&drag.origin),
            _ => false,
        }
    }

    /// Swap `id` with the item above it; no-op for the first item
    pub fn move_up<P: Payload>(store: &mut ItemStore<P>, id: &ItemId) -> bool {
        match store.index_of(id) {
            Some(index) if index > 0 => store.reorder(id, index - 1),
            _ => false,
        }
    }

    /// Swap `id` with the item below it; no-op for the last item
    pub fn move_down<P: Payload>(store: &mut ItemStore<P>, id: &ItemId) -> bool {
        match store.index_of(id) {
            Some(index) if index + 1 < store.len() => store.reorder(id, index + 1),
            _ => false,
        }
    }
}

/// Send the full order of an owner to the remote store.
///
/// Uses the batch `reorder` call; when the backend does not offer one, falls
/// back to per-item position updates for items whose baseline position differs.
pub(crate) async fn push_order<P: Payload>(
    remote: &dyn RemoteStore<P>,
    owner: &OwnerId,
    current: &[Item<P>],
    baseline_positions: &HashMap<ItemId, u32>,
) -> RemoteResult<()> {
    let ordered: Vec<ItemId> = current.iter().map(|item| item.id.clone()).collect();

    match remote.reorder(owner, &ordered).await {
        Err(RemoteError::Unsupported(_)) => {
            debug!("[{}] no batch reorder, updating positions one by one", owner);
            for item in current {
                if baseline_positions.get(&item.id) == Some(&item.position) {
                    continue;
                }
                remote
                    .update(&item.id, &ItemPatch::position(item.position))
                    .await?;
            }
            Ok(())
        }
        other => other,
    }
}
