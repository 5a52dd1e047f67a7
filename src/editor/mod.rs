//! Editor
//!
//! One `Editor` per owner and page: the ordered store, the last-synced
//! baseline, drag state and the single in-flight save, behind a cloneable
//! handle. Mutations are synchronous; only remote work suspends.

pub mod diff;
pub mod guard;
pub mod reorder;
pub mod store;
pub mod sync;


use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::EditorConfig;
use crate::domain::{BlockPayload, Item, ItemId, OwnerId, Payload, ValidationError, WidgetPayload};
use crate::repository::RemoteStore;

pub use diff::{diff, Diff, PendingUpdate};
pub use guard::{DirtyFlag, GuardState, LeaveDecision, UnsavedChangesGuard, LEAVE_PROMPT};
pub use reorder::{DragSummary, PersistPolicy, ReorderController};
pub use store::ItemStore;
pub use sync::{FailedOp, OpKind, Snapshot, SyncError, SyncReport};

/// A save shared by every caller that asks while it runs
pub type SaveFuture = Shared<BoxFuture<'static, Result<SyncReport, SyncError>>>;

struct EditorState<P> {
    store: ItemStore<P>,
    snapshot: Snapshot<P>,
    drag: ReorderController,
    in_flight: Option<SaveFuture>,
}

impl<P: Payload> EditorState<P> {
    /// Clear dirty when nothing is left to send
    fn clean_if_synced(&mut self) {
        if diff(self.store.items(), self.snapshot.items()).is_empty() {
            self.store.mark_clean();
        }
    }

    fn load(&mut self, mut items: Vec<Item<P>>) {
        let owner = self.store.owner().clone();
        items.retain(|item| item.owner_id == owner);
        self.snapshot.replace(items.clone());
        if self.store.replace_all(items) {
            info!("[{}] loaded positions had gaps; compacted locally", owner);
        }
    }
}

/// Editing handle for the ordered items of one owner
pub struct Editor<P: Payload> {
    inner: Arc<Mutex<EditorState<P>>>,
    remote: Arc<dyn RemoteStore<P>>,
    config: EditorConfig,
}

impl<P: Payload> Clone for Editor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            remote: Arc::clone(&self.remote),
            config: self.config.clone(),
        }
    }
}

impl Editor<BlockPayload> {
    /// Block canvas of a task
    pub fn task_canvas(
        task_id: impl Into<OwnerId>,
        remote: Arc<dyn RemoteStore<BlockPayload>>,
    ) -> Self {
        Self::new(task_id.into(), remote, EditorConfig::block_canvas())
    }
}

impl Editor<WidgetPayload> {
    /// Widget grid of a shared dashboard
    pub fn dashboard_grid(
        dashboard_id: impl Into<OwnerId>,
        remote: Arc<dyn RemoteStore<WidgetPayload>>,
    ) -> Self {
        Self::new(dashboard_id.into(), remote, EditorConfig::widget_grid())
    }

    /// Personal widget grid of a team member
    pub fn member_grid(
        member_id: impl Into<OwnerId>,
        remote: Arc<dyn RemoteStore<WidgetPayload>>,
    ) -> Self {
        Self::new(member_id.into(), remote, EditorConfig::widget_grid())
    }
}

impl<P: Payload> Editor<P> {
    pub fn new(owner: OwnerId, remote: Arc<dyn RemoteStore<P>>, config: EditorConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EditorState {
                store: ItemStore::new(owner),
                snapshot: Snapshot::default(),
                drag: ReorderController::new(),
                in_flight: None,
            })),
            remote,
            config,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.inner.lock().store.owner().clone()
    }

    pub fn policy(&self) -> PersistPolicy {
        self.config.persistence
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current items in position order
    pub fn items(&self) -> Vec<Item<P>> {
        self.inner.lock().store.items().to_vec()
    }

    /// Last state known to be persisted
    pub fn baseline(&self) -> Vec<Item<P>> {
        self.inner.lock().snapshot.items().to_vec()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().store.is_dirty()
    }

    /// Operations the next save would send
    pub fn pending(&self) -> Diff<P> {
        let state = self.inner.lock();
        diff(state.store.items(), state.snapshot.items())
    }

    pub fn guard(&self) -> UnsavedChangesGuard<Editor<P>> {
        UnsavedChangesGuard::new(self.clone())
    }

    // ========================
    // Local edits
    // ========================

    pub fn add(&self, kind: P::Kind) -> ItemId {
        self.inner.lock().store.add(kind)
    }

    pub fn add_with(&self, payload: P) -> Result<ItemId, ValidationError> {
        self.inner.lock().store.add_with(payload)
    }

    pub fn update<F>(&self, id: &ItemId, edit: F) -> Result<bool, ValidationError>
    where
        F: FnOnce(&mut P),
    {
        self.inner.lock().store.update(id, edit)
    }

    pub fn remove(&self, id: &ItemId) -> bool {
        self.inner.lock().store.remove(id)
    }

    /// Apply the persistence policy to edits made so far.
    ///
    /// Immediate surfaces save right away; deferred ones wait for [`Editor::save`].
    pub async fn commit(&self) -> Result<SyncReport, SyncError> {
        match self.config.persistence {
            PersistPolicy::Deferred => Ok(SyncReport::default()),
            PersistPolicy::Immediate => self.save().await,
        }
    }

    /// [`Editor::add`] followed by [`Editor::commit`]
    pub async fn add_committed(&self, kind: P::Kind) -> Result<ItemId, SyncError> {
        let id = self.add(kind);
        self.commit().await?;
        // A successful save swaps the local id for the issued one
        let id = self.inner.lock().store.items().last().map(|item| item.id.clone()).unwrap_or(id);
        Ok(id)
    }

    /// [`Editor::update`] followed by [`Editor::commit`] when something changed
    pub async fn update_committed<F>(&self, id: &ItemId, edit: F) -> Result<bool, SyncError>
    where
        F: FnOnce(&mut P),
    {
        let changed = self.update(id, edit)?;
        if changed {
            self.commit().await?;
        }
        Ok(changed)
    }

    /// [`Editor::remove`] followed by [`Editor::commit`] when something was removed
    pub async fn remove_committed(&self, id: &ItemId) -> Result<bool, SyncError> {
        let removed = self.remove(id);
        if removed {
            self.commit().await?;
        }
        Ok(removed)
    }

    /// Move `id` to `new_index` locally. Never persists by itself, whatever the
    /// policy; see [`Editor::persist_order`].
    pub fn reorder(&self, id: &ItemId, new_index: usize) -> bool {
        self.inner.lock().store.reorder(id, new_index)
    }

    // ========================
    // Drag & discrete moves
    // ========================

    pub fn drag_start(&self, id: &ItemId) -> bool {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.drag.drag_start(&state.store, id)
    }

    pub fn drag_over(&self, target: &ItemId) -> bool {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.drag.drag_over(&mut state.store, target)
    }

    pub fn drag_cancel(&self) -> bool {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let restored = state.drag.drag_cancel(&mut state.store);
        if restored {
            state.clean_if_synced();
        }
        restored
    }

    pub fn dragging(&self) -> Option<ItemId> {
        self.inner.lock().drag.dragging().cloned()
    }

    /// Finish the drag; under the immediate policy a changed order is persisted
    pub async fn drag_end(&self) -> Result<Option<DragSummary>, SyncError> {
        let summary = self.inner.lock().drag.drag_end();
        if let Some(DragSummary { moved: true, .. }) = &summary {
            self.after_move().await?;
        }
        Ok(summary)
    }

    pub async fn move_up(&self, id: &ItemId) -> Result<bool, SyncError> {
        let moved = ReorderController::move_up(&mut self.inner.lock().store, id);
        if moved {
            self.after_move().await?;
        }
        Ok(moved)
    }

    pub async fn move_down(&self, id: &ItemId) -> Result<bool, SyncError> {
        let moved = ReorderController::move_down(&mut self.inner.lock().store, id);
        if moved {
            self.after_move().await?;
        }
        Ok(moved)
    }

    async fn after_move(&self) -> Result<(), SyncError> {
        match self.config.persistence {
            PersistPolicy::Deferred => Ok(()),
            PersistPolicy::Immediate => self.persist_order().await,
        }
    }

    /// Send the current order to the remote store.
    ///
    /// When anything besides positions is pending (new or removed items,
    /// payload edits) the editor saves in full instead. On failure the view
    /// is reverted to the remote (or last saved) order.
    pub async fn persist_order(&self) -> Result<(), SyncError> {
        let order_only = self.pending().is_order_only();
        if !order_only {
            debug!("unsaved edits present; saving in full instead of reordering");
            return self.save().await.map(|_| ());
        }

        let (owner, current, baseline_positions) = {
            let state = self.inner.lock();
            let positions: HashMap<ItemId, u32> = state
                .snapshot
                .items()
                .iter()
                .map(|item| (item.id.clone(), item.position))
                .collect();
            (state.store.owner().clone(), state.store.items().to_vec(), positions)
        };

        let ordered: Vec<ItemId> = current.iter().map(|item| item.id.clone()).collect();
        let pushed =
            reorder::push_order(self.remote.as_ref(), &owner, &current, &baseline_positions).await;
        match pushed {
            Ok(()) => {
                let mut state = self.inner.lock();
                state.snapshot.apply_order(&ordered);
                state.clean_if_synced();
                info!("[{}] order saved ({} items)", owner, ordered.len());
                Ok(())
            }
            Err(source) => {
                warn!("[{}] saving order failed: {}", owner, source);
                let reverted = self.config.revert_on_reorder_failure && self.revert(&owner).await;
                Err(SyncError::Reorder { source, reverted })
            }
        }
    }

    /// Refetch and force-load; falls back to the baseline order if the refetch fails
    async fn revert(&self, owner: &OwnerId) -> bool {
        match self.remote.list(owner).await {
            Ok(items) => {
                self.force_load(items);
                info!("[{}] reverted to remote order", owner);
            }
            Err(error) => {
                warn!("[{}] refetch failed ({}); restoring last saved order", owner, error);
                let mut state = self.inner.lock();
                let order = state.snapshot.order();
                state.store.restore_order(&order);
                state.clean_if_synced();
            }
        }
        true
    }

    // ========================
    // Sync
    // ========================

    /// Persist every pending change.
    ///
    /// While a save runs, further calls return the same shared future.
    pub fn save(&self) -> SaveFuture {
        let mut state = self.inner.lock();
        if let Some(running) = &state.in_flight {
            debug!("[{}] save already in flight; joining it", state.store.owner());
            return running.clone();
        }
        let future = run_save(
            Arc::clone(&self.inner),
            Arc::clone(&self.remote),
            self.config.max_concurrent_ops,
        )
        .boxed()
        .shared();
        state.in_flight = Some(future.clone());
        future
    }

    /// Replace local state with `items` unless they equal the current baseline.
    ///
    /// Returns whether anything was replaced.
    pub fn load(&self, items: Vec<Item<P>>) -> bool {
        let mut state = self.inner.lock();
        if state.snapshot.matches(&items) {
            debug!("[{}] load skipped; baseline unchanged", state.store.owner());
            return false;
        }
        state.load(items);
        true
    }

    /// Replace local state unconditionally
    pub fn force_load(&self, items: Vec<Item<P>>) {
        self.inner.lock().load(items);
    }

    /// Fetch the owner's items and load them
    pub async fn refresh(&self) -> Result<bool, SyncError> {
        let owner = self.owner();
        let items = self.remote.list(&owner).await.map_err(SyncError::Refresh)?;
        Ok(self.load(items))
    }
}

impl<P: Payload> DirtyFlag for Editor<P> {
    fn is_dirty(&self) -> bool {
        Editor::is_dirty(self)
    }
}

async fn run_save<P: Payload>(
    inner: Arc<Mutex<EditorState<P>>>,
    remote: Arc<dyn RemoteStore<P>>,
    max_concurrent: usize,
) -> Result<SyncReport, SyncError> {
    let (owner, revision, plan) = {
        let mut state = inner.lock();
        let plan = diff(state.store.items(), state.snapshot.items());
        if plan.is_empty() {
            state.in_flight = None;
            state.store.mark_clean();
            return Ok(SyncReport::default());
        }
        (state.store.owner().clone(), state.store.revision(), plan)
    };

    debug!(
        "[{}] saving: {} create, {} update, {} delete",
        owner,
        plan.to_insert.len(),
        plan.to_update.len(),
        plan.to_delete.len()
    );
    let outcome = sync::execute(remote.as_ref(), &owner, plan, max_concurrent).await;

    let mut guard = inner.lock();
    let state = &mut *guard;
    state.in_flight = None;
    sync::reconcile(&mut state.store, &mut state.snapshot, revision, outcome)
}
