//! Sync Executor
//!
//! Turns a diff into remote calls, runs them concurrently, waits for the
//! whole batch and folds the results back into the store and baseline.

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;

use crate::domain::{Item, ItemId, OwnerId, Payload, RemoteError, ValidationError};
use crate::repository::{ensure_remote, RemoteStore};

use super::diff::Diff;
use super::store::ItemStore;

/// Kind of remote write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

/// A remote write that did not go through
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{op:?} {id} failed: {error}")]
pub struct FailedOp {
    pub op: OpKind,
    pub id: ItemId,
    pub error: RemoteError,
}

/// Counts of writes performed by a successful save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Why a save or order persist did not fully succeed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// Some operations of the batch failed; succeeded ones are not rolled back
    #[error("{} of {} remote operations failed", .failures.len(), .attempted)]
    Partial {
        attempted: usize,
        failures: Vec<FailedOp>,
    },
    /// The new order could not be persisted
    #[error("saving the new order failed: {source} (reverted: {reverted})")]
    Reorder { source: RemoteError, reverted: bool },
    #[error("refresh failed: {0}")]
    Refresh(RemoteError),
    /// A committed edit was rejected locally; nothing was sent
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl SyncError {
    pub fn failures(&self) -> &[FailedOp] {
        match self {
            SyncError::Partial { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Number of failed operations of one kind
    pub fn failed(&self, op: OpKind) -> usize {
        self.failures().iter().filter(|f| f.op == op).count()
    }
}

/// Last collection of items known to be persisted; the diff baseline
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    items: Vec<Item<P>>,
}

impl<P: Payload> Default for Snapshot<P> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<P: Payload> Snapshot<P> {
    pub fn items(&self) -> &[Item<P>] {
        &self.items
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item<P>> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Ids ordered by remote position
    pub fn order(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Whether `items` hold the same ids, order and content as the baseline.
    ///
    /// Timestamps are ignored; the backend bumps them on every write.
    pub fn matches(&self, items: &[Item<P>]) -> bool {
        let mut incoming: Vec<&Item<P>> = items.iter().collect();
        incoming.sort_by_key(|item| item.position);
        incoming.len() == self.items.len()
            && incoming
                .iter()
                .zip(&self.items)
                .all(|(theirs, ours)| theirs.id == ours.id && theirs.same_content(ours))
    }

    pub(crate) fn replace(&mut self, mut items: Vec<Item<P>>) {
        items.sort_by_key(|item| item.position);
        self.items = items;
    }

    /// Set baseline positions to each id's index in `ordered`
    pub(crate) fn apply_order(&mut self, ordered: &[ItemId]) {
        for item in &mut self.items {
            if let Some(index) = ordered.iter().position(|id| id == &item.id) {
                item.position = index as u32;
            }
        }
        self.items.sort_by_key(|item| item.position);
    }

    fn record(&mut self, item: &Item<P>) {
        match self.items.iter_mut().find(|row| row.id == item.id) {
            Some(row) => *row = item.clone(),
            None => self.items.push(item.clone()),
        }
    }

    fn forget(&mut self, id: &ItemId) {
        self.items.retain(|row| &row.id != id);
    }

    fn settle(&mut self) {
        self.items.sort_by_key(|item| item.position);
    }
}

enum OpResult<P> {
    Created { local: ItemId, item: Item<P> },
    Updated(Item<P>),
    Deleted(ItemId),
    Failed(FailedOp),
}

/// Results of one fanned-out batch
pub(crate) struct BatchOutcome<P> {
    pub attempted: usize,
    created: Vec<(ItemId, Item<P>)>,
    updated: Vec<Item<P>>,
    deleted: Vec<ItemId>,
    failures: Vec<FailedOp>,
}

impl<P> BatchOutcome<P> {
    fn report(&self) -> SyncReport {
        SyncReport {
            created: self.created.len(),
            updated: self.updated.len(),
            deleted: self.deleted.len(),
        }
    }
}

/// Issue every operation of `diff` concurrently and wait for all of them.
///
/// At most `max_concurrent` calls are outstanding at once; `0` means no cap.
pub(crate) async fn execute<P: Payload>(
    remote: &dyn RemoteStore<P>,
    owner: &OwnerId,
    diff: Diff<P>,
    max_concurrent: usize,
) -> BatchOutcome<P> {
    let attempted = diff.len();
    let mut ops: Vec<BoxFuture<'_, OpResult<P>>> = Vec::with_capacity(attempted);

    for item in diff.to_insert {
        ops.push(
            async move {
                let result = remote
                    .create(owner, &item.payload, item.position)
                    .await
                    .and_then(ensure_remote);
                match result {
                    Ok(created) => OpResult::Created {
                        local: item.id,
                        item: created,
                    },
                    Err(error) => OpResult::Failed(FailedOp {
                        op: OpKind::Create,
                        id: item.id,
                        error,
                    }),
                }
            }
            .boxed(),
        );
    }

    for pending in diff.to_update {
        ops.push(
            async move {
                match remote.update(&pending.item.id, &pending.patch).await {
                    Ok(updated) => OpResult::Updated(updated),
                    Err(error) => OpResult::Failed(FailedOp {
                        op: OpKind::Update,
                        id: pending.item.id,
                        error,
                    }),
                }
            }
            .boxed(),
        );
    }

    for id in diff.to_delete {
        ops.push(
            async move {
                match remote.delete(&id).await {
                    Ok(()) => OpResult::Deleted(id),
                    // Already gone remotely: the goal of the delete holds
                    Err(RemoteError::NotFound(_)) => {
                        debug!("[{}] delete of {} found nothing", owner, id);
                        OpResult::Deleted(id)
                    }
                    Err(error) => OpResult::Failed(FailedOp {
                        op: OpKind::Delete,
                        id,
                        error,
                    }),
                }
            }
            .boxed(),
        );
    }

    let limit = if max_concurrent == 0 {
        attempted.max(1)
    } else {
        max_concurrent
    };
    let results: Vec<OpResult<P>> = futures::stream::iter(ops)
        .buffer_unordered(limit)
        .collect()
        .await;

    let mut outcome = BatchOutcome {
        attempted,
        created: Vec::new(),
        updated: Vec::new(),
        deleted: Vec::new(),
        failures: Vec::new(),
    };
    for result in results {
        match result {
            OpResult::Created { local, item } => outcome.created.push((local, item)),
            OpResult::Updated(item) => outcome.updated.push(item),
            OpResult::Deleted(id) => outcome.deleted.push(id),
            OpResult::Failed(failed) => outcome.failures.push(failed),
        }
    }
    outcome
}

/// Fold a batch outcome into the store and the baseline.
///
/// Succeeded operations are always recorded in the baseline, so a retry
/// covers only what failed. The store is cleaned and replaced by the
/// authoritative state only when the whole batch succeeded and no edit
/// happened while it was in flight (`revision` unchanged).
pub(crate) fn reconcile<P: Payload>(
    store: &mut ItemStore<P>,
    snapshot: &mut Snapshot<P>,
    revision: u64,
    outcome: BatchOutcome<P>,
) -> Result<SyncReport, SyncError> {
    let report = outcome.report();
    let owner = store.owner().clone();

    for (local, item) in &outcome.created {
        store.adopt(local, item);
        snapshot.record(item);
    }
    for item in &outcome.updated {
        store.absorb_timestamps(item);
        snapshot.record(item);
    }
    for id in &outcome.deleted {
        snapshot.forget(id);
    }
    snapshot.settle();

    if !outcome.failures.is_empty() {
        warn!(
            "[{}] save partially failed: {} of {} operations ({} create, {} update, {} delete)",
            owner,
            outcome.failures.len(),
            outcome.attempted,
            outcome.failures.iter().filter(|f| f.op == OpKind::Create).count(),
            outcome.failures.iter().filter(|f| f.op == OpKind::Update).count(),
            outcome.failures.iter().filter(|f| f.op == OpKind::Delete).count(),
        );
        for failed in &outcome.failures {
            debug!("[{}] {}", owner, failed);
        }
        return Err(SyncError::Partial {
            attempted: outcome.attempted,
            failures: outcome.failures,
        });
    }

    if store.revision() == revision {
        // Stays dirty only if the remote positions still need compacting
        store.replace_all(snapshot.items().to_vec());
    } else {
        debug!("[{}] edits arrived during save; staying dirty", owner);
    }

    info!(
        "[{}] saved: {} created, {} updated, {} deleted",
        owner, report.created, report.updated, report.deleted
    );
    Ok(report)
}
