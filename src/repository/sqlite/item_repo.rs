//! Item Repository (SQLite)
//!
//! Core CRUD operations over `board_items`. Payloads are stored as JSON,
//! the kind as plain text for querying.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::domain::{Item, ItemId, ItemKind, ItemPatch, OwnerId, Payload, RemoteError, RemoteResult};
use crate::repository::traits::RemoteStore;

use super::db::init_db;

pub(super) const SELECT_COLUMNS: &str =
    "SELECT id, owner_id, kind, payload, position, created_at, updated_at FROM board_items";

/// SQLite-backed store for one payload family
pub struct SqliteRemote<P> {
    pub(super) conn: Arc<Mutex<Connection>>,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Payload> SqliteRemote<P> {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            _payload: PhantomData,
        }
    }

    /// Open the database at `db_path` and run migrations
    pub fn open(db_path: &Path) -> RemoteResult<Self> {
        let conn = init_db(db_path)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }
}

pub(super) fn internal(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Internal(e.to_string())
}

pub(super) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Row id behind a remote item id
pub(super) fn row_id(id: &ItemId) -> RemoteResult<i64> {
    id.as_remote()
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| RemoteError::NotFound(format!("Item {} not found", id)))
}

/// Raw column values of one row
pub(super) struct RawRow {
    id: i64,
    owner_id: String,
    kind: String,
    payload: String,
    position: i64,
    created_at: Option<i64>,
    updated_at: Option<i64>,
}

pub(super) fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row.get(2)?,
        payload: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn timestamp(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

/// Convert a raw row into a domain item
pub(super) fn row_to_item<P: Payload>(raw: RawRow) -> RemoteResult<Item<P>> {
    let kind = P::Kind::parse(&raw.kind).ok_or_else(|| {
        RemoteError::InvalidResponse(format!("row {}: unknown kind {:?}", raw.id, raw.kind))
    })?;
    let payload: P = serde_json::from_str(&raw.payload)
        .map_err(|e| RemoteError::InvalidResponse(format!("row {}: {}", raw.id, e)))?;
    if payload.kind() != kind {
        return Err(RemoteError::InvalidResponse(format!(
            "row {}: kind column says {} but payload is {}",
            raw.id,
            kind.as_str(),
            payload.kind().as_str()
        )));
    }
    Ok(Item {
        id: ItemId::Remote(raw.id.to_string()),
        owner_id: OwnerId::new(raw.owner_id),
        position: u32::try_from(raw.position).unwrap_or(0),
        payload,
        created_at: timestamp(raw.created_at),
        updated_at: timestamp(raw.updated_at),
    })
}

pub(super) fn find_row<P: Payload>(conn: &Connection, id: i64) -> RemoteResult<Option<Item<P>>> {
    let raw = conn
        .query_row(&format!("{} WHERE id = ?", SELECT_COLUMNS), params![id], read_row)
        .optional()
        .map_err(internal)?;
    raw.map(row_to_item).transpose()
}

#[async_trait]
impl<P: Payload> RemoteStore<P> for SqliteRemote<P> {
    async fn list(&self, owner: &OwnerId) -> RemoteResult<Vec<Item<P>>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE owner_id = ? ORDER BY position, id",
                SELECT_COLUMNS
            ))
            .map_err(internal)?;
        let rows = stmt
            .query_map(params![owner.as_str()], read_row)
            .map_err(internal)?;

        let mut items = Vec::new();
        for raw in rows {
            items.push(row_to_item(raw.map_err(internal)?)?);
        }
        Ok(items)
    }

    async fn create(&self, owner: &OwnerId, payload: &P, position: u32) -> RemoteResult<Item<P>> {
        let conn = self.conn.lock().await;
        let json = serde_json::to_string(payload).map_err(internal)?;
        let now = now_millis();

        conn.execute(
            "INSERT INTO board_items (owner_id, kind, payload, position, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![owner.as_str(), payload.kind().as_str(), json, position as i64, now, now],
        )
        .map_err(internal)?;

        let id = conn.last_insert_rowid();
        find_row(&conn, id)?.ok_or_else(|| RemoteError::Internal(format!("Item {} vanished", id)))
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch<P>) -> RemoteResult<Item<P>> {
        let conn = self.conn.lock().await;
        let rid = row_id(id)?;

        // First get existing item
        let mut item: Item<P> = find_row(&conn, rid)?
            .ok_or_else(|| RemoteError::NotFound(format!("Item {} not found", id)))?;
        patch.apply(&mut item);

        let json = serde_json::to_string(&item.payload).map_err(internal)?;
        let now = now_millis();
        conn.execute(
            "UPDATE board_items SET kind = ?, payload = ?, position = ?, updated_at = ?
             WHERE id = ?",
            params![item.kind().as_str(), json, item.position as i64, now, rid],
        )
        .map_err(internal)?;

        item.updated_at = timestamp(Some(now));
        Ok(item)
    }

    async fn delete(&self, id: &ItemId) -> RemoteResult<()> {
        let conn = self.conn.lock().await;
        let rid = row_id(id)?;
        let affected = conn
            .execute("DELETE FROM board_items WHERE id = ?", params![rid])
            .map_err(internal)?;
        if affected == 0 {
            return Err(RemoteError::NotFound(format!("Item {} not found", id)));
        }
        Ok(())
    }

    async fn reorder(&self, owner: &OwnerId, ordered: &[ItemId]) -> RemoteResult<()> {
        let mut conn = self.conn.lock().await;
        super::item_positioning::write_order(&mut conn, owner, ordered)
    }
}
