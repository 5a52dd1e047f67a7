//! Item Positioning Operations
//!
//! Operations for managing item positions within an owner.

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::{ItemId, OwnerId, Payload, RemoteError, RemoteResult};

use super::item_repo::{internal, now_millis, row_id, SqliteRemote};

/// Trait for item positioning operations
#[async_trait]
pub trait ItemPositioningOperations {
    /// Next free position for an owner
    async fn next_position(&self, owner: &OwnerId) -> RemoteResult<u32>;

    /// Reindex items of an owner to be sequential (0, 1, 2, ...)
    async fn reindex(&self, owner: &OwnerId) -> RemoteResult<()>;
}

#[async_trait]
impl<P: Payload> ItemPositioningOperations for SqliteRemote<P> {
    async fn next_position(&self, owner: &OwnerId) -> RemoteResult<u32> {
        let conn = self.conn.lock().await;
        let next: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(position), -1) + 1 FROM board_items WHERE owner_id = ?",
                params![owner.as_str()],
                |row| row.get(0),
            )
            .map_err(internal)?;
        Ok(u32::try_from(next).unwrap_or(0))
    }

    async fn reindex(&self, owner: &OwnerId) -> RemoteResult<()> {
        let mut conn = self.conn.lock().await;

        // Get all items of this owner ordered by current position
        let ids: Vec<i64> = {
            let mut stmt = conn
                .prepare("SELECT id FROM board_items WHERE owner_id = ? ORDER BY position, id")
                .map_err(internal)?;
            let rows = stmt
                .query_map(params![owner.as_str()], |row| row.get(0))
                .map_err(internal)?;
            rows.collect::<Result<_, _>>().map_err(internal)?
        };

        // Update each item with sequential position
        let tx = conn.transaction().map_err(internal)?;
        let now = now_millis();
        for (new_pos, id) in ids.iter().enumerate() {
            tx.execute(
                "UPDATE board_items SET position = ?, updated_at = ? WHERE id = ?",
                params![new_pos as i64, now, id],
            )
            .map_err(internal)?;
        }
        tx.commit().map_err(internal)
    }
}

/// Rewrite the positions of `ordered` to their index, in one transaction.
///
/// Every id must belong to `owner`; otherwise nothing is written.
pub(super) fn write_order(
    conn: &mut Connection,
    owner: &OwnerId,
    ordered: &[ItemId],
) -> RemoteResult<()> {
    let tx = conn.transaction().map_err(internal)?;
    let now = now_millis();

    for (index, id) in ordered.iter().enumerate() {
        let rid = row_id(id)?;
        let affected = tx
            .execute(
                "UPDATE board_items SET position = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
                params![index as i64, now, rid, owner.as_str()],
            )
            .map_err(internal)?;
        if affected == 0 {
            // Dropping the transaction rolls it back
            return Err(RemoteError::Conflict(format!(
                "Item {} does not belong to {}",
                id, owner
            )));
        }
    }

    tx.commit().map_err(internal)
}
