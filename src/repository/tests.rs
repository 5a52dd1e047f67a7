//! Repository Integration Tests
//!
//! Tests for SqliteRemote with in-memory SQLite database.

#[cfg(test)]
mod tests {
    use crate::domain::{BlockKind, BlockPayload, ItemId, ItemPatch, OwnerId, Payload, RemoteError};
    use crate::repository::{init_db, ItemPositioningOperations, RemoteStore, SqliteRemote};
    use std::path::Path;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn setup_test_db() -> SqliteRemote<BlockPayload> {
        // Use in-memory database for tests
        let conn = init_db(Path::new(":memory:")).expect("Failed to init test DB");
        SqliteRemote::new(Arc::new(Mutex::new(conn)))
    }

    fn task() -> OwnerId {
        OwnerId::new("task-7")
    }

    fn text(body: &str) -> BlockPayload {
        BlockPayload::Text { text: body.to_string() }
    }

    #[tokio::test]
    async fn test_create_item() {
        let repo = setup_test_db();

        let created = repo.create(&task(), &text("Brief"), 0).await.expect("Failed to create");

        assert!(!created.id.is_local());
        assert_eq!(created.payload, text("Brief"));
        assert_eq!(created.owner_id, task());
        assert!(created.created_at.is_some());
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_ordered() {
        let repo = setup_test_db();

        repo.create(&task(), &text("second"), 1).await.unwrap();
        repo.create(&task(), &text("first"), 0).await.unwrap();
        repo.create(&OwnerId::new("task-8"), &text("elsewhere"), 0).await.unwrap();

        let items = repo.list(&task()).await.expect("List failed");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].payload, text("first"));
        assert_eq!(items[1].position, 1);
    }

    #[tokio::test]
    async fn test_update_item() {
        let repo = setup_test_db();

        let created = repo.create(&task(), &text("Original"), 0).await.unwrap();
        let patch = ItemPatch {
            payload: Some(BlockPayload::Heading { text: "Updated".into(), level: 1 }),
            position: None,
        };

        let updated = repo.update(&created.id, &patch).await.expect("Update failed");
        assert_eq!(updated.kind(), BlockKind::Heading);
        assert_eq!(updated.position, 0);

        let listed = repo.list(&task()).await.unwrap();
        assert_eq!(listed[0].payload, updated.payload);
    }

    #[tokio::test]
    async fn test_delete_item() {
        let repo = setup_test_db();

        let created = repo.create(&task(), &text("To delete"), 0).await.unwrap();
        repo.delete(&created.id).await.expect("Delete failed");

        assert!(repo.list(&task()).await.unwrap().is_empty());
        let again = repo.delete(&created.id).await;
        assert!(matches!(again, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_local_ids_are_not_found() {
        let repo = setup_test_db();
        let result = repo.delete(&ItemId::new_local()).await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reorder_rewrites_positions() {
        let repo = setup_test_db();

        let a = repo.create(&task(), &text("a"), 0).await.unwrap();
        let b = repo.create(&task(), &text("b"), 1).await.unwrap();
        let c = repo.create(&task(), &text("c"), 2).await.unwrap();

        repo.reorder(&task(), &[c.id.clone(), a.id.clone(), b.id.clone()]).await.unwrap();

        let order: Vec<ItemId> =
            repo.list(&task()).await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(order, vec![c.id, a.id, b.id]);
    }

    #[tokio::test]
    async fn test_reorder_rejects_foreign_items() {
        let repo = setup_test_db();

        let mine = repo.create(&task(), &text("mine"), 0).await.unwrap();
        let other = repo.create(&OwnerId::new("task-8"), &text("theirs"), 0).await.unwrap();

        let result = repo.reorder(&task(), &[other.id, mine.id.clone()]).await;
        assert!(matches!(result, Err(RemoteError::Conflict(_))));

        // Rolled back: nothing moved
        let listed = repo.list(&task()).await.unwrap();
        assert_eq!(listed[0].id, mine.id);
        assert_eq!(listed[0].position, 0);
    }

    #[tokio::test]
    async fn test_reindex_closes_gaps() {
        let repo = setup_test_db();

        repo.create(&task(), &text("a"), 3).await.unwrap();
        repo.create(&task(), &text("b"), 9).await.unwrap();
        assert_eq!(repo.next_position(&task()).await.unwrap(), 10);

        repo.reindex(&task()).await.unwrap();

        let positions: Vec<u32> =
            repo.list(&task()).await.unwrap().iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(repo.next_position(&task()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_payload_round_trips_through_json_column() {
        let repo = setup_test_db();

        let mut checklist = BlockPayload::empty(BlockKind::Checklist);
        checklist.push_entry("Kickoff call");
        let created = repo.create(&task(), &checklist, 0).await.unwrap();

        let listed = repo.list(&task()).await.unwrap();
        assert_eq!(listed[0].payload, checklist);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn test_rows_with_bad_kind_are_rejected() {
        let conn = Arc::new(Mutex::new(init_db(Path::new(":memory:")).unwrap()));
        let repo: SqliteRemote<BlockPayload> = SqliteRemote::new(conn.clone());

        let json = serde_json::to_string(&text("body")).unwrap();
        conn.lock()
            .await
            .execute(
                "INSERT INTO board_items (owner_id, kind, payload, position) VALUES (?, ?, ?, 0)",
                rusqlite::params![task().as_str(), "video", json],
            )
            .unwrap();
        let err = repo.list(&task()).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse(_)));

        conn.lock()
            .await
            .execute("UPDATE board_items SET kind = 'heading'", [])
            .unwrap();
        let err = repo.list(&task()).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_reopening_database_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");

        let repo: SqliteRemote<BlockPayload> = SqliteRemote::open(&path).unwrap();
        repo.create(&task(), &text("kept"), 0).await.unwrap();
        drop(repo);

        // Migrations run again on an existing schema
        let reopened: SqliteRemote<BlockPayload> = SqliteRemote::open(&path).unwrap();
        let items = reopened.list(&task()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].created_at.is_some());
    }
}
