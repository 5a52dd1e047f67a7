//! Database Connection and Setup
//!
//! Opens the SQLite file backing the local store and runs migrations.

use std::path::Path;

use rusqlite::Connection;

use crate::domain::RemoteError;

/// Open (or create) the database at `db_path`; `:memory:` gives a private in-memory db
pub fn init_db(db_path: &Path) -> Result<Connection, RemoteError> {
    let conn = if db_path == Path::new(":memory:") {
        Connection::open_in_memory()
    } else {
        Connection::open(db_path)
    }
    .map_err(|e| RemoteError::Internal(format!("Failed to open db: {}", e)))?;

    run_migrations(&conn)?;
    Ok(conn)
}

/// Check if a column exists in a table
#[allow(clippy::let_and_return)]
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(names) = stmt.query_map([], |row| row.get::<_, String>(1)) else {
        return false;
    };
    let found = names.flatten().any(|name| name == column);
    found
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> Result<(), RemoteError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS board_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .map_err(|e| RemoteError::Internal(e.to_string()))?;

    // Timestamps were added after the first schema
    for column in ["created_at", "updated_at"] {
        if !column_exists(conn, "board_items", column) {
            conn.execute(
                &format!("ALTER TABLE board_items ADD COLUMN {} INTEGER", column),
                [],
            )
            .map_err(|e| RemoteError::Internal(format!("Failed to add {}: {}", column, e)))?;
        }
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_board_items_owner ON board_items(owner_id, position)",
        [],
    )
    .map_err(|e| RemoteError::Internal(e.to_string()))?;

    Ok(())
}
