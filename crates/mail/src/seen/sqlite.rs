//! SQLite-backed seen store

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

use super::SeenStore;
use crate::models::MessageId;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE seen_messages (
            id TEXT PRIMARY KEY,
            marked_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )])
}

/// SQLite-backed implementation of [`SeenStore`]
///
/// The database file is created on first use. Each mark is its own
/// committed transaction, so ids recorded before a crash survive it.
/// The connection closes when the store is dropped.
pub struct SqliteSeenStore {
    conn: Mutex<Connection>,
}

impl SqliteSeenStore {
    /// Open (or create) a seen store at the given path
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create seen store directory {:?}", parent)
            })?;
        }

        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open seen store at {:?}", db_path.as_ref()))?;

        // WAL keeps writes sequential and survives crashes mid-commit;
        // NORMAL sync is safe in WAL mode.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run seen store migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SeenStore for SqliteSeenStore {
    fn contains(&self, id: &MessageId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM seen_messages WHERE id = ?",
            [id.as_str()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn mark(&self, id: &MessageId) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR IGNORE INTO seen_messages (id) VALUES (?)",
            [id.as_str()],
        )?;

        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM seen_messages", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM seen_messages", [])?;
        Ok(())
    }
}
