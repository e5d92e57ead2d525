pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crush_types::models::{ChatMessage, RoomId};

/// Durable, append-only store of chat messages.
///
/// Implementations are synchronous; async callers run them on a blocking
/// thread.
pub trait MessageLog: Send + Sync {
    /// Store a new message. Returns only once the write is durable.
    fn append(&self, message: &ChatMessage) -> Result<()>;

    /// All messages in `room`, oldest first.
    fn history(&self, room: &RoomId) -> Result<Vec<ChatMessage>>;

    /// Add `reader` to the read set of every message in `room`.
    /// Returns how many messages were newly marked.
    fn mark_read(&self, room: &RoomId, reader: &str) -> Result<usize>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}
