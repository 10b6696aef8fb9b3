//! # ssb-store
//!
//! Storage layer for the Secure-Scuttlebutt core: the receive-log, the
//! named multi-logs built on top of it, pump cursors, and the graph
//! builder's edge store, all backed by a single SQLite database at
//! `<data_dir>/ssb.db`.
//!
//! ## Schema
//!
//! One connection, four tables (`receive_log`, `multilog_entries`,
//! `cursors`, `graph_edges`); WAL mode, foreign keys, and a busy timeout
//! are set on every connection. Schema version is tracked in
//! `PRAGMA user_version`.

pub mod cancel;
pub mod cursor;
pub mod edges;
pub mod migrations;
pub mod multilog;
pub mod receive_log;
mod schema;

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};

use rusqlite::Connection;

pub use cancel::CancelToken;
pub use cursor::CursorStore;
pub use edges::{EdgeRow, EdgeStore};
pub use multilog::{MultiLog, SubLog};
pub use receive_log::{QuerySpec, ReceiveLog};

/// Storage errors (spec §6 names `NotFound`/`Nulled`/`ShuttingDown` at the
/// orchestrator boundary; the rest are this crate's own I/O concerns).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("nulled: rx_seq {0}")]
    Nulled(i64),

    #[error("corrupt: {0}")]
    Corrupt(String),

    #[error("shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub(crate) type Gate = Arc<(Mutex<()>, Condvar)>;

/// A single SQLite-backed store shared by the receive-log, every named
/// multi-log, cursors, and the graph edge store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    gate: Gate,
}

impl Store {
    /// Open or create the store at `path`, configuring pragmas and running
    /// migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            gate: Arc::new((Mutex::new(()), Condvar::new())),
        })
    }

    pub fn receive_log(&self) -> ReceiveLog {
        ReceiveLog {
            conn: self.conn.clone(),
            gate: self.gate.clone(),
        }
    }

    pub fn multi_log(&self, name: &str) -> MultiLog {
        MultiLog {
            conn: self.conn.clone(),
            name: name.to_string(),
        }
    }

    pub fn cursor_store(&self) -> CursorStore {
        CursorStore {
            conn: self.conn.clone(),
        }
    }

    pub fn edge_store(&self) -> EdgeStore {
        EdgeStore {
            conn: self.conn.clone(),
        }
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_runs_migrations() {
        let store = Store::open_memory().expect("open");
        let conn = store.conn.lock().unwrap();
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, migrations::SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let store = Store::open_memory().expect("open");
        let conn = store.conn.lock().unwrap();
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }
}
