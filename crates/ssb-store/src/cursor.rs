//! Direct access to persisted pump cursors (spec: "an integer in the
//! receive-log's address space recording the last rxSeq an index has
//! consumed"). Most callers never touch this directly — `MultiLog::index_one`
//! and `EdgeStore::set_edge`/`remove_edge` persist the cursor as part of
//! their own atomic write — but pump start-up needs to recover it.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

#[derive(Clone)]
pub struct CursorStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl CursorStore {
    /// The persisted cursor for `name`, or -1 if none (spec §4.4 step 1).
    pub fn get(&self, name: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let cursor: Option<i64> = conn
            .query_row("SELECT rx_seq FROM cursors WHERE name = ?1", [name], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(cursor.unwrap_or(-1))
    }

    pub fn set(&self, name: &str, rx_seq: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO cursors (name, rx_seq) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET rx_seq = excluded.rx_seq",
            rusqlite::params![name, rx_seq],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn test_missing_cursor_is_minus_one() {
        let store = Store::open_memory().expect("open");
        assert_eq!(store.cursor_store().get("byType").unwrap(), -1);
    }

    #[test]
    fn test_cursor_set_and_get() {
        let store = Store::open_memory().expect("open");
        let cursors = store.cursor_store();
        cursors.set("byType", 7).unwrap();
        assert_eq!(cursors.get("byType").unwrap(), 7);
        cursors.set("byType", 8).unwrap();
        assert_eq!(cursors.get("byType").unwrap(), 8);
    }
}
