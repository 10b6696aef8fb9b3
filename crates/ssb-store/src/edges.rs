//! The graph builder's edge store (spec §4.5 "Badger variant": "an
//! incrementally maintained on-disk key-value store mapping `(from, to) →
//! latestEdge`"). Storage-only: supersession comparison and cursor
//! persistence happen here; contact-message interpretation lives in
//! `ssb-graph`.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

#[derive(Clone)]
pub struct EdgeStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

/// A snapshot edge: `from -> to` with the given weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRow {
    pub from: Vec<u8>,
    pub to: Vec<u8>,
    pub weight: i64,
}

impl EdgeStore {
    /// Set the edge `from -> to` to `weight`, but only if `source_sequence`
    /// (the contributing contact message's `msg.sequence` within its
    /// author) supersedes whatever produced the current edge — "later
    /// contact messages strictly supersede earlier ones" (spec §4.5).
    /// Persists `cursor_name`'s cursor to `rx_seq` in the same transaction.
    pub fn set_edge(
        &self,
        from: &[u8],
        to: &[u8],
        weight: i64,
        source_sequence: i64,
        cursor_name: &str,
        rx_seq: i64,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT source_sequence FROM graph_edges WHERE from_addr = ?1 AND to_addr = ?2",
                rusqlite::params![from, to],
                |r| r.get(0),
            )
            .optional()?;
        if existing.map_or(true, |e| source_sequence > e) {
            tx.execute(
                "INSERT INTO graph_edges (from_addr, to_addr, weight, source_sequence)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(from_addr, to_addr) DO UPDATE SET
                    weight = excluded.weight,
                    source_sequence = excluded.source_sequence",
                rusqlite::params![from, to, weight, source_sequence],
            )?;
        }
        mark_known(&tx, from)?;
        persist_cursor(&tx, cursor_name, rx_seq)?;
        tx.commit()?;
        Ok(())
    }

    /// Remove the edge `from -> to` (explicit unfollow), subject to the
    /// same supersession rule as `set_edge`.
    pub fn remove_edge(
        &self,
        from: &[u8],
        to: &[u8],
        source_sequence: i64,
        cursor_name: &str,
        rx_seq: i64,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT source_sequence FROM graph_edges WHERE from_addr = ?1 AND to_addr = ?2",
                rusqlite::params![from, to],
                |r| r.get(0),
            )
            .optional()?;
        if existing.map_or(false, |e| source_sequence > e) {
            tx.execute(
                "DELETE FROM graph_edges WHERE from_addr = ?1 AND to_addr = ?2",
                rusqlite::params![from, to],
            )?;
        }
        mark_known(&tx, from)?;
        persist_cursor(&tx, cursor_name, rx_seq)?;
        tx.commit()?;
        Ok(())
    }

    /// Persist `cursor_name`'s cursor to `rx_seq` without touching any edge
    /// or the known-feeds set — used when a pumped entry has no author to
    /// attribute at all (a nulled receive-log entry) or isn't a contact
    /// message in the first place.
    pub fn touch_cursor(&self, cursor_name: &str, rx_seq: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        persist_cursor(&conn, cursor_name, rx_seq)?;
        Ok(())
    }

    /// Record that `author` emitted a contact message that was a no-op
    /// (neither `following` nor `blocking` set), and persist `cursor_name`'s
    /// cursor to `rx_seq`. `author` still counts toward `NodeCount` (spec
    /// §4.5: "plus any feed that has emitted any contact"), even though the
    /// message never touches `graph_edges`.
    pub fn note_contact_no_op(&self, author: &[u8], cursor_name: &str, rx_seq: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        mark_known(&tx, author)?;
        persist_cursor(&tx, cursor_name, rx_seq)?;
        tx.commit()?;
        Ok(())
    }

    /// Snapshot every edge currently stored — `Build()`'s O(edges) scan.
    pub fn list_edges(&self) -> Result<Vec<EdgeRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT from_addr, to_addr, weight FROM graph_edges")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EdgeRow {
                    from: row.get(0)?,
                    to: row.get(1)?,
                    weight: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<EdgeRow>>>()?;
        Ok(rows)
    }

    /// Every feed that has ever emitted a contact message, independent of
    /// whether it currently has a surviving edge.
    pub fn list_known_feeds(&self) -> Result<Vec<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT addr FROM graph_known_feeds")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
        Ok(rows)
    }
}

fn mark_known(conn: &Connection, addr: &[u8]) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO graph_known_feeds (addr) VALUES (?1)",
        rusqlite::params![addr],
    )?;
    Ok(())
}

fn persist_cursor(conn: &Connection, name: &str, rx_seq: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO cursors (name, rx_seq) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET rx_seq = excluded.rx_seq",
        rusqlite::params![name, rx_seq],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn test_set_edge_then_list() {
        let store = Store::open_memory().expect("open");
        let edges = store.edge_store();
        edges.set_edge(b"a", b"b", 1, 1, "graph", 0).unwrap();
        let rows = edges.list_edges().unwrap();
        assert_eq!(rows, vec![EdgeRow { from: b"a".to_vec(), to: b"b".to_vec(), weight: 1 }]);
        assert_eq!(store.cursor_store().get("graph").unwrap(), 0);
        assert_eq!(edges.list_known_feeds().unwrap(), vec![b"a".to_vec()]);
    }

    #[test]
    fn test_note_contact_no_op_marks_known_without_an_edge() {
        let store = Store::open_memory().expect("open");
        let edges = store.edge_store();
        edges.note_contact_no_op(b"a", "graph", 0).unwrap();
        assert!(edges.list_edges().unwrap().is_empty());
        assert_eq!(edges.list_known_feeds().unwrap(), vec![b"a".to_vec()]);
    }

    #[test]
    fn test_touch_cursor_does_not_mark_anything_known() {
        let store = Store::open_memory().expect("open");
        let edges = store.edge_store();
        edges.touch_cursor("graph", 0).unwrap();
        assert_eq!(store.cursor_store().get("graph").unwrap(), 0);
        assert!(edges.list_known_feeds().unwrap().is_empty());
    }

    #[test]
    fn test_later_sequence_supersedes_earlier() {
        let store = Store::open_memory().expect("open");
        let edges = store.edge_store();
        edges.set_edge(b"a", b"b", 1, 5, "graph", 0).unwrap();
        // stale replay at a lower source_sequence must not override.
        edges.set_edge(b"a", b"b", -1, 2, "graph", 1).unwrap();
        let rows = edges.list_edges().unwrap();
        assert_eq!(rows[0].weight, 1);
    }

    #[test]
    fn test_block_overrides_follow_when_sequence_is_later() {
        let store = Store::open_memory().expect("open");
        let edges = store.edge_store();
        edges.set_edge(b"a", b"b", 1, 1, "graph", 0).unwrap();
        edges.set_edge(b"a", b"b", -1, 2, "graph", 1).unwrap();
        let rows = edges.list_edges().unwrap();
        assert_eq!(rows[0].weight, -1);
    }

    #[test]
    fn test_remove_edge_deletes() {
        let store = Store::open_memory().expect("open");
        let edges = store.edge_store();
        edges.set_edge(b"a", b"b", 1, 1, "graph", 0).unwrap();
        edges.remove_edge(b"a", b"b", 2, "graph", 1).unwrap();
        assert!(edges.list_edges().unwrap().is_empty());
    }
}
