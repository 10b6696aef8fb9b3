//! Multi-log (spec §4.3): a family of sub-logs keyed by an opaque address,
//! backed by one `multilog_entries` table shared by every named multi-log
//! instance (`feeds`, `byType`, `byContent`, `private`, ...).

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};
use ssb_types::Message;

use crate::receive_log::ReceiveLog;
use crate::{Result, StoreError};

/// A snapshot of one sub-log: the ordered list of rxSeqs at some addr.
#[derive(Debug, Clone, Default)]
pub struct SubLog {
    rx_seqs: Vec<i64>,
}

impl SubLog {
    /// 0-based index of the last entry, -1 if empty.
    pub fn current_seq(&self) -> i64 {
        self.rx_seqs.len() as i64 - 1
    }

    pub fn get(&self, idx: i64) -> Option<i64> {
        if idx < 0 {
            return None;
        }
        self.rx_seqs.get(idx as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.rx_seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx_seqs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.rx_seqs.iter()
    }
}

#[derive(Clone)]
pub struct MultiLog {
    pub(crate) conn: Arc<Mutex<Connection>>,
    pub(crate) name: String,
}

impl MultiLog {
    /// The sub-log at `addr`; empty (not an error) if nothing has been
    /// indexed there yet — matching "creates on first access" with no
    /// separate creation step, since a sub-log with zero rows and one that
    /// was never touched are indistinguishable.
    pub fn get(&self, addr: &[u8]) -> Result<SubLog> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT rx_seq FROM multilog_entries
             WHERE multilog_name = ?1 AND addr = ?2 ORDER BY idx ASC",
        )?;
        let rx_seqs = stmt
            .query_map(rusqlite::params![self.name, addr], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(SubLog { rx_seqs })
    }

    /// All addresses with at least one indexed entry, in unspecified order.
    pub fn list(&self) -> Result<Vec<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT DISTINCT addr FROM multilog_entries WHERE multilog_name = ?1")?;
        let addrs = stmt
            .query_map([&self.name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
        Ok(addrs)
    }

    /// Flush and release. SQLite writes are already durable on commit, so
    /// this is a no-op kept for parity with the spec's `close()` contract.
    pub fn close(&self) -> Result<()> {
        tracing::debug!(multilog = %self.name, "closed multi-log handle");
        Ok(())
    }

    /// Append `rx_seq` to the sub-log at `addr` and persist `self.name`'s
    /// pump cursor to `rx_seq`, atomically (spec §9 durability resolution:
    /// cursor only advances once the sub-log write is durable).
    ///
    /// Idempotent: if `rx_seq` is already the sub-log's last entry, the
    /// insert is skipped and only the cursor write happens — this is the
    /// crash-recovery idempotence spec §4.4 requires of update functions.
    pub fn index_one(&self, addr: &[u8], rx_seq: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let last: Option<i64> = tx
            .query_row(
                "SELECT rx_seq FROM multilog_entries
                 WHERE multilog_name = ?1 AND addr = ?2 ORDER BY idx DESC LIMIT 1",
                rusqlite::params![self.name, addr],
                |r| r.get(0),
            )
            .optional()?;
        if last != Some(rx_seq) {
            let next_idx: i64 = tx.query_row(
                "SELECT COALESCE(MAX(idx), -1) + 1 FROM multilog_entries
                 WHERE multilog_name = ?1 AND addr = ?2",
                rusqlite::params![self.name, addr],
                |r| r.get(0),
            )?;
            tx.execute(
                "INSERT INTO multilog_entries (multilog_name, addr, idx, rx_seq)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![self.name, addr, next_idx, rx_seq],
            )?;
        }
        tx.execute(
            "INSERT INTO cursors (name, rx_seq) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET rx_seq = excluded.rx_seq",
            rusqlite::params![self.name, rx_seq],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove every entry for `author_addr` across this multi-log —
    /// used by `NullFeed` (spec §4.7 Heal).
    pub fn remove_all(&self, addr: &[u8]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM multilog_entries WHERE multilog_name = ?1 AND addr = ?2",
            rusqlite::params![self.name, addr],
        )?;
        Ok(())
    }

    /// Compose this sub-log with the receive-log: the messages at `addr`
    /// in sub-log order, skipping nulled entries (spec §4.3 "indirect"
    /// view).
    pub fn indirect(&self, receive_log: &ReceiveLog, addr: &[u8]) -> Result<Vec<(i64, Message)>> {
        let sub_log = self.get(addr)?;
        let mut out = Vec::with_capacity(sub_log.len());
        for &rx_seq in sub_log.iter() {
            match receive_log.get(rx_seq) {
                Ok(msg) => out.push((rx_seq, msg)),
                Err(StoreError::Nulled(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn test_index_one_appends_and_advances_cursor() {
        let store = Store::open_memory().expect("open");
        let ml = store.multi_log("feeds");
        ml.index_one(b"addr-a", 0).unwrap();
        ml.index_one(b"addr-a", 1).unwrap();

        let sub = ml.get(b"addr-a").unwrap();
        assert_eq!(sub.current_seq(), 1);
        assert_eq!(sub.get(0), Some(0));
        assert_eq!(sub.get(1), Some(1));

        let cursor = store.cursor_store();
        assert_eq!(cursor.get("feeds").unwrap(), 1);
    }

    #[test]
    fn test_index_one_is_idempotent_on_replay() {
        let store = Store::open_memory().expect("open");
        let ml = store.multi_log("feeds");
        ml.index_one(b"addr-a", 0).unwrap();
        ml.index_one(b"addr-a", 0).unwrap(); // replay after crash
        let sub = ml.get(b"addr-a").unwrap();
        assert_eq!(sub.len(), 1);
    }

    #[test]
    fn test_list_returns_all_addrs() {
        let store = Store::open_memory().expect("open");
        let ml = store.multi_log("feeds");
        ml.index_one(b"a", 0).unwrap();
        ml.index_one(b"b", 1).unwrap();
        let mut addrs = ml.list().unwrap();
        addrs.sort();
        assert_eq!(addrs, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_remove_all_clears_addr() {
        let store = Store::open_memory().expect("open");
        let ml = store.multi_log("feeds");
        ml.index_one(b"a", 0).unwrap();
        ml.remove_all(b"a").unwrap();
        assert!(ml.get(b"a").unwrap().is_empty());
    }
}
