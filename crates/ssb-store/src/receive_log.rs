//! The receive-log (spec §4.2): an append-only sequence of stored messages
//! with stable, dense, monotonic sequence numbers ("rxSeq") and "null"
//! (tombstone) semantics.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};
use ssb_types::Message;

use crate::cancel::CancelToken;
use crate::{Gate, Result, StoreError};

/// A query over the receive-log's rxSeq space (spec §4.2 `query(spec)`).
#[derive(Debug, Clone, Copy)]
pub struct QuerySpec {
    pub from: i64,
    pub reverse: bool,
}

impl QuerySpec {
    pub fn from(from: i64) -> Self {
        Self {
            from,
            reverse: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

#[derive(Clone)]
pub struct ReceiveLog {
    pub(crate) conn: Arc<Mutex<Connection>>,
    pub(crate) gate: Gate,
}

impl ReceiveLog {
    /// Append a message, already validated at the boundary (spec §7:
    /// malformed input never reaches `append`). Returns the assigned rxSeq.
    pub fn append(&self, msg: &Message) -> Result<i64> {
        let next = {
            let conn = self.conn.lock().unwrap();
            let current: Option<i64> =
                conn.query_row("SELECT MAX(rx_seq) FROM receive_log", [], |r| r.get(0))?;
            let next = current.map(|s| s + 1).unwrap_or(0);
            conn.execute(
                "INSERT INTO receive_log (rx_seq, nulled, author, sequence, msg_key, canonical)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    next,
                    msg.author.to_storage(),
                    msg.sequence,
                    msg.key.to_storage(),
                    msg.to_canonical_bytes(),
                ],
            )?;
            next
        };
        self.notify_appended();
        tracing::debug!(rx_seq = next, author = %msg.author, sequence = msg.sequence, "appended message");
        Ok(next)
    }

    /// `get(rxSeq) → Message`: `Nulled` for tombstones, `NotFound` past the
    /// end or for a slot that was never written.
    pub fn get(&self, rx_seq: i64) -> Result<Message> {
        match self.fetch_raw(rx_seq)? {
            None => Err(StoreError::NotFound(format!("rx_seq {rx_seq}"))),
            Some(None) => Err(StoreError::Nulled(rx_seq)),
            Some(Some(msg)) => Ok(msg),
        }
    }

    /// Last assigned rxSeq, or -1 if empty.
    pub fn seq(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let current: Option<i64> =
            conn.query_row("SELECT MAX(rx_seq) FROM receive_log", [], |r| r.get(0))?;
        Ok(current.unwrap_or(-1))
    }

    /// Turn a slot into a tombstone. Idempotent; errors only if `rx_seq`
    /// was never written at all.
    pub fn null(&self, rx_seq: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM receive_log WHERE rx_seq = ?1",
                [rx_seq],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound(format!("rx_seq {rx_seq}")));
        }
        conn.execute(
            "UPDATE receive_log SET nulled = 1, canonical = NULL WHERE rx_seq = ?1",
            [rx_seq],
        )?;
        Ok(())
    }

    /// A bounded, non-live query over `[spec.from, seq()]` (or empty if the
    /// log hasn't reached `spec.from` yet). Nulled entries yield `None`.
    pub fn query(&self, spec: QuerySpec) -> Result<Vec<(i64, Option<Message>)>> {
        let conn = self.conn.lock().unwrap();
        let sql = if spec.reverse {
            "SELECT rx_seq, nulled, canonical FROM receive_log WHERE rx_seq >= ?1 ORDER BY rx_seq DESC"
        } else {
            "SELECT rx_seq, nulled, canonical FROM receive_log WHERE rx_seq >= ?1 ORDER BY rx_seq ASC"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([spec.from], |row| {
            let rx_seq: i64 = row.get(0)?;
            let nulled: i64 = row.get(1)?;
            let canonical: Option<Vec<u8>> = row.get(2)?;
            Ok((rx_seq, nulled, canonical))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (rx_seq, nulled, canonical) = row?;
            out.push((rx_seq, decode_entry(rx_seq, nulled, canonical)?));
        }
        Ok(out)
    }

    /// A live, seqWrap query starting at `from` (spec §4.4 step 2): blocks
    /// for new appends instead of ending.
    pub fn live_from(&self, from: i64) -> LiveQuery {
        LiveQuery {
            log: self.clone(),
            next_seq: from,
        }
    }

    /// Block up to `timeout` for the next append, or return early once one
    /// happens. Used by pumps that poll a multi-log's sub-log (the graph
    /// builder's Log variant) rather than the receive-log directly, so they
    /// don't have to busy-loop.
    pub fn wait_for_activity(&self, timeout: Duration) {
        self.wait_for_append(timeout);
    }

    fn fetch_raw(&self, rx_seq: i64) -> Result<Option<Option<Message>>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT nulled, canonical FROM receive_log WHERE rx_seq = ?1",
                [rx_seq],
                |row| {
                    let nulled: i64 = row.get(0)?;
                    let canonical: Option<Vec<u8>> = row.get(1)?;
                    Ok((nulled, canonical))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((nulled, canonical)) => Ok(Some(decode_entry(rx_seq, nulled, canonical)?)),
        }
    }

    fn notify_appended(&self) {
        let _guard = self.gate.0.lock().unwrap();
        self.gate.1.notify_all();
    }

    fn wait_for_append(&self, timeout: Duration) {
        let guard = self.gate.0.lock().unwrap();
        let _ = self.gate.1.wait_timeout(guard, timeout).unwrap();
    }
}

fn decode_entry(rx_seq: i64, nulled: i64, canonical: Option<Vec<u8>>) -> Result<Option<Message>> {
    if nulled != 0 {
        return Ok(None);
    }
    let bytes = canonical.ok_or_else(|| {
        StoreError::Corrupt(format!("rx_seq {rx_seq} is not nulled but has no canonical bytes"))
    })?;
    let msg = Message::decode_trusted(&bytes)
        .map_err(|e| StoreError::Corrupt(format!("rx_seq {rx_seq}: {e}")))?;
    Ok(Some(msg))
}

/// A blocking, infinite iterator over the receive-log starting at some
/// rxSeq, used by index pumps and the graph builder's Badger variant.
pub struct LiveQuery {
    log: ReceiveLog,
    next_seq: i64,
}

impl LiveQuery {
    /// Block until the entry at the current cursor is available or
    /// `cancel` fires (returning `ShuttingDown`, per spec §5).
    pub fn next_blocking(&mut self, cancel: &CancelToken) -> Result<(i64, Option<Message>)> {
        loop {
            if cancel.is_cancelled() {
                return Err(StoreError::ShuttingDown);
            }
            if let Some(entry) = self.log.fetch_raw(self.next_seq)? {
                let seq = self.next_seq;
                self.next_seq += 1;
                return Ok((seq, entry));
            }
            self.log.wait_for_append(Duration::from_millis(200));
        }
    }
}
