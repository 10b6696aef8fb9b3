//! The index pump (spec §4.4): recovers its cursor, opens a live query on
//! the receive-log, and applies an update function per message, persisting
//! the cursor as it goes.

use ssb_store::{CancelToken, CursorStore, MultiLog, ReceiveLog, StoreError};

use crate::{AddrFn, IndexError};

/// One long-lived pump feeding one named multi-log.
pub struct Pump {
    name: String,
    receive_log: ReceiveLog,
    multi_log: MultiLog,
    addr_fn: AddrFn,
}

impl Pump {
    pub fn new(name: impl Into<String>, receive_log: ReceiveLog, multi_log: MultiLog, addr_fn: AddrFn) -> Self {
        Self {
            name: name.into(),
            receive_log,
            multi_log,
            addr_fn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until cancelled or a transient error occurs. Returns `Ok(())`
    /// on clean shutdown (spec: `ShuttingDown` is success, not failure).
    pub fn run(&self, cursors: &CursorStore, cancel: &CancelToken) -> Result<(), IndexError> {
        let start = cursors.get(&self.name)? + 1;
        tracing::debug!(index = %self.name, start, "starting index pump");
        let mut live = self.receive_log.live_from(start);

        loop {
            match live.next_blocking(cancel) {
                Ok((rx_seq, Some(msg))) => {
                    let addrs = (self.addr_fn)(&msg);
                    if addrs.is_empty() {
                        cursors.set(&self.name, rx_seq)?;
                    } else {
                        for addr in addrs {
                            self.multi_log.index_one(&addr, rx_seq)?;
                        }
                    }
                }
                Ok((rx_seq, None)) => {
                    // Nulled entry: nothing to index, still advance the cursor.
                    cursors.set(&self.name, rx_seq)?;
                }
                Err(StoreError::ShuttingDown) => {
                    tracing::debug!(index = %self.name, "index pump shutting down");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
