//! The two graph builder variants (spec §4.5): Badger subscribes to the
//! receive-log directly; Log instead polls the `byType`/"contact" sub-log,
//! trading a slightly longer dependency chain for reuse of an index that
//! may already exist for other reasons.

use std::time::Duration;

use ssb_store::{CancelToken, CursorStore, EdgeStore, MultiLog, ReceiveLog, StoreError};
use ssb_types::Content;

use crate::contact::{apply_contact, UnfollowPolicy};
use crate::{GraphError, Result};

/// The `byType` sub-log address contact messages are indexed under (spec
/// §4.3's `byType` multi-log, keyed by the raw `content.type` string).
const CONTACT_ADDR: &[u8] = b"contact";

/// Live-subscribe to the receive-log directly, applying contact messages as
/// they arrive and advancing the cursor for every other message too (so a
/// restart resumes exactly where it left off, per spec §4.4's pump
/// contract).
pub fn run_badger_pump(
    receive_log: &ReceiveLog,
    edges: &EdgeStore,
    cursors: &CursorStore,
    cursor_name: &str,
    cancel: &CancelToken,
    policy: UnfollowPolicy,
) -> Result<()> {
    let start = cursors.get(cursor_name)? + 1;
    tracing::debug!(cursor = cursor_name, start, "starting badger graph pump");
    let mut live = receive_log.live_from(start);

    loop {
        match live.next_blocking(cancel) {
            Ok((rx_seq, Some(msg))) => match msg.content.as_contact() {
                Some(contact) => {
                    apply_contact(edges, &msg.author, contact, msg.sequence, cursor_name, rx_seq, policy)?;
                }
                None => edges.touch_cursor(cursor_name, rx_seq)?,
            },
            Ok((rx_seq, None)) => edges.touch_cursor(cursor_name, rx_seq)?,
            Err(StoreError::ShuttingDown) => {
                tracing::debug!(cursor = cursor_name, "badger graph pump shutting down");
                return Ok(());
            }
            Err(e) => return Err(GraphError::Store(e)),
        }
    }
}

/// Poll the `byType`/"contact" sub-log instead of the receive-log, falling
/// back to [`ReceiveLog::wait_for_activity`] when a pass finds nothing new
/// — an approximation of a live subscription on that sub-log, which has no
/// blocking primitive of its own (spec §4.3 only promises `get`/`list`).
pub fn run_log_pump(
    receive_log: &ReceiveLog,
    contact_log: &MultiLog,
    edges: &EdgeStore,
    cursors: &CursorStore,
    cursor_name: &str,
    cancel: &CancelToken,
    policy: UnfollowPolicy,
) -> Result<()> {
    tracing::debug!(cursor = cursor_name, "starting log graph pump");
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(cursor = cursor_name, "log graph pump shutting down");
            return Ok(());
        }

        let cursor = cursors.get(cursor_name)?;
        let sub_log = contact_log.get(CONTACT_ADDR)?;
        let mut made_progress = false;

        for &rx_seq in sub_log.iter() {
            if rx_seq <= cursor {
                continue;
            }
            made_progress = true;
            match receive_log.get(rx_seq) {
                Ok(msg) => match msg.content.as_contact() {
                    Some(contact) => apply_contact(
                        edges,
                        &msg.author,
                        contact,
                        msg.sequence,
                        cursor_name,
                        rx_seq,
                        policy,
                    )?,
                    None => edges.touch_cursor(cursor_name, rx_seq)?,
                },
                Err(StoreError::Nulled(_)) => edges.touch_cursor(cursor_name, rx_seq)?,
                Err(e) => return Err(GraphError::Store(e)),
            }
        }

        if !made_progress {
            receive_log.wait_for_activity(Duration::from_millis(200));
        }
    }
}
