//! Contact-message edge semantics (spec §4.5), shared by both graph
//! builder variants.

use ssb_store::EdgeStore;
use ssb_types::{ContactContent, FeedRef};

use crate::Result;

/// How a contact message with `following=false`/`blocking=false` is
/// interpreted. The source left this ambiguous (the upstream
/// `XTestTypedLog` covering it is disabled); SPEC_FULL §4 resolves it as
/// "remove the edge", made an explicit policy so a different
/// interpretation can be swapped in without touching call sites.
#[derive(Debug, Clone, Copy, Default)]
pub enum UnfollowPolicy {
    #[default]
    RemoveEdge,
}

/// Apply one contact message's effect on the edge `author -> contact.contact`,
/// then persist `cursor_name`'s cursor to `rx_seq` — all in one transaction
/// (spec §9 durability resolution), via the storage layer's supersession
/// check on `source_sequence` (spec §4.5: "later contact messages strictly
/// supersede earlier ones").
pub fn apply_contact(
    edges: &EdgeStore,
    author: &FeedRef,
    contact: &ContactContent,
    source_sequence: i64,
    cursor_name: &str,
    rx_seq: i64,
    policy: UnfollowPolicy,
) -> Result<()> {
    let from = author.to_storage();
    let to = contact.contact.to_storage();

    if contact.blocking == Some(true) {
        // Block wins over follow even if both fields are present.
        edges.set_edge(&from, &to, -1, source_sequence, cursor_name, rx_seq)?;
    } else if contact.following == Some(true) {
        edges.set_edge(&from, &to, 1, source_sequence, cursor_name, rx_seq)?;
    } else if contact.following == Some(false) || contact.blocking == Some(false) {
        match policy {
            UnfollowPolicy::RemoveEdge => {
                edges.remove_edge(&from, &to, source_sequence, cursor_name, rx_seq)?;
            }
        }
    } else {
        // Neither field present: "no change" (spec §4.1), still advance
        // the cursor so the pump makes progress. `author` emitted a
        // contact message, so it still counts toward NodeCount.
        edges.note_contact_no_op(&from, cursor_name, rx_seq)?;
    }
    Ok(())
}
