//! Status reporting (spec §6): a snapshot for external observers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// State of one running index pump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    Idle,
    Building,
    Error(String),
}

/// Name and current state of one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub name: String,
    pub state: IndexState,
}

/// One connected peer, as surfaced by the (external) transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatus {
    pub address: String,
    pub connected_for: Duration,
}

/// A point-in-time snapshot of the core's health (spec §6). The `peers`
/// and `pending_blob_wants` fields are populated by the transport/blob
/// layers this core doesn't own; they default empty here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub pid: u32,
    #[serde(default)]
    pub peers: Vec<PeerStatus>,
    #[serde(default)]
    pub pending_blob_wants: Vec<String>,
    pub receive_log_length: i64,
    pub indexes: Vec<IndexStatus>,
}
