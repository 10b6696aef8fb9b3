//! # ssb-core
//!
//! The orchestrator that wires storage, indexing, and the trust graph into
//! one running peer core (spec §4.8): opens the receive-log and configured
//! multi-logs, starts their index pumps, and exposes the external interface
//! (spec §6) that a transport layer sits on top of.

pub mod config;
pub mod orchestrator;
pub mod status;

pub use config::CoreConfig;
pub use orchestrator::{Core, Replicator};
pub use status::Status;

use ssb_fsck::{ConsistencyProblems, FsckError, WrongSequence};

/// The external error surface (spec §6): every error an orchestrator
/// operation can return, independent of which internal crate raised it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,
    #[error("entry {0} is nulled")]
    Nulled(i64),
    #[error("malformed reference: {0}")]
    MalformedRef(String),
    #[error(transparent)]
    WrongSequence(#[from] WrongSequence),
    #[error("out of reach ({dist:?} hops, max {max})")]
    OutOfReach { dist: Option<i64>, max: i64 },
    #[error("shutting down")]
    ShuttingDown,
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    ConsistencyProblems(#[from] ConsistencyProblems),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<ssb_store::StoreError> for CoreError {
    fn from(e: ssb_store::StoreError) -> Self {
        match e {
            ssb_store::StoreError::NotFound(_) => CoreError::NotFound,
            ssb_store::StoreError::Nulled(rx_seq) => CoreError::Nulled(rx_seq),
            ssb_store::StoreError::ShuttingDown => CoreError::ShuttingDown,
            other => CoreError::Corrupt(other.to_string()),
        }
    }
}

impl From<ssb_types::RefError> for CoreError {
    fn from(e: ssb_types::RefError) -> Self {
        CoreError::MalformedRef(e.to_string())
    }
}

impl From<ssb_index::IndexError> for CoreError {
    fn from(e: ssb_index::IndexError) -> Self {
        match e {
            ssb_index::IndexError::Store(e) => e.into(),
        }
    }
}

impl From<ssb_graph::GraphError> for CoreError {
    fn from(e: ssb_graph::GraphError) -> Self {
        match e {
            ssb_graph::GraphError::Store(e) => e.into(),
            ssb_graph::GraphError::Ref(e) => e.into(),
        }
    }
}

impl From<FsckError> for CoreError {
    fn from(e: FsckError) -> Self {
        match e {
            FsckError::Store(e) => e.into(),
            FsckError::Ref(e) => e.into(),
            FsckError::WrongSequence(e) => CoreError::WrongSequence(e),
            FsckError::Consistency(e) => CoreError::ConsistencyProblems(e),
        }
    }
}
