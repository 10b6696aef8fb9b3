//! # ssb-index
//!
//! The index pump abstraction (spec §4.4): long-running tasks that consume
//! a live query of the receive-log and write into a sink multi-log,
//! persisting a resume cursor as they go.

pub mod addr_fns;
pub mod pump;

use std::sync::Arc;

use ssb_types::Message;

pub use pump::Pump;

/// Maps a message to the sub-log address(es) it should be indexed under,
/// or no addresses if the message doesn't belong in this index.
pub type AddrFn = Arc<dyn Fn(&Message) -> Vec<Vec<u8>> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] ssb_store::StoreError),
}

pub type Result<T> = std::result::Result<T, IndexError>;
