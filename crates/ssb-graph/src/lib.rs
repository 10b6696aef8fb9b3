//! # ssb-graph
//!
//! The trust graph builder and authorizer (spec §4.5, §4.6): consumes
//! contact messages to maintain a follow/block edge store, materializes it
//! into a queryable [`graph::Graph`] snapshot, and gates friend-of-friend
//! reach through [`authorizer::Authorizer`].

pub mod authorizer;
pub mod contact;
pub mod graph;
pub mod pump;

pub use authorizer::{AuthorizeResult, Authorizer};
pub use contact::UnfollowPolicy;
pub use graph::Graph;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] ssb_store::StoreError),
    #[error(transparent)]
    Ref(#[from] ssb_types::RefError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
