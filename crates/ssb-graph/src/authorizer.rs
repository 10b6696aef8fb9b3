//! Friend-of-friend authorization (spec §4.6): gates replication reach by
//! hop distance from a root feed over the follow graph, with blocks
//! dominating regardless of distance.

use ssb_types::FeedRef;

use crate::graph::Graph;

/// The outcome of authorizing a candidate feed against a root and a hop
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeResult {
    Ok,
    OutOfReach { dist: Option<i64>, max: i64 },
}

/// Authorizes candidates against one root feed and a maximum hop count.
pub struct Authorizer<'g> {
    root: FeedRef,
    max_hops: i64,
    graph: &'g Graph,
}

impl<'g> Authorizer<'g> {
    pub fn new(root: FeedRef, max_hops: i64, graph: &'g Graph) -> Self {
        Self { root, max_hops, graph }
    }

    /// The three rules (spec §4.6):
    /// 1. The root itself is always authorized.
    /// 2. A direct block from `root` to `candidate` is `OutOfReach`
    ///    regardless of any other path that might also reach it.
    /// 3. Otherwise, a candidate reachable within `max_hops` positive edges
    ///    is authorized; unreachable or too-far candidates are `OutOfReach`.
    pub fn authorize(&self, candidate: &FeedRef) -> AuthorizeResult {
        if candidate == &self.root {
            return AuthorizeResult::Ok;
        }
        if self.graph.edge_weight(&self.root, candidate) == Some(-1) {
            return AuthorizeResult::OutOfReach { dist: None, max: self.max_hops };
        }
        let dist = self.graph.hops(&self.root, candidate);
        match dist {
            Some(d) if d <= self.max_hops => AuthorizeResult::Ok,
            other => AuthorizeResult::OutOfReach { dist: other, max: self.max_hops },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssb_store::Store;
    use ssb_types::FeedAlgo;

    fn feed(tag: u8) -> FeedRef {
        FeedRef::new(FeedAlgo::Ed25519, [tag; 32])
    }

    #[test]
    fn test_root_is_always_authorized() {
        let store = Store::open_memory().unwrap();
        let graph = Graph::build(&store.edge_store()).unwrap();
        let auth = Authorizer::new(feed(0), 0, &graph);
        assert_eq!(auth.authorize(&feed(0)), AuthorizeResult::Ok);
    }

    #[test]
    fn test_direct_follow_within_max_hops() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        let graph = Graph::build(&edges).unwrap();
        let auth = Authorizer::new(feed(0), 1, &graph);
        assert_eq!(auth.authorize(&feed(1)), AuthorizeResult::Ok);
    }

    #[test]
    fn test_out_of_reach_beyond_max_hops() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        edges.set_edge(&feed(1).to_storage(), &feed(2).to_storage(), 1, 1, "graph", 1).unwrap();
        let graph = Graph::build(&edges).unwrap();
        let auth = Authorizer::new(feed(0), 1, &graph);
        assert_eq!(
            auth.authorize(&feed(2)),
            AuthorizeResult::OutOfReach { dist: Some(2), max: 1 }
        );
    }

    #[test]
    fn test_monotonic_in_max_hops() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        edges.set_edge(&feed(1).to_storage(), &feed(2).to_storage(), 1, 1, "graph", 1).unwrap();
        let graph = Graph::build(&edges).unwrap();

        let narrow = Authorizer::new(feed(0), 1, &graph);
        let wide = Authorizer::new(feed(0), 2, &graph);
        assert_eq!(narrow.authorize(&feed(2)), AuthorizeResult::OutOfReach { dist: Some(2), max: 1 });
        assert_eq!(wide.authorize(&feed(2)), AuthorizeResult::Ok);
    }

    #[test]
    fn test_block_dominates_any_hop_budget() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), -1, 1, "graph", 0).unwrap();
        let graph = Graph::build(&edges).unwrap();
        let auth = Authorizer::new(feed(0), 100, &graph);
        assert_eq!(auth.authorize(&feed(1)), AuthorizeResult::OutOfReach { dist: None, max: 100 });
    }
}
