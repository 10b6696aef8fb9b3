//! The materialized graph snapshot (spec §3, §4.5): a directed weighted
//! graph over feed references, rebuilt from the edge store on demand.
//!
//! A purpose-built adjacency list suffices here instead of a general graph
//! library (spec §9 design note): every query is a bounded-depth BFS over
//! positive-weight edges, and blocks simply aren't edges BFS ever follows.

use std::collections::{HashMap, HashSet};

use ssb_store::EdgeStore;
use ssb_types::FeedRef;

use crate::Result;

/// An immutable snapshot of the follow/block graph at some point in time.
/// A later `Graph::build` call may return a newer snapshot; callers treat
/// any one `Graph` as immutable (spec §4.5).
#[derive(Debug, Clone)]
pub struct Graph {
    adjacency: HashMap<Vec<u8>, HashMap<Vec<u8>, i64>>,
    nodes: HashSet<Vec<u8>>,
}

impl Graph {
    /// Atomically snapshot the edge store into an in-memory graph. Cost is
    /// O(edges + known feeds).
    pub fn build(edges: &EdgeStore) -> Result<Self> {
        let rows = edges.list_edges()?;
        let mut adjacency: HashMap<Vec<u8>, HashMap<Vec<u8>, i64>> = HashMap::new();
        let mut nodes = HashSet::new();
        for row in rows {
            nodes.insert(row.from.clone());
            nodes.insert(row.to.clone());
            adjacency.entry(row.from).or_default().insert(row.to, row.weight);
        }
        for addr in edges.list_known_feeds()? {
            nodes.insert(addr);
        }
        Ok(Self { adjacency, nodes })
    }

    /// Number of feeds referenced by any edge, plus any feed that has
    /// emitted a contact message even without a surviving edge (spec §4.5).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The weight of the edge `from -> to`, if any.
    pub fn edge_weight(&self, from: &FeedRef, to: &FeedRef) -> Option<i64> {
        self.adjacency.get(&from.to_storage())?.get(&to.to_storage()).copied()
    }

    /// Feeds `from` follows directly (positive edges out of `from`).
    pub fn follows(&self, from: &FeedRef) -> Result<Vec<FeedRef>> {
        self.edges_with_sign(from, |w| w > 0)
    }

    /// Feeds `from` blocks directly (negative edges out of `from`).
    pub fn blocks(&self, from: &FeedRef) -> Result<Vec<FeedRef>> {
        self.edges_with_sign(from, |w| w < 0)
    }

    fn edges_with_sign(&self, from: &FeedRef, pred: impl Fn(i64) -> bool) -> Result<Vec<FeedRef>> {
        let Some(neighbors) = self.adjacency.get(&from.to_storage()) else {
            return Ok(Vec::new());
        };
        neighbors
            .iter()
            .filter(|(_, &weight)| pred(weight))
            .map(|(addr, _)| FeedRef::from_storage(addr).map_err(Into::into))
            .collect()
    }

    /// Length of the shortest directed path `from -> ... -> to` using only
    /// positive-weight edges; `None` if unreachable. `from == to` is `0`.
    pub fn hops(&self, from: &FeedRef, to: &FeedRef) -> Option<i64> {
        let from = from.to_storage();
        let to = to.to_storage();
        if from == to {
            return Some(0);
        }

        let mut visited: HashSet<Vec<u8>> = HashSet::new();
        visited.insert(from.clone());
        let mut frontier = vec![from];
        let mut dist: i64 = 0;

        while !frontier.is_empty() {
            dist += 1;
            let mut next = Vec::new();
            for node in &frontier {
                let Some(neighbors) = self.adjacency.get(node) else {
                    continue;
                };
                for (neighbor, &weight) in neighbors {
                    if weight <= 0 || visited.contains(neighbor) {
                        continue;
                    }
                    if *neighbor == to {
                        return Some(dist);
                    }
                    visited.insert(neighbor.clone());
                    next.push(neighbor.clone());
                }
            }
            frontier = next;
        }
        None
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
    fn test_empty_graph() {
        let store = Store::open_memory().unwrap();
        let graph = Graph::build(&store.edge_store()).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.hops(&feed(1), &feed(2)), None);
    }

    #[test]
    fn test_hops_same_node_is_zero() {
        let store = Store::open_memory().unwrap();
        let graph = Graph::build(&store.edge_store()).unwrap();
        assert_eq!(graph.hops(&feed(1), &feed(1)), Some(0));
    }

    #[test]
    fn test_friend_of_friend_is_two_hops_away() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        // M -> A -> C
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        edges.set_edge(&feed(1).to_storage(), &feed(3).to_storage(), 1, 1, "graph", 1).unwrap();
        let graph = Graph::build(&edges).unwrap();
        assert_eq!(graph.hops(&feed(0), &feed(1)), Some(1));
        assert_eq!(graph.hops(&feed(0), &feed(3)), Some(2));
    }

    #[test]
    fn test_block_prunes_path() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), -1, 1, "graph", 0).unwrap();
        let graph = Graph::build(&edges).unwrap();
        assert_eq!(graph.hops(&feed(0), &feed(1)), None);
    }

    #[test]
    fn test_follows_and_blocks_split_by_sign() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        edges.set_edge(&feed(0).to_storage(), &feed(2).to_storage(), -1, 1, "graph", 0).unwrap();
        let graph = Graph::build(&edges).unwrap();

        let follows = graph.follows(&feed(0)).unwrap();
        assert_eq!(follows, vec![feed(1)]);
        let blocks = graph.blocks(&feed(0)).unwrap();
        assert_eq!(blocks, vec![feed(2)]);
    }

    #[test]
    fn test_follows_empty_for_unknown_node() {
        let store = Store::open_memory().unwrap();
        let graph = Graph::build(&store.edge_store()).unwrap();
        assert!(graph.follows(&feed(9)).unwrap().is_empty());
    }

    #[test]
    fn test_block_after_follow_from_same_author_makes_target_unreachable() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        // Later contact message (higher source_sequence) supersedes.
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), -1, 2, "graph", 1).unwrap();
        let graph = Graph::build(&edges).unwrap();
        assert_eq!(graph.hops(&feed(0), &feed(1)), None);
    }

    #[test]
    fn test_node_count_includes_authors_with_no_surviving_edge() {
        let store = Store::open_memory().unwrap();
        let edges = store.edge_store();
        // A follows B, then immediately unfollows: the edge disappears but
        // A still emitted a contact message and must still count as a node.
        edges.set_edge(&feed(0).to_storage(), &feed(1).to_storage(), 1, 1, "graph", 0).unwrap();
        edges.remove_edge(&feed(0).to_storage(), &feed(1).to_storage(), 2, "graph", 1).unwrap();
        let graph = Graph::build(&edges).unwrap();
        assert_eq!(graph.node_count(), 1);
    }
}
