//! Route computation
//!
//! Builds a unit-cost directed graph from three sources: the local
//! symmetric links, the two-hop associations learned from beacons, and the
//! mesh-wide advertised link database. A single-source shortest-path run
//! from the local node then rebuilds the routing table in one pass, so
//! readers never observe a half-updated table.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{NodeId, Timestamp};
use crate::tables::{NeighborTable, TopologyTable, TwoHopTable};

/// One computed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    /// Destination node.
    pub dest: NodeId,
    /// The symmetric neighbor to hand packets to.
    pub next_hop: NodeId,
    /// Path cost (unit link cost, so equal to the hop count).
    pub metric: u32,
    /// Number of hops to the destination.
    pub hops: u32,
    /// When the route was computed.
    pub computed_at: Timestamp,
}

/// Answer to a next-hop query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop {
    /// The destination is this node.
    Local,
    /// A live route exists.
    Route {
        /// Neighbor to forward through.
        next_hop: NodeId,
        /// Path cost.
        metric: u32,
        /// Hops to destination.
        hops: u32,
    },
    /// The destination is known but no usable path remains; a loss event
    /// has been queued for the transport.
    Unreachable,
    /// The destination has never been heard of.
    NoRoute,
}

/// The routing table, rebuilt wholesale on every recomputation.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
    capacity: usize,
}

impl RoutingTable {
    /// Creates an empty table with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Replaces the whole table with a freshly computed one.
    pub fn replace(&mut self, mut entries: Vec<RouteEntry>) {
        if entries.len() > self.capacity {
            warn!(
                computed = entries.len(),
                capacity = self.capacity,
                "routing table overflow, keeping nearest destinations"
            );
            entries.sort_by_key(|e| e.metric);
            entries.truncate(self.capacity);
        }
        self.entries = entries;
    }

    /// Looks up the route for `dest`.
    #[must_use]
    pub fn lookup(&self, dest: NodeId) -> Option<&RouteEntry> {
        self.entries.iter().find(|e| e.dest == dest)
    }

    /// Drops the route for `dest`, if present. Returns whether it existed.
    pub fn invalidate(&mut self, dest: NodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.dest != dest);
        before != self.entries.len()
    }

    /// All routes.
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects the deduplicated directed edge set visible to this node.
#[must_use]
pub(crate) fn build_graph(
    self_id: NodeId,
    neighbors: &NeighborTable,
    two_hop: &TwoHopTable,
    topology: &TopologyTable,
    now: Timestamp,
) -> Vec<(NodeId, NodeId)> {
    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    let mut push = |from: NodeId, to: NodeId| {
        if from != to && seen.insert((from, to)) {
            edges.push((from, to));
        }
    };

    for neighbor in neighbors.symmetric() {
        push(self_id, neighbor.id);
    }
    for assoc in two_hop.iter() {
        if neighbors.is_symmetric(assoc.via) {
            push(assoc.via, assoc.two_hop);
        }
    }
    for link in topology.valid_links(now) {
        push(link.from, link.to);
    }
    edges
}

/// Single-source shortest paths over a unit-cost edge list.
///
/// Returns one entry per reachable destination, next hop resolved by
/// walking the parent chain back to the source. The node universe is
/// capped at `max_nodes`; nodes first encountered beyond the cap are left
/// out of the computation entirely.
#[must_use]
pub(crate) fn compute_routes(
    source: NodeId,
    edges: &[(NodeId, NodeId)],
    max_nodes: usize,
    now: Timestamp,
) -> Vec<RouteEntry> {
    // Enumerate the node universe, source first so it always fits.
    fn intern(
        id: NodeId,
        max_nodes: usize,
        index: &mut HashMap<NodeId, usize>,
        nodes: &mut Vec<NodeId>,
    ) -> Option<usize> {
        if let Some(&i) = index.get(&id) {
            return Some(i);
        }
        if nodes.len() >= max_nodes {
            return None;
        }
        let i = nodes.len();
        index.insert(id, i);
        nodes.push(id);
        Some(i)
    }
    let mut index: HashMap<NodeId, usize> = HashMap::new();
    let mut nodes: Vec<NodeId> = Vec::new();
    let source_index = intern(source, max_nodes, &mut index, &mut nodes).unwrap_or_default();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); max_nodes];
    let mut dropped = 0usize;
    for &(from, to) in edges {
        let (Some(f), Some(t)) = (
            intern(from, max_nodes, &mut index, &mut nodes),
            intern(to, max_nodes, &mut index, &mut nodes),
        ) else {
            dropped += 1;
            continue;
        };
        adjacency[f].push(t);
    }
    if dropped > 0 {
        debug!(dropped, max_nodes, "edges beyond node bound ignored");
    }

    const INFINITY: u32 = u32::MAX;
    let mut dist = vec![INFINITY; nodes.len()];
    let mut parent: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut heap: BinaryHeap<Reverse<(u32, usize)>> = BinaryHeap::new();
    dist[source_index] = 0;
    heap.push(Reverse((0, source_index)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        for &next in &adjacency[node] {
            let candidate = cost + 1;
            if candidate < dist[next] {
                dist[next] = candidate;
                parent[next] = Some(node);
                heap.push(Reverse((candidate, next)));
            }
        }
    }

    let mut routes = Vec::new();
    for (i, &dest) in nodes.iter().enumerate() {
        if i == source_index || dist[i] == INFINITY {
            continue;
        }
        // First hop: walk the parent chain until just after the source.
        let mut step = i;
        while let Some(prev) = parent[step] {
            if prev == source_index {
                break;
            }
            step = prev;
        }
        routes.push(RouteEntry {
            dest,
            next_hop: nodes[step],
            metric: dist[i],
            hops: dist[i],
            computed_at: now,
        });
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn edges(pairs: &[(u32, u32)]) -> Vec<(NodeId, NodeId)> {
        pairs.iter().map(|&(f, t)| (node(f), node(t))).collect()
    }

    #[test]
    fn direct_neighbors_route_in_one_hop() {
        let routes = compute_routes(node(1), &edges(&[(1, 2), (1, 3)]), 50, 0);
        assert_eq!(routes.len(), 2);
        for route in &routes {
            assert_eq!(route.hops, 1);
            assert_eq!(route.next_hop, route.dest);
        }
    }

    #[test]
    fn multi_hop_route_resolves_first_hop() {
        let routes = compute_routes(node(1), &edges(&[(1, 2), (2, 3), (3, 4)]), 50, 0);
        let to_four = routes.iter().find(|r| r.dest == node(4)).unwrap();
        assert_eq!(to_four.next_hop, node(2));
        assert_eq!(to_four.hops, 3);
    }

    #[test]
    fn shortest_of_two_paths_wins() {
        // 1->2->5 and 1->3->4->5.
        let routes = compute_routes(
            node(1),
            &edges(&[(1, 2), (2, 5), (1, 3), (3, 4), (4, 5)]),
            50,
            0,
        );
        let to_five = routes.iter().find(|r| r.dest == node(5)).unwrap();
        assert_eq!(to_five.hops, 2);
        assert_eq!(to_five.next_hop, node(2));
    }

    #[test]
    fn disconnected_nodes_get_no_route() {
        let routes = compute_routes(node(1), &edges(&[(1, 2), (8, 9)]), 50, 0);
        assert!(routes.iter().any(|r| r.dest == node(2)));
        assert!(!routes.iter().any(|r| r.dest == node(9)));
        // Node 9 is reachable from 8, but not from the source.
        assert!(!routes.iter().any(|r| r.dest == node(8)));
    }

    #[test]
    fn node_bound_truncates_the_universe() {
        // Chain 1->2->3->4 with a bound of 3 nodes: node 4 never enters.
        let routes = compute_routes(node(1), &edges(&[(1, 2), (2, 3), (3, 4)]), 3, 0);
        assert_eq!(routes.len(), 2);
        assert!(!routes.iter().any(|r| r.dest == node(4)));
    }

    #[test]
    fn replace_caps_table_size_keeping_nearest() {
        let mut table = RoutingTable::new(2);
        let entries = vec![
            RouteEntry {
                dest: node(4),
                next_hop: node(2),
                metric: 3,
                hops: 3,
                computed_at: 0,
            },
            RouteEntry {
                dest: node(2),
                next_hop: node(2),
                metric: 1,
                hops: 1,
                computed_at: 0,
            },
            RouteEntry {
                dest: node(3),
                next_hop: node(2),
                metric: 2,
                hops: 2,
                computed_at: 0,
            },
        ];
        table.replace(entries);
        assert_eq!(table.len(), 2);
        assert!(table.lookup(node(2)).is_some());
        assert!(table.lookup(node(3)).is_some());
        assert!(table.lookup(node(4)).is_none());
    }

    #[test]
    fn invalidate_removes_single_destination() {
        let mut table = RoutingTable::new(8);
        table.replace(vec![RouteEntry {
            dest: node(2),
            next_hop: node(2),
            metric: 1,
            hops: 1,
            computed_at: 0,
        }]);
        assert!(table.invalidate(node(2)));
        assert!(!table.invalidate(node(2)));
        assert!(table.is_empty());
    }
}
