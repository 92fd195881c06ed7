//! Shortest-hop pipe routes through live relays.
//!
//! `PathFinder` searches {start} ∪ live relays ∪ {target} with BFS. The start
//! may be a placed consumer or a placement preview; intermediate hops are
//! only ever live relays, and the start never relays its own route.

use std::collections::BTreeSet;

use crate::buildings::{GridPos, NodeId, NodeRef};
use crate::spatial::SpatialIndex;
use crate::traversal::breadth_first;

/// A vertex in a route search: the start (maybe unplaced) or a placed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Vertex {
    Start,
    Node(NodeId),
}

/// Route search over one resource's live relay set.
pub struct PathFinder<'a> {
    index: &'a SpatialIndex,
    live_relays: &'a BTreeSet<NodeId>,
}

impl<'a> PathFinder<'a> {
    pub fn new(index: &'a SpatialIndex, live_relays: &'a BTreeSet<NodeId>) -> Self {
        Self { index, live_relays }
    }

    fn resolve(&self, start: NodeRef) -> Option<(Option<NodeId>, GridPos)> {
        match start {
            NodeRef::Placed(id) => self.index.get(id).map(|n| (Some(id), n.pos)),
            NodeRef::Hypothetical { pos, .. } => Some((None, pos)),
        }
    }

    /// Find the shortest route from `start` to `target`.
    ///
    /// Returns the nodes after the start, ending with `target`; a direct
    /// neighbor gives `[target]`. Returns `None` if unreachable, if either end
    /// is unknown, or if start and target are the same node.
    pub fn find_path(&self, start: NodeRef, target: NodeId) -> Option<Vec<NodeId>> {
        let (start_id, start_pos) = self.resolve(start)?;
        if start_id == Some(target) || !self.index.contains(target) {
            return None;
        }

        let usable = |id: NodeId| id == target || (self.live_relays.contains(&id) && Some(id) != start_id);

        let search = breadth_first(
            [Vertex::Start],
            |v| {
                let pos = match v {
                    Vertex::Start => Some(start_pos),
                    // Only live relays forward; the target ends the search.
                    Vertex::Node(id) if id != target && self.live_relays.contains(&id) => {
                        self.index.get(id).map(|n| n.pos)
                    }
                    Vertex::Node(_) => None,
                };
                pos.map(|p| self.index.neighbors_of_pos(p))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|&id| usable(id))
                    .map(Vertex::Node)
                    .collect::<Vec<_>>()
            },
            |v| v == Vertex::Node(target),
        );

        let path = search.path()?;
        Some(
            path.into_iter()
                .filter_map(|v| match v {
                    Vertex::Start => None,
                    Vertex::Node(id) => Some(id),
                })
                .collect(),
        )
    }

    /// Hop count of the shortest route, if any.
    pub fn hops(&self, start: NodeRef, target: NodeId) -> Option<usize> {
        self.find_path(start, target).map(|p| p.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{BuildingKind, Node};

    fn setup(nodes: &[Node], live: &[u32]) -> (SpatialIndex, BTreeSet<NodeId>) {
        let index = SpatialIndex::new(nodes, 2.0);
        let live = live.iter().map(|&i| NodeId(i)).collect();
        (index, live)
    }

    #[test]
    fn test_direct_neighbor() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 2, 0),
        ];
        let (index, live) = setup(&nodes, &[]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(finder.find_path(NodeId(2).into(), NodeId(1)), Some(vec![NodeId(1)]));
    }

    #[test]
    fn test_through_live_relay() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
            Node::new(3, BuildingKind::House, 4, 0),
        ];
        let (index, live) = setup(&nodes, &[2]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(
            finder.find_path(NodeId(3).into(), NodeId(1)),
            Some(vec![NodeId(2), NodeId(1)])
        );
        assert_eq!(finder.hops(NodeId(3).into(), NodeId(1)), Some(2));
    }

    #[test]
    fn test_dead_relay_blocks() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
            Node::new(3, BuildingKind::House, 4, 0),
        ];
        let (index, live) = setup(&nodes, &[]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(finder.find_path(NodeId(3).into(), NodeId(1)), None);
    }

    #[test]
    fn test_consumers_never_relay() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 2, 0),
            Node::new(3, BuildingKind::House, 4, 0),
        ];
        let (index, live) = setup(&nodes, &[]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(finder.find_path(NodeId(3).into(), NodeId(1)), None);
    }

    #[test]
    fn test_other_producers_never_relay() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Well, 2, 0),
            Node::new(3, BuildingKind::House, 4, 0),
        ];
        let (index, live) = setup(&nodes, &[]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(finder.find_path(NodeId(3).into(), NodeId(1)), None);
        assert_eq!(finder.find_path(NodeId(3).into(), NodeId(2)), Some(vec![NodeId(2)]));
    }

    #[test]
    fn test_shortest_of_two_routes() {
        // Long way round: 4 → 5 → 6 → 1; short: 4 → 2 → 1
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
            Node::new(4, BuildingKind::House, 4, 0),
            Node::new(5, BuildingKind::Aqueduct, 4, 2),
            Node::new(6, BuildingKind::Aqueduct, 2, 2),
        ];
        let (index, live) = setup(&nodes, &[2, 5, 6]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(
            finder.find_path(NodeId(4).into(), NodeId(1)),
            Some(vec![NodeId(2), NodeId(1)])
        );
    }

    #[test]
    fn test_hypothetical_start() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
        ];
        let (index, live) = setup(&nodes, &[2]);
        let finder = PathFinder::new(&index, &live);
        let preview = NodeRef::Hypothetical {
            kind: BuildingKind::House,
            pos: GridPos::new(4, 0),
        };
        assert_eq!(finder.find_path(preview, NodeId(1)), Some(vec![NodeId(2), NodeId(1)]));
        let far = NodeRef::Hypothetical {
            kind: BuildingKind::House,
            pos: GridPos::new(9, 9),
        };
        assert_eq!(finder.find_path(far, NodeId(1)), None);
    }

    #[test]
    fn test_target_relay_is_reached_directly() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Cistern, 2, 0),
            Node::new(3, BuildingKind::House, 4, 0),
        ];
        let (index, live) = setup(&nodes, &[2]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(finder.find_path(NodeId(3).into(), NodeId(2)), Some(vec![NodeId(2)]));
    }

    #[test]
    fn test_self_and_unknown() {
        let nodes = [Node::new(1, BuildingKind::Well, 0, 0)];
        let (index, live) = setup(&nodes, &[]);
        let finder = PathFinder::new(&index, &live);
        assert_eq!(finder.find_path(NodeId(1).into(), NodeId(1)), None);
        assert_eq!(finder.find_path(NodeId(1).into(), NodeId(9)), None);
        assert_eq!(finder.find_path(NodeId(9).into(), NodeId(1)), None);
    }
}
