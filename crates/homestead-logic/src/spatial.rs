//! Distance-threshold adjacency between buildings.
//!
//! Two buildings are neighbors iff `0 < distance <= max_interaction_distance`.
//! The index buckets nodes into square cells one interaction range wide, so
//! neighbor enumeration only looks at the 3×3 block of cells around a point.
//! Built once per rebuild and dropped with the snapshot.

use std::collections::{BTreeMap, HashMap};

use crate::buildings::{BuildingKind, GridPos, Node, NodeId};

/// True iff two positions are within interaction range of each other.
///
/// Compares squared distances so a pair exactly at the threshold counts.
pub fn within_range(a: GridPos, b: GridPos, max_distance: f64) -> bool {
    let d2 = a.distance_sq(b);
    d2 > 0 && (d2 as f64) <= max_distance * max_distance
}

/// Per-rebuild spatial index over a node snapshot.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: BTreeMap<NodeId, Node>,
    buckets: HashMap<(i32, i32), Vec<NodeId>>,
    cell_size: i32,
    max_distance: f64,
}

impl SpatialIndex {
    pub fn new<'a>(nodes: impl IntoIterator<Item = &'a Node>, max_distance: f64) -> Self {
        let cell_size = if max_distance.is_finite() && max_distance >= 1.0 {
            max_distance.ceil() as i32
        } else {
            1
        };
        let nodes: BTreeMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id, *n)).collect();
        let mut buckets: HashMap<(i32, i32), Vec<NodeId>> = HashMap::new();
        // BTreeMap iteration keeps every bucket sorted by id.
        for node in nodes.values() {
            buckets
                .entry(Self::bucket_of(node.pos, cell_size))
                .or_default()
                .push(node.id);
        }
        Self {
            nodes,
            buckets,
            cell_size,
            max_distance,
        }
    }

    fn bucket_of(pos: GridPos, cell_size: i32) -> (i32, i32) {
        (pos.x.div_euclid(cell_size), pos.y.div_euclid(cell_size))
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes of one kind, ascending by id.
    pub fn of_kind(&self, kind: BuildingKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    /// Are two placed nodes neighbors? Unknown ids never are.
    pub fn are_neighbors(&self, a: NodeId, b: NodeId) -> bool {
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(na), Some(nb)) => within_range(na.pos, nb.pos, self.max_distance),
            _ => false,
        }
    }

    /// Is a placed node within range of an arbitrary position?
    pub fn in_range_of(&self, id: NodeId, pos: GridPos) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|n| within_range(n.pos, pos, self.max_distance))
    }

    /// Every node within range of `pos`, ascending by id.
    ///
    /// A node sitting exactly on `pos` is not a neighbor of it.
    pub fn neighbors_of_pos(&self, pos: GridPos) -> Vec<NodeId> {
        let (bx, by) = Self::bucket_of(pos, self.cell_size);
        let mut result = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                // Buckets past the i32 edge cannot hold nodes.
                let (Some(x), Some(y)) = (bx.checked_add(dx), by.checked_add(dy)) else {
                    continue;
                };
                if let Some(bucket) = self.buckets.get(&(x, y)) {
                    for id in bucket {
                        if self.in_range_of(*id, pos) {
                            result.push(*id);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Every node within range of a placed node, ascending by id.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes.get(&id) {
            Some(node) => self.neighbors_of_pos(node.pos),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(nodes: &[Node], max: f64) -> SpatialIndex {
        SpatialIndex::new(nodes, max)
    }

    #[test]
    fn test_exactly_at_threshold_is_neighbor() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 2, 0),
        ];
        let idx = index(&nodes, 2.0);
        assert!(idx.are_neighbors(NodeId(1), NodeId(2)));
    }

    #[test]
    fn test_marginally_beyond_threshold_is_not() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 2, 1),
        ];
        // sqrt(5) ≈ 2.236
        assert!(!index(&nodes, 2.0).are_neighbors(NodeId(1), NodeId(2)));
        assert!(!index(&nodes, 2.23).are_neighbors(NodeId(1), NodeId(2)));
        assert!(index(&nodes, 2.24).are_neighbors(NodeId(1), NodeId(2)));
    }

    #[test]
    fn test_diagonal_threshold() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 1, 1),
        ];
        assert!(index(&nodes, std::f64::consts::SQRT_2).are_neighbors(NodeId(1), NodeId(2)));
        assert!(!index(&nodes, 1.41).are_neighbors(NodeId(1), NodeId(2)));
    }

    #[test]
    fn test_same_tile_not_neighbor() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 3, 3),
            Node::new(2, BuildingKind::House, 3, 3),
        ];
        assert!(!index(&nodes, 2.0).are_neighbors(NodeId(1), NodeId(2)));
    }

    #[test]
    fn test_self_is_not_neighbor() {
        let nodes = [Node::new(1, BuildingKind::Well, 0, 0)];
        let idx = index(&nodes, 2.0);
        assert!(!idx.are_neighbors(NodeId(1), NodeId(1)));
        assert!(idx.neighbors(NodeId(1)).is_empty());
    }

    #[test]
    fn test_neighbors_sorted_and_across_buckets() {
        let nodes = [
            Node::new(9, BuildingKind::House, -1, 0),
            Node::new(3, BuildingKind::House, 1, 1),
            Node::new(5, BuildingKind::Well, 0, 0),
            Node::new(7, BuildingKind::House, 0, -2),
            Node::new(8, BuildingKind::House, 5, 5),
        ];
        let idx = index(&nodes, 2.0);
        assert_eq!(idx.neighbors(NodeId(5)), vec![NodeId(3), NodeId(7), NodeId(9)]);
    }

    #[test]
    fn test_neighbors_of_empty_position() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 10, 10),
            Node::new(2, BuildingKind::Well, 12, 10),
        ];
        let idx = index(&nodes, 2.0);
        assert_eq!(idx.neighbors_of_pos(GridPos::new(11, 10)), vec![NodeId(1), NodeId(2)]);
        assert!(idx.neighbors_of_pos(GridPos::new(20, 20)).is_empty());
    }

    #[test]
    fn test_unknown_ids() {
        let idx = index(&[Node::new(1, BuildingKind::Well, 0, 0)], 2.0);
        assert!(!idx.are_neighbors(NodeId(1), NodeId(99)));
        assert!(idx.neighbors(NodeId(99)).is_empty());
        assert!(idx.get(NodeId(99)).is_none());
    }

    #[test]
    fn test_fractional_range_below_one() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 1, 0),
        ];
        assert!(!index(&nodes, 0.5).are_neighbors(NodeId(1), NodeId(2)));
        assert!(index(&nodes, 1.0).are_neighbors(NodeId(1), NodeId(2)));
    }

    #[test]
    fn test_nodes_on_i32_edges() {
        let nodes = [
            Node::new(1, BuildingKind::Well, i32::MAX, 0),
            Node::new(2, BuildingKind::House, i32::MAX - 1, 0),
            Node::new(3, BuildingKind::Well, i32::MIN, i32::MIN),
            Node::new(4, BuildingKind::House, i32::MIN, i32::MIN + 1),
        ];
        let idx = index(&nodes, 1.0);
        assert_eq!(idx.neighbors(NodeId(1)), vec![NodeId(2)]);
        assert_eq!(idx.neighbors(NodeId(3)), vec![NodeId(4)]);
        assert!(idx.neighbors_of_pos(GridPos::new(i32::MAX, i32::MAX)).is_empty());
        assert!(!idx.are_neighbors(NodeId(1), NodeId(3)));
    }
}
