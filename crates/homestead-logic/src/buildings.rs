//! Building kinds, node identity and grid positions.
//!
//! Nodes are owned by whatever registry the caller uses; the engine only
//! ever reads them. `NodeRef` lets preview queries describe a building that
//! has not been placed yet without inventing a fake id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a placed building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer tile coordinates on the settlement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance in tiles. Exact, no rounding.
    pub fn distance_sq(self, other: GridPos) -> i64 {
        let dx = (self.x as i64) - (other.x as i64);
        let dy = (self.y as i64) - (other.y as i64);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance in tiles.
    pub fn distance(self, other: GridPos) -> f64 {
        (self.distance_sq(other) as f64).sqrt()
    }
}

/// Closed set of building kinds a settlement can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BuildingKind {
    // Water network
    Well = 0,
    Cistern = 1,
    Aqueduct = 2,
    // Heat network
    Furnace = 10,
    HeatStore = 11,
    Flue = 12,
    // Piped consumers
    House = 20,
    Infirmary = 21,
    Bathhouse = 22,
    Greenhouse = 23,
    Bakery = 24,
    // Direct-neighbor consumers
    Watermill = 30,
    Smokehouse = 31,
    // No requirements
    Storehouse = 40,
}

impl BuildingKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Well => "Well",
            Self::Cistern => "Cistern",
            Self::Aqueduct => "Aqueduct",
            Self::Furnace => "Furnace",
            Self::HeatStore => "Heat Store",
            Self::Flue => "Flue",
            Self::House => "House",
            Self::Infirmary => "Infirmary",
            Self::Bathhouse => "Bathhouse",
            Self::Greenhouse => "Greenhouse",
            Self::Bakery => "Bakery",
            Self::Watermill => "Watermill",
            Self::Smokehouse => "Smokehouse",
            Self::Storehouse => "Storehouse",
        }
    }

    pub fn all() -> &'static [BuildingKind] {
        &[
            Self::Well,
            Self::Cistern,
            Self::Aqueduct,
            Self::Furnace,
            Self::HeatStore,
            Self::Flue,
            Self::House,
            Self::Infirmary,
            Self::Bathhouse,
            Self::Greenhouse,
            Self::Bakery,
            Self::Watermill,
            Self::Smokehouse,
            Self::Storehouse,
        ]
    }
}

/// A placed building as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: BuildingKind,
    pub pos: GridPos,
}

impl Node {
    pub fn new(id: u32, kind: BuildingKind, x: i32, y: i32) -> Self {
        Self {
            id: NodeId(id),
            kind,
            pos: GridPos::new(x, y),
        }
    }
}

/// A building a query is about: either placed, or a placement preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Placed(NodeId),
    Hypothetical { kind: BuildingKind, pos: GridPos },
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Placed(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_sq_is_exact() {
        let a = GridPos::new(0, 0);
        let b = GridPos::new(3, 4);
        assert_eq!(a.distance_sq(b), 25);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = GridPos::new(-2, 7);
        let b = GridPos::new(5, -1);
        assert_eq!(a.distance_sq(b), b.distance_sq(a));
    }

    #[test]
    fn test_all_kinds_unique_names() {
        let mut names: Vec<_> = BuildingKind::all().iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BuildingKind::all().len());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&BuildingKind::HeatStore).unwrap();
        assert_eq!(json, "\"heat_store\"");
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(42).to_string(), "#42");
    }
}
