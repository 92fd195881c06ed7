//! Legacy direct-neighbor supply rule.
//!
//! Some kinds are not fed through the capacity tables. Their input counts as
//! present when a neighbor of the source kind exists, or when a neighboring
//! tank chains back to such a source through other tanks.

use crate::buildings::{BuildingKind, GridPos, NodeId};
use crate::config::DirectRequirement;
use crate::spatial::SpatialIndex;
use crate::traversal::breadth_first;

/// Is `req` met for a building at `pos`?
///
/// `this` is the building's own id when placed; it is never used as a link
/// in its own tank chain.
pub fn requirement_met(
    index: &SpatialIndex,
    pos: GridPos,
    this: Option<NodeId>,
    req: &DirectRequirement,
) -> bool {
    let is_kind = |id: NodeId, kind: BuildingKind| {
        Some(id) != this && index.get(id).is_some_and(|n| n.kind == kind)
    };

    let around = index.neighbors_of_pos(pos);
    if around.iter().any(|&id| is_kind(id, req.source)) {
        return true;
    }

    let Some(tank) = req.tank else {
        return false;
    };
    let first_tanks: Vec<NodeId> = around.into_iter().filter(|&id| is_kind(id, tank)).collect();

    breadth_first(
        first_tanks,
        |v| {
            index
                .neighbors(v)
                .into_iter()
                .filter(|&id| is_kind(id, tank))
                .collect::<Vec<_>>()
        },
        |v| index.neighbors(v).into_iter().any(|id| is_kind(id, req.source)),
    )
    .found()
}
