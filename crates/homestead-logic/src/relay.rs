//! Relay activation: which relays are connected back to a producer.
//!
//! Multi-source BFS from every producer of a resource, hopping only through
//! relays of that resource. A relay not reached this way is inert: it does
//! not forward and does not contribute capacity.

use std::collections::BTreeSet;

use crate::buildings::NodeId;
use crate::resources::ResourceFlowDescriptor;
use crate::spatial::SpatialIndex;
use crate::traversal::breadth_first;

/// Live relays for one resource, given the producers and relay candidates.
pub fn live_relays(
    index: &SpatialIndex,
    producers: &[NodeId],
    relays: &BTreeSet<NodeId>,
) -> BTreeSet<NodeId> {
    let search = breadth_first(
        producers.iter().copied(),
        |v| {
            index
                .neighbors(v)
                .into_iter()
                .filter(move |n| relays.contains(n))
        },
        |_| false,
    );
    search.discovered().filter(|id| relays.contains(id)).collect()
}

/// Gather producers and relays for `descriptor` from the index and resolve
/// which relays are live.
pub fn resolve_live_relays(
    index: &SpatialIndex,
    descriptor: &ResourceFlowDescriptor,
) -> BTreeSet<NodeId> {
    let producers: Vec<NodeId> = index
        .nodes()
        .filter(|n| descriptor.is_producer(n.kind))
        .map(|n| n.id)
        .collect();
    let relays: BTreeSet<NodeId> = index
        .nodes()
        .filter(|n| descriptor.is_relay(n.kind))
        .map(|n| n.id)
        .collect();
    live_relays(index, &producers, &relays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{BuildingKind, Node};
    use crate::config::FlowConfig;
    use crate::resources::ResourceId;

    fn resolve(nodes: &[Node]) -> BTreeSet<NodeId> {
        let config = FlowConfig::default();
        let index = SpatialIndex::new(nodes, config.max_interaction_distance);
        let water = config.descriptor(ResourceId::Water).unwrap();
        resolve_live_relays(&index, water)
    }

    #[test]
    fn test_relay_next_to_producer_is_live() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
        ];
        assert_eq!(resolve(&nodes), BTreeSet::from([NodeId(2)]));
    }

    #[test]
    fn test_chain_of_relays() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
            Node::new(3, BuildingKind::Cistern, 4, 0),
            Node::new(4, BuildingKind::Aqueduct, 6, 0),
        ];
        assert_eq!(resolve(&nodes), BTreeSet::from([NodeId(2), NodeId(3), NodeId(4)]));
    }

    #[test]
    fn test_isolated_relay_is_inert() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Cistern, 10, 10),
            Node::new(3, BuildingKind::Aqueduct, 11, 10),
        ];
        assert!(resolve(&nodes).is_empty());
    }

    #[test]
    fn test_consumers_do_not_bridge_relays() {
        // Relay 3 is only reachable through house 2, which does not forward.
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 2, 0),
            Node::new(3, BuildingKind::Aqueduct, 4, 0),
        ];
        assert!(resolve(&nodes).is_empty());
    }

    #[test]
    fn test_other_resource_relays_ignored() {
        let nodes = [
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Flue, 2, 0),
            Node::new(3, BuildingKind::Aqueduct, 4, 0),
        ];
        assert!(resolve(&nodes).is_empty());
    }

    #[test]
    fn test_no_producers() {
        let nodes = [Node::new(1, BuildingKind::Aqueduct, 0, 0)];
        assert!(resolve(&nodes).is_empty());
    }
}
