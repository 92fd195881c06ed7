//! Id allocation for placed buildings.

use std::collections::BTreeMap;

use crate::buildings::{BuildingKind, GridPos, Node, NodeId};
use crate::network::NodeEvents;

/// Owns the live node set and hands out ids. Every change is reported to the
/// supplied `NodeEvents` observer.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a building and return its fresh id. Ids are never reused.
    pub fn place(&mut self, kind: BuildingKind, pos: GridPos, events: &mut dyn NodeEvents) -> NodeId {
        self.next_id += 1;
        let node = Node {
            id: NodeId(self.next_id),
            kind,
            pos,
        };
        self.nodes.insert(node.id, node);
        events.on_node_added(node);
        node.id
    }

    pub fn remove(&mut self, id: NodeId, events: &mut dyn NodeEvents) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        events.on_node_removed(id);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;
    use crate::network::{FlowNetwork, RegistryEvent};
    use crate::resources::ResourceId;
    use std::sync::mpsc;

    #[test]
    fn test_ids_are_fresh() {
        let mut net = FlowNetwork::new(FlowConfig::default());
        let mut registry = NodeRegistry::new();
        let a = registry.place(BuildingKind::Well, GridPos::new(0, 0), &mut net);
        let b = registry.place(BuildingKind::House, GridPos::new(1, 0), &mut net);
        registry.remove(b, &mut net);
        let c = registry.place(BuildingKind::House, GridPos::new(1, 0), &mut net);
        assert_eq!(a, NodeId(1));
        assert_ne!(b, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_drives_network() {
        let mut net = FlowNetwork::new(FlowConfig::default());
        let mut registry = NodeRegistry::new();
        registry.place(BuildingKind::Furnace, GridPos::new(0, 0), &mut net);
        let bakery = registry.place(BuildingKind::Bakery, GridPos::new(1, 0), &mut net);
        assert!(net.query().is_supplied_with(bakery, ResourceId::Heat));
        assert_eq!(net.nodes().count(), registry.len());
    }

    #[test]
    fn test_remove_unknown_is_silent() {
        let (mut tx, rx) = mpsc::channel::<RegistryEvent>();
        let mut registry = NodeRegistry::new();
        assert!(registry.remove(NodeId(7), &mut tx).is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_events_over_channel() {
        let (mut tx, rx) = mpsc::channel::<RegistryEvent>();
        let mut registry = NodeRegistry::new();
        let id = registry.place(BuildingKind::Well, GridPos::new(3, 3), &mut tx);
        registry.remove(id, &mut tx);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RegistryEvent::Added(n) if n.id == id));
        assert_eq!(events[1], RegistryEvent::Removed(id));
    }
}
