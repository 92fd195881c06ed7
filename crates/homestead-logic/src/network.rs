//! The owner of the committed snapshot.
//!
//! `FlowNetwork` mirrors the node set it is told about and rebuilds the whole
//! `SupplySnapshot` after every structural event. Events arrive through the
//! `NodeEvents` observer trait (direct callbacks) or as `RegistryEvent`
//! values (e.g. drained from an `mpsc` channel).

use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, Sender};

use crate::buildings::{Node, NodeId};
use crate::config::FlowConfig;
use crate::query::SupplyQuery;
use crate::snapshot::SupplySnapshot;

/// Observer for structural changes to the node set.
pub trait NodeEvents {
    fn on_node_added(&mut self, node: Node);
    fn on_node_removed(&mut self, id: NodeId);
}

/// A structural change, as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(Node),
    Removed(NodeId),
}

/// Forwards events into a channel for a `FlowNetwork` on the other end.
impl NodeEvents for Sender<RegistryEvent> {
    fn on_node_added(&mut self, node: Node) {
        if self.send(RegistryEvent::Added(node)).is_err() {
            log::debug!("flow network gone; dropped add of {}", node.id);
        }
    }

    fn on_node_removed(&mut self, id: NodeId) {
        if self.send(RegistryEvent::Removed(id)).is_err() {
            log::debug!("flow network gone; dropped removal of {}", id);
        }
    }
}

type RebuildListener = Box<dyn FnMut(&SupplySnapshot)>;

/// Node mirror + committed snapshot + rebuild listeners.
pub struct FlowNetwork {
    config: FlowConfig,
    nodes: BTreeMap<NodeId, Node>,
    snapshot: SupplySnapshot,
    listeners: Vec<RebuildListener>,
    rebuilds: u64,
}

impl FlowNetwork {
    pub fn new(config: FlowConfig) -> Self {
        Self::with_nodes(config, std::iter::empty::<Node>())
    }

    /// Start from an existing node set, e.g. after a load.
    pub fn with_nodes(config: FlowConfig, nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes: BTreeMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id, n)).collect();
        let snapshot = SupplySnapshot::build(nodes.values(), &config);
        Self {
            config,
            nodes,
            snapshot,
            listeners: Vec::new(),
            rebuilds: 1,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Mirrored nodes, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn snapshot(&self) -> &SupplySnapshot {
        &self.snapshot
    }

    pub fn query(&self) -> SupplyQuery<'_> {
        SupplyQuery::new(&self.snapshot, &self.config)
    }

    /// Number of snapshots built so far, including the initial one.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Called with every new snapshot after it is committed.
    pub fn subscribe(&mut self, listener: impl FnMut(&SupplySnapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Discard the current snapshot and build a fresh one.
    pub fn rebuild(&mut self) {
        self.snapshot = SupplySnapshot::build(self.nodes.values(), &self.config);
        self.rebuilds += 1;
        log::debug!(
            "rebuild #{}: {} node(s), {} allocation(s)",
            self.rebuilds,
            self.nodes.len(),
            self.snapshot.allocations().count()
        );
        for listener in &mut self.listeners {
            listener(&self.snapshot);
        }
    }

    pub fn apply(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::Added(node) => self.on_node_added(node),
            RegistryEvent::Removed(id) => self.on_node_removed(id),
        }
    }

    /// Apply every event waiting on the channel. Returns how many were applied.
    pub fn drain(&mut self, events: &Receiver<RegistryEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }
}

impl NodeEvents for FlowNetwork {
    fn on_node_added(&mut self, node: Node) {
        if let Some(old) = self.nodes.insert(node.id, node) {
            log::debug!("{} replaced ({} → {})", node.id, old.kind.name(), node.kind.name());
        } else {
            log::debug!("{} added: {} at ({}, {})", node.id, node.kind.name(), node.pos.x, node.pos.y);
        }
        self.rebuild();
    }

    fn on_node_removed(&mut self, id: NodeId) {
        match self.nodes.remove(&id) {
            Some(node) => {
                log::debug!("{} removed: {}", id, node.kind.name());
                self.rebuild();
            }
            None => log::debug!("ignoring removal of unknown node {}", id),
        }
    }
}
