//! Read-only questions over the committed snapshot.
//!
//! `SupplyQuery` borrows a snapshot and the config it was built with. All
//! answers are pure reads; previews never commit capacity.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::allocator::Allocation;
use crate::buildings::{BuildingKind, GridPos, NodeId, NodeRef};
use crate::config::FlowConfig;
use crate::direct::requirement_met;
use crate::resources::{PipeCategory, ResourceId};
use crate::snapshot::{PipeSegment, ResourceSummary, SupplySnapshot};

/// Which way a resource moves across a connection, seen from the node asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FlowDirection {
    /// The peer feeds this node.
    Incoming,
    /// This node feeds the peer.
    Outgoing,
}

/// A pipe connection from one building to a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Connection {
    pub peer: NodeId,
    pub category: PipeCategory,
    pub direction: FlowDirection,
}

/// Query surface over one committed snapshot.
#[derive(Clone, Copy)]
pub struct SupplyQuery<'a> {
    snapshot: &'a SupplySnapshot,
    config: &'a FlowConfig,
}

impl<'a> SupplyQuery<'a> {
    pub fn new(snapshot: &'a SupplySnapshot, config: &'a FlowConfig) -> Self {
        Self { snapshot, config }
    }

    pub fn snapshot(&self) -> &'a SupplySnapshot {
        self.snapshot
    }

    pub fn is_supplied_with(&self, id: NodeId, resource: ResourceId) -> bool {
        self.snapshot.is_supplied(id, resource)
    }

    /// Every piped requirement supplied and every direct requirement met.
    /// Unknown nodes are never operational.
    pub fn is_fully_operational(&self, id: NodeId) -> bool {
        let index = self.snapshot.index();
        let Some(node) = index.get(id) else {
            return false;
        };
        let piped = self
            .config
            .piped_requirements(node.kind)
            .into_iter()
            .all(|(resource, _)| self.is_supplied_with(id, resource));
        piped
            && self
                .config
                .direct_requirements(node.kind)
                .iter()
                .all(|req| requirement_met(index, node.pos, Some(id), req))
    }

    /// Would a `kind` placed at `pos` be operational right now?
    ///
    /// Uses the remaining capacities of the committed snapshot, so capacity
    /// already promised to placed buildings is not offered again.
    pub fn would_be_operational(&self, kind: BuildingKind, pos: GridPos) -> bool {
        let index = self.snapshot.index();
        let preview = NodeRef::Hypothetical { kind, pos };

        for (resource, requirement) in self.config.piped_requirements(kind) {
            let Some(allocation) = self.snapshot.resource(resource) else {
                return false;
            };
            if allocation
                .best_provider(index, preview, pos, requirement)
                .is_none()
            {
                return false;
            }
        }

        self.config
            .direct_requirements(kind)
            .iter()
            .all(|req| requirement_met(index, pos, None, req))
    }

    /// Pipe connections for a building.
    ///
    /// Placed buildings report the adjacent hops of every committed route
    /// through them. Previews have no routes, so they report every neighbor
    /// the declared roles would let them exchange a resource with.
    pub fn connections_for_building(&self, node: NodeRef) -> Vec<Connection> {
        match node {
            NodeRef::Placed(id) => self.committed_connections(id),
            NodeRef::Hypothetical { kind, pos } => self.proximity_connections(kind, pos),
        }
    }

    fn committed_connections(&self, id: NodeId) -> Vec<Connection> {
        let mut found = BTreeSet::new();
        for r in self.snapshot.resources() {
            for allocation in &r.allocations {
                let path = &allocation.path;
                for (i, _) in path.iter().enumerate().filter(|(_, &n)| n == id) {
                    if let Some(&upstream) = path.get(i + 1) {
                        found.insert(Connection {
                            peer: upstream,
                            category: r.pipe_category,
                            direction: FlowDirection::Incoming,
                        });
                    }
                    if i > 0 {
                        found.insert(Connection {
                            peer: path[i - 1],
                            category: r.pipe_category,
                            direction: FlowDirection::Outgoing,
                        });
                    }
                }
            }
        }
        found.into_iter().collect()
    }

    fn proximity_connections(&self, kind: BuildingKind, pos: GridPos) -> Vec<Connection> {
        let index = self.snapshot.index();
        let around = index.neighbors_of_pos(pos);
        let mut found = BTreeSet::new();

        for descriptor in &self.config.descriptors {
            let receives = descriptor.is_relay(kind)
                || (descriptor.is_consumer(kind)
                    && self.config.consumption(kind, descriptor.resource) > 0);
            let feeds = descriptor.can_feed(kind);

            for &peer in &around {
                let Some(other) = index.get(peer) else {
                    continue;
                };
                if receives && descriptor.can_feed(other.kind) {
                    found.insert(Connection {
                        peer,
                        category: descriptor.pipe_category,
                        direction: FlowDirection::Incoming,
                    });
                }
                if feeds && descriptor.can_receive(other.kind) {
                    found.insert(Connection {
                        peer,
                        category: descriptor.pipe_category,
                        direction: FlowDirection::Outgoing,
                    });
                }
            }
        }
        found.into_iter().collect()
    }

    /// Uncommitted capacity of a provider; 0 for anything else.
    pub fn remaining_capacity(&self, id: NodeId, resource: ResourceId) -> u32 {
        self.snapshot
            .resource(resource)
            .map(|r| r.remaining(id))
            .unwrap_or(0)
    }

    /// Committed allocations whose route passes through the node.
    pub fn allocations_for(&self, id: NodeId) -> Vec<&'a Allocation> {
        self.snapshot.allocations().filter(|a| a.touches(id)).collect()
    }

    /// Consumers without supply, in admission order.
    pub fn unsupplied_consumers(&self, resource: ResourceId) -> &'a [NodeId] {
        self.snapshot
            .resource(resource)
            .map(|r| r.unsupplied.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_live_relay(&self, id: NodeId, resource: ResourceId) -> bool {
        self.snapshot
            .resource(resource)
            .is_some_and(|r| r.live_relays.contains(&id))
    }

    pub fn pipe_segments(&self) -> Vec<PipeSegment> {
        self.snapshot.pipe_segments()
    }

    pub fn summary(&self, resource: ResourceId) -> Option<ResourceSummary> {
        self.snapshot.summary(resource)
    }
}
