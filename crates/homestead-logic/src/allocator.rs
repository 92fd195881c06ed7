//! Greedy capacity allocation for one resource.
//!
//! Consumers are admitted in (priority, distance to nearest provider, id)
//! order. Each takes its full requirement from the reachable provider with
//! the fewest hops (then the shortest straight-line distance, then the lowest
//! id) that still has enough capacity left. Commitments are never revisited,
//! so the result is deterministic but not globally optimal: an early consumer
//! may take a provider a later one needed.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::buildings::{GridPos, NodeId, NodeRef};
use crate::config::FlowConfig;
use crate::pathfinding::PathFinder;
use crate::relay::resolve_live_relays;
use crate::resources::{PipeCategory, ResourceFlowDescriptor, ResourceId};
use crate::spatial::SpatialIndex;

/// A committed supply: `amount` of `resource` from `producer` to `consumer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub consumer: NodeId,
    /// The providing node: a producer or a live capacity relay.
    pub producer: NodeId,
    pub resource: ResourceId,
    pub amount: u32,
    /// Consumer first, producer last, live relays in between.
    pub path: Vec<NodeId>,
}

impl Allocation {
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Does the node appear anywhere on this route?
    pub fn touches(&self, id: NodeId) -> bool {
        self.path.contains(&id)
    }
}

/// Result of allocating one resource over a node snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAllocation {
    pub resource: ResourceId,
    pub pipe_category: PipeCategory,
    pub live_relays: BTreeSet<NodeId>,
    /// Provider → capacity before any commitment.
    pub initial_capacity: BTreeMap<NodeId, u32>,
    /// Provider → capacity left after every commitment.
    pub remaining_capacity: BTreeMap<NodeId, u32>,
    pub supplied: BTreeSet<NodeId>,
    /// Consumers left without supply, in admission order.
    pub unsupplied: Vec<NodeId>,
    /// In admission order.
    pub allocations: Vec<Allocation>,
}

impl ResourceAllocation {
    fn empty(descriptor: &ResourceFlowDescriptor) -> Self {
        Self {
            resource: descriptor.resource,
            pipe_category: descriptor.pipe_category,
            live_relays: BTreeSet::new(),
            initial_capacity: BTreeMap::new(),
            remaining_capacity: BTreeMap::new(),
            supplied: BTreeSet::new(),
            unsupplied: Vec::new(),
            allocations: Vec::new(),
        }
    }

    pub fn is_supplied(&self, id: NodeId) -> bool {
        self.supplied.contains(&id)
    }

    pub fn remaining(&self, provider: NodeId) -> u32 {
        self.remaining_capacity.get(&provider).copied().unwrap_or(0)
    }

    /// Sum of amounts committed from one provider.
    pub fn committed(&self, provider: NodeId) -> u32 {
        self.allocations
            .iter()
            .filter(|a| a.producer == provider)
            .map(|a| a.amount)
            .sum()
    }

    /// Best provider for a start node given the remaining capacities: the
    /// reachable provider with capacity ≥ `requirement` and the fewest hops,
    /// then shortest straight-line distance, then lowest id.
    ///
    /// Returns the provider and the route after the start.
    pub fn best_provider(
        &self,
        index: &SpatialIndex,
        start: NodeRef,
        start_pos: GridPos,
        requirement: u32,
    ) -> Option<(NodeId, Vec<NodeId>)> {
        let finder = PathFinder::new(index, &self.live_relays);
        let mut best: Option<(usize, f64, NodeId, Vec<NodeId>)> = None;

        for (&provider, &left) in &self.remaining_capacity {
            if left < requirement {
                continue;
            }
            let Some(route) = finder.find_path(start, provider) else {
                continue;
            };
            let Some(provider_pos) = index.get(provider).map(|n| n.pos) else {
                continue;
            };
            let hops = route.len();
            let dist = start_pos.distance(provider_pos);
            // Providers iterate in id order, so strict improvement keeps the lower id.
            let better = match &best {
                None => true,
                Some((best_hops, best_dist, _, _)) => match hops.cmp(best_hops) {
                    Ordering::Less => true,
                    Ordering::Equal => dist.total_cmp(best_dist) == Ordering::Less,
                    Ordering::Greater => false,
                },
            };
            if better {
                best = Some((hops, dist, provider, route));
            }
        }

        best.map(|(_, _, provider, route)| (provider, route))
    }
}

struct Admission {
    id: NodeId,
    pos: GridPos,
    priority: u32,
    nearest_provider: f64,
    requirement: u32,
}

/// Allocate one resource over the indexed nodes.
pub fn allocate(
    index: &SpatialIndex,
    config: &FlowConfig,
    descriptor: &ResourceFlowDescriptor,
) -> ResourceAllocation {
    let resource = descriptor.resource;
    let mut result = ResourceAllocation::empty(descriptor);

    // 1. Relay activation
    result.live_relays = resolve_live_relays(index, descriptor);

    // 2. Provider capacity
    for node in index.nodes() {
        if descriptor.is_producer(node.kind) {
            result
                .initial_capacity
                .insert(node.id, config.capacity(node.kind, resource));
        } else if let Some(relay) = descriptor.relay(node.kind) {
            if relay.adds_capacity && result.live_relays.contains(&node.id) {
                let cap = config.capacity(node.kind, resource);
                if cap > 0 {
                    result.initial_capacity.insert(node.id, cap);
                }
            }
        }
    }
    result.remaining_capacity = result.initial_capacity.clone();

    // 3. Consumers with a nonzero requirement
    let provider_positions: Vec<(NodeId, GridPos)> = result
        .initial_capacity
        .iter()
        .filter(|(_, &cap)| cap > 0)
        .filter_map(|(&id, _)| index.get(id).map(|n| (id, n.pos)))
        .collect();

    let mut queue: Vec<Admission> = index
        .nodes()
        .filter(|n| descriptor.is_consumer(n.kind))
        .filter_map(|n| {
            let requirement = config.consumption(n.kind, resource);
            if requirement == 0 {
                return None;
            }
            let nearest_provider = provider_positions
                .iter()
                .filter(|(id, _)| *id != n.id)
                .map(|(_, pos)| n.pos.distance(*pos))
                .fold(f64::INFINITY, f64::min);
            Some(Admission {
                id: n.id,
                pos: n.pos,
                priority: descriptor.priority(n.kind),
                nearest_provider,
                requirement,
            })
        })
        .collect();

    // 4. Admission order
    queue.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.nearest_provider.total_cmp(&b.nearest_provider))
            .then(a.id.cmp(&b.id))
    });

    // 5. Single greedy pass
    for consumer in &queue {
        let choice = result.best_provider(
            index,
            NodeRef::Placed(consumer.id),
            consumer.pos,
            consumer.requirement,
        );
        let Some((provider, route)) = choice else {
            log::trace!(
                "{} {}: unsupplied (needs {})",
                resource.name(),
                consumer.id,
                consumer.requirement
            );
            result.unsupplied.push(consumer.id);
            continue;
        };

        let left = result.remaining_capacity.entry(provider).or_insert(0);
        match left.checked_sub(consumer.requirement) {
            Some(rest) => *left = rest,
            None => {
                log::warn!(
                    "{} provider {} over-committed by {}; clamping to zero",
                    resource.name(),
                    provider,
                    consumer.requirement - *left
                );
                *left = 0;
            }
        }

        let mut path = Vec::with_capacity(route.len() + 1);
        path.push(consumer.id);
        path.extend(route);
        log::trace!(
            "{} {}: {} from {} over {} hop(s)",
            resource.name(),
            consumer.id,
            consumer.requirement,
            provider,
            path.len() - 1
        );
        result.supplied.insert(consumer.id);
        result.allocations.push(Allocation {
            consumer: consumer.id,
            producer: provider,
            resource,
            amount: consumer.requirement,
            path,
        });
    }

    result
}
