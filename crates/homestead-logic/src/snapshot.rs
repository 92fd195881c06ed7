//! The committed result of one rebuild.
//!
//! A `SupplySnapshot` is built from scratch for a node set and never patched.
//! It owns the spatial index of that rebuild plus one `ResourceAllocation`
//! per configured resource.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::allocator::{allocate, Allocation, ResourceAllocation};
use crate::buildings::{Node, NodeId};
use crate::config::FlowConfig;
use crate::resources::{PipeCategory, ResourceId};
use crate::spatial::SpatialIndex;

/// One drawable pipe between two neighbors. `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PipeSegment {
    pub a: NodeId,
    pub b: NodeId,
    pub category: PipeCategory,
}

impl PipeSegment {
    pub fn new(x: NodeId, y: NodeId, category: PipeCategory) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self { a, b, category }
    }
}

/// Per-resource totals for dashboards and the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub resource: ResourceId,
    pub consumers: usize,
    pub supplied: usize,
    pub unsupplied: usize,
    pub live_relays: usize,
    pub providers: usize,
    pub initial_capacity: u64,
    pub committed: u64,
    pub remaining: u64,
}

/// Allocation state for one node set.
#[derive(Debug, Clone, Serialize)]
pub struct SupplySnapshot {
    #[serde(skip)]
    index: SpatialIndex,
    resources: BTreeMap<ResourceId, ResourceAllocation>,
}

impl SupplySnapshot {
    /// Run every resource's allocator over `nodes`.
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a Node>, config: &FlowConfig) -> Self {
        let index = SpatialIndex::new(nodes, config.max_interaction_distance);
        let mut resources = BTreeMap::new();
        for descriptor in &config.descriptors {
            let allocation = allocate(&index, config, descriptor);
            log::debug!(
                "{}: {} allocation(s), {} unsupplied, {} live relay(s)",
                descriptor.resource.name(),
                allocation.allocations.len(),
                allocation.unsupplied.len(),
                allocation.live_relays.len()
            );
            resources.insert(descriptor.resource, allocation);
        }
        Self { index, resources }
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn resource(&self, resource: ResourceId) -> Option<&ResourceAllocation> {
        self.resources.get(&resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceAllocation> {
        self.resources.values()
    }

    pub fn is_supplied(&self, id: NodeId, resource: ResourceId) -> bool {
        self.resources
            .get(&resource)
            .is_some_and(|r| r.is_supplied(id))
    }

    /// Every committed allocation, resource by resource.
    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.resources.values().flat_map(|r| r.allocations.iter())
    }

    /// Deduplicated pipe segments over every allocation path.
    pub fn pipe_segments(&self) -> Vec<PipeSegment> {
        let mut segments = BTreeSet::new();
        for r in self.resources.values() {
            for allocation in &r.allocations {
                for pair in allocation.path.windows(2) {
                    segments.insert(PipeSegment::new(pair[0], pair[1], r.pipe_category));
                }
            }
        }
        segments.into_iter().collect()
    }

    pub fn summary(&self, resource: ResourceId) -> Option<ResourceSummary> {
        let r = self.resources.get(&resource)?;
        // Totals widen to u64: several large providers can exceed u32.
        let initial: u64 = r.initial_capacity.values().map(|&c| u64::from(c)).sum();
        let remaining: u64 = r.remaining_capacity.values().map(|&c| u64::from(c)).sum();
        let committed: u64 = r.allocations.iter().map(|a| u64::from(a.amount)).sum();
        Some(ResourceSummary {
            resource,
            consumers: r.supplied.len() + r.unsupplied.len(),
            supplied: r.supplied.len(),
            unsupplied: r.unsupplied.len(),
            live_relays: r.live_relays.len(),
            providers: r.initial_capacity.len(),
            initial_capacity: initial,
            committed,
            remaining,
        })
    }
}
