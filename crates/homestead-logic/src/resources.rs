//! Resource flow descriptors and per-kind amount tables.
//!
//! Each resource carried by the settlement's pipes has one
//! `ResourceFlowDescriptor` naming which building kinds produce it, relay it
//! and consume it. Amounts live in `ResourceTable`s keyed by kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::buildings::BuildingKind;

/// Resources that flow through pipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceId {
    Water,
    Heat,
}

impl ResourceId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Heat => "heat",
        }
    }

    pub fn all() -> &'static [ResourceId] {
        &[Self::Water, Self::Heat]
    }
}

/// Label the renderer uses to pick a pipe mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeCategory {
    WaterPipe,
    HeatDuct,
}

/// A relay kind and whether it adds its own capacity once live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySpec {
    pub kind: BuildingKind,
    /// `false` = pure pass-through hop.
    pub adds_capacity: bool,
}

/// Static description of how one resource flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceFlowDescriptor {
    pub resource: ResourceId,
    pub producers: Vec<BuildingKind>,
    pub relays: Vec<RelaySpec>,
    pub consumers: Vec<BuildingKind>,
    /// Lower number = served first. Kinds absent from the map are served last.
    #[serde(default)]
    pub priorities: BTreeMap<BuildingKind, u32>,
    pub pipe_category: PipeCategory,
}

impl ResourceFlowDescriptor {
    pub fn is_producer(&self, kind: BuildingKind) -> bool {
        self.producers.contains(&kind)
    }

    pub fn relay(&self, kind: BuildingKind) -> Option<&RelaySpec> {
        self.relays.iter().find(|r| r.kind == kind)
    }

    pub fn is_relay(&self, kind: BuildingKind) -> bool {
        self.relay(kind).is_some()
    }

    pub fn is_consumer(&self, kind: BuildingKind) -> bool {
        self.consumers.contains(&kind)
    }

    /// Priority of a consumer kind; configuration gaps rank last.
    pub fn priority(&self, kind: BuildingKind) -> u32 {
        self.priorities.get(&kind).copied().unwrap_or(u32::MAX)
    }

    /// True if this kind can push the resource onward (producer or relay).
    pub fn can_feed(&self, kind: BuildingKind) -> bool {
        self.is_producer(kind) || self.is_relay(kind)
    }

    /// True if this kind can accept the resource from a neighbor.
    pub fn can_receive(&self, kind: BuildingKind) -> bool {
        self.is_consumer(kind) || self.is_relay(kind)
    }
}

/// Fixed per-cycle amounts keyed by building kind, then resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable(pub BTreeMap<BuildingKind, BTreeMap<ResourceId, u32>>);

impl ResourceTable {
    /// Amount for a kind and resource; 0 when not listed.
    pub fn get(&self, kind: BuildingKind, resource: ResourceId) -> u32 {
        self.0
            .get(&kind)
            .and_then(|row| row.get(&resource))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, kind: BuildingKind, resource: ResourceId, amount: u32) {
        self.0.entry(kind).or_default().insert(resource, amount);
    }

    /// Builder-style `set`.
    pub fn with(mut self, kind: BuildingKind, resource: ResourceId, amount: u32) -> Self {
        self.set(kind, resource, amount);
        self
    }
}
