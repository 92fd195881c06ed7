//! Static flow configuration: descriptors, amount tables, interaction range.
//!
//! `FlowConfig::default()` is the built-in settlement. A config can also be
//! loaded from JSON; loading validates it and rejects anything with
//! error-severity issues. Validation collects every issue instead of
//! stopping at the first.
//!
//! ```
//! use homestead_logic::config::{validate_config, FlowConfig, Severity};
//!
//! let config = FlowConfig::default();
//! let issues = validate_config(&config);
//! assert!(issues.iter().all(|i| i.severity != Severity::Error));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::buildings::BuildingKind;
use crate::resources::{PipeCategory, RelaySpec, ResourceFlowDescriptor, ResourceId, ResourceTable};

/// Default range within which two buildings share pipes.
pub const DEFAULT_MAX_INTERACTION_DISTANCE: f64 = 2.0;

/// Legacy requirement satisfied only by a direct neighbor of `source`, or by
/// a neighboring `tank` that chains back to one through other tanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectRequirement {
    pub resource: ResourceId,
    pub source: BuildingKind,
    #[serde(default)]
    pub tank: Option<BuildingKind>,
}

/// Everything the engine treats as load-time immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub max_interaction_distance: f64,
    pub descriptors: Vec<ResourceFlowDescriptor>,
    pub capacities: ResourceTable,
    pub consumption: ResourceTable,
    #[serde(default)]
    pub direct_requirements: BTreeMap<BuildingKind, Vec<DirectRequirement>>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        use BuildingKind::*;

        let water = ResourceFlowDescriptor {
            resource: ResourceId::Water,
            producers: vec![Well],
            relays: vec![
                RelaySpec {
                    kind: Cistern,
                    adds_capacity: true,
                },
                RelaySpec {
                    kind: Aqueduct,
                    adds_capacity: false,
                },
            ],
            consumers: vec![Infirmary, Greenhouse, House, Bathhouse],
            priorities: BTreeMap::from([(Infirmary, 0), (Greenhouse, 1), (House, 2), (Bathhouse, 3)]),
            pipe_category: PipeCategory::WaterPipe,
        };

        let heat = ResourceFlowDescriptor {
            resource: ResourceId::Heat,
            producers: vec![Furnace],
            relays: vec![
                RelaySpec {
                    kind: HeatStore,
                    adds_capacity: true,
                },
                RelaySpec {
                    kind: Flue,
                    adds_capacity: false,
                },
            ],
            consumers: vec![Infirmary, House, Bakery, Greenhouse, Bathhouse],
            priorities: BTreeMap::from([
                (Infirmary, 0),
                (House, 1),
                (Bakery, 2),
                (Greenhouse, 3),
                (Bathhouse, 4),
            ]),
            pipe_category: PipeCategory::HeatDuct,
        };

        let capacities = ResourceTable::default()
            .with(Well, ResourceId::Water, 12)
            .with(Cistern, ResourceId::Water, 6)
            .with(Furnace, ResourceId::Heat, 10)
            .with(HeatStore, ResourceId::Heat, 4);

        let consumption = ResourceTable::default()
            .with(Infirmary, ResourceId::Water, 3)
            .with(Infirmary, ResourceId::Heat, 3)
            .with(Greenhouse, ResourceId::Water, 4)
            .with(Greenhouse, ResourceId::Heat, 2)
            .with(House, ResourceId::Water, 2)
            .with(House, ResourceId::Heat, 2)
            .with(Bakery, ResourceId::Heat, 3)
            .with(Bathhouse, ResourceId::Water, 5)
            .with(Bathhouse, ResourceId::Heat, 4);

        let water_tank = DirectRequirement {
            resource: ResourceId::Water,
            source: Well,
            tank: Some(Cistern),
        };
        let heat_tank = DirectRequirement {
            resource: ResourceId::Heat,
            source: Furnace,
            tank: Some(HeatStore),
        };
        let direct_requirements = BTreeMap::from([
            (Watermill, vec![water_tank]),
            (Cistern, vec![water_tank]),
            (Smokehouse, vec![heat_tank]),
            (HeatStore, vec![heat_tank]),
        ]);

        Self {
            max_interaction_distance: DEFAULT_MAX_INTERACTION_DISTANCE,
            descriptors: vec![water, heat],
            capacities,
            consumption,
            direct_requirements,
        }
    }
}

impl FlowConfig {
    /// Parse and validate a JSON config. Warnings are logged, errors reject.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FlowConfig = serde_json::from_str(json)?;
        let issues = validate_config(&config);
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|i| i.severity == Severity::Error);
        for w in &warnings {
            log::warn!("flow config [{}]: {}", w.category, w.message);
        }
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn descriptor(&self, resource: ResourceId) -> Option<&ResourceFlowDescriptor> {
        self.descriptors.iter().find(|d| d.resource == resource)
    }

    pub fn capacity(&self, kind: BuildingKind, resource: ResourceId) -> u32 {
        self.capacities.get(kind, resource)
    }

    pub fn consumption(&self, kind: BuildingKind, resource: ResourceId) -> u32 {
        self.consumption.get(kind, resource)
    }

    /// Priority of `kind` for `resource`; unknown resource or kind ranks last.
    pub fn priority(&self, resource: ResourceId, kind: BuildingKind) -> u32 {
        self.descriptor(resource)
            .map(|d| d.priority(kind))
            .unwrap_or(u32::MAX)
    }

    /// Resources this kind draws through pipes, with the amount per cycle.
    pub fn piped_requirements(&self, kind: BuildingKind) -> Vec<(ResourceId, u32)> {
        self.descriptors
            .iter()
            .filter(|d| d.is_consumer(kind))
            .map(|d| (d.resource, self.consumption(kind, d.resource)))
            .filter(|&(_, amount)| amount > 0)
            .collect()
    }

    pub fn direct_requirements(&self, kind: BuildingKind) -> &[DirectRequirement] {
        self.direct_requirements
            .get(&kind)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Config load failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("flow config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("flow config has {} error(s), first: {}", .0.len(), first_message(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn first_message(issues: &[ConfigIssue]) -> &str {
    issues.first().map(|i| i.message.as_str()).unwrap_or("")
}

/// A single config validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub category: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Validate a flow config, returning every issue found.
pub fn validate_config(config: &FlowConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    let d = config.max_interaction_distance;
    if !d.is_finite() || d <= 0.0 {
        issues.push(ConfigIssue {
            category: "distance",
            severity: Severity::Error,
            message: format!("max_interaction_distance must be positive and finite, got {}", d),
        });
    }

    let mut seen = BTreeSet::new();
    for desc in &config.descriptors {
        if !seen.insert(desc.resource) {
            issues.push(ConfigIssue {
                category: "descriptor",
                severity: Severity::Error,
                message: format!("resource {} has more than one descriptor", desc.resource.name()),
            });
        }
        issues.extend(check_roles(desc));
        issues.extend(check_amounts(config, desc));
    }

    for (kind, reqs) in &config.direct_requirements {
        for req in reqs {
            if req.tank == Some(req.source) {
                issues.push(ConfigIssue {
                    category: "direct",
                    severity: Severity::Error,
                    message: format!(
                        "{} direct {} requirement uses {} as both source and tank",
                        kind.name(),
                        req.resource.name(),
                        req.source.name()
                    ),
                });
            }
        }
    }

    issues
}

fn check_roles(desc: &ResourceFlowDescriptor) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let relay_kinds: Vec<BuildingKind> = desc.relays.iter().map(|r| r.kind).collect();

    let overlaps = [
        ("producer", &desc.producers, "relay", &relay_kinds),
        ("producer", &desc.producers, "consumer", &desc.consumers),
        ("relay", &relay_kinds, "consumer", &desc.consumers),
    ];
    for (a_name, a, b_name, b) in overlaps {
        for kind in a.iter().filter(|k| b.contains(k)) {
            issues.push(ConfigIssue {
                category: "roles",
                severity: Severity::Error,
                message: format!(
                    "{} is both {} and {} for {}",
                    kind.name(),
                    a_name,
                    b_name,
                    desc.resource.name()
                ),
            });
        }
    }

    let mut dup = BTreeSet::new();
    for kind in &relay_kinds {
        if !dup.insert(*kind) {
            issues.push(ConfigIssue {
                category: "roles",
                severity: Severity::Error,
                message: format!("{} listed twice as {} relay", kind.name(), desc.resource.name()),
            });
        }
    }
    issues
}

fn check_amounts(config: &FlowConfig, desc: &ResourceFlowDescriptor) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let r = desc.resource;

    for kind in &desc.producers {
        if config.capacity(*kind, r) == 0 {
            issues.push(ConfigIssue {
                category: "capacity",
                severity: Severity::Warning,
                message: format!("producer {} has no {} capacity", kind.name(), r.name()),
            });
        }
    }
    for relay in desc.relays.iter().filter(|r| r.adds_capacity) {
        if config.capacity(relay.kind, r) == 0 {
            issues.push(ConfigIssue {
                category: "capacity",
                severity: Severity::Warning,
                message: format!(
                    "relay {} adds capacity but has no {} capacity",
                    relay.kind.name(),
                    r.name()
                ),
            });
        }
    }
    for kind in &desc.consumers {
        if config.consumption(*kind, r) == 0 {
            issues.push(ConfigIssue {
                category: "consumption",
                severity: Severity::Warning,
                message: format!("consumer {} requires no {}", kind.name(), r.name()),
            });
        }
        if !desc.priorities.contains_key(kind) {
            issues.push(ConfigIssue {
                category: "priority",
                severity: Severity::Warning,
                message: format!("consumer {} has no {} priority, served last", kind.name(), r.name()),
            });
        }
    }
    issues
}
