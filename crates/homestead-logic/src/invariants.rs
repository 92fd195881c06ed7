//! Post-hoc checks over a built snapshot.
//!
//! Pure functions that report what is wrong rather than panicking. The
//! harness and the property tests run these over every snapshot they build;
//! a correct allocator never produces a violation.

use std::collections::{BTreeMap, BTreeSet};

use crate::allocator::{Allocation, ResourceAllocation};
use crate::config::FlowConfig;
use crate::snapshot::SupplySnapshot;
use crate::spatial::SpatialIndex;

/// One broken guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub category: &'static str,
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Run every check over every resource in the snapshot.
pub fn check_snapshot(snapshot: &SupplySnapshot, config: &FlowConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for r in snapshot.resources() {
        violations.extend(check_capacity(r));
        violations.extend(check_routes(snapshot.index(), r));
        violations.extend(check_amounts(snapshot.index(), config, r));
        violations.extend(check_supplied_set(r));
    }
    violations
}

// ── Capacity ────────────────────────────────────────────────────────────

/// Committed amounts never exceed a provider's capacity, and the remaining
/// figure is exactly what is left.
pub fn check_capacity(r: &ResourceAllocation) -> Vec<InvariantViolation> {
    let mut errors = Vec::new();
    let name = r.resource.name();

    for a in &r.allocations {
        if !r.initial_capacity.contains_key(&a.producer) {
            errors.push(InvariantViolation {
                category: "capacity",
                message: format!("{name}: {} draws from non-provider {}", a.consumer, a.producer),
            });
        }
    }

    for (&provider, &initial) in &r.initial_capacity {
        let committed: u64 = r
            .allocations
            .iter()
            .filter(|a| a.producer == provider)
            .map(|a| u64::from(a.amount))
            .sum();
        if committed > u64::from(initial) {
            errors.push(InvariantViolation {
                category: "capacity",
                message: format!("{name}: {provider} committed {committed} of {initial}"),
            });
            continue;
        }
        let expected = u64::from(initial) - committed;
        let remaining = u64::from(r.remaining(provider));
        if remaining != expected {
            errors.push(InvariantViolation {
                category: "capacity",
                message: format!("{name}: {provider} reports {remaining} left, expected {expected}"),
            });
        }
    }
    errors
}

// ── Routes ──────────────────────────────────────────────────────────────

/// Paths run consumer → producer over neighboring hops, with only live
/// relays in between and no node visited twice.
pub fn check_routes(index: &SpatialIndex, r: &ResourceAllocation) -> Vec<InvariantViolation> {
    let mut errors = Vec::new();
    for a in &r.allocations {
        if let Some(message) = route_problem(index, r, a) {
            errors.push(InvariantViolation {
                category: "route",
                message: format!("{}: {} ← {}: {message}", r.resource.name(), a.consumer, a.producer),
            });
        }
    }
    errors
}

fn route_problem(index: &SpatialIndex, r: &ResourceAllocation, a: &Allocation) -> Option<String> {
    if a.path.len() < 2 {
        return Some(format!("path has {} node(s)", a.path.len()));
    }
    if a.path.first() != Some(&a.consumer) {
        return Some("path does not start at the consumer".into());
    }
    if a.path.last() != Some(&a.producer) {
        return Some("path does not end at the producer".into());
    }
    if let Some(missing) = a.path.iter().find(|&&id| !index.contains(id)) {
        return Some(format!("{missing} is not in the node set"));
    }
    let distinct: BTreeSet<_> = a.path.iter().collect();
    if distinct.len() != a.path.len() {
        return Some("path revisits a node".into());
    }
    if let Some(hop) = a.path[1..a.path.len() - 1]
        .iter()
        .find(|&&id| !r.live_relays.contains(&id))
    {
        return Some(format!("intermediate {hop} is not a live relay"));
    }
    if let Some(pair) = a.path.windows(2).find(|p| !index.are_neighbors(p[0], p[1])) {
        return Some(format!("{} and {} are not neighbors", pair[0], pair[1]));
    }
    None
}

// ── Amounts ─────────────────────────────────────────────────────────────

/// Every allocation carries the consumer's full requirement for the right
/// resource.
pub fn check_amounts(
    index: &SpatialIndex,
    config: &FlowConfig,
    r: &ResourceAllocation,
) -> Vec<InvariantViolation> {
    let mut errors = Vec::new();
    for a in &r.allocations {
        if a.resource != r.resource {
            errors.push(InvariantViolation {
                category: "amount",
                message: format!(
                    "{} allocation filed under {}",
                    a.resource.name(),
                    r.resource.name()
                ),
            });
        }
        let Some(node) = index.get(a.consumer) else {
            errors.push(InvariantViolation {
                category: "amount",
                message: format!("consumer {} is not in the node set", a.consumer),
            });
            continue;
        };
        let need = config.consumption(node.kind, r.resource);
        if a.amount != need {
            errors.push(InvariantViolation {
                category: "amount",
                message: format!(
                    "{}: {} ({}) got {} but needs {need}",
                    r.resource.name(),
                    a.consumer,
                    node.kind.name(),
                    a.amount
                ),
            });
        }
    }
    errors
}

// ── Supplied set ────────────────────────────────────────────────────────

/// A consumer has at most one allocation per resource, and the supplied set
/// is exactly the set of allocated consumers.
pub fn check_supplied_set(r: &ResourceAllocation) -> Vec<InvariantViolation> {
    let mut errors = Vec::new();
    let name = r.resource.name();

    let mut per_consumer: BTreeMap<_, usize> = BTreeMap::new();
    for a in &r.allocations {
        *per_consumer.entry(a.consumer).or_default() += 1;
    }
    for (consumer, count) in &per_consumer {
        if *count > 1 {
            errors.push(InvariantViolation {
                category: "supplied_set",
                message: format!("{name}: {consumer} has {count} allocations"),
            });
        }
    }

    let allocated: BTreeSet<_> = per_consumer.into_keys().collect();
    if allocated != r.supplied {
        errors.push(InvariantViolation {
            category: "supplied_set",
            message: format!(
                "{name}: supplied set has {} consumer(s), allocations cover {}",
                r.supplied.len(),
                allocated.len()
            ),
        });
    }
    if let Some(both) = r.unsupplied.iter().find(|&&id| r.supplied.contains(&id)) {
        errors.push(InvariantViolation {
            category: "supplied_set",
            message: format!("{name}: {both} is both supplied and unsupplied"),
        });
    }
    errors
}
