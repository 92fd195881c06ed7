//! Property tests over random settlement layouts.
//!
//! Every generated layout is rebuilt through the default tables and checked
//! against the allocation guarantees: full amounts only, capacity bounds,
//! live-relay routes, and determinism.

use std::collections::BTreeSet;

use proptest::prelude::*;

use homestead_logic::buildings::{BuildingKind, Node};
use homestead_logic::config::FlowConfig;
use homestead_logic::invariants::check_snapshot;
use homestead_logic::snapshot::SupplySnapshot;

fn kind_strategy() -> impl Strategy<Value = BuildingKind> {
    prop::sample::select(BuildingKind::all().to_vec())
}

/// Up to 40 buildings on a 12×12 patch, distinct positions, ids 1..=n.
fn layout_strategy() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec((kind_strategy(), 0i32..12, 0i32..12), 0..40).prop_map(|raw| {
        let mut seen = BTreeSet::new();
        raw.into_iter()
            .filter(|&(_, x, y)| seen.insert((x, y)))
            .enumerate()
            .map(|(i, (kind, x, y))| Node::new(i as u32 + 1, kind, x, y))
            .collect()
    })
}

proptest! {
    #[test]
    fn test_random_layouts_hold_invariants(nodes in layout_strategy()) {
        let config = FlowConfig::default();
        let snapshot = SupplySnapshot::build(&nodes, &config);
        let violations = check_snapshot(&snapshot, &config);
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn test_amounts_are_never_partial(nodes in layout_strategy()) {
        let config = FlowConfig::default();
        let snapshot = SupplySnapshot::build(&nodes, &config);
        for a in snapshot.allocations() {
            let kind = snapshot.index().get(a.consumer).map(|n| n.kind);
            prop_assert!(kind.is_some());
            if let Some(kind) = kind {
                prop_assert_eq!(a.amount, config.consumption(kind, a.resource));
            }
        }
    }

    #[test]
    fn test_committed_within_capacity(nodes in layout_strategy()) {
        let config = FlowConfig::default();
        let snapshot = SupplySnapshot::build(&nodes, &config);
        for r in snapshot.resources() {
            for (&provider, &cap) in &r.initial_capacity {
                prop_assert!(r.committed(provider) <= cap);
            }
        }
    }

    #[test]
    fn test_routes_only_cross_live_relays(nodes in layout_strategy()) {
        let config = FlowConfig::default();
        let snapshot = SupplySnapshot::build(&nodes, &config);
        for r in snapshot.resources() {
            for a in &r.allocations {
                let inner = &a.path[1..a.path.len() - 1];
                prop_assert!(inner.iter().all(|id| r.live_relays.contains(id)));
            }
            // Dead capacity relays never provide.
            for provider in r.initial_capacity.keys() {
                let kind = snapshot.index().get(*provider).map(|n| n.kind);
                let is_relay = kind.is_some_and(|k| {
                    config.descriptor(r.resource).is_some_and(|d| d.is_relay(k))
                });
                prop_assert!(!is_relay || r.live_relays.contains(provider));
            }
        }
    }

    #[test]
    fn test_rebuild_is_deterministic(nodes in layout_strategy()) {
        let config = FlowConfig::default();
        let first = SupplySnapshot::build(&nodes, &config);
        let mut reversed = nodes.clone();
        reversed.reverse();
        let second = SupplySnapshot::build(&reversed, &config);
        for (a, b) in first.resources().zip(second.resources()) {
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn test_removing_a_node_leaves_no_reference(nodes in layout_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!nodes.is_empty());
        let config = FlowConfig::default();
        let gone = nodes[pick.index(nodes.len())].id;
        let rest: Vec<Node> = nodes.iter().copied().filter(|n| n.id != gone).collect();
        let snapshot = SupplySnapshot::build(&rest, &config);
        prop_assert!(snapshot.allocations().all(|a| !a.touches(gone)));
        prop_assert!(snapshot.resources().all(|r| !r.is_supplied(gone)));
        prop_assert!(check_snapshot(&snapshot, &config).is_empty());
    }
}

