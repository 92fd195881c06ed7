//! Homestead Headless Flow Harness
//!
//! Validates resource-flow allocation without a renderer.
//! Runs entirely in-process: built-in scenarios, a bundled layout, and a
//! seeded sweep of random settlements checked against the snapshot
//! invariants.
//!
//! Usage:
//!   cargo run -p homestead-simtest
//!   cargo run -p homestead-simtest -- --verbose
//!   cargo run -p homestead-simtest -- --seed 7 --layout my_town.json --dump
//!   cargo run -p homestead-simtest -- --config tables.json

use homestead_logic::buildings::{BuildingKind, GridPos, Node, NodeId, NodeRef};
use homestead_logic::config::{validate_config, FlowConfig, Severity};
use homestead_logic::invariants::check_snapshot;
use homestead_logic::network::{FlowNetwork, NodeEvents, RegistryEvent};
use homestead_logic::registry::NodeRegistry;
use homestead_logic::resources::ResourceId;
use homestead_logic::snapshot::SupplySnapshot;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ── Bundled layout ──────────────────────────────────────────────────────
const SAMPLE_LAYOUT_JSON: &str = include_str!("../../../data/sample_layout.json");

const DEFAULT_SEED: u64 = 0x5EED;
const SWEEP_LAYOUTS: usize = 200;

#[derive(Debug, Deserialize)]
struct Layout {
    name: String,
    nodes: Vec<Node>,
    #[serde(default)]
    expect: Expectations,
}

#[derive(Debug, Default, Deserialize)]
struct Expectations {
    #[serde(default)]
    supplied: Vec<Supply>,
    #[serde(default)]
    unsupplied: Vec<Supply>,
    #[serde(default)]
    operational: Vec<NodeId>,
    #[serde(default)]
    not_operational: Vec<NodeId>,
    #[serde(default)]
    remaining: Vec<Remaining>,
}

#[derive(Debug, Deserialize)]
struct Supply {
    id: NodeId,
    resource: ResourceId,
}

#[derive(Debug, Deserialize)]
struct Remaining {
    id: NodeId,
    resource: ResourceId,
    amount: u32,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    dump: bool,
    layout: Option<String>,
    config: Option<String>,
    seed: u64,
}

impl Options {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        let seed = match value_of("--seed") {
            Some(s) => s.parse().unwrap_or_else(|_| {
                eprintln!("--seed expects an integer, got {:?}; using {}", s, DEFAULT_SEED);
                DEFAULT_SEED
            }),
            None => DEFAULT_SEED,
        };
        Self {
            verbose: args.iter().any(|a| a == "--verbose"),
            dump: args.iter().any(|a| a == "--dump"),
            layout: value_of("--layout"),
            config: value_of("--config"),
            seed,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "homestead_logic=debug"
    } else {
        "homestead_logic=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let opts = Options::from_args();
    init_logging(opts.verbose);
    println!("=== Homestead Flow Harness ===\n");

    let mut results = Vec::new();

    // 0. Flow tables
    let config = load_config(&opts, &mut results);
    results.extend(validate_flow_tables(&config));

    // 1. Built-in scenarios
    results.extend(validate_contention());
    results.extend(validate_relays(&config));
    results.extend(validate_structural_changes(&config));
    results.extend(validate_threshold(&config));
    results.extend(validate_previews(&config));
    results.extend(validate_tank_chains(&config));

    // 2. Bundled layout (and any user layout)
    results.extend(validate_layout(SAMPLE_LAYOUT_JSON, &config, opts.dump));
    if let Some(path) = &opts.layout {
        match std::fs::read_to_string(path) {
            Ok(json) => results.extend(validate_layout(&json, &config, opts.dump)),
            Err(e) => results.push(TestResult {
                name: "layout_read".into(),
                passed: false,
                detail: format!("{}: {}", path, e),
            }),
        }
    }

    // 3. Random sweep
    results.extend(validate_random_sweep(&config, opts.seed, opts.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn network_with(config: &FlowConfig, nodes: &[Node]) -> FlowNetwork {
    FlowNetwork::with_nodes(config.clone(), nodes.iter().copied())
}

// ── 0. Flow tables ──────────────────────────────────────────────────────

fn load_config(opts: &Options, results: &mut Vec<TestResult>) -> FlowConfig {
    let Some(path) = &opts.config else {
        return FlowConfig::default();
    };
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| FlowConfig::from_json(&json).map_err(|e| e.to_string()));
    match loaded {
        Ok(config) => {
            results.push(TestResult {
                name: "config_load".into(),
                passed: true,
                detail: format!("loaded {}", path),
            });
            config
        }
        Err(e) => {
            results.push(TestResult {
                name: "config_load".into(),
                passed: false,
                detail: format!("{}: {}; falling back to built-in tables", path, e),
            });
            FlowConfig::default()
        }
    }
}

fn validate_flow_tables(config: &FlowConfig) -> Vec<TestResult> {
    println!("--- Flow Tables ---");
    let mut results = Vec::new();

    let issues = validate_config(config);
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors == 0,
        detail: format!("{} issue(s), {} error(s)", issues.len(), errors),
    });

    // Export and reload must give back the same tables
    let round_trip = config
        .to_json_pretty()
        .ok()
        .and_then(|json| FlowConfig::from_json(&json).ok());
    results.push(TestResult {
        name: "config_json_round_trip".into(),
        passed: round_trip.as_ref() == Some(config),
        detail: "to_json_pretty → from_json".into(),
    });

    // Every resource has a producer with capacity
    let mut missing = Vec::new();
    for d in &config.descriptors {
        let has_capacity = d
            .producers
            .iter()
            .any(|&k| config.capacity(k, d.resource) > 0);
        if !has_capacity {
            missing.push(d.resource.name());
        }
    }
    results.push(TestResult {
        name: "config_producers".into(),
        passed: missing.is_empty(),
        detail: if missing.is_empty() {
            format!("{} resource(s) with producers", config.descriptors.len())
        } else {
            format!("no producer capacity for {:?}", missing)
        },
    });

    results
}

// ── 1. Scenarios ────────────────────────────────────────────────────────

fn validate_contention() -> Vec<TestResult> {
    println!("--- Contention ---");
    let mut results = Vec::new();

    // One well holding 10, two consumers needing 6 at priorities 1 and 2.
    let mut config = FlowConfig::default();
    config
        .capacities
        .set(BuildingKind::Well, ResourceId::Water, 10);
    config
        .consumption
        .set(BuildingKind::Infirmary, ResourceId::Water, 6);
    config
        .consumption
        .set(BuildingKind::House, ResourceId::Water, 6);
    for d in &mut config.descriptors {
        if d.resource == ResourceId::Water {
            d.priorities.insert(BuildingKind::Infirmary, 1);
            d.priorities.insert(BuildingKind::House, 2);
        }
    }

    let net = network_with(
        &config,
        &[
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::House, 1, 0),
            Node::new(3, BuildingKind::Infirmary, 0, 2),
        ],
    );
    let q = net.query();
    let infirmary = q.is_supplied_with(NodeId(3), ResourceId::Water);
    let house = q.is_supplied_with(NodeId(2), ResourceId::Water);
    let left = q.remaining_capacity(NodeId(1), ResourceId::Water);
    results.push(TestResult {
        name: "contention_priority".into(),
        passed: infirmary && !house && left == 4,
        detail: format!(
            "infirmary supplied={}, house supplied={}, well left={}",
            infirmary, house, left
        ),
    });

    let amounts: Vec<u32> = net.snapshot().allocations().map(|a| a.amount).collect();
    results.push(TestResult {
        name: "contention_full_amount".into(),
        passed: amounts == vec![6],
        detail: format!("amounts {:?}", amounts),
    });

    results
}

fn validate_relays(config: &FlowConfig) -> Vec<TestResult> {
    println!("--- Relays ---");
    let mut results = Vec::new();

    let mut net = network_with(
        config,
        &[
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Aqueduct, 2, 0),
            Node::new(3, BuildingKind::House, 4, 0),
        ],
    );
    let path = net
        .snapshot()
        .allocations()
        .find(|a| a.consumer == NodeId(3))
        .map(|a| a.path.clone())
        .unwrap_or_default();
    results.push(TestResult {
        name: "relay_path".into(),
        passed: path == vec![NodeId(3), NodeId(2), NodeId(1)],
        detail: format!("path {:?}", path),
    });

    net.on_node_removed(NodeId(2));
    let stale = net.snapshot().allocations().count();
    results.push(TestResult {
        name: "relay_removed".into(),
        passed: stale == 0 && !net.query().is_supplied_with(NodeId(3), ResourceId::Water),
        detail: format!("{} allocation(s) after removing the aqueduct", stale),
    });

    // A capacity relay out of reach of every producer adds nothing.
    let isolated = network_with(
        config,
        &[
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Cistern, 8, 8),
            Node::new(3, BuildingKind::House, 9, 8),
        ],
    );
    let live = isolated.query().is_live_relay(NodeId(2), ResourceId::Water);
    let cap = isolated
        .snapshot()
        .summary(ResourceId::Water)
        .map(|s| s.initial_capacity)
        .unwrap_or(0);
    results.push(TestResult {
        name: "relay_dead_adds_nothing".into(),
        passed: !live && cap == u64::from(config.capacity(BuildingKind::Well, ResourceId::Water)),
        detail: format!("cistern live={}, water capacity={}", live, cap),
    });

    results
}

fn validate_structural_changes(config: &FlowConfig) -> Vec<TestResult> {
    println!("--- Structural Changes ---");
    let mut results = Vec::new();

    let (mut tx, rx) = std::sync::mpsc::channel::<RegistryEvent>();
    let mut registry = NodeRegistry::new();
    let mut net = FlowNetwork::new(config.clone());

    let furnace = registry.place(BuildingKind::Furnace, GridPos::new(0, 0), &mut tx);
    let bakery = registry.place(BuildingKind::Bakery, GridPos::new(1, 1), &mut tx);
    let applied = net.drain(&rx);
    let before = net.query().is_fully_operational(bakery);

    registry.remove(furnace, &mut tx);
    net.drain(&rx);
    let after = net.query().is_fully_operational(bakery);
    let referenced = net.snapshot().allocations().any(|a| a.touches(furnace));

    results.push(TestResult {
        name: "producer_deleted".into(),
        passed: applied == 2 && before && !after && !referenced,
        detail: format!(
            "bakery operational {} → {}, stale references={}",
            before, after, referenced
        ),
    });

    let rebuilds = net.rebuild_count();
    net.on_node_removed(NodeId(999));
    results.push(TestResult {
        name: "unknown_removal_noop".into(),
        passed: net.rebuild_count() == rebuilds,
        detail: "removing an unknown id does not rebuild".into(),
    });

    results
}

fn validate_threshold(config: &FlowConfig) -> Vec<TestResult> {
    println!("--- Interaction Distance ---");
    let mut results = Vec::new();

    let max = config.max_interaction_distance;
    let edge = max.floor() as i32;
    let supplied_at = |x: i32, y: i32| {
        network_with(
            config,
            &[
                Node::new(1, BuildingKind::Furnace, 0, 0),
                Node::new(2, BuildingKind::Bakery, x, y),
            ],
        )
        .query()
        .is_supplied_with(NodeId(2), ResourceId::Heat)
    };

    let at = supplied_at(edge, 0);
    let beyond = supplied_at(edge, 1);
    let exact = (edge as f64) == max;
    results.push(TestResult {
        name: "threshold_inclusive".into(),
        passed: at && (!beyond || !exact),
        detail: format!(
            "distance {} supplied={}, just beyond supplied={}",
            edge, at, beyond
        ),
    });

    results
}

fn validate_previews(config: &FlowConfig) -> Vec<TestResult> {
    println!("--- Previews ---");
    let mut results = Vec::new();

    let net = network_with(
        config,
        &[
            Node::new(1, BuildingKind::Furnace, 0, 0),
            Node::new(2, BuildingKind::Bakery, 1, 0),
            Node::new(3, BuildingKind::Bakery, -1, 0),
            Node::new(4, BuildingKind::Bakery, 0, 1),
        ],
    );
    let q = net.query();
    let left = q.remaining_capacity(NodeId(1), ResourceId::Heat);
    let need = config.consumption(BuildingKind::Bakery, ResourceId::Heat);
    let preview = q.would_be_operational(BuildingKind::Bakery, GridPos::new(0, -1));
    results.push(TestResult {
        name: "preview_remaining_capacity".into(),
        passed: preview == (left >= need),
        detail: format!("furnace left={}, bakery needs {}, preview={}", left, need, preview),
    });

    let before = serde_json::to_string(net.snapshot()).unwrap_or_default();
    let _ = q.would_be_operational(BuildingKind::House, GridPos::new(1, 1));
    let _ = q.connections_for_building(NodeRef::Hypothetical {
        kind: BuildingKind::House,
        pos: GridPos::new(1, 1),
    });
    let after = serde_json::to_string(net.snapshot()).unwrap_or_default();
    results.push(TestResult {
        name: "preview_read_only".into(),
        passed: before == after,
        detail: "previews leave the snapshot untouched".into(),
    });

    results
}

fn validate_tank_chains(config: &FlowConfig) -> Vec<TestResult> {
    println!("--- Tank Chains ---");
    let mut results = Vec::new();

    let chained = network_with(
        config,
        &[
            Node::new(1, BuildingKind::Well, 0, 0),
            Node::new(2, BuildingKind::Cistern, 2, 0),
            Node::new(3, BuildingKind::Cistern, 4, 0),
            Node::new(4, BuildingKind::Watermill, 6, 0),
        ],
    );
    results.push(TestResult {
        name: "tank_chain".into(),
        passed: chained.query().is_fully_operational(NodeId(4)),
        detail: "watermill fed through two cisterns".into(),
    });

    let ring = network_with(
        config,
        &[
            Node::new(1, BuildingKind::Cistern, 0, 0),
            Node::new(2, BuildingKind::Cistern, 1, 0),
            Node::new(3, BuildingKind::Cistern, 1, 1),
            Node::new(4, BuildingKind::Cistern, 0, 1),
            Node::new(5, BuildingKind::Watermill, 2, 2),
        ],
    );
    results.push(TestResult {
        name: "tank_ring_terminates".into(),
        passed: !ring.query().is_fully_operational(NodeId(5)),
        detail: "cyclic cisterns with no well".into(),
    });

    results
}

// ── 2. Layouts ──────────────────────────────────────────────────────────

fn validate_layout(json: &str, config: &FlowConfig, dump: bool) -> Vec<TestResult> {
    let mut results = Vec::new();

    let layout: Layout = match serde_json::from_str(json) {
        Ok(l) => l,
        Err(e) => {
            println!("--- Layout ---");
            results.push(TestResult {
                name: "layout_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };
    println!("--- Layout: {} ---", layout.name);

    let ids: BTreeSet<NodeId> = layout.nodes.iter().map(|n| n.id).collect();
    results.push(TestResult {
        name: format!("{}_unique_ids", layout.name),
        passed: ids.len() == layout.nodes.len(),
        detail: format!("{} node(s), {} distinct id(s)", layout.nodes.len(), ids.len()),
    });

    let net = network_with(config, &layout.nodes);
    let q = net.query();

    if dump {
        match serde_json::to_string_pretty(net.snapshot()) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("snapshot dump failed: {}", e),
        }
    }

    let violations = check_snapshot(net.snapshot(), config);
    results.push(TestResult {
        name: format!("{}_invariants", layout.name),
        passed: violations.is_empty(),
        detail: match violations.first() {
            None => format!("{} allocation(s) clean", net.snapshot().allocations().count()),
            Some(v) => format!("{} violation(s), first: {}", violations.len(), v),
        },
    });

    let expect = &layout.expect;
    let wrong_supplied: Vec<String> = expect
        .supplied
        .iter()
        .filter(|s| !q.is_supplied_with(s.id, s.resource))
        .chain(
            expect
                .unsupplied
                .iter()
                .filter(|s| q.is_supplied_with(s.id, s.resource)),
        )
        .map(|s| format!("{}/{}", s.id, s.resource.name()))
        .collect();
    results.push(TestResult {
        name: format!("{}_supply", layout.name),
        passed: wrong_supplied.is_empty(),
        detail: if wrong_supplied.is_empty() {
            format!(
                "{} supply expectation(s) met",
                expect.supplied.len() + expect.unsupplied.len()
            )
        } else {
            format!("wrong: {}", wrong_supplied.join(", "))
        },
    });

    let wrong_operational: Vec<String> = expect
        .operational
        .iter()
        .filter(|&&id| !q.is_fully_operational(id))
        .chain(
            expect
                .not_operational
                .iter()
                .filter(|&&id| q.is_fully_operational(id)),
        )
        .map(|id| id.to_string())
        .collect();
    results.push(TestResult {
        name: format!("{}_operational", layout.name),
        passed: wrong_operational.is_empty(),
        detail: if wrong_operational.is_empty() {
            format!(
                "{} operational expectation(s) met",
                expect.operational.len() + expect.not_operational.len()
            )
        } else {
            format!("wrong: {}", wrong_operational.join(", "))
        },
    });

    let wrong_remaining: Vec<String> = expect
        .remaining
        .iter()
        .filter_map(|r| {
            let actual = q.remaining_capacity(r.id, r.resource);
            (actual != r.amount).then(|| {
                format!(
                    "{}/{} left {} (expected {})",
                    r.id,
                    r.resource.name(),
                    actual,
                    r.amount
                )
            })
        })
        .collect();
    results.push(TestResult {
        name: format!("{}_remaining", layout.name),
        passed: wrong_remaining.is_empty(),
        detail: if wrong_remaining.is_empty() {
            format!("{} capacity expectation(s) met", expect.remaining.len())
        } else {
            wrong_remaining.join(", ")
        },
    });

    results
}

// ── 3. Random sweep ─────────────────────────────────────────────────────

fn random_layout(rng: &mut StdRng) -> Vec<Node> {
    let count = rng.gen_range(0..60);
    let side = rng.gen_range(4..16);
    let mut taken = BTreeSet::new();
    let mut nodes = Vec::new();
    for _ in 0..count {
        let pos = (rng.gen_range(0..side), rng.gen_range(0..side));
        if !taken.insert(pos) {
            continue;
        }
        let Some(&kind) = BuildingKind::all().choose(rng) else {
            continue;
        };
        nodes.push(Node::new(nodes.len() as u32 + 1, kind, pos.0, pos.1));
    }
    nodes
}

fn validate_random_sweep(config: &FlowConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Random Sweep (seed {}) ---", seed);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut violations = 0usize;
    let mut nondeterministic = 0usize;
    let mut stale = 0usize;
    let mut allocations = 0usize;
    let mut first_failure = None;

    for i in 0..SWEEP_LAYOUTS {
        let nodes = random_layout(&mut rng);
        let snapshot = SupplySnapshot::build(&nodes, config);
        allocations += snapshot.allocations().count();

        let found = check_snapshot(&snapshot, config);
        if !found.is_empty() {
            violations += found.len();
            first_failure.get_or_insert_with(|| format!("layout {}: {}", i, found[0]));
        }

        let mut shuffled = nodes.clone();
        shuffled.shuffle(&mut rng);
        let again = SupplySnapshot::build(&shuffled, config);
        if !snapshot.resources().eq(again.resources()) {
            nondeterministic += 1;
            first_failure.get_or_insert_with(|| format!("layout {}: order-dependent result", i));
        }

        if let Some(victim) = nodes.choose(&mut rng) {
            let mut net = network_with(config, &nodes);
            net.on_node_removed(victim.id);
            if net.snapshot().allocations().any(|a| a.touches(victim.id)) {
                stale += 1;
                first_failure.get_or_insert_with(|| {
                    format!("layout {}: {} still routed after removal", i, victim.id)
                });
            }
        }

        if verbose && i % 50 == 0 {
            println!(
                "  layout {:>3}: {} node(s), {} allocation(s)",
                i,
                nodes.len(),
                snapshot.allocations().count()
            );
        }
    }

    let detail_or = |ok: &str| first_failure.clone().unwrap_or_else(|| ok.to_string());
    results.push(TestResult {
        name: "sweep_invariants".into(),
        passed: violations == 0,
        detail: detail_or(&format!(
            "{} layouts, {} allocation(s), no violations",
            SWEEP_LAYOUTS, allocations
        )),
    });
    results.push(TestResult {
        name: "sweep_deterministic".into(),
        passed: nondeterministic == 0,
        detail: detail_or("input order never changes the result"),
    });
    results.push(TestResult {
        name: "sweep_removal".into(),
        passed: stale == 0,
        detail: detail_or("removed nodes never appear in a route"),
    });

    results
}
