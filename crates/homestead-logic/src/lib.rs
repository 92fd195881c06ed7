//! Pure resource-flow logic for Homestead.
//!
//! This crate decides which buildings in a settlement receive water and heat.
//! It is independent of any renderer, engine, or runtime: functions take plain
//! data (`Node`s and a `FlowConfig`) and return results, so everything here is
//! unit-testable and runs the same in the game, the headless harness, and the
//! benchmarks.
//!
//! Every structural change (a building placed or removed) triggers a full
//! rebuild of the `SupplySnapshot`. Nothing is patched incrementally.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`allocator`] | Greedy priority-ordered capacity allocation for one resource |
//! | [`buildings`] | Node ids, grid positions, building kinds, placed/preview refs |
//! | [`config`] | Flow tables, JSON loading, and config validation |
//! | [`direct`] | Legacy direct-neighbor supply rule with tank chains |
//! | [`invariants`] | Post-hoc checks over a built snapshot |
//! | [`network`] | Node mirror, rebuild-on-change, observer and channel events |
//! | [`pathfinding`] | Fewest-hop routes through live relays |
//! | [`query`] | Read-only questions over a snapshot (supply, previews, connections) |
//! | [`registry`] | Id allocation for placed buildings |
//! | [`relay`] | Live relay resolution from producers outward |
//! | [`resources`] | Resource ids, per-resource flow descriptors, per-kind tables |
//! | [`snapshot`] | The committed allocation state of one rebuild |
//! | [`spatial`] | Bucketed neighbor lookup within the interaction distance |
//! | [`traversal`] | Cycle-safe breadth-first search shared by the above |

pub mod allocator;
pub mod buildings;
pub mod config;
pub mod direct;
pub mod invariants;
pub mod network;
pub mod pathfinding;
pub mod query;
pub mod registry;
pub mod relay;
pub mod resources;
pub mod snapshot;
pub mod spatial;
pub mod traversal;
