//! Cycle-safe breadth-first search shared by relay activation, path finding
//! and the tank-chain rule.
//!
//! The parent map doubles as the visited set, so cyclic neighbor relations
//! terminate. Neighbors are expanded in the order the caller yields them;
//! callers yield ascending ids to keep results deterministic.

use std::collections::{BTreeMap, VecDeque};

/// Outcome of a breadth-first search.
#[derive(Debug, Clone)]
pub struct Search<N: Ord> {
    /// Every discovered vertex → the vertex it was discovered from.
    /// Sources map to `None`.
    parents: BTreeMap<N, Option<N>>,
    goal: Option<N>,
}

impl<N: Copy + Ord> Search<N> {
    /// The first goal vertex discovered, if any.
    pub fn goal(&self) -> Option<N> {
        self.goal
    }

    pub fn found(&self) -> bool {
        self.goal.is_some()
    }

    pub fn visited(&self, vertex: N) -> bool {
        self.parents.contains_key(&vertex)
    }

    /// All discovered vertices, in `Ord` order.
    pub fn discovered(&self) -> impl Iterator<Item = N> + '_ {
        self.parents.keys().copied()
    }

    /// Source-to-goal vertex sequence, inclusive at both ends.
    pub fn path(&self) -> Option<Vec<N>> {
        let goal = self.goal?;
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(Some(parent)) = self.parents.get(&current) {
            path.push(*parent);
            current = *parent;
        }
        path.reverse();
        Some(path)
    }
}

/// Multi-source BFS.
///
/// `neighbors(v)` yields the vertices reachable from `v` in one hop.
/// `is_goal(v)` is checked when a vertex is first discovered (sources
/// included); the search stops at the first goal. Pass `|_| false` to
/// compute the full reachable set.
pub fn breadth_first<N, S, F, I, G>(sources: S, mut neighbors: F, mut is_goal: G) -> Search<N>
where
    N: Copy + Ord,
    S: IntoIterator<Item = N>,
    F: FnMut(N) -> I,
    I: IntoIterator<Item = N>,
    G: FnMut(N) -> bool,
{
    let mut parents = BTreeMap::new();
    let mut queue = VecDeque::new();

    for source in sources {
        if parents.contains_key(&source) {
            continue;
        }
        parents.insert(source, None);
        if is_goal(source) {
            return Search {
                parents,
                goal: Some(source),
            };
        }
        queue.push_back(source);
    }

    while let Some(current) = queue.pop_front() {
        for next in neighbors(current) {
            if parents.contains_key(&next) {
                continue;
            }
            parents.insert(next, Some(current));
            if is_goal(next) {
                return Search {
                    parents,
                    goal: Some(next),
                };
            }
            queue.push_back(next);
        }
    }

    Search {
        parents,
        goal: None,
    }
}
