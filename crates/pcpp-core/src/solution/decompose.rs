//! Decomposition of a near-integral solution into its cycles.
//!
//! The walker greedily follows unused passages from an arbitrary directed
//! start. Whenever a walk gets stuck (back at its start by flow balance), the
//! parent walk continues; when the parent meets an unused passage at its
//! current vertex, the pending sub-walk is spliced in. This handles
//! figure-eights and repeated vertices with an explicit stack of partial
//! walks.

use std::collections::HashMap;

use crate::instance::graph::{Grid, VertexId};
use crate::instance::passage::VertexPassage;

use super::cycle::Cycle;
use super::feasibility::{self, SolutionError};
use super::fractional::FractionalSolution;

/// Maximal deviation from an integer a passage value may have to be rounded
/// during decomposition.
const ROUNDING_EPS: f64 = 0.1;

/// A multiset of passages from a near-integral solution, consumed while
/// walking cycles.
struct PassageMultiset {
    counts: HashMap<VertexPassage, u32>,
}

impl PassageMultiset {
    fn new(solution: &FractionalSolution) -> Result<Self, SolutionError> {
        let mut counts = HashMap::new();
        for (vp, x) in solution.iter() {
            let rounded = x.round();
            if (rounded - x).abs() > ROUNDING_EPS {
                return Err(SolutionError::NotIntegral {
                    vertex: vp.vertex(),
                    value: x,
                });
            }
            if rounded > 0.0 {
                counts.insert(*vp, rounded as u32);
            }
        }
        Ok(Self { counts })
    }

    fn pop(&mut self, vp: &VertexPassage) {
        match self.counts.get_mut(vp) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.counts.remove(vp);
            }
            None => debug_assert!(false, "popping a passage that is not present"),
        }
    }

    /// The next vertex reachable from `current` when arriving from
    /// `previous`, if any unused passage supports it.
    fn next(&self, grid: &Grid, current: VertexId, previous: VertexId) -> Option<VertexId> {
        debug_assert!(current != previous);
        grid.neighbors(current).iter().copied().find(|&n| {
            self.counts
                .contains_key(&VertexPassage::new(current, previous, n))
        })
    }

    fn any_remaining(&self) -> Option<VertexPassage> {
        self.counts.keys().next().copied()
    }

    fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Walks greedily from `(prev -> v)` until no unused passage continues the
/// walk. By flow balance this happens exactly when the walk is back at its
/// start.
fn collect_walk(
    multiset: &mut PassageMultiset,
    grid: &Grid,
    start_v: VertexId,
    start_prev: VertexId,
) -> Vec<VertexPassage> {
    let mut walk = Vec::new();
    let mut v = start_v;
    let mut prev = start_prev;
    while let Some(n) = multiset.next(grid, v, prev) {
        let vp = VertexPassage::new(v, prev, n);
        multiset.pop(&vp);
        walk.push(vp);
        prev = v;
        v = n;
    }
    debug_assert!(
        v == start_v && prev == start_prev,
        "a flow-feasible walk closes at its start"
    );
    walk
}

/// Decomposes a feasible, near-integral solution into its cycles.
///
/// The result is a multiset: the union of the cycles' passage multisets
/// equals the rounded input. Fails on non-integral values, passages between
/// non-neighbors or flow imbalance.
pub fn decompose_cycles(
    grid: &Grid,
    solution: &FractionalSolution,
) -> Result<Vec<Cycle>, SolutionError> {
    feasibility::check_passages_between_neighbors(grid, solution)?;
    feasibility::check_flow_feasible(grid, solution)?;
    let mut multiset = PassageMultiset::new(solution)?;

    let mut cycles = Vec::new();
    while !multiset.is_empty() {
        let Some(start) = multiset.any_remaining() else {
            break;
        };
        let mut stack = collect_walk(&mut multiset, grid, start.vertex(), start.end_b());
        debug_assert!(stack.len() >= 2, "closed walks have at least two passages");
        let mut passages = Vec::new();
        while stack.len() >= 2 {
            // Splice in sub-walks starting at the stack head. This only
            // yields something for multi-coverage solutions.
            let sub_walk = collect_walk(
                &mut multiset,
                grid,
                stack[stack.len() - 1].vertex(),
                stack[stack.len() - 2].vertex(),
            );
            if let Some(vp) = stack.pop() {
                passages.push(vp);
            }
            stack.extend(sub_walk);
        }
        if let Some(vp) = stack.pop() {
            passages.push(vp);
        }
        let cycle = Cycle::new(passages);
        debug_assert!(cycle.is_connected(), "decomposed cycles are connected");
        cycles.push(cycle);
    }
    Ok(cycles)
}
