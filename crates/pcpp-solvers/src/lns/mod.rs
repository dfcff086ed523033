/*!
Large-neighborhood search over cycle covers and tours.

Each iteration selects a costly area, re-optimizes it exactly with a local
MIP (boundary frozen) and overwrites the area's passages. The tour variant
additionally separates subtour elimination constraints until the solution is
one cycle again, reverting the iteration if that takes too long.
 */

use std::collections::HashSet;

use log::{debug, warn};
use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::{Cycle, FractionalSolution, decompose_cycles, is_feasible_cycle_cover};

use crate::error::SolverError;

mod area;
mod mip;

pub use area::AreaSelector;
pub use mip::{FixedEdges, LocalMip, SubtourCut};

/// LNS over the cycle cover: plain local re-optimization, disconnected
/// results are fine at this stage.
pub struct CycleCoverLns {
    area_size: usize,
    repetitions: usize,
}

impl CycleCoverLns {
    pub fn new(area_size: usize, repetitions: usize) -> Self {
        Self {
            area_size,
            repetitions,
        }
    }

    pub fn optimize(
        &self,
        instance: &GridInstance,
        mut solution: FractionalSolution,
    ) -> Result<FractionalSolution, SolverError> {
        let selector = AreaSelector::new(self.area_size, false);
        let mut excluded = HashSet::new();
        for _ in 0..self.repetitions {
            let Some((root, area)) = selector.select(instance, &solution, &excluded) else {
                break;
            };
            debug!("re-optimizing cycle cover around {root:?}");
            excluded.insert(root);
            excluded.extend(instance.grid().neighbors(root).iter().copied());
            let mip = LocalMip::new(instance, &area, &solution);
            let optimized = mip.solve(&[])?;
            debug_assert!(is_feasible_cycle_cover(instance, &optimized));
            solution = optimized;
        }
        Ok(solution)
    }
}

/// LNS over the connected tour. Re-optimization may split the tour into
/// several cycles; those are eliminated with cut constraints, up to a cap
/// per iteration.
pub struct TourLns {
    area_size: usize,
    repetitions: usize,
    max_subtour_eliminations: usize,
}

impl TourLns {
    pub fn new(area_size: usize, repetitions: usize) -> Self {
        Self {
            area_size,
            repetitions,
            max_subtour_eliminations: 10,
        }
    }

    pub fn optimize(
        &self,
        instance: &GridInstance,
        mut solution: FractionalSolution,
    ) -> Result<FractionalSolution, SolverError> {
        let selector = AreaSelector::new(self.area_size, true);
        let mut excluded = HashSet::new();
        for _ in 0..self.repetitions {
            let Some((root, area)) = selector.select(instance, &solution, &excluded) else {
                break;
            };
            debug!("re-optimizing tour around {root:?}");
            // The excluded set grows even if the iteration is reverted below.
            excluded.insert(root);
            excluded.extend(instance.grid().neighbors(root).iter().copied());
            let optimized = self.optimize_area(instance, &solution, &area)?;
            debug_assert!(is_feasible_cycle_cover(instance, &optimized));
            solution = optimized;
        }
        Ok(solution)
    }

    /// One area re-optimization with subtour elimination. Returns the old
    /// solution unchanged if the tour cannot be reconnected within the cap.
    fn optimize_area(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        area: &[VertexId],
    ) -> Result<FractionalSolution, SolverError> {
        let mip = LocalMip::new(instance, area, solution);
        let mut cuts: Vec<SubtourCut> = Vec::new();
        for _ in 0..=self.max_subtour_eliminations {
            let candidate = mip.solve(&cuts)?;
            let cycles = decompose_cycles(instance.grid(), &candidate)?;
            if cycles.len() <= 1 {
                return Ok(candidate);
            }
            debug!("separating {} subtours", cycles.len() - 1);
            for cycle in &cycles {
                match subtour_cut(instance, &mip, cycle) {
                    Some(cut) => cuts.push(cut),
                    None => {
                        // A cycle without any passage in the area cannot be
                        // separated locally; give up on this iteration.
                        warn!("subtour outside the re-optimized area, reverting iteration");
                        return Ok(solution.clone());
                    }
                }
            }
        }
        warn!(
            "tour not reconnected within {} eliminations, reverting iteration",
            self.max_subtour_eliminations
        );
        Ok(solution.clone())
    }
}

/// Builds the elimination cut for one cycle: some in-area passage of the
/// cycle is only allowed if a crossing passage unused by the cycle carries
/// flow too.
fn subtour_cut(
    instance: &GridInstance,
    mip: &LocalMip<'_>,
    cycle: &Cycle,
) -> Option<SubtourCut> {
    let cycle_solution = cycle.to_fractional_solution();
    let in_area: Vec<VertexPassage> = cycle
        .passages()
        .iter()
        .filter(|vp| mip.area().contains(&vp.vertex()))
        .copied()
        .collect();
    let anchor = *in_area.first()?;
    let mut crossing = Vec::new();
    for vp in &in_area {
        let (end_a, end_b) = vp.endpoints();
        for n0 in [end_a, end_b] {
            for &n1 in instance.grid().neighbors(vp.vertex()) {
                let candidate = VertexPassage::new(vp.vertex(), n0, n1);
                if cycle_solution.get(&candidate) == 0.0
                    && mip.area().contains(&n1)
                    && mip.has_passage_variable(&candidate)
                {
                    crossing.push(candidate);
                }
            }
        }
    }
    Some(SubtourCut { anchor, crossing })
}
