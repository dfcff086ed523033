//! Area selection for the local re-optimization.
//!
//! Roots are scored by the local cost of the vertex and its direct
//! neighbors: usage-weighted passage costs plus the opportunity loss at the
//! current coverage. The area is the BFS ball around the best root.

use std::collections::HashSet;

use log::debug;
use pcpp_core::instance::{GridInstance, VertexId};
use pcpp_core::solution::FractionalSolution;
use rand::seq::SliceRandom;

pub struct AreaSelector {
    size: usize,
    only_covered_roots: bool,
}

impl AreaSelector {
    pub fn new(size: usize, only_covered_roots: bool) -> Self {
        Self {
            size,
            only_covered_roots,
        }
    }

    fn cost_at_vertex(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        v: VertexId,
    ) -> f64 {
        let passage_cost: f64 = solution
            .at_vertex(v)
            .iter()
            .map(|(vp, x)| instance.passage_cost(vp, true) * x)
            .sum();
        passage_cost
            + instance
                .coverage(v)
                .opportunity_loss(solution.coverage(v))
    }

    fn rate_vertex(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        v: VertexId,
    ) -> f64 {
        self.cost_at_vertex(instance, solution, v)
            + instance
                .grid()
                .neighbors(v)
                .iter()
                .map(|&n| self.cost_at_vertex(instance, solution, n))
                .sum::<f64>()
    }

    fn root_vertex(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        exclude: &HashSet<VertexId>,
    ) -> Option<VertexId> {
        let candidates: Vec<VertexId> = if self.only_covered_roots {
            let mut used: Vec<VertexId> = solution
                .iter()
                .filter(|(_, x)| *x >= 1.0)
                .map(|(vp, _)| vp.vertex())
                .filter(|v| !exclude.contains(v))
                .collect();
            used.sort();
            used.dedup();
            used
        } else {
            instance
                .grid()
                .vertices()
                .filter(|v| !exclude.contains(v))
                .collect()
        };
        if candidates.is_empty() {
            debug!("no scored root candidate left, falling back to a random one");
            let mut fallback: Vec<VertexId> = solution
                .iter()
                .filter(|(_, x)| *x >= 1.0)
                .map(|(vp, _)| vp.vertex())
                .collect();
            if fallback.is_empty() {
                fallback = instance.grid().vertices().collect();
            }
            return fallback.choose(&mut rand::thread_rng()).copied();
        }
        candidates
            .into_iter()
            .max_by(|&a, &b| {
                self.rate_vertex(instance, solution, a)
                    .total_cmp(&self.rate_vertex(instance, solution, b))
            })
    }

    /// Picks a root and its BFS area. `None` only for the empty grid.
    pub fn select(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        exclude: &HashSet<VertexId>,
    ) -> Option<(VertexId, Vec<VertexId>)> {
        let root = self.root_vertex(instance, solution, exclude)?;
        Some((root, instance.grid().bfs_area(root, self.size)))
    }
}
