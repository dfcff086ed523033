//! The adaptive strip strategy: incident-edge directions as orientations.
//!
//! When a vertex has more incident directions than the strip budget, the
//! most-used ones (by the fractional solution) are kept and the remaining
//! slots are filled by minimizing the worst-case projected cost increase
//! over all passages. One strip is selected as dominant and carries the
//! vertex's value as its penalty.

use std::collections::HashMap;
use std::f64::consts::PI;

use itertools::Itertools;
use log::debug;
use pcpp_core::geometry::direction;
use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use super::{StripBlueprint, StripSelector};

/// Usage below this does not qualify a neighbor direction on its own.
const USAGE_THRESHOLD: f64 = 0.02;
/// Base of the exponential usage weighting in the dominant-strip choice:
/// the weight left at a quarter-turn of extra cost.
const DOMINANCE_DECAY: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct NeighborAdaptiveStrips {
    /// Total strip budget per vertex.
    pub budget: usize,
}

impl NeighborAdaptiveStrips {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    fn for_vertex(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        v: VertexId,
    ) -> Vec<StripBlueprint> {
        let grid = instance.grid();
        let neighbors: Vec<VertexId> = grid.neighbors(v).to_vec();
        let value = instance.coverage(v).opportunity_loss(0.0);
        let usages = solution.at_vertex(v);
        let mut orientations: Vec<f64> = neighbors
            .iter()
            .map(|&n| direction(grid.position(n), grid.position(v)))
            .collect();

        if orientations.len() > self.budget {
            let mut selected = self.usage_ranked_directions(&neighbors, &usages);
            selected.truncate(self.budget);
            let passages: Vec<VertexPassage> = neighbors
                .iter()
                .combinations_with_replacement(2)
                .map(|ends| VertexPassage::new(v, *ends[0], *ends[1]))
                .collect();
            while selected.len() < self.budget {
                match self.minmax_fill(instance, &passages, &orientations, &selected) {
                    Some(next) => selected.push(next),
                    None => break,
                }
            }
            orientations = selected.iter().map(|&i| orientations[i]).collect();
        }

        if orientations.is_empty() {
            return Vec::new();
        }
        let dominant = self.dominant_orientation(instance, &usages, &orientations);
        orientations
            .iter()
            .enumerate()
            .map(|(i, &o)| StripBlueprint::new(o, if i == dominant { value } else { 0.0 }))
            .collect()
    }

    /// Neighbor indices with noticeable usage, most-used first.
    fn usage_ranked_directions(
        &self,
        neighbors: &[VertexId],
        usages: &[(VertexPassage, f64)],
    ) -> Vec<usize> {
        let mut neighbor_usage = vec![0.0f64; neighbors.len()];
        for (vp, x) in usages {
            let (a, b) = vp.endpoints();
            for (i, &n) in neighbors.iter().enumerate() {
                if n == a || n == b {
                    neighbor_usage[i] += x;
                }
            }
        }
        let mut ranked: Vec<usize> = (0..neighbors.len())
            .filter(|&i| neighbor_usage[i] > USAGE_THRESHOLD)
            .collect();
        ranked.sort_by(|&a, &b| neighbor_usage[b].total_cmp(&neighbor_usage[a]));
        ranked
    }

    /// Fills one more orientation slot: picks the unselected column of the
    /// projected-cost-increase matrix with the smallest product against the
    /// squared per-passage cost of the already selected columns.
    fn minmax_fill(
        &self,
        instance: &GridInstance,
        passages: &[VertexPassage],
        orientations: &[f64],
        selected: &[usize],
    ) -> Option<usize> {
        let cost_increase = |vp: &VertexPassage, o: f64| {
            instance.forced_passage_cost(vp, true, o) - instance.passage_cost(vp, true)
        };
        let weights: Vec<f64> = passages
            .iter()
            .map(|vp| {
                if selected.is_empty() {
                    1.0
                } else {
                    selected
                        .iter()
                        .map(|&i| cost_increase(vp, orientations[i]))
                        .fold(f64::INFINITY, f64::min)
                        .powi(2)
                }
            })
            .collect();
        (0..orientations.len())
            .filter(|i| !selected.contains(i))
            .min_by(|&a, &b| {
                let score = |column: usize| {
                    passages
                        .iter()
                        .zip(&weights)
                        .map(|(vp, w)| cost_increase(vp, orientations[column]) * w)
                        .sum::<f64>()
                };
                score(a).total_cmp(&score(b))
            })
    }

    /// The dominant orientation by exponentially weighted usage: passages
    /// contribute their value discounted by the extra turn angle the
    /// orientation forces upon them.
    fn dominant_orientation(
        &self,
        instance: &GridInstance,
        usages: &[(VertexPassage, f64)],
        orientations: &[f64],
    ) -> usize {
        let grid = instance.grid();
        let mut weights = vec![0.0f64; orientations.len()];
        for (vp, x) in usages {
            let free = vp.turn_angle(grid);
            let diffs: Vec<f64> = orientations
                .iter()
                .map(|&o| vp.forced_turn_angle(grid, o) - free)
                .collect();
            let min_diff = diffs.iter().copied().fold(f64::INFINITY, f64::min);
            for (i, diff) in diffs.iter().enumerate() {
                weights[i] += x * DOMINANCE_DECAY.powf((diff - min_diff) / (0.25 * PI));
            }
        }
        weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

impl StripSelector for NeighborAdaptiveStrips {
    fn select(
        &self,
        instance: &GridInstance,
        fractional_solution: &FractionalSolution,
    ) -> HashMap<VertexId, Vec<StripBlueprint>> {
        debug!("selecting atomic strips with the adaptive strategy");
        instance
            .grid()
            .vertices()
            .map(|v| (v, self.for_vertex(instance, fractional_solution, v)))
            .collect()
    }
}
