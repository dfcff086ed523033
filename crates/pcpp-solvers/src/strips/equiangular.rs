//! The static strip strategy: `k` equiangular orientations per vertex, each
//! repeated `r` times.
//!
//! The base orientation is picked from a small sample set (stepwise plus
//! incident-edge directions) by scoring the whole equiangular list against
//! the graph and the fractional solution. The vertex's penalty vector is
//! then distributed over the chosen orientations by their fractional usage.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::debug;
use pcpp_core::geometry::{abs_angle_difference, direction};
use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use super::{StripBlueprint, StripSelector};

/// Weight of the neighbor-direction deviation in the orientation score.
const NEIGHBOR_FACTOR: f64 = 0.1;
/// Weight of the projected passage-cost increase in the orientation score.
const PASSAGE_FACTOR: f64 = 1.0;
/// Number of stepwise sample orientations.
const STEPWISE_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct EquiangularRepetitionStrips {
    /// Number of distinct orientations per vertex.
    pub orientations: usize,
    /// Repetitions of each orientation.
    pub repetitions: usize,
}

impl EquiangularRepetitionStrips {
    pub fn new(orientations: usize, repetitions: usize) -> Self {
        Self {
            orientations,
            repetitions,
        }
    }

    /// Candidate base orientations: stepwise samples plus the directions of
    /// the incident edges.
    fn sample_orientations(&self, instance: &GridInstance, v: VertexId) -> Vec<f64> {
        let grid = instance.grid();
        let mut samples: Vec<f64> = (0..STEPWISE_SAMPLES)
            .map(|i| i as f64 * PI / STEPWISE_SAMPLES as f64)
            .collect();
        samples.extend(
            grid.neighbors(v)
                .iter()
                .map(|&n| direction(grid.position(n), grid.position(v))),
        );
        samples
    }

    /// The equiangular orientation list anchored at the base orientation.
    fn pattern(&self, base: f64) -> Vec<f64> {
        (0..self.orientations)
            .map(|i| (base + i as f64 * PI / self.orientations as f64).rem_euclid(PI))
            .collect()
    }

    /// Scores an orientation list for a vertex. Lower is better: a weighted
    /// sum of how far the incident edges deviate from the nearest
    /// orientation and of the turn-angle overhead the fractional solution
    /// would pay when projected onto the list.
    fn rate(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        v: VertexId,
        orientations: &[f64],
    ) -> f64 {
        let grid = instance.grid();
        let neighbor_cost: f64 = grid
            .neighbors(v)
            .iter()
            .map(|&n| {
                let d = direction(grid.position(n), grid.position(v));
                orientations
                    .iter()
                    .map(|&o| abs_angle_difference(o, d).min(abs_angle_difference(o + PI, d)))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum();
        let passage_cost: f64 = solution
            .at_vertex(v)
            .iter()
            .map(|(vp, x)| {
                let free = vp.turn_angle(grid);
                let overhead = orientations
                    .iter()
                    .map(|&o| (vp.forced_turn_angle(grid, o) - free).abs())
                    .fold(f64::INFINITY, f64::min);
                x * overhead
            })
            .sum();
        NEIGHBOR_FACTOR * neighbor_cost + PASSAGE_FACTOR * passage_cost
    }

    /// Distributes the vertex's penalty vector over the orientations. Each
    /// orientation absorbs the fractional usage projected onto it; penalties
    /// go to the currently most-used orientation that still has repetition
    /// budget, largest penalties first.
    fn assign(
        &self,
        instance: &GridInstance,
        solution: &FractionalSolution,
        v: VertexId,
        orientations: &[f64],
    ) -> Vec<StripBlueprint> {
        let grid = instance.grid();
        let mut weights = vec![0.0f64; orientations.len()];
        for (vp, x) in solution.at_vertex(v) {
            if let Some(best) = closest_orientation(grid, &vp, orientations) {
                weights[best] += x;
            }
        }
        let mut penalties: Vec<f64> = instance.coverage(v).penalties().to_vec();
        let budget = orientations.len() * self.repetitions;
        while penalties.len() < budget {
            penalties.push(0.0);
        }
        let mut usages = vec![0usize; orientations.len()];
        let mut blueprints = Vec::new();
        for p in penalties {
            let candidate = (0..orientations.len())
                .filter(|&i| usages[i] < self.repetitions)
                .max_by(|&a, &b| weights[a].total_cmp(&weights[b]));
            let Some(i) = candidate else {
                break;
            };
            weights[i] -= 1.0;
            usages[i] += 1;
            blueprints.push(StripBlueprint::new(orientations[i], p));
        }
        blueprints
    }
}

/// The orientation a passage fits best, by turn-angle overhead.
fn closest_orientation(
    grid: &pcpp_core::instance::Grid,
    vp: &VertexPassage,
    orientations: &[f64],
) -> Option<usize> {
    let free = vp.turn_angle(grid);
    (0..orientations.len()).min_by(|&a, &b| {
        let overhead_a = (vp.forced_turn_angle(grid, orientations[a]) - free).abs();
        let overhead_b = (vp.forced_turn_angle(grid, orientations[b]) - free).abs();
        overhead_a.total_cmp(&overhead_b)
    })
}

impl StripSelector for EquiangularRepetitionStrips {
    fn select(
        &self,
        instance: &GridInstance,
        fractional_solution: &FractionalSolution,
    ) -> HashMap<VertexId, Vec<StripBlueprint>> {
        debug!("selecting atomic strips with the equiangular strategy");
        let mut result = HashMap::new();
        for v in instance.grid().vertices() {
            let best_list = self
                .sample_orientations(instance, v)
                .into_iter()
                .map(|base| self.pattern(base))
                .min_by(|a, b| {
                    self.rate(instance, fractional_solution, v, a)
                        .total_cmp(&self.rate(instance, fractional_solution, v, b))
                })
                .unwrap_or_default();
            result.insert(v, self.assign(instance, fractional_solution, v, &best_list));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pcpp_core::geometry::Point;
    use pcpp_core::instance::{
        CoverageNecessities, CoverageNecessity, Grid, SimpleTouringCosts,
    };

    use super::*;

    /// A horizontal three-vertex path.
    fn path_instance(coverage: CoverageNecessities) -> GridInstance {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(0.0, 0.0));
        let p1 = grid.add_vertex(Point::new(1.0, 0.0));
        let p2 = grid.add_vertex(Point::new(2.0, 0.0));
        grid.add_edge(p0, p1).unwrap();
        grid.add_edge(p1, p2).unwrap();
        GridInstance::new(grid, Box::new(SimpleTouringCosts::new(1.0, 1.0)), coverage).unwrap()
    }

    #[test]
    fn test_produces_k_times_r_blueprints() {
        let instance = path_instance(CoverageNecessities::new(CoverageNecessity::simple()));
        let selector = EquiangularRepetitionStrips::new(3, 2);
        let strips = selector.select(&instance, &FractionalSolution::new());
        for v in instance.grid().vertices() {
            assert_eq!(strips[&v].len(), 6);
        }
    }

    #[test]
    fn test_mandatory_penalty_lands_on_some_strip() {
        let instance = path_instance(CoverageNecessities::new(CoverageNecessity::simple()));
        let selector = EquiangularRepetitionStrips::new(2, 2);
        let strips = selector.select(&instance, &FractionalSolution::new());
        for v in instance.grid().vertices() {
            let mandatory = strips[&v].iter().filter(|b| !b.is_skippable()).count();
            assert_eq!(mandatory, 1);
        }
    }

    #[test]
    fn test_usage_pulls_the_base_orientation_onto_the_path() {
        let instance = path_instance(CoverageNecessities::new(CoverageNecessity::simple()));
        let mut solution = FractionalSolution::new();
        // A heavily used straight passage through the middle vertex.
        solution.set(
            VertexPassage::new(VertexId(1), VertexId(0), VertexId(2)),
            2.0,
        );
        let selector = EquiangularRepetitionStrips::new(1, 2);
        let strips = selector.select(&instance, &solution);
        for blueprint in &strips[&VertexId(1)] {
            assert_abs_diff_eq!(blueprint.orientation, 0.0, epsilon = 1e-6);
        }
    }
}
