//! Feasibility checks shared by all pipeline stages: passage legality, flow
//! balance per edge, integrality and coverage.

use thiserror::Error;

use crate::instance::GridInstance;
use crate::instance::graph::{Grid, VertexId};
use crate::instance::passage::VertexPassage;

use super::fractional::FractionalSolution;

/// Tolerance for the per-edge flow balance.
pub const FLOW_EPS: f64 = 1e-5;

#[derive(Error, Debug)]
pub enum SolutionError {
    #[error("flow imbalance of {imbalance} on edge {from:?} -- {to:?}")]
    NotFlowFeasible {
        from: VertexId,
        to: VertexId,
        imbalance: f64,
    },
    #[error("passage value {value} at {vertex:?} is not near-integral")]
    NotIntegral { vertex: VertexId, value: f64 },
    #[error("vertex {vertex:?} is covered {covered} times but requires {required}")]
    InsufficientCoverage {
        vertex: VertexId,
        covered: f64,
        required: usize,
    },
    #[error("a passage at {vertex:?} uses a non-neighbor endpoint")]
    ForeignPassage { vertex: VertexId },
}

/// The flow leaving `v` towards `out`: passages at `v` with `out` as an
/// endpoint, counting U-turns twice.
fn flow_at(solution: &FractionalSolution, grid: &Grid, v: VertexId, out: VertexId) -> f64 {
    grid.neighbors(v)
        .iter()
        .map(|&n| {
            let vp = VertexPassage::new(v, out, n);
            let multiplier = if n == out { 2.0 } else { 1.0 };
            multiplier * solution.get(&vp)
        })
        .sum()
}

/// Checks that every passage only uses endpoints adjacent to its vertex.
pub fn check_passages_between_neighbors(
    grid: &Grid,
    solution: &FractionalSolution,
) -> Result<(), SolutionError> {
    for (vp, _) in solution.iter() {
        let (a, b) = vp.endpoints();
        if !grid.has_edge(vp.vertex(), a) || !grid.has_edge(vp.vertex(), b) {
            return Err(SolutionError::ForeignPassage {
                vertex: vp.vertex(),
            });
        }
    }
    Ok(())
}

/// Checks the flow balance on every edge: both sides must support the same
/// number of traversals.
pub fn check_flow_feasible(
    grid: &Grid,
    solution: &FractionalSolution,
) -> Result<(), SolutionError> {
    for edge in grid.edges() {
        let (v, w) = (edge.a(), edge.b());
        let imbalance = (flow_at(solution, grid, v, w) - flow_at(solution, grid, w, v)).abs();
        if imbalance > FLOW_EPS {
            return Err(SolutionError::NotFlowFeasible {
                from: v,
                to: w,
                imbalance,
            });
        }
    }
    Ok(())
}

pub fn is_flow_feasible(grid: &Grid, solution: &FractionalSolution) -> bool {
    check_flow_feasible(grid, solution).is_ok()
}

/// Checks that every mandatory coverage is met.
pub fn check_covered(
    instance: &GridInstance,
    solution: &FractionalSolution,
) -> Result<(), SolutionError> {
    for v in instance.grid().vertices() {
        let required = instance.coverage(v).required_count();
        let covered = solution.coverage(v);
        if covered + FLOW_EPS < required as f64 {
            return Err(SolutionError::InsufficientCoverage {
                vertex: v,
                covered,
                required,
            });
        }
    }
    Ok(())
}

pub fn is_covered(instance: &GridInstance, solution: &FractionalSolution) -> bool {
    check_covered(instance, solution).is_ok()
}

/// The combined predicate for a feasible integral cycle cover: integral,
/// flow-feasible, sufficiently covering and only using legal passages.
pub fn is_feasible_cycle_cover(instance: &GridInstance, solution: &FractionalSolution) -> bool {
    solution.is_integral()
        && check_passages_between_neighbors(instance.grid(), solution).is_ok()
        && is_flow_feasible(instance.grid(), solution)
        && is_covered(instance, solution)
}

#[cfg(test)]
mod tests {
    use crate::geometry::Point;
    use crate::instance::{CoverageNecessities, CoverageNecessity, SimpleTouringCosts};

    use super::*;

    fn triangle_instance() -> GridInstance {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(0.0, 0.0));
        let p1 = grid.add_vertex(Point::new(1.0, 1.0));
        let p2 = grid.add_vertex(Point::new(2.0, 0.0));
        grid.add_edge(p0, p1).unwrap();
        grid.add_edge(p1, p2).unwrap();
        grid.add_edge(p0, p2).unwrap();
        GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(1.0, 1.0)),
            CoverageNecessities::new(CoverageNecessity::simple()),
        )
        .unwrap()
    }

    fn triangle_ring() -> FractionalSolution {
        let mut solution = FractionalSolution::new();
        solution.set(
            VertexPassage::new(VertexId(0), VertexId(1), VertexId(2)),
            1.0,
        );
        solution.set(
            VertexPassage::new(VertexId(1), VertexId(0), VertexId(2)),
            1.0,
        );
        solution.set(
            VertexPassage::new(VertexId(2), VertexId(0), VertexId(1)),
            1.0,
        );
        solution
    }

    #[test]
    fn test_integral_ring_is_feasible() {
        let instance = triangle_instance();
        assert!(is_feasible_cycle_cover(&instance, &triangle_ring()));
    }

    #[test]
    fn test_half_ring_is_flow_feasible_but_fractional() {
        let instance = triangle_instance();
        let mut solution = FractionalSolution::new();
        for (vp, _) in triangle_ring().iter() {
            solution.set(*vp, 0.5);
        }
        assert!(is_flow_feasible(instance.grid(), &solution));
        assert!(!is_feasible_cycle_cover(&instance, &solution));
    }

    #[test]
    fn test_unbalanced_flow_is_detected() {
        let instance = triangle_instance();
        let mut solution = FractionalSolution::new();
        solution.set(
            VertexPassage::new(VertexId(0), VertexId(1), VertexId(1)),
            1.0,
        );
        solution.set(
            VertexPassage::new(VertexId(1), VertexId(0), VertexId(2)),
            1.0,
        );
        solution.set(
            VertexPassage::new(VertexId(2), VertexId(0), VertexId(1)),
            1.0,
        );
        assert!(matches!(
            check_flow_feasible(instance.grid(), &solution),
            Err(SolutionError::NotFlowFeasible { .. })
        ));
    }

    #[test]
    fn test_missing_coverage_is_detected() {
        let instance = triangle_instance();
        let mut solution = FractionalSolution::new();
        // A shuttle between p0 and p1 leaves p2 uncovered.
        solution.set(
            VertexPassage::new(VertexId(0), VertexId(1), VertexId(1)),
            1.0,
        );
        solution.set(
            VertexPassage::new(VertexId(1), VertexId(0), VertexId(0)),
            1.0,
        );
        assert!(is_flow_feasible(instance.grid(), &solution));
        assert!(matches!(
            check_covered(&instance, &solution),
            Err(SolutionError::InsufficientCoverage { .. })
        ));
    }

    #[test]
    fn test_foreign_passage_is_detected() {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(0.0, 0.0));
        let p1 = grid.add_vertex(Point::new(1.0, 0.0));
        let p2 = grid.add_vertex(Point::new(2.0, 0.0));
        grid.add_edge(p0, p1).unwrap();
        grid.add_edge(p1, p2).unwrap();
        let mut solution = FractionalSolution::new();
        // p0 and p2 are not adjacent.
        solution.set(VertexPassage::new(p1, p0, p2), 1.0);
        solution.set(VertexPassage::new(p0, p2, p2), 1.0);
        assert!(matches!(
            check_passages_between_neighbors(&grid, &solution),
            Err(SolutionError::ForeignPassage { .. })
        ));
    }
}
