/*!
The fractional relaxation of the penalty cycle cover.

For every unordered vertex passage `(a, v, b)` there is a continuous variable
`x >= 0`; for every finite skip penalty cheaper than the cheapest cycle
through its vertex there is a penalty variable `y in [0, 1]`. The objective
sums halved passage costs and penalties. Constraints: per-edge flow balance
(U-turns count twice) and per-vertex coverage.

The LP has one variable per passage, i.e. `O(sum of squared degrees)` many,
and one constraint per edge plus one per covered vertex.

[`IntegralizingLpSolver`] optionally runs a best-first branch-and-bound on
top of the relaxation to push the solution towards integrality.
 */

use std::collections::HashMap;

use good_lp::solvers::highs::highs;
use good_lp::{Expression, Solution, SolverModel, Variable, constraint, variable, variables};
use itertools::Itertools;
use log::debug;
use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use crate::error::SolverError;

mod integralize;

pub use integralize::IntegralizingLpSolver;

/// Variable values below this threshold are not copied into the extracted
/// fractional solution.
const EXTRACTION_EPS: f64 = 0.01;

/// Bound constraints on passage variables, used by the branch-and-bound
/// integralizer.
#[derive(Debug, Clone, Default)]
pub struct PassageBounds {
    pub lower: HashMap<VertexPassage, f64>,
    pub upper: HashMap<VertexPassage, f64>,
}

/// The symbolic structure of the relaxation for one instance. Every solve
/// materializes a fresh backend model, so bound sets can vary per call.
pub struct LinearProgram<'a> {
    instance: &'a GridInstance,
    passages: Vec<VertexPassage>,
    penalties: Vec<(VertexId, f64)>,
}

impl<'a> LinearProgram<'a> {
    pub fn new(instance: &'a GridInstance) -> Self {
        let grid = instance.grid();
        let mut passages = Vec::new();
        for v in grid.vertices() {
            for ends in grid.neighbors(v).iter().combinations_with_replacement(2) {
                passages.push(VertexPassage::new(v, *ends[0], *ends[1]));
            }
        }
        let mut penalties = Vec::new();
        for v in grid.vertices() {
            let necessity = instance.coverage(v);
            if necessity.is_empty() || necessity.is_fully_mandatory() {
                continue;
            }
            let bound = cheapest_covering_cycle_cost(instance, v);
            for &p in necessity.penalties() {
                // Penalties at or above the cheapest covering cycle are
                // always covered instead, so they need no variable.
                if p < bound {
                    penalties.push((v, p));
                }
            }
        }
        Self {
            instance,
            passages,
            penalties,
        }
    }

    pub fn passages(&self) -> &[VertexPassage] {
        &self.passages
    }

    /// Solves the relaxation without extra bounds.
    pub fn solve(&self) -> Result<(FractionalSolution, f64), SolverError> {
        self.solve_with_bounds(&PassageBounds::default())
    }

    /// Solves the relaxation with additional integer bounds on selected
    /// passage variables.
    pub fn solve_with_bounds(
        &self,
        bounds: &PassageBounds,
    ) -> Result<(FractionalSolution, f64), SolverError> {
        let grid = self.instance.grid();
        let mut vars = variables!();
        let mut passage_vars: HashMap<VertexPassage, Variable> = HashMap::new();
        let mut objective = Expression::from(0.0);
        for vp in &self.passages {
            let var = vars.add(variable().min(0.0));
            objective += self.instance.passage_cost(vp, true) * var;
            passage_vars.insert(*vp, var);
        }
        let mut penalty_vars: Vec<(f64, Variable)> = Vec::new();
        let mut penalty_vars_at: HashMap<VertexId, Vec<Variable>> = HashMap::new();
        for &(v, p) in &self.penalties {
            let var = vars.add(variable().min(0.0).max(1.0));
            objective += p * var;
            penalty_vars.push((p, var));
            penalty_vars_at.entry(v).or_default().push(var);
        }

        let mut model = vars.minimise(objective).using(highs);

        // Flow balance per edge, counting U-turns twice.
        for edge in grid.edges() {
            let mut balance = Expression::from(0.0);
            for (v, out, sign) in [(edge.a(), edge.b(), 1.0), (edge.b(), edge.a(), -1.0)] {
                for &n in grid.neighbors(v) {
                    let vp = VertexPassage::new(v, out, n);
                    let multiplier = if vp.is_uturn() { 2.0 } else { 1.0 };
                    balance += sign * multiplier * passage_vars[&vp];
                }
            }
            model = model.with(constraint!(balance == 0.0));
        }

        // Coverage per vertex: passages plus paid penalties meet the vector.
        for v in grid.vertices() {
            let target = self.instance.coverage(v).len();
            if target == 0 {
                continue;
            }
            let mut covering = Expression::from(0.0);
            for ends in grid.neighbors(v).iter().combinations_with_replacement(2) {
                covering += passage_vars[&VertexPassage::new(v, *ends[0], *ends[1])];
            }
            if let Some(vars_at) = penalty_vars_at.get(&v) {
                for &var in vars_at {
                    covering += var;
                }
            }
            let target = target as f64;
            model = model.with(constraint!(covering >= target));
        }

        for (vp, &bound) in &bounds.lower {
            let x = passage_vars[vp];
            model = model.with(constraint!(x >= bound));
        }
        for (vp, &bound) in &bounds.upper {
            let x = passage_vars[vp];
            model = model.with(constraint!(x <= bound));
        }

        let solved = model.solve()?;

        let mut solution = FractionalSolution::new();
        let mut objective_value = 0.0;
        for vp in &self.passages {
            let value = solved.value(passage_vars[vp]);
            objective_value += self.instance.passage_cost(vp, true) * value;
            if value > EXTRACTION_EPS {
                solution.set(*vp, value);
            }
        }
        for &(p, var) in &penalty_vars {
            objective_value += p * solved.value(var);
        }
        Ok((solution, objective_value))
    }
}

/// A cheap upper bound for covering `v`: shuttle once to the distance-nearest
/// neighbor and back, paying the two U-turns.
fn cheapest_covering_cycle_cost(instance: &GridInstance, v: VertexId) -> f64 {
    let grid = instance.grid();
    let nearest = grid
        .neighbors(v)
        .iter()
        .copied()
        .min_by(|&a, &b| {
            instance
                .distance_cost(v, a)
                .total_cmp(&instance.distance_cost(v, b))
        });
    let Some(n) = nearest else {
        return f64::INFINITY;
    };
    instance.turn_cost(v, (n, n))
        + instance.turn_cost(n, (v, v))
        + 2.0 * instance.distance_cost(v, n)
}

/// The plain fractional solver: one LP solve, no integralization.
#[derive(Debug, Clone, Copy, Default)]
pub struct FractionalLpSolver;

impl FractionalLpSolver {
    pub fn solve(&self, instance: &GridInstance) -> Result<(FractionalSolution, f64), SolverError> {
        let lp = LinearProgram::new(instance);
        let result = lp.solve()?;
        debug!("fractional relaxation solved with objective {}", result.1);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pcpp_core::geometry::Point;
    use pcpp_core::instance::{
        CoverageNecessities, CoverageNecessity, Grid, SimpleTouringCosts,
    };
    use pcpp_core::solution::feasibility;

    use super::*;

    fn triangle_instance(coverage: CoverageNecessities) -> GridInstance {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(0.0, 0.0));
        let p1 = grid.add_vertex(Point::new(1.0, 1.0));
        let p2 = grid.add_vertex(Point::new(2.0, 0.0));
        grid.add_edge(p0, p1).unwrap();
        grid.add_edge(p1, p2).unwrap();
        grid.add_edge(p0, p2).unwrap();
        GridInstance::new(grid, Box::new(SimpleTouringCosts::new(1.0, 1.0)), coverage).unwrap()
    }

    #[test]
    fn test_all_optional_triangle_has_empty_relaxation() {
        let instance =
            triangle_instance(CoverageNecessities::new(CoverageNecessity::optional()));
        let (solution, objective) = FractionalLpSolver.solve(&instance).unwrap();
        assert!(solution.is_empty());
        assert_abs_diff_eq!(objective, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mandatory_triangle_relaxation_is_flow_feasible_and_covering() {
        let instance = triangle_instance(CoverageNecessities::new(CoverageNecessity::simple()));
        let (solution, objective) = FractionalLpSolver.solve(&instance).unwrap();
        assert!(feasibility::is_flow_feasible(instance.grid(), &solution));
        assert!(feasibility::is_covered(&instance, &solution));
        assert!(objective > 0.0);
    }

    #[test]
    fn test_isolated_mandatory_vertex_is_infeasible() {
        let mut grid = Grid::new();
        grid.add_vertex(Point::new(0.0, 0.0));
        let instance = GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(1.0, 1.0)),
            CoverageNecessities::new(CoverageNecessity::simple()),
        )
        .unwrap();
        assert!(FractionalLpSolver.solve(&instance).is_err());
    }

    #[test]
    fn test_variable_counts() {
        let instance = triangle_instance(CoverageNecessities::new(CoverageNecessity::simple()));
        let lp = LinearProgram::new(&instance);
        // Per vertex of degree 2: three unordered endpoint pairs.
        assert_eq!(lp.passages().len(), 9);
    }

    #[test]
    fn test_cheap_penalties_get_variables() {
        let mut coverage = CoverageNecessities::new(CoverageNecessity::simple());
        coverage.set(VertexId(1), CoverageNecessity::penalty(0.1));
        coverage.set(VertexId(2), CoverageNecessity::penalty(1e9));
        let instance = triangle_instance(coverage);
        let lp = LinearProgram::new(&instance);
        // Only the cheap penalty at p1 is worth a variable; the huge one at
        // p2 is dominated by covering and the mandatory p0 must be covered.
        assert_eq!(lp.penalties.len(), 1);
        assert_eq!(lp.penalties[0].0, VertexId(1));
    }
}
