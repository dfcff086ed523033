//! The local re-optimization MIP.
//!
//! Structurally the fractional relaxation restricted to an area, with
//! integer passage variables and binary penalty variables. Edges crossing
//! the area boundary keep their current traversal counts through equality
//! constraints, so the re-optimized area always composes with the untouched
//! remainder into a flow-feasible solution.

use std::collections::{HashMap, HashSet};

use good_lp::solvers::highs::highs;
use good_lp::{Expression, Solution, SolverModel, Variable, constraint, variable, variables};
use itertools::Itertools;
use pcpp_core::instance::{GridInstance, GridEdge, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use crate::error::SolverError;

/// Traversal counts of the edges crossing the area boundary, frozen during
/// the local re-optimization.
pub struct FixedEdges {
    counts: HashMap<GridEdge, f64>,
}

impl FixedEdges {
    pub fn new(area: &HashSet<VertexId>, solution: &FractionalSolution) -> Self {
        let mut counts: HashMap<GridEdge, f64> = HashMap::new();
        for &v in area {
            for (vp, x) in solution.at_vertex(v) {
                let (a, b) = vp.endpoints();
                for n in [a, b] {
                    if !area.contains(&n) {
                        *counts.entry(GridEdge::new(v, n)).or_insert(0.0) += x;
                    }
                }
            }
        }
        Self { counts }
    }

    pub fn count(&self, from: VertexId, to: VertexId) -> f64 {
        self.counts
            .get(&GridEdge::new(from, to))
            .copied()
            .unwrap_or(0.0)
    }

    /// The frozen edges incident to `v` as `(other endpoint, count)` pairs.
    pub fn at_vertex(&self, v: VertexId) -> Vec<(VertexId, f64)> {
        self.counts
            .iter()
            .filter(|(edge, _)| edge.contains(v))
            .map(|(edge, &count)| (edge.other(v), count))
            .collect()
    }
}

/// A subtour elimination constraint: the crossing passages together must
/// carry at least as much as the passage the cycle is anchored on.
pub struct SubtourCut {
    pub anchor: VertexPassage,
    pub crossing: Vec<VertexPassage>,
}

/// The local MIP for one area. Solving materializes a fresh model, so
/// accumulated subtour cuts can be passed per call.
pub struct LocalMip<'a> {
    instance: &'a GridInstance,
    area: HashSet<VertexId>,
    current: &'a FractionalSolution,
    passages: Vec<VertexPassage>,
    passage_set: HashSet<VertexPassage>,
    fixed: FixedEdges,
    penalties: Vec<(VertexId, f64)>,
}

impl<'a> LocalMip<'a> {
    pub fn new(
        instance: &'a GridInstance,
        area_vertices: &[VertexId],
        current: &'a FractionalSolution,
    ) -> Self {
        let grid = instance.grid();
        let area: HashSet<VertexId> = area_vertices.iter().copied().collect();
        let fixed = FixedEdges::new(&area, current);

        let mut passages = Vec::new();
        for &v in area_vertices {
            for ends in grid.neighbors(v).iter().combinations_with_replacement(2) {
                let (u, w) = (*ends[0], *ends[1]);
                let u_included = area.contains(&u) || fixed.count(v, u) > 0.0;
                let w_included = area.contains(&w) || fixed.count(v, w) > 0.0;
                if u_included && w_included {
                    passages.push(VertexPassage::new(v, u, w));
                }
            }
        }
        let passage_set: HashSet<VertexPassage> = passages.iter().copied().collect();

        let mut penalties = Vec::new();
        for &v in area_vertices {
            let necessity = instance.coverage(v);
            if necessity.is_empty() || necessity.is_fully_mandatory() {
                continue;
            }
            let bound = cheapest_covering_cycle_cost(instance, v);
            for &p in necessity.penalties() {
                if p < bound {
                    penalties.push((v, p));
                }
            }
        }

        Self {
            instance,
            area,
            current,
            passages,
            passage_set,
            fixed,
            penalties,
        }
    }

    pub fn area(&self) -> &HashSet<VertexId> {
        &self.area
    }

    pub fn has_passage_variable(&self, vp: &VertexPassage) -> bool {
        self.passage_set.contains(vp)
    }

    /// Solves the local MIP under the given subtour cuts and returns the
    /// current solution with the area overwritten by the new assignment.
    pub fn solve(&self, cuts: &[SubtourCut]) -> Result<FractionalSolution, SolverError> {
        let grid = self.instance.grid();
        let mut vars = variables!();
        let mut objective = Expression::from(0.0);
        let mut passage_vars: HashMap<VertexPassage, Variable> = HashMap::new();
        for vp in &self.passages {
            let var = vars.add(variable().integer().min(0));
            objective += self.instance.passage_cost(vp, true) * var;
            passage_vars.insert(*vp, var);
        }
        let mut penalty_vars_at: HashMap<VertexId, Vec<Variable>> = HashMap::new();
        for &(v, p) in &self.penalties {
            let var = vars.add(variable().binary());
            objective += p * var;
            penalty_vars_at.entry(v).or_default().push(var);
        }

        let mut model = vars.minimise(objective).using(highs);

        // Flow balance on edges fully inside the area.
        for edge in grid.edges() {
            if !self.area.contains(&edge.a()) || !self.area.contains(&edge.b()) {
                continue;
            }
            let mut balance = Expression::from(0.0);
            for (v, out, sign) in [(edge.a(), edge.b(), 1.0), (edge.b(), edge.a(), -1.0)] {
                for &n in grid.neighbors(v) {
                    let vp = VertexPassage::new(v, out, n);
                    if let Some(&var) = passage_vars.get(&vp) {
                        let multiplier = if vp.is_uturn() { 2.0 } else { 1.0 };
                        balance += sign * multiplier * var;
                    }
                }
            }
            model = model.with(constraint!(balance == 0.0));
        }

        // Boundary edges keep their current traversal counts.
        for &v in &self.area {
            for (out, count) in self.fixed.at_vertex(v) {
                let mut usage = Expression::from(0.0);
                for &n in grid.neighbors(v) {
                    let vp = VertexPassage::new(v, out, n);
                    if let Some(&var) = passage_vars.get(&vp) {
                        let multiplier = if vp.is_uturn() { 2.0 } else { 1.0 };
                        usage += multiplier * var;
                    }
                }
                let count = count.round();
                model = model.with(constraint!(usage == count));
            }
        }

        // Coverage inside the area.
        for &v in &self.area {
            let target = self.instance.coverage(v).len();
            if target == 0 {
                continue;
            }
            let mut covering = Expression::from(0.0);
            for ends in grid.neighbors(v).iter().combinations_with_replacement(2) {
                if let Some(&var) = passage_vars.get(&VertexPassage::new(v, *ends[0], *ends[1])) {
                    covering += var;
                }
            }
            if let Some(vars_at) = penalty_vars_at.get(&v) {
                for &var in vars_at {
                    covering += var;
                }
            }
            let target = target as f64;
            model = model.with(constraint!(covering >= target));
        }

        // Subtour elimination cuts from previous rounds.
        for cut in cuts {
            let Some(&anchor_var) = passage_vars.get(&cut.anchor) else {
                continue;
            };
            let mut crossing = Expression::from(0.0);
            for vp in &cut.crossing {
                if let Some(&var) = passage_vars.get(vp) {
                    crossing += var;
                }
            }
            model = model.with(constraint!(crossing >= anchor_var));
        }

        let solved = model.solve()?;

        let mut result = self.current.clone();
        for vp in &self.passages {
            result.set(*vp, solved.value(passage_vars[vp]).round());
        }
        Ok(result)
    }
}

/// Same bound as in the relaxation: shuttle to the distance-nearest
/// neighbor and back.
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
