//! Best-first branch-and-bound on top of the fractional relaxation.
//!
//! Nodes carry their LP solution plus the bound sets that produced it and are
//! kept ordered by objective value. Branching picks the passage with the
//! highest `fractionality * cost * vertex fractionality` score and spawns two
//! children with a ceiled lower bound resp. a floored upper bound on that
//! passage. Infeasible children are pruned. The procedure is anytime: the
//! best node is always a valid fractional solution.

use log::{debug, trace};
use pcpp_core::instance::{GridInstance, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use crate::error::SolverError;

use super::{LinearProgram, PassageBounds};

/// Branching scores below this are considered integral enough to stop.
const MIN_BRANCHING_SCORE: f64 = 0.01;

struct BnbNode {
    solution: FractionalSolution,
    objective: f64,
    bounds: PassageBounds,
}

/// Fractional solver that performs up to `depth` branch-and-bound steps to
/// improve integrality. Depth zero behaves like the plain relaxation.
#[derive(Debug, Clone, Copy)]
pub struct IntegralizingLpSolver {
    depth: usize,
}

impl IntegralizingLpSolver {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn solve(&self, instance: &GridInstance) -> Result<(FractionalSolution, f64), SolverError> {
        let lp = LinearProgram::new(instance);
        let (solution, objective) = lp.solve()?;
        debug!("integralizer root relaxation: {objective}");
        let mut nodes = vec![BnbNode {
            solution,
            objective,
            bounds: PassageBounds::default(),
        }];

        for step in 0..self.depth {
            if nodes[0].solution.is_integral() {
                debug!("relaxation integral after {step} branchings");
                break;
            }
            let node = nodes.remove(0);
            let Some(vp) = select_branching_passage(instance, &node.solution) else {
                // Everything fractional is negligible, keep the incumbent.
                nodes.insert(0, node);
                break;
            };
            let value = node.solution.get(&vp);
            trace!("branching on passage with value {value}");
            for child_bounds in branched_bounds(&node.bounds, vp, value) {
                match lp.solve_with_bounds(&child_bounds) {
                    Ok((solution, objective)) => nodes.push(BnbNode {
                        solution,
                        objective,
                        bounds: child_bounds,
                    }),
                    Err(error) => {
                        // Pruned: the bounds admit no fractional cycle cover.
                        trace!("pruning branch-and-bound child: {error}");
                    }
                }
            }
            if nodes.is_empty() {
                // Both children infeasible; the parent stays the incumbent.
                nodes.push(node);
                break;
            }
            nodes.sort_by(|a, b| a.objective.total_cmp(&b.objective));
        }

        let best = &nodes[0];
        debug!("integralized relaxation: {}", best.objective);
        Ok((best.solution.clone(), best.objective))
    }
}

fn branched_bounds(
    bounds: &PassageBounds,
    vp: VertexPassage,
    value: f64,
) -> [PassageBounds; 2] {
    let mut ceiled = bounds.clone();
    ceiled.lower.insert(vp, value.ceil());
    let mut floored = bounds.clone();
    floored.upper.insert(vp, value.floor());
    [ceiled, floored]
}

fn fractionality(x: f64) -> f64 {
    (x - x.floor()).min(x.ceil() - x)
}

/// The most promising fractional passage: weighted by its own fractionality,
/// its cost and how fractional its vertex is overall.
fn select_branching_passage(
    instance: &GridInstance,
    solution: &FractionalSolution,
) -> Option<VertexPassage> {
    let score = |vp: &VertexPassage, x: f64| {
        let vertex_fractionality: f64 = solution
            .at_vertex(vp.vertex())
            .iter()
            .map(|(_, value)| fractionality(*value))
            .sum();
        fractionality(x) * instance.passage_cost(vp, true) * vertex_fractionality
    };
    solution
        .iter()
        .map(|(vp, x)| (*vp, score(vp, x)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(_, best)| *best > MIN_BRANCHING_SCORE)
        .map(|(vp, _)| vp)
}
