//! The grid solver: runs the pipeline and enforces the invariants between
//! its stages.
//!
//! `relaxation -> strips -> matching -> cycle-cover LNS -> connector ->
//! tour LNS`. Every stage hands a feasible solution to the next; violations
//! indicate algorithm bugs and surface as errors rather than corrupt tours.

use log::{debug, info};
use pcpp_core::instance::GridInstance;
use pcpp_core::solution::{
    Cycle, FractionalSolution, decompose_cycles, is_feasible_cycle_cover,
};

use crate::connect::connect_cycles_via_pcst;
use crate::error::SolverError;
use crate::lns::{CycleCoverLns, TourLns};
use crate::lp::{FractionalLpSolver, IntegralizingLpSolver};
use crate::matching::StripMatching;
use crate::strips::{
    EquiangularRepetitionStrips, NeighborAdaptiveStrips, StripSelector,
};

/// Tuning parameters of the grid solver. Immutable once handed to the
/// solver.
#[derive(Debug, Clone, Copy)]
pub struct GridSolverParameters {
    /// Atomic-strip orientation count per vertex.
    pub k: usize,
    /// Repetitions per orientation.
    pub r: usize,
    /// Use the neighbor-based adaptive strip strategy instead of the
    /// equiangular one.
    pub adaptive: bool,
    /// Branch-and-bound depth of the integralizer, zero disables it.
    pub integralize: usize,
    /// Cycle-cover LNS iterations and area size.
    pub cc_opt_steps: usize,
    pub cc_opt_size: usize,
    /// Tour LNS iterations and area size.
    pub t_opt_steps: usize,
    pub t_opt_size: usize,
}

impl Default for GridSolverParameters {
    fn default() -> Self {
        Self {
            k: 3,
            r: 2,
            adaptive: true,
            integralize: 50,
            cc_opt_steps: 25,
            cc_opt_size: 50,
            t_opt_steps: 25,
            t_opt_size: 50,
        }
    }
}

/// Observer hooks of the solver. Every hook is optional.
#[derive(Default)]
pub struct SolverCallbacks<'cb> {
    /// Invoked once the relaxation (and its optional integralization) is
    /// solved, with the fractional solution and its objective.
    pub on_fractional_solution: Option<Box<dyn FnMut(&FractionalSolution, f64) + 'cb>>,
    /// Invoked with the final tour, its touring cost and the remaining
    /// opportunity loss.
    pub on_grid_solution: Option<Box<dyn FnMut(&Cycle, f64, f64) + 'cb>>,
}

/// The cycle-cover stage: relaxation, strip selection and matching.
struct CycleCoverSolver {
    params: GridSolverParameters,
}

impl CycleCoverSolver {
    fn solve(
        &self,
        instance: &GridInstance,
        callbacks: &mut SolverCallbacks<'_>,
    ) -> Result<FractionalSolution, SolverError> {
        debug!("cycle cover: computing fractional solution");
        let (fractional, objective) = if self.params.integralize > 0 {
            IntegralizingLpSolver::new(self.params.integralize).solve(instance)?
        } else {
            FractionalLpSolver.solve(instance)?
        };
        if let Some(hook) = callbacks.on_fractional_solution.as_mut() {
            hook(&fractional, objective);
        }
        info!("fractional solution with objective {objective}");

        debug!("cycle cover: selecting atomic strips");
        let selector: Box<dyn StripSelector> = if self.params.adaptive {
            Box::new(NeighborAdaptiveStrips::new(self.params.k * self.params.r))
        } else {
            Box::new(EquiangularRepetitionStrips::new(self.params.k, self.params.r))
        };
        let blueprints = selector.select(instance, &fractional);

        debug!("cycle cover: solving the strip matching");
        let mut matching = StripMatching::new(instance);
        for v in instance.grid().vertices() {
            let Some(for_vertex) = blueprints.get(&v) else {
                continue;
            };
            for blueprint in for_vertex {
                let strip = matching.create_strip(v, blueprint.orientation);
                if blueprint.is_skippable() {
                    matching.add_skip_penalty(strip, blueprint.penalty);
                }
            }
        }
        matching.solve()?;
        Ok(matching.to_solution())
    }
}

/// Computes a single closed tour for a grid instance.
pub struct GridSolver {
    params: GridSolverParameters,
}

impl GridSolver {
    pub fn new(params: GridSolverParameters) -> Self {
        Self { params }
    }

    pub fn solve(&self, instance: &GridInstance) -> Result<Cycle, SolverError> {
        self.solve_with_callbacks(instance, &mut SolverCallbacks::default())
    }

    pub fn solve_with_callbacks(
        &self,
        instance: &GridInstance,
        callbacks: &mut SolverCallbacks<'_>,
    ) -> Result<Cycle, SolverError> {
        let grid = instance.grid();
        info!(
            "solving grid instance with {} vertices and {} edges",
            grid.vertex_count(),
            grid.edge_count()
        );
        if grid.vertex_count() == 0 {
            return Ok(self.emit(instance, Cycle::empty(), &FractionalSolution::new(), callbacks));
        }

        let cover_solver = CycleCoverSolver {
            params: self.params,
        };
        let mut cover = cover_solver.solve(instance, callbacks)?;
        cover = CycleCoverLns::new(self.params.cc_opt_size, self.params.cc_opt_steps)
            .optimize(instance, cover)?;
        if !is_feasible_cycle_cover(instance, &cover) {
            return Err(SolverError::InvariantViolated(
                "cycle cover stage produced an infeasible cover".into(),
            ));
        }
        let cycles = decompose_cycles(grid, &cover)?;
        info!("cycle cover with {} cycles", cycles.len());

        let Some(tour) = connect_cycles_via_pcst(instance, cycles)? else {
            info!("no profitable connection, the tour is empty");
            return Ok(self.emit(instance, Cycle::empty(), &FractionalSolution::new(), callbacks));
        };

        let tour_solution = TourLns::new(self.params.t_opt_size, self.params.t_opt_steps)
            .optimize(instance, tour.to_fractional_solution())?;
        let mut tour_cycles = decompose_cycles(grid, &tour_solution)?;
        if tour_cycles.len() > 1 {
            return Err(SolverError::InvariantViolated(
                "tour optimization split the tour".into(),
            ));
        }
        let tour = tour_cycles.pop().unwrap_or_else(Cycle::empty);
        Ok(self.emit(instance, tour, &tour_solution, callbacks))
    }

    /// Reports the final tour through the callbacks and returns it.
    fn emit(
        &self,
        instance: &GridInstance,
        tour: Cycle,
        solution: &FractionalSolution,
        callbacks: &mut SolverCallbacks<'_>,
    ) -> Cycle {
        let touring_cost: f64 = tour
            .passages()
            .iter()
            .map(|vp| instance.passage_cost(vp, true))
            .sum();
        let opportunity_loss: f64 = instance
            .grid()
            .vertices()
            .map(|v| instance.coverage(v).opportunity_loss(solution.coverage(v)))
            .sum();
        info!("touring cost {touring_cost}, opportunity loss {opportunity_loss}");
        if let Some(hook) = callbacks.on_grid_solution.as_mut() {
            hook(&tour, touring_cost, opportunity_loss);
        }
        tour
    }
}

impl Default for GridSolver {
    fn default() -> Self {
        Self::new(GridSolverParameters::default())
    }
}
