//! Merging cycles into a growing reference cycle.
//!
//! [`CheapestCycleConnection`] keeps a shortest-path tree seeded with the
//! reference cycle's passages. Merges invalidate single passages at the
//! splice points; when a reported best connection turns out to start at a
//! passage no longer on the reference cycle, the tree is recomputed from
//! scratch and the query retried.

use log::warn;
use pcpp_core::instance::GridInstance;
use pcpp_core::solution::{Cycle, FractionalSolution, decompose_cycles};

use crate::error::SolverError;

use super::shortest_path::PassageShortestPath;

pub struct CheapestCycleConnection<'a> {
    instance: &'a GridInstance,
    shortest_path: PassageShortestPath<'a>,
    cycle: Cycle,
}

impl<'a> CheapestCycleConnection<'a> {
    pub fn new(instance: &'a GridInstance, cycle: Cycle) -> Self {
        let mut connection = Self {
            instance,
            shortest_path: PassageShortestPath::new(instance),
            cycle: Cycle::empty(),
        };
        connection.update_cycle(cycle);
        connection
    }

    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    /// Replaces the reference cycle. The old sources stay in the tree; they
    /// are expected to be mostly contained in the new cycle.
    pub fn update_cycle(&mut self, cycle: Cycle) {
        self.cycle = cycle;
        for vp in self.cycle.passages() {
            self.shortest_path.add_source(*vp, false);
        }
        self.shortest_path.propagate();
    }

    fn best_target(
        &self,
        other: &Cycle,
    ) -> Option<(pcpp_core::instance::VertexPassage, f64)> {
        other
            .passages()
            .iter()
            .map(|vp| (*vp, self.shortest_path.cost(vp)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn rebuild(&mut self) {
        self.shortest_path = PassageShortestPath::new(self.instance);
        let cycle = self.cycle.clone();
        self.update_cycle(cycle);
    }

    /// The cost of connecting `other` to the reference cycle. With `check`,
    /// stale sources trigger a recomputation of the tree.
    pub fn cost(&mut self, other: &Cycle, check: bool) -> f64 {
        let Some((target, cost)) = self.best_target(other) else {
            return f64::INFINITY;
        };
        if check && cost.is_finite() {
            if let Some((_, source)) = self.shortest_path.connection(&target) {
                if !self.cycle.passages().contains(&source) {
                    warn!("stale shortest-path source, recomputing the tree");
                    self.rebuild();
                    return self.cost(other, false);
                }
            }
        }
        cost
    }

    /// The solution delta merging `other` into the reference cycle.
    pub fn connection(&mut self, other: &Cycle) -> Option<FractionalSolution> {
        let (target, _) = self.best_target(other)?;
        let (delta, source) = self.shortest_path.connection(&target)?;
        if !self.cycle.passages().contains(&source) {
            warn!("stale shortest-path source, recomputing the tree");
            self.rebuild();
            let (target, _) = self.best_target(other)?;
            return self.shortest_path.connection(&target).map(|(d, _)| d);
        }
        Some(delta)
    }
}

/// Merges cycles into one growing tour cycle via the cheapest connections.
pub struct CycleMerger<'a> {
    instance: &'a GridInstance,
    connection: CheapestCycleConnection<'a>,
}

impl<'a> CycleMerger<'a> {
    pub fn new(instance: &'a GridInstance, cycle: Cycle) -> Self {
        Self {
            instance,
            connection: CheapestCycleConnection::new(instance, cycle),
        }
    }

    pub fn cycle(&self) -> &Cycle {
        self.connection.cycle()
    }

    pub fn estimate_cost(&mut self, other: &Cycle) -> f64 {
        self.connection.cost(other, true)
    }

    /// Merges `other` into the reference cycle and returns the merged
    /// cycle.
    pub fn merge(&mut self, other: &Cycle) -> Result<Cycle, SolverError> {
        let delta = self.connection.connection(other).ok_or_else(|| {
            SolverError::InvariantViolated("no connection between cycles to merge".into())
        })?;
        let mut merged = other.to_fractional_solution();
        merged.absorb(&self.connection.cycle().to_fractional_solution());
        merged.absorb(&delta);
        let mut cycles = decompose_cycles(self.instance.grid(), &merged)?;
        if cycles.len() != 1 {
            return Err(SolverError::InvariantViolated(
                "cycle merge did not produce a single cycle".into(),
            ));
        }
        let merged_cycle = cycles.pop().expect("exactly one cycle");
        self.connection.update_cycle(merged_cycle.clone());
        Ok(merged_cycle)
    }
}
