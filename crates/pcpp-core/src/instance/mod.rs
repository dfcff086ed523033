//! The immutable grid instance: an embedded graph of waypoint candidates, a
//! touring cost function and per-vertex coverage necessities.

use thiserror::Error;

pub mod costs;
pub mod coverage;
pub mod graph;
pub mod passage;

pub use costs::{MultipliedTouringCosts, SimpleTouringCosts, TouringCosts};
pub use coverage::{CoverageNecessities, CoverageNecessity};
pub use graph::{Grid, GridEdge, VertexId};
pub use passage::VertexPassage;

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("grid graph must be connected")]
    Disconnected,
    #[error("self-loop at {0:?} is not allowed")]
    SelfLoop(VertexId),
    #[error("parallel edge between {0:?} and {1:?}")]
    ParallelEdge(VertexId, VertexId),
    #[error("unknown vertex handle {0:?}")]
    UnknownVertex(VertexId),
    #[error("coverage penalties must be positive and non-increasing")]
    MalformedPenaltyVector,
}

/// A discretized coverage planning instance. Immutable after construction;
/// solutions reference it but never modify it.
pub struct GridInstance {
    grid: Grid,
    costs: Box<dyn TouringCosts>,
    coverage: CoverageNecessities,
}

impl GridInstance {
    /// Bundles a grid with its cost model and coverage necessities. The grid
    /// graph has to be connected, otherwise mandatory coverage may be
    /// unreachable.
    pub fn new(
        grid: Grid,
        costs: Box<dyn TouringCosts>,
        coverage: CoverageNecessities,
    ) -> Result<Self, InstanceError> {
        if !grid.is_connected() {
            return Err(InstanceError::Disconnected);
        }
        Ok(Self {
            grid,
            costs,
            coverage,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn coverage(&self, v: VertexId) -> &CoverageNecessity {
        self.coverage.get(v)
    }

    pub fn distance_cost(&self, from: VertexId, to: VertexId) -> f64 {
        self.costs.distance_cost(&self.grid, from, to)
    }

    pub fn turn_cost(&self, at: VertexId, ends: (VertexId, VertexId)) -> f64 {
        self.costs.turn_cost(&self.grid, at, ends, None)
    }

    pub fn forced_turn_cost(&self, at: VertexId, ends: (VertexId, VertexId), orientation: f64) -> f64 {
        self.costs.turn_cost(&self.grid, at, ends, Some(orientation))
    }

    pub fn turn_cost_from_angle(&self, at: VertexId, angle: f64) -> f64 {
        self.costs.turn_cost_from_angle(&self.grid, at, angle)
    }

    pub fn passage_cost(&self, vp: &VertexPassage, halving: bool) -> f64 {
        self.costs.passage_cost(&self.grid, vp, halving, None)
    }

    pub fn forced_passage_cost(&self, vp: &VertexPassage, halving: bool, orientation: f64) -> f64 {
        self.costs
            .passage_cost(&self.grid, vp, halving, Some(orientation))
    }

    /// The opportunity loss of leaving every vertex uncovered.
    pub fn total_opportunity_loss(&self) -> f64 {
        self.grid
            .vertices()
            .map(|v| self.coverage(v).opportunity_loss(0.0))
            .sum()
    }
}
