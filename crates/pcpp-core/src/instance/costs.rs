use std::collections::HashMap;

use crate::geometry::{self, distance};
use crate::instance::graph::{Grid, GridEdge, VertexId};
use crate::instance::passage::VertexPassage;

/// The cost model of a grid instance: a distance cost per edge and a turn
/// cost per vertex passage.
pub trait TouringCosts {
    /// The cost of traversing the edge `{from, to}` once.
    fn distance_cost(&self, grid: &Grid, from: VertexId, to: VertexId) -> f64;

    /// The turn cost at `at` for a given turn angle.
    fn turn_cost_from_angle(&self, grid: &Grid, at: VertexId, angle: f64) -> f64;

    /// The turn cost at `at` when entering from `ends.0` and leaving towards
    /// `ends.1`. With a forced orientation the passage is charged as if the
    /// trajectory at `at` were a straight line of that orientation.
    fn turn_cost(
        &self,
        grid: &Grid,
        at: VertexId,
        ends: (VertexId, VertexId),
        forced_orientation: Option<f64>,
    ) -> f64 {
        let p0 = grid.position(ends.0);
        let p1 = grid.position(at);
        let p2 = grid.position(ends.1);
        let angle = match forced_orientation {
            Some(orientation) => geometry::forced_turn_angle(p0, p1, p2, orientation),
            None => geometry::turn_angle(p0, p1, p2),
        };
        self.turn_cost_from_angle(grid, at, angle)
    }

    /// The full cost of a vertex passage. With `halving` the distance share
    /// is halved so that summing over a solution counts every edge once.
    fn passage_cost(
        &self,
        grid: &Grid,
        vp: &VertexPassage,
        halving: bool,
        forced_orientation: Option<f64>,
    ) -> f64 {
        let turn = self.turn_cost(grid, vp.vertex(), vp.endpoints(), forced_orientation);
        let mut dist = self.distance_cost(grid, vp.vertex(), vp.end_a())
            + self.distance_cost(grid, vp.vertex(), vp.end_b());
        if halving {
            dist *= 0.5;
        }
        dist + turn
    }
}

/// Homogeneous touring costs: Euclidean distances and turn angles, each
/// scaled by a global factor.
#[derive(Debug, Clone, Copy)]
pub struct SimpleTouringCosts {
    pub turn_factor: f64,
    pub distance_factor: f64,
}

impl SimpleTouringCosts {
    pub fn new(turn_factor: f64, distance_factor: f64) -> Self {
        Self {
            turn_factor,
            distance_factor,
        }
    }
}

impl TouringCosts for SimpleTouringCosts {
    fn distance_cost(&self, grid: &Grid, from: VertexId, to: VertexId) -> f64 {
        self.distance_factor * distance(grid.position(from), grid.position(to))
    }

    fn turn_cost_from_angle(&self, _grid: &Grid, _at: VertexId, angle: f64) -> f64 {
        self.turn_factor * angle
    }
}

/// Heterogeneous touring costs: per-vertex turn multipliers and per-edge
/// distance multipliers on top of the global factors. Missing multipliers
/// default to one.
#[derive(Debug, Clone)]
pub struct MultipliedTouringCosts {
    turn_factor: f64,
    distance_factor: f64,
    vertex_multipliers: HashMap<VertexId, f64>,
    edge_multipliers: HashMap<GridEdge, f64>,
}

impl MultipliedTouringCosts {
    pub fn new(turn_factor: f64, distance_factor: f64) -> Self {
        Self {
            turn_factor,
            distance_factor,
            vertex_multipliers: HashMap::new(),
            edge_multipliers: HashMap::new(),
        }
    }

    pub fn set_vertex_multiplier(&mut self, v: VertexId, multiplier: f64) {
        self.vertex_multipliers.insert(v, multiplier);
    }

    pub fn set_edge_multiplier(&mut self, edge: GridEdge, multiplier: f64) {
        self.edge_multipliers.insert(edge, multiplier);
    }
}

impl TouringCosts for MultipliedTouringCosts {
    fn distance_cost(&self, grid: &Grid, from: VertexId, to: VertexId) -> f64 {
        let multiplier = self
            .edge_multipliers
            .get(&GridEdge::new(from, to))
            .copied()
            .unwrap_or(1.0);
        self.distance_factor * multiplier * distance(grid.position(from), grid.position(to))
    }

    fn turn_cost_from_angle(&self, _grid: &Grid, at: VertexId, angle: f64) -> f64 {
        let multiplier = self.vertex_multipliers.get(&at).copied().unwrap_or(1.0);
        self.turn_factor * multiplier * angle
    }
}
