//! Shortest paths in the direction-aware metric.
//!
//! The search state is a directed edge `(u, v)`: the last segment traversed.
//! Moving from `(u, v)` to `(v, w)` costs the distance of `{v, w}` plus the
//! turn at `v` between `u` and `w`, so turn costs attach to transitions
//! between consecutive edges. Costs propagate through a label-correcting
//! queue; an epsilon keeps floating-point noise from rippling through the
//! whole tree.

use std::collections::{HashMap, VecDeque};

use pcpp_core::instance::{GridInstance, VertexId};

pub type DirectedEdge = (VertexId, VertexId);

/// The transition cost between consecutive directed edges, optionally
/// scaled (doubled paths use a multiplier of two).
pub struct EdgeCostFunction<'a> {
    instance: &'a GridInstance,
    multiplier: f64,
}

impl<'a> EdgeCostFunction<'a> {
    pub fn new(instance: &'a GridInstance, multiplier: f64) -> Self {
        Self {
            instance,
            multiplier,
        }
    }

    pub fn cost(&self, edge: DirectedEdge, predecessor: DirectedEdge) -> f64 {
        debug_assert!(predecessor.1 == edge.0, "edges must be consecutive");
        let distance = self.instance.distance_cost(edge.0, edge.1);
        let turn = self.instance.turn_cost(edge.0, (predecessor.0, edge.1));
        self.multiplier * (distance + turn)
    }
}

/// A shortest-path tree over directed edges with multiple sources.
pub struct DirectedEdgeDijkstra<'a> {
    instance: &'a GridInstance,
    cost_function: EdgeCostFunction<'a>,
    improved: VecDeque<DirectedEdge>,
    predecessors: HashMap<DirectedEdge, Option<DirectedEdge>>,
    costs: HashMap<DirectedEdge, f64>,
    epsilon: f64,
}

impl<'a> DirectedEdgeDijkstra<'a> {
    pub fn new(instance: &'a GridInstance, cost_function: EdgeCostFunction<'a>) -> Self {
        Self {
            instance,
            cost_function,
            improved: VecDeque::new(),
            predecessors: HashMap::new(),
            costs: HashMap::new(),
            epsilon: 1e-4,
        }
    }

    /// Lowers the cost of reaching an edge, both for source initialization
    /// and for propagation. Improvements below the epsilon are ignored so
    /// they cannot amplify through the queue.
    pub fn update(
        &mut self,
        edge: DirectedEdge,
        value: f64,
        predecessor: Option<DirectedEdge>,
    ) -> bool {
        let current = self.cost(edge);
        if current - self.epsilon > value {
            self.costs.insert(edge, value);
            self.improved.push_back(edge);
            self.predecessors.insert(edge, predecessor);
            true
        } else {
            false
        }
    }

    /// Propagates pending improvements through the tree. Cheap when there is
    /// nothing to do.
    pub fn propagate(&mut self) {
        while let Some(edge) = self.improved.pop_front() {
            let cost_to_edge = self.cost(edge);
            for &n in self.instance.grid().neighbors(edge.1) {
                let successor = (edge.1, n);
                let cost = cost_to_edge + self.cost_function.cost(successor, edge);
                self.update(successor, cost, Some(edge));
            }
        }
    }

    pub fn cost(&self, edge: DirectedEdge) -> f64 {
        self.costs.get(&edge).copied().unwrap_or(f64::INFINITY)
    }

    /// The edge path from a source to `target`, sources first. Only valid
    /// for reached targets.
    pub fn path(&self, target: DirectedEdge) -> Vec<DirectedEdge> {
        let mut path = vec![target];
        let mut current = self.predecessors.get(&target).copied().flatten();
        while let Some(edge) = current {
            path.push(edge);
            current = self.predecessors.get(&edge).copied().flatten();
        }
        path.reverse();
        debug_assert!(
            path.windows(2).all(|w| w[0].1 == w[1].0),
            "paths are edge-consecutive"
        );
        path
    }
}
