//! Cheapest connections from a set of source passages to arbitrary target
//! passages, via doubled shortest paths or direct splices.
//!
//! A source passage is opened towards a neighbor by replacing it with the
//! two passages routing through that neighbor; the cost difference is the
//! endpoint-replacement overhead. The path itself is charged twice (it is
//! walked out and back), targets are closed with the same replacement
//! overhead on their side.

use std::collections::HashMap;

use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use super::dijkstra::{DirectedEdge, DirectedEdgeDijkstra, EdgeCostFunction};
use super::intersect::IntersectingPassageConnection;

pub struct PassageShortestPath<'a> {
    instance: &'a GridInstance,
    sources: HashMap<DirectedEdge, VertexPassage>,
    dijkstra: DirectedEdgeDijkstra<'a>,
    direct: IntersectingPassageConnection<'a>,
}

impl<'a> PassageShortestPath<'a> {
    pub fn new(instance: &'a GridInstance) -> Self {
        Self {
            instance,
            sources: HashMap::new(),
            dijkstra: DirectedEdgeDijkstra::new(instance, EdgeCostFunction::new(instance, 2.0)),
            direct: IntersectingPassageConnection::new(instance),
        }
    }

    /// The two passages replacing `vp` when its cycle detours through `n`.
    fn replacement_passages(vp: &VertexPassage, n: VertexId) -> [VertexPassage; 2] {
        [
            VertexPassage::new(vp.vertex(), n, vp.end_a()),
            VertexPassage::new(vp.vertex(), n, vp.end_b()),
        ]
    }

    /// The overhead of opening `source` towards `path_start`, full distance
    /// costs included.
    fn start_cost(&self, source: &VertexPassage, path_start: VertexId) -> f64 {
        let replacements = Self::replacement_passages(source, path_start);
        replacements
            .iter()
            .map(|vp| self.instance.passage_cost(vp, false))
            .sum::<f64>()
            - self.instance.passage_cost(source, false)
    }

    /// Registers a passage as a connection source.
    pub fn add_source(&mut self, source: VertexPassage, propagate: bool) {
        self.direct.add_source(source);
        for &n in self.instance.grid().neighbors(source.vertex()) {
            let edge = (source.vertex(), n);
            let cost = self.start_cost(&source, n);
            if self.dijkstra.update(edge, cost, None) {
                self.sources.insert(edge, source);
            }
        }
        if propagate {
            self.dijkstra.propagate();
        }
    }

    pub fn propagate(&mut self) {
        self.dijkstra.propagate();
    }

    /// The cost of reaching `target` over the given final path edge: the
    /// tree cost plus the turn-only replacement overhead at the target.
    fn path_cost(&self, target: &VertexPassage, path_end: DirectedEdge) -> f64 {
        debug_assert!(path_end.1 == target.vertex());
        let grid = self.instance.grid();
        let turn_cost = |vp: &VertexPassage| {
            self.instance
                .turn_cost_from_angle(vp.vertex(), vp.turn_angle(grid))
        };
        let replacements = Self::replacement_passages(target, path_end.0);
        let overhead =
            turn_cost(&replacements[0]) + turn_cost(&replacements[1]) - turn_cost(target);
        self.dijkstra.cost(path_end) + overhead
    }

    fn best_path_end(&self, target: &VertexPassage) -> Option<(DirectedEdge, f64)> {
        self.instance
            .grid()
            .neighbors(target.vertex())
            .iter()
            .map(|&n| {
                let edge = (n, target.vertex());
                (edge, self.path_cost(target, edge))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// The cheapest connection cost to `target`, direct or via a doubled
    /// path.
    pub fn cost(&self, target: &VertexPassage) -> f64 {
        let direct = self.direct.cost(target);
        let indirect = self
            .best_path_end(target)
            .map(|(_, cost)| cost)
            .unwrap_or(f64::INFINITY);
        direct.min(indirect)
    }

    /// The solution delta connecting `target` to the cheapest source, plus
    /// that source passage.
    pub fn connection(
        &self,
        target: &VertexPassage,
    ) -> Option<(FractionalSolution, VertexPassage)> {
        let indirect = self.best_path_end(target);
        let direct_cost = self.direct.cost(target);
        match indirect {
            Some((path_end, cost)) if cost <= direct_cost && cost.is_finite() => {
                let path = self.dijkstra.path(path_end);
                let source = *self.sources.get(&path[0])?;
                Some((self.doubled_path_delta(&source, &path, target), source))
            }
            _ => self.direct.connection(target),
        }
    }

    /// Builds the delta of a doubled-path merge: the path's interior
    /// passages twice, plus the endpoint replacements on both sides.
    fn doubled_path_delta(
        &self,
        source: &VertexPassage,
        path: &[DirectedEdge],
        target: &VertexPassage,
    ) -> FractionalSolution {
        let mut delta = FractionalSolution::new();
        for pair in path.windows(2) {
            let (edge, next) = (pair[0], pair[1]);
            delta.add(VertexPassage::new(edge.1, edge.0, next.1), 2.0);
        }
        delta.add(*source, -1.0);
        for vp in Self::replacement_passages(source, path[0].1) {
            delta.add(vp, 1.0);
        }
        delta.add(*target, -1.0);
        for vp in Self::replacement_passages(target, path[path.len() - 1].0) {
            delta.add(vp, 1.0);
        }
        delta
    }
}
