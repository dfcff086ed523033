//! Direct connections between cycles sharing a vertex.
//!
//! Two passages through the same vertex can be re-paired into two new
//! passages, splicing their cycles together on the spot. The cost is the
//! change in turn cost; the cheaper of the two possible re-pairings is used.

use std::collections::HashMap;

use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

/// Source passages indexed by vertex, answering cheapest direct-connection
/// queries for targets at shared vertices.
pub struct IntersectingPassageConnection<'a> {
    instance: &'a GridInstance,
    sources: HashMap<VertexId, Vec<VertexPassage>>,
}

impl<'a> IntersectingPassageConnection<'a> {
    pub fn new(instance: &'a GridInstance) -> Self {
        Self {
            instance,
            sources: HashMap::new(),
        }
    }

    pub fn add_source(&mut self, source: VertexPassage) {
        let at_vertex = self.sources.entry(source.vertex()).or_default();
        if !at_vertex.contains(&source) {
            at_vertex.push(source);
        }
    }

    fn turn_cost(&self, vp: &VertexPassage) -> f64 {
        self.instance.turn_cost(vp.vertex(), vp.endpoints())
    }

    /// The cheaper re-pairing of `source` and `target` at their shared
    /// vertex.
    fn replacements(
        &self,
        source: &VertexPassage,
        target: &VertexPassage,
    ) -> (VertexPassage, VertexPassage) {
        debug_assert!(source.vertex() == target.vertex());
        let v = source.vertex();
        let straight = (
            VertexPassage::new(v, source.end_a(), target.end_a()),
            VertexPassage::new(v, source.end_b(), target.end_b()),
        );
        let crossed = (
            VertexPassage::new(v, source.end_a(), target.end_b()),
            VertexPassage::new(v, source.end_b(), target.end_a()),
        );
        let cost = |pair: &(VertexPassage, VertexPassage)| {
            self.turn_cost(&pair.0) + self.turn_cost(&pair.1)
        };
        if cost(&straight) < cost(&crossed) {
            straight
        } else {
            crossed
        }
    }

    fn best_source(&self, target: &VertexPassage) -> Option<(VertexPassage, f64)> {
        let candidates = self.sources.get(&target.vertex())?;
        let objective = |source: &VertexPassage| {
            let (r0, r1) = self.replacements(source, target);
            self.turn_cost(&r0) + self.turn_cost(&r1)
                - (self.turn_cost(target) + self.turn_cost(source))
        };
        candidates
            .iter()
            .map(|source| (*source, objective(source)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// The cost of directly splicing `target`'s cycle into any source cycle
    /// at a shared vertex; infinite if they do not intersect.
    pub fn cost(&self, target: &VertexPassage) -> f64 {
        self.best_source(target)
            .map(|(_, cost)| cost)
            .unwrap_or(f64::INFINITY)
    }

    /// The solution delta performing the splice, plus the source passage it
    /// attaches to.
    pub fn connection(
        &self,
        target: &VertexPassage,
    ) -> Option<(FractionalSolution, VertexPassage)> {
        let (source, _) = self.best_source(target)?;
        let mut delta = FractionalSolution::new();
        delta.add(*target, -1.0);
        delta.add(source, -1.0);
        let (r0, r1) = self.replacements(&source, target);
        delta.add(r0, 1.0);
        delta.add(r1, 1.0);
        Some((delta, source))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pcpp_core::geometry::Point;
    use pcpp_core::instance::{
        CoverageNecessities, CoverageNecessity, Grid, SimpleTouringCosts,
    };

    use super::*;

    /// A plus-shaped star around a shared center.
    fn star_instance() -> GridInstance {
        let mut grid = Grid::new();
        let center = grid.add_vertex(Point::new(0.0, 0.0));
        for (x, y) in [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)] {
            let n = grid.add_vertex(Point::new(x, y));
            grid.add_edge(center, n).unwrap();
        }
        GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(1.0, 1.0)),
            CoverageNecessities::new(CoverageNecessity::optional()),
        )
        .unwrap()
    }

    #[test]
    fn test_straight_passages_splice_for_a_full_turn() {
        let instance = star_instance();
        let mut connection = IntersectingPassageConnection::new(&instance);
        // Horizontal straight passage as source, vertical one as target.
        let source = VertexPassage::new(VertexId(0), VertexId(1), VertexId(3));
        let target = VertexPassage::new(VertexId(0), VertexId(2), VertexId(4));
        connection.add_source(source);
        // Both re-pairings consist of two quarter turns; the original
        // passages were straight, so the delta is a full pi.
        assert_abs_diff_eq!(
            connection.cost(&target),
            std::f64::consts::PI,
            epsilon = 1e-6
        );
        let (delta, found_source) = connection.connection(&target).unwrap();
        assert_eq!(found_source, source);
        assert_abs_diff_eq!(delta.get(&source), -1.0);
        assert_abs_diff_eq!(delta.get(&target), -1.0);
    }

    #[test]
    fn test_disjoint_vertices_have_no_direct_connection() {
        let instance = star_instance();
        let mut connection = IntersectingPassageConnection::new(&instance);
        connection.add_source(VertexPassage::new(VertexId(0), VertexId(1), VertexId(3)));
        let target = VertexPassage::new(VertexId(1), VertexId(0), VertexId(0));
        assert!(connection.cost(&target).is_infinite());
        assert!(connection.connection(&target).is_none());
    }
}
