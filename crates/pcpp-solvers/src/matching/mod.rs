/*!
Reduction of turn-aware cycle cover to minimum-weight perfect matching.

The auxiliary graph has two nodes per atomic strip, one per end. Skip edges
connect the two ends of a skippable strip at the strip's penalty; mandatory
strips get none and are thereby forced into the cover. Transition edges
connect ends of strips at graph-adjacent vertices, weighted by the
direction-aware cost of leaving one strip and arriving at the other.

The reconstructed matching is walked into closed end sequences, which
collapse into vertex rings and finally into passages.
 */

use std::collections::HashSet;
use std::f64::consts::PI;

use log::debug;
use pcpp_core::geometry::{abs_angle_difference, direction};
use pcpp_core::instance::{GridInstance, VertexId, VertexPassage};
use pcpp_core::solution::FractionalSolution;

use crate::error::SolverError;
use crate::strips::{AtomicStrips, EndId, StripId};

mod oracle;

pub use oracle::min_weight_perfect_matching;

/// The direction-aware cost of transitioning from one strip end to another:
/// the edge distance plus the turn out of the first strip's direction and
/// the turn into the (reversed) direction of the second end.
fn transition_cost(
    instance: &GridInstance,
    strips: &AtomicStrips,
    from: EndId,
    to: EndId,
) -> f64 {
    let grid = instance.grid();
    let v0 = strips.end_vertex(from);
    let v1 = strips.end_vertex(to);
    let heading = direction(grid.position(v1), grid.position(v0));
    let first_turn = abs_angle_difference(strips.end_direction(from), heading);
    let second_turn = abs_angle_difference(
        heading,
        (strips.end_direction(to) + PI).rem_euclid(2.0 * PI),
    );
    instance.distance_cost(v0, v1)
        + instance.turn_cost_from_angle(v0, first_turn)
        + instance.turn_cost_from_angle(v1, second_turn)
}

/// Builder and solver for the strip-end matching of one instance.
pub struct StripMatching<'a> {
    instance: &'a GridInstance,
    strips: AtomicStrips,
    edges: Vec<(EndId, EndId, f64)>,
    partner: Vec<Option<EndId>>,
}

impl<'a> StripMatching<'a> {
    pub fn new(instance: &'a GridInstance) -> Self {
        Self {
            instance,
            strips: AtomicStrips::new(),
            edges: Vec::new(),
            partner: Vec::new(),
        }
    }

    pub fn strips(&self) -> &AtomicStrips {
        &self.strips
    }

    /// Places a strip and fully connects its ends to all strips at adjacent
    /// vertices.
    pub fn create_strip(&mut self, vertex: VertexId, orientation: f64) -> StripId {
        let strip = self.strips.create(vertex, orientation);
        let (e0, e1) = self.strips.ends(strip);
        for &n in self.instance.grid().neighbors(vertex) {
            for &other in self.strips.strips_at(n) {
                let (o0, o1) = self.strips.ends(other);
                for end in [e0, e1] {
                    for other_end in [o0, o1] {
                        let weight = transition_cost(self.instance, &self.strips, end, other_end);
                        debug_assert!(
                            {
                                let reverse =
                                    transition_cost(self.instance, &self.strips, other_end, end);
                                (reverse - weight).abs() <= (1e-3 * weight).max(1e-3)
                            },
                            "transition costs are symmetric"
                        );
                        self.edges.push((end, other_end, weight));
                    }
                }
            }
        }
        strip
    }

    /// Adds the skip edge between the two ends of a strip. Mandatory strips
    /// simply never get one.
    pub fn add_skip_penalty(&mut self, strip: StripId, penalty: f64) {
        debug_assert!(penalty >= 0.0 && penalty.is_finite());
        let (e0, e1) = self.strips.ends(strip);
        self.edges.push((e0, e1, penalty));
    }

    /// Runs the perfect-matching oracle and stores the matched partner of
    /// every end.
    pub fn solve(&mut self) -> Result<(), SolverError> {
        debug!(
            "solving strip matching on {} ends and {} edges",
            self.strips.end_count(),
            self.edges.len()
        );
        let edges: Vec<(usize, usize, f64)> = self
            .edges
            .iter()
            .map(|&(a, b, w)| (a.0, b.0, w))
            .collect();
        let matching = min_weight_perfect_matching(self.strips.end_count(), &edges)?;
        self.partner = vec![None; self.strips.end_count()];
        for (a, b) in matching {
            self.partner[a] = Some(EndId(b));
            self.partner[b] = Some(EndId(a));
        }
        Ok(())
    }

    fn matched(&self, end: EndId) -> EndId {
        self.partner[end.0].expect("solve() assigns every end a partner")
    }

    /// Walks the closed end sequence through `start`, alternating matched
    /// partners and strip partners. Only valid after [`Self::solve`].
    fn walk(&self, start: EndId) -> Vec<EndId> {
        let mut sequence = vec![start];
        let mut current = self.matched(start);
        sequence.push(current);
        current = current.partner();
        while current != start {
            sequence.push(current);
            current = self.matched(current);
            if current == start {
                break;
            }
            sequence.push(current);
            current = current.partner();
        }
        sequence
    }

    /// Reconstructs the integral cycle cover induced by the matching:
    /// consecutive co-located ends collapse into a single waypoint, the
    /// remaining vertex rings emit one passage per waypoint. Two-end walks
    /// are skipped strips and disappear.
    pub fn to_solution(&self) -> FractionalSolution {
        let mut solution = FractionalSolution::new();
        let mut visited: HashSet<EndId> = HashSet::new();
        for index in 0..self.strips.end_count() {
            let start = EndId(index);
            if visited.contains(&start) {
                continue;
            }
            let sequence = self.walk(start);
            visited.extend(sequence.iter().copied());
            if sequence.len() <= 2 {
                continue;
            }
            let mut ring: Vec<VertexId> = Vec::new();
            for end in &sequence {
                let vertex = self.strips.end_vertex(*end);
                if ring.last() != Some(&vertex) {
                    ring.push(vertex);
                }
            }
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            if ring.len() < 2 {
                continue;
            }
            let n = ring.len();
            for i in 0..n {
                let vp = VertexPassage::new(ring[(i + 1) % n], ring[i], ring[(i + 2) % n]);
                solution.add(vp, 1.0);
            }
        }
        solution
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

    fn two_point_instance() -> GridInstance {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(1.0, 0.0));
        let p1 = grid.add_vertex(Point::new(2.0, 0.0));
        grid.add_edge(p0, p1).unwrap();
        GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(1.0, 1.0)),
            CoverageNecessities::new(CoverageNecessity::optional()),
        )
        .unwrap()
    }

    #[test]
    fn test_transition_cost_pure_distance() {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(1.0, 1.0));
        let p1 = grid.add_vertex(Point::new(1.0, 3.0));
        grid.add_edge(p0, p1).unwrap();
        let instance = GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(0.0, 1.0)),
            CoverageNecessities::new(CoverageNecessity::optional()),
        )
        .unwrap();
        let mut strips = AtomicStrips::new();
        let s0 = strips.create(p0, 1.0);
        let s1 = strips.create(p1, 1.0);
        let (from, _) = strips.ends(s0);
        let (to, _) = strips.ends(s1);
        assert_abs_diff_eq!(
            transition_cost(&instance, &strips, from, to),
            2.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_transition_cost_pure_turns() {
        let mut grid = Grid::new();
        let p0 = grid.add_vertex(Point::new(1.0, 1.0));
        let p1 = grid.add_vertex(Point::new(1.0, 3.0));
        grid.add_edge(p0, p1).unwrap();
        let instance = GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(1.0, 0.0)),
            CoverageNecessities::new(CoverageNecessity::optional()),
        )
        .unwrap();
        let mut strips = AtomicStrips::new();
        // Heading straight up, arriving on a strip pointing right-down:
        // a quarter turn at departure, none at arrival.
        let s0 = strips.create(p0, 0.0);
        let s1 = strips.create(p1, 1.5 * PI);
        let (from, _) = strips.ends(s0);
        let (to, _) = strips.ends(s1);
        assert_abs_diff_eq!(
            transition_cost(&instance, &strips, from, to),
            0.5 * PI,
            epsilon = 1e-6
        );
        // Arriving against a strip pointing up costs a half turn on each side.
        let s2 = strips.create(p1, PI);
        let (to2, _) = strips.ends(s2);
        let expected = abs_angle_difference(0.0, 0.5 * PI)
            + abs_angle_difference(0.5 * PI, PI + PI);
        assert_abs_diff_eq!(
            transition_cost(&instance, &strips, from, to2),
            expected,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_skippable_strips_disappear_and_forced_ones_connect() {
        let instance = two_point_instance();
        let mut matching = StripMatching::new(&instance);
        let (p0, p1) = (VertexId(0), VertexId(1));
        let s0 = matching.create_strip(p0, 0.0);
        matching.add_skip_penalty(s0, 0.1);
        // This strip is expensive to skip, so it must be toured.
        let s1 = matching.create_strip(p1, 2.0);
        matching.add_skip_penalty(s1, 1000.0);
        let s2 = matching.create_strip(p1, 1.0);
        matching.add_skip_penalty(s2, 0.0);
        matching.solve().unwrap();
        let solution = matching.to_solution();
        // The expensive strip at p1 pulls the shuttle to p0 into the cover.
        assert!(solution.coverage(p1) >= 1.0);
        assert!(solution.coverage(p0) >= 1.0);
        assert!(feasibility::is_flow_feasible(instance.grid(), &solution));
        assert!(solution.is_integral());
    }

    #[test]
    fn test_all_free_skips_produce_the_empty_cover() {
        let instance = two_point_instance();
        let mut matching = StripMatching::new(&instance);
        for v in [VertexId(0), VertexId(1)] {
            for orientation in [0.0, 1.0] {
                let s = matching.create_strip(v, orientation);
                matching.add_skip_penalty(s, 0.0);
            }
        }
        matching.solve().unwrap();
        assert!(matching.to_solution().is_empty());
    }

    #[test]
    fn test_mandatory_strip_forces_a_cycle() {
        let instance = two_point_instance();
        let mut matching = StripMatching::new(&instance);
        // No skip edge at all: the strip is mandatory.
        matching.create_strip(VertexId(0), 0.0);
        let s1 = matching.create_strip(VertexId(1), 0.0);
        matching.add_skip_penalty(s1, 0.0);
        matching.solve().unwrap();
        let solution = matching.to_solution();
        assert!(solution.coverage(VertexId(0)) >= 1.0);
        assert!(feasibility::is_flow_feasible(instance.grid(), &solution));
    }
}
