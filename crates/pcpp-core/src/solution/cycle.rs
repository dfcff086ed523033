use std::collections::HashMap;

use crate::geometry::{distance, turn_angle};
use crate::instance::graph::{Grid, GridEdge, VertexId};
use crate::instance::passage::VertexPassage;

use super::fractional::FractionalSolution;

/// A closed walk given as an ordered list of vertex passages. Consecutive
/// passages share an edge: each passage's vertex is an endpoint of its
/// neighbors, wrapping around at the ends. Vertices may repeat
/// (figure-eights are valid cycles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    passages: Vec<VertexPassage>,
}

impl Cycle {
    pub fn new(passages: Vec<VertexPassage>) -> Self {
        Self { passages }
    }

    pub fn empty() -> Self {
        Self {
            passages: Vec::new(),
        }
    }

    pub fn passages(&self) -> &[VertexPassage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// The consecutive-passage connectivity predicate: every passage hands
    /// over to the next via a shared edge, including the wrap-around pair.
    pub fn is_connected(&self) -> bool {
        if self.passages.is_empty() {
            return true;
        }
        if self.passages.len() == 1 {
            return false;
        }
        let n = self.passages.len();
        (0..n).all(|i| {
            let current = &self.passages[i];
            let next = &self.passages[(i + 1) % n];
            let (a, b) = current.endpoints();
            let (a_next, b_next) = next.endpoints();
            (next.vertex() == a || next.vertex() == b)
                && (current.vertex() == a_next || current.vertex() == b_next)
        })
    }

    /// How often each vertex is passed.
    pub fn covered_vertices(&self) -> HashMap<VertexId, usize> {
        let mut coverage = HashMap::new();
        for vp in &self.passages {
            *coverage.entry(vp.vertex()).or_insert(0) += 1;
        }
        coverage
    }

    /// The vertex sequence of the walk, one entry per passage.
    pub fn waypoints(&self) -> Vec<VertexId> {
        self.passages.iter().map(|vp| vp.vertex()).collect()
    }

    /// The closed vertex chain: the waypoints plus the first vertex repeated
    /// at the end.
    fn closed_chain(&self) -> Vec<VertexId> {
        let mut chain = self.waypoints();
        if let Some(&first) = chain.first() {
            chain.push(first);
        }
        chain
    }

    /// How often each undirected grid edge is traversed.
    pub fn edges(&self) -> HashMap<GridEdge, usize> {
        let mut edges = HashMap::new();
        let chain = self.closed_chain();
        for pair in chain.windows(2) {
            *edges.entry(GridEdge::new(pair[0], pair[1])).or_insert(0) += 1;
        }
        edges
    }

    pub fn length(&self, grid: &Grid) -> f64 {
        let chain = self.closed_chain();
        chain
            .windows(2)
            .map(|pair| distance(grid.position(pair[0]), grid.position(pair[1])))
            .sum()
    }

    pub fn angle_sum(&self, grid: &Grid) -> f64 {
        if self.passages.is_empty() {
            return 0.0;
        }
        let mut chain = self.closed_chain();
        chain.insert(0, self.passages[self.passages.len() - 1].vertex());
        chain
            .windows(3)
            .map(|w| {
                turn_angle(
                    grid.position(w[0]),
                    grid.position(w[1]),
                    grid.position(w[2]),
                )
            })
            .sum()
    }

    /// The passage multiset of the walk as a fractional solution.
    pub fn to_fractional_solution(&self) -> FractionalSolution {
        let mut solution = FractionalSolution::new();
        if self.passages.is_empty() {
            return solution;
        }
        let mut chain = self.closed_chain();
        chain.insert(0, self.passages[self.passages.len() - 1].vertex());
        for w in chain.windows(3) {
            solution.add(VertexPassage::new(w[1], w[0], w[2]), 1.0);
        }
        solution
    }
}
