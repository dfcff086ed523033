use crate::geometry::{self, distance};
use crate::instance::graph::{Grid, VertexId};

/// One traversal of a vertex: the tour enters `vertex` via `end_a` and leaves
/// via `end_b`. Equivalent under swapping the endpoints, so they are stored
/// normalized with `end_a <= end_b`. A U-turn is the case `end_a == end_b`
/// and counts as two traversals of that edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexPassage {
    vertex: VertexId,
    end_a: VertexId,
    end_b: VertexId,
}

impl VertexPassage {
    pub fn new(vertex: VertexId, end_a: VertexId, end_b: VertexId) -> Self {
        debug_assert!(
            vertex != end_a && vertex != end_b,
            "passage endpoints must differ from the passed vertex"
        );
        let (end_a, end_b) = if end_a <= end_b {
            (end_a, end_b)
        } else {
            (end_b, end_a)
        };
        Self {
            vertex,
            end_a,
            end_b,
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn end_a(&self) -> VertexId {
        self.end_a
    }

    pub fn end_b(&self) -> VertexId {
        self.end_b
    }

    pub fn endpoints(&self) -> (VertexId, VertexId) {
        (self.end_a, self.end_b)
    }

    pub fn is_uturn(&self) -> bool {
        self.end_a == self.end_b
    }

    /// The turn angle of the passage, `π` for a U-turn.
    pub fn turn_angle(&self, grid: &Grid) -> f64 {
        geometry::turn_angle(
            grid.position(self.end_a),
            grid.position(self.vertex),
            grid.position(self.end_b),
        )
    }

    /// The turn angle as if the trajectory at the vertex were constrained to
    /// a straight line of the given orientation.
    pub fn forced_turn_angle(&self, grid: &Grid, orientation: f64) -> f64 {
        geometry::forced_turn_angle(
            grid.position(self.end_a),
            grid.position(self.vertex),
            grid.position(self.end_b),
            orientation,
        )
    }

    /// The geometric length of the passage, starting at the endpoints.
    ///
    /// Halve this when summing over a solution, otherwise every edge is
    /// counted twice (once from each side).
    pub fn distance(&self, grid: &Grid) -> f64 {
        let at = grid.position(self.vertex);
        distance(at, grid.position(self.end_a)) + distance(at, grid.position(self.end_b))
    }
}
