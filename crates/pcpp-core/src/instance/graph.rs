use std::collections::VecDeque;

use crate::geometry::Point;
use crate::instance::InstanceError;

/// Handle of a vertex in a [`Grid`].
///
/// Identity is nominal: two vertices at identical coordinates are distinct
/// entities. All containers key on the handle, so vertices may be relocated
/// without invalidating them; coordinates are read on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

/// An undirected edge between two grid vertices, normalized to `a <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridEdge {
    a: VertexId,
    b: VertexId,
}

impl GridEdge {
    pub fn new(from: VertexId, to: VertexId) -> Self {
        if from <= to {
            Self { a: from, b: to }
        } else {
            Self { a: to, b: from }
        }
    }

    pub fn a(&self) -> VertexId {
        self.a
    }

    pub fn b(&self) -> VertexId {
        self.b
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.a == v || self.b == v
    }

    /// The endpoint opposite to `v`.
    pub fn other(&self, v: VertexId) -> VertexId {
        if v == self.a { self.b } else { self.a }
    }
}

/// An embedded, undirected, simple graph of waypoint candidates.
///
/// Self-loops and parallel edges are rejected. Degree is unbounded but
/// typically small (grid-like neighborhoods).
#[derive(Debug, Clone, Default)]
pub struct Grid {
    positions: Vec<Point>,
    adjacency: Vec<Vec<VertexId>>,
    edges: Vec<GridEdge>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh vertex handle at the given position.
    pub fn add_vertex(&mut self, position: Point) -> VertexId {
        let id = VertexId(self.positions.len());
        self.positions.push(position);
        self.adjacency.push(Vec::new());
        id
    }

    /// Adds an undirected edge. Fails on unknown handles, self-loops and
    /// parallel edges.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId) -> Result<GridEdge, InstanceError> {
        if from.0 >= self.positions.len() {
            return Err(InstanceError::UnknownVertex(from));
        }
        if to.0 >= self.positions.len() {
            return Err(InstanceError::UnknownVertex(to));
        }
        if from == to {
            return Err(InstanceError::SelfLoop(from));
        }
        if self.adjacency[from.0].contains(&to) {
            return Err(InstanceError::ParallelEdge(from, to));
        }
        let edge = GridEdge::new(from, to);
        self.adjacency[from.0].push(to);
        self.adjacency[to.0].push(from);
        self.edges.push(edge);
        Ok(edge)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.positions.len()).map(VertexId)
    }

    pub fn edges(&self) -> &[GridEdge] {
        &self.edges
    }

    pub fn neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.adjacency[v.0]
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.adjacency[v.0].len()
    }

    pub fn has_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.adjacency[from.0].contains(&to)
    }

    pub fn position(&self, v: VertexId) -> Point {
        self.positions[v.0]
    }

    /// Moves a vertex. Handles stay valid, costs change implicitly.
    pub fn relocate(&mut self, v: VertexId, position: Point) {
        self.positions[v.0] = position;
    }

    /// Breadth-first connectivity check. The empty grid counts as connected.
    pub fn is_connected(&self) -> bool {
        let n = self.positions.len();
        if n == 0 {
            return true;
        }
        let mut seen = vec![false; n];
        let mut queue = VecDeque::from([VertexId(0)]);
        seen[0] = true;
        let mut count = 1;
        while let Some(v) = queue.pop_front() {
            for &nbr in self.neighbors(v) {
                if !seen[nbr.0] {
                    seen[nbr.0] = true;
                    count += 1;
                    queue.push_back(nbr);
                }
            }
        }
        count == n
    }

    /// Breadth-first expansion around `root`, truncated once the area exceeds
    /// `size` vertices.
    pub fn bfs_area(&self, root: VertexId, size: usize) -> Vec<VertexId> {
        let mut area = vec![root];
        let mut seen = vec![false; self.positions.len()];
        seen[root.0] = true;
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            for &nbr in self.neighbors(v) {
                if seen[nbr.0] {
                    continue;
                }
                if area.len() > size {
                    return area;
                }
                seen[nbr.0] = true;
                area.push(nbr);
                queue.push_back(nbr);
            }
        }
        area
    }
}
