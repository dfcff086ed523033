/*!
Atomic strips: orientation primitives for the matching reduction.

An atomic strip is a zero-length segment at a vertex with an (unoriented)
orientation in `[0, π)`. It carries two opposed ends pointing at `θ` and
`θ + π`. A perfect matching on all ends induces a cycle cover: pairing the
two ends of one strip continues straight along its orientation, matching
ends of different strips transitions between their vertices.

Strip selection turns the fractional relaxation into a blueprint list per
vertex; the two strategies live in [`equiangular`] and [`adaptive`].
 */

use std::collections::HashMap;
use std::f64::consts::PI;

use pcpp_core::instance::{GridInstance, VertexId};
use pcpp_core::solution::FractionalSolution;

pub mod adaptive;
pub mod equiangular;

pub use adaptive::NeighborAdaptiveStrips;
pub use equiangular::EquiangularRepetitionStrips;

const TWO_PI: f64 = 2.0 * PI;

/// Handle of an atomic strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StripId(pub usize);

/// Handle of a strip end. End `2s` and `2s + 1` belong to strip `s`; the
/// partner of an end flips the low bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndId(pub usize);

impl EndId {
    pub fn strip(self) -> StripId {
        StripId(self.0 / 2)
    }

    pub fn side(self) -> usize {
        self.0 & 1
    }

    pub fn partner(self) -> EndId {
        EndId(self.0 ^ 1)
    }
}

/// An atomic strip placed at a vertex.
#[derive(Debug, Clone, Copy)]
pub struct AtomicStrip {
    pub vertex: VertexId,
    pub orientation: f64,
}

/// The strips of an instance, with per-vertex lookup and end handles.
#[derive(Debug, Default)]
pub struct AtomicStrips {
    strips: Vec<AtomicStrip>,
    at_vertex: HashMap<VertexId, Vec<StripId>>,
}

impl AtomicStrips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, vertex: VertexId, orientation: f64) -> StripId {
        let id = StripId(self.strips.len());
        self.strips.push(AtomicStrip {
            vertex,
            orientation: orientation.rem_euclid(TWO_PI),
        });
        self.at_vertex.entry(vertex).or_default().push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    pub fn end_count(&self) -> usize {
        2 * self.strips.len()
    }

    pub fn get(&self, id: StripId) -> &AtomicStrip {
        &self.strips[id.0]
    }

    pub fn ends(&self, id: StripId) -> (EndId, EndId) {
        (EndId(2 * id.0), EndId(2 * id.0 + 1))
    }

    pub fn end_vertex(&self, end: EndId) -> VertexId {
        self.strips[end.strip().0].vertex
    }

    /// The direction the end points at: the strip orientation for side 0,
    /// the opposite for side 1.
    pub fn end_direction(&self, end: EndId) -> f64 {
        let strip = &self.strips[end.strip().0];
        (strip.orientation + end.side() as f64 * PI).rem_euclid(TWO_PI)
    }

    pub fn strips_at(&self, v: VertexId) -> &[StripId] {
        self.at_vertex.get(&v).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A suggested atomic strip for a vertex: its orientation (mod π) and the
/// penalty its skip edge carries. An infinite penalty marks the strip as
/// mandatory, i.e. it gets no skip edge at all.
#[derive(Debug, Clone, Copy)]
pub struct StripBlueprint {
    pub orientation: f64,
    pub penalty: f64,
}

impl StripBlueprint {
    pub fn new(orientation: f64, penalty: f64) -> Self {
        debug_assert!(penalty >= 0.0, "skip penalties are non-negative");
        Self {
            orientation: orientation.rem_euclid(PI),
            penalty,
        }
    }

    /// True if the strip needs a skip edge.
    pub fn is_skippable(&self) -> bool {
        self.penalty.is_finite()
    }

    /// True if skipping is not free.
    pub fn has_penalty(&self) -> bool {
        self.penalty > 0.0
    }
}

/// Turns the fractional relaxation into strip blueprints per vertex.
pub trait StripSelector {
    fn select(
        &self,
        instance: &GridInstance,
        fractional_solution: &FractionalSolution,
    ) -> HashMap<VertexId, Vec<StripBlueprint>>;
}
