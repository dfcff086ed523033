use std::collections::{HashMap, HashSet};

use crate::instance::graph::{Grid, VertexId};
use crate::instance::passage::VertexPassage;

/// Values closer to zero than this are treated as absent. LP backends return
/// slightly noisy values, so all comparisons in this type are epsilon-aware.
pub const VALUE_EPS: f64 = 1e-3;

/// Tolerance for deciding whether a solution is integral.
pub const INTEGRALITY_EPS: f64 = 0.01;

/// A sparse assignment of non-negative values to vertex passages, e.g. the
/// result of the fractional relaxation or an integral cycle cover.
#[derive(Debug, Clone, Default)]
pub struct FractionalSolution {
    usages: HashMap<VertexPassage, f64>,
    at_vertex: HashMap<VertexId, HashSet<VertexPassage>>,
}

impl FractionalSolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the usage of a passage, dropping near-zero entries.
    pub fn set(&mut self, vp: VertexPassage, value: f64) {
        debug_assert!(value >= -VALUE_EPS, "usages must be non-negative");
        if value.abs() <= VALUE_EPS {
            self.usages.remove(&vp);
        } else {
            self.usages.insert(vp, value);
            self.at_vertex.entry(vp.vertex()).or_default().insert(vp);
        }
    }

    /// Adds to the (possibly absent) usage of a passage. Intermediate sums
    /// may dip below zero while composing connection deltas; entries ending
    /// up near zero are dropped.
    pub fn add(&mut self, vp: VertexPassage, value: f64) {
        let sum = self.get(&vp) + value;
        if sum.abs() <= VALUE_EPS {
            self.usages.remove(&vp);
        } else {
            self.usages.insert(vp, sum);
            self.at_vertex.entry(vp.vertex()).or_default().insert(vp);
        }
    }

    pub fn get(&self, vp: &VertexPassage) -> f64 {
        self.usages.get(vp).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, vp: &VertexPassage) -> bool {
        self.get(vp) > 0.0
    }

    /// All passages recorded at a vertex together with their current usage.
    pub fn at_vertex(&self, v: VertexId) -> Vec<(VertexPassage, f64)> {
        match self.at_vertex.get(&v) {
            Some(passages) => passages.iter().map(|vp| (*vp, self.get(vp))).collect(),
            None => Vec::new(),
        }
    }

    /// The summed usage of all passages at a vertex.
    pub fn coverage(&self, v: VertexId) -> f64 {
        match self.at_vertex.get(&v) {
            Some(passages) => passages.iter().map(|vp| self.get(vp)).sum(),
            None => 0.0,
        }
    }

    /// Iterates over all non-zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (&VertexPassage, f64)> + '_ {
        self.usages.iter().map(|(vp, &x)| (vp, x))
    }

    pub fn len(&self) -> usize {
        self.usages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Vertices that currently carry at least one passage.
    pub fn vertices(&self) -> Vec<VertexId> {
        let set: HashSet<VertexId> = self.usages.keys().map(|vp| vp.vertex()).collect();
        set.into_iter().collect()
    }

    /// Adds every entry of `other` on top of this solution.
    pub fn absorb(&mut self, other: &FractionalSolution) {
        for (vp, x) in other.iter() {
            self.add(*vp, x);
        }
    }

    /// The pointwise positive difference `self - other`.
    pub fn difference(&self, other: &FractionalSolution) -> FractionalSolution {
        let mut result = FractionalSolution::new();
        for (vp, x) in self.iter() {
            let diff = x - other.get(vp);
            if diff > 0.0 {
                result.set(*vp, diff);
            }
        }
        result
    }

    /// The usage-weighted sum of turn angles.
    pub fn angle_sum(&self, grid: &Grid) -> f64 {
        self.iter().map(|(vp, x)| vp.turn_angle(grid) * x).sum()
    }

    /// The usage-weighted length, counting every edge once.
    pub fn length(&self, grid: &Grid) -> f64 {
        self.iter().map(|(vp, x)| 0.5 * vp.distance(grid) * x).sum()
    }

    pub fn is_integral(&self) -> bool {
        self.iter()
            .all(|(_, x)| (x - x.round()).abs() <= INTEGRALITY_EPS)
    }

    /// Epsilon-aware pointwise equality.
    pub fn approx_eq(&self, other: &FractionalSolution) -> bool {
        self.iter().all(|(vp, x)| (x - other.get(vp)).abs() <= VALUE_EPS)
            && other.iter().all(|(vp, x)| (x - self.get(vp)).abs() <= VALUE_EPS)
    }
}
