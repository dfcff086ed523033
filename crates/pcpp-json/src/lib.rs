/*!
JSON persistence for grid instances and solved tours.

The instance format mirrors what the polygonal front-end emits: vertex
coordinates with optional coverage vectors (a `null` entry is a mandatory
coverage), edges with optional distance multipliers, per-vertex turn
multipliers and the global cost factors. Tours are stored as waypoint index
sequences with their measurements.
 */

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::debug;
use pcpp_core::geometry::Point;
use pcpp_core::instance::{
    CoverageNecessities, CoverageNecessity, Grid, GridInstance, InstanceError,
    MultipliedTouringCosts,
};
use pcpp_core::solution::Cycle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error("edge references unknown vertex index {0}")]
    UnknownVertexIndex(usize),
}

/// A vertex record: position, coverage vector and turn multiplier.
///
/// `coverage` entries are skip penalties, largest first; `null` encodes a
/// mandatory coverage. A missing vector means a single mandatory coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexRecord {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Vec<Option<f64>>>,
    #[serde(default = "default_multiplier")]
    pub turn_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a: usize,
    pub b: usize,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceFile {
    pub turn_factor: f64,
    pub distance_factor: f64,
    pub vertices: Vec<VertexRecord>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourFile {
    pub waypoints: Vec<usize>,
    pub length: f64,
    pub angle_sum: f64,
}

impl InstanceFile {
    /// Builds the grid instance described by this file.
    pub fn to_instance(&self) -> Result<GridInstance, PersistenceError> {
        let mut grid = Grid::new();
        let mut costs = MultipliedTouringCosts::new(self.turn_factor, self.distance_factor);
        let mut coverage = CoverageNecessities::default();
        let mut ids = Vec::with_capacity(self.vertices.len());
        for record in &self.vertices {
            let id = grid.add_vertex(Point::new(record.x, record.y));
            costs.set_vertex_multiplier(id, record.turn_multiplier);
            if let Some(entries) = &record.coverage {
                let penalties: Vec<f64> = entries
                    .iter()
                    .map(|entry| entry.unwrap_or(f64::INFINITY))
                    .collect();
                coverage.set(id, CoverageNecessity::new(penalties)?);
            }
            ids.push(id);
        }
        for record in &self.edges {
            let a = *ids
                .get(record.a)
                .ok_or(PersistenceError::UnknownVertexIndex(record.a))?;
            let b = *ids
                .get(record.b)
                .ok_or(PersistenceError::UnknownVertexIndex(record.b))?;
            let edge = grid.add_edge(a, b)?;
            costs.set_edge_multiplier(edge, record.multiplier);
        }
        debug!(
            "loaded instance with {} vertices and {} edges",
            self.vertices.len(),
            self.edges.len()
        );
        Ok(GridInstance::new(grid, Box::new(costs), coverage)?)
    }
}

/// Reads a grid instance from a JSON file.
pub fn load_instance<P: AsRef<Path>>(path: P) -> Result<GridInstance, PersistenceError> {
    let reader = BufReader::new(File::open(path)?);
    let file: InstanceFile = serde_json::from_reader(reader)?;
    file.to_instance()
}

/// Parses a grid instance from a JSON string.
pub fn parse_instance(json: &str) -> Result<GridInstance, PersistenceError> {
    let file: InstanceFile = serde_json::from_str(json)?;
    file.to_instance()
}

/// Serializes a tour together with its measurements.
pub fn tour_to_file(tour: &Cycle, grid: &Grid) -> TourFile {
    TourFile {
        waypoints: tour.waypoints().iter().map(|v| v.0).collect(),
        length: tour.length(grid),
        angle_sum: tour.angle_sum(grid),
    }
}

/// Writes a solved tour to a JSON file.
pub fn save_tour<P: AsRef<Path>>(
    path: P,
    tour: &Cycle,
    grid: &Grid,
) -> Result<(), PersistenceError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &tour_to_file(tour, grid))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pcpp_core::instance::{VertexId, VertexPassage};

    use super::*;

    const TRIANGLE: &str = r#"{
        "turn_factor": 1.0,
        "distance_factor": 2.0,
        "vertices": [
            {"x": 0.0, "y": 0.0},
            {"x": 1.0, "y": 1.0, "coverage": [null, 3.5], "turn_multiplier": 2.0},
            {"x": 2.0, "y": 0.0, "coverage": []}
        ],
        "edges": [
            {"a": 0, "b": 1},
            {"a": 1, "b": 2, "multiplier": 3.0},
            {"a": 0, "b": 2}
        ]
    }"#;

    #[test]
    fn test_parse_triangle() {
        let instance = parse_instance(TRIANGLE).unwrap();
        assert_eq!(instance.grid().vertex_count(), 3);
        assert_eq!(instance.grid().edge_count(), 3);
        // Missing coverage falls back to a single mandatory coverage.
        assert_eq!(instance.coverage(VertexId(0)).required_count(), 1);
        assert_eq!(instance.coverage(VertexId(1)).required_count(), 1);
        assert_eq!(instance.coverage(VertexId(1)).len(), 2);
        assert!(instance.coverage(VertexId(2)).is_empty());
        // The edge multiplier scales the distance cost.
        let plain = instance.distance_cost(VertexId(0), VertexId(1));
        let scaled = instance.distance_cost(VertexId(1), VertexId(2));
        assert!((scaled / plain - 3.0).abs() < 1e-9);
        // The vertex multiplier scales the turn cost.
        let at_plain = instance.turn_cost_from_angle(VertexId(0), 1.0);
        let at_scaled = instance.turn_cost_from_angle(VertexId(1), 1.0);
        assert!((at_scaled / at_plain - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_vertex_index_is_reported() {
        let json = r#"{
            "turn_factor": 1.0,
            "distance_factor": 1.0,
            "vertices": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}],
            "edges": [{"a": 0, "b": 5}]
        }"#;
        assert!(matches!(
            parse_instance(json),
            Err(PersistenceError::UnknownVertexIndex(5))
        ));
    }

    #[test]
    fn test_increasing_penalties_are_rejected() {
        let json = r#"{
            "turn_factor": 1.0,
            "distance_factor": 1.0,
            "vertices": [
                {"x": 0.0, "y": 0.0, "coverage": [1.0, 2.0]},
                {"x": 1.0, "y": 0.0}
            ],
            "edges": [{"a": 0, "b": 1}]
        }"#;
        assert!(matches!(
            parse_instance(json),
            Err(PersistenceError::Instance(_))
        ));
    }

    #[test]
    fn test_tour_round_trip_through_json() {
        let instance = parse_instance(TRIANGLE).unwrap();
        let tour = Cycle::new(vec![
            VertexPassage::new(VertexId(0), VertexId(2), VertexId(1)),
            VertexPassage::new(VertexId(1), VertexId(0), VertexId(2)),
            VertexPassage::new(VertexId(2), VertexId(1), VertexId(0)),
        ]);
        let file = tour_to_file(&tour, instance.grid());
        assert_eq!(file.waypoints, vec![0, 1, 2]);
        let json = serde_json::to_string(&file).unwrap();
        let parsed: TourFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.waypoints, file.waypoints);
        assert!((parsed.length - file.length).abs() < 1e-9);
    }
}
