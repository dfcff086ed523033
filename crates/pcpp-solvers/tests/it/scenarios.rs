//! End-to-end scenarios for the grid solver pipeline.

use std::cell::Cell;
use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use pcpp_core::geometry::Point;
use pcpp_core::instance::{
    CoverageNecessities, CoverageNecessity, Grid, GridInstance, SimpleTouringCosts, VertexId,
};
use pcpp_solvers::{GridSolver, GridSolverParameters, SolverCallbacks};

fn triangle(coverage: CoverageNecessities) -> GridInstance {
    let mut grid = Grid::new();
    let p0 = grid.add_vertex(Point::new(0.0, 0.0));
    let p1 = grid.add_vertex(Point::new(1.0, 1.0));
    let p2 = grid.add_vertex(Point::new(2.0, 0.0));
    grid.add_edge(p0, p1).unwrap();
    grid.add_edge(p1, p2).unwrap();
    grid.add_edge(p0, p2).unwrap();
    GridInstance::new(grid, Box::new(SimpleTouringCosts::new(1.0, 1.0)), coverage).unwrap()
}

fn quick_params() -> GridSolverParameters {
    GridSolverParameters {
        integralize: 10,
        cc_opt_steps: 5,
        cc_opt_size: 12,
        t_opt_steps: 5,
        t_opt_size: 12,
        ..GridSolverParameters::default()
    }
}

#[test]
fn test_all_optional_triangle_yields_the_empty_tour() {
    let instance = triangle(CoverageNecessities::new(CoverageNecessity::optional()));
    let fractional_objective = Cell::new(f64::NAN);
    let reported_cost = Cell::new(f64::NAN);
    let reported_loss = Cell::new(f64::NAN);
    let mut callbacks = SolverCallbacks {
        on_fractional_solution: Some(Box::new(|solution, objective| {
            assert!(solution.is_empty());
            fractional_objective.set(objective);
        })),
        on_grid_solution: Some(Box::new(|tour, cost, loss| {
            assert!(tour.is_empty());
            reported_cost.set(cost);
            reported_loss.set(loss);
        })),
    };
    let tour = GridSolver::new(quick_params())
        .solve_with_callbacks(&instance, &mut callbacks)
        .unwrap();
    assert!(tour.is_empty());
    assert_abs_diff_eq!(fractional_objective.get(), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(reported_cost.get(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(reported_loss.get(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_all_mandatory_triangle_is_toured_once() {
    let instance = triangle(CoverageNecessities::new(CoverageNecessity::simple()));
    let tour = GridSolver::new(quick_params()).solve(&instance).unwrap();
    assert_eq!(tour.len(), 3);
    assert!(tour.is_connected());
    assert_abs_diff_eq!(
        tour.length(instance.grid()),
        2.0 + 2.0 * 2.0f64.sqrt(),
        epsilon = 1e-4
    );
    assert_abs_diff_eq!(tour.angle_sum(instance.grid()), 2.0 * PI, epsilon = 1e-4);
    let solution = tour.to_fractional_solution();
    for v in instance.grid().vertices() {
        assert_abs_diff_eq!(solution.coverage(v), 1.0, epsilon = 1e-6);
    }
}

/// Two mandatory unit squares joined by a three-edge corridor of optional
/// waypoints. The cover is two square cycles; the connector must bridge
/// them with a doubled corridor.
#[test]
fn test_dumbbell_squares_are_bridged_by_a_doubled_path() {
    let mut grid = Grid::new();
    let coords = [
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
        (4.0, 0.0),
        (5.0, 0.0),
        (5.0, 1.0),
        (4.0, 1.0),
        (2.0, 0.0),
        (3.0, 0.0),
    ];
    let ids: Vec<VertexId> = coords
        .iter()
        .map(|&(x, y)| grid.add_vertex(Point::new(x, y)))
        .collect();
    for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0), (4, 5), (5, 6), (6, 7), (7, 4)] {
        grid.add_edge(ids[a], ids[b]).unwrap();
    }
    for (a, b) in [(1, 8), (8, 9), (9, 4)] {
        grid.add_edge(ids[a], ids[b]).unwrap();
    }
    let mut coverage = CoverageNecessities::new(CoverageNecessity::optional());
    for i in 0..8 {
        coverage.set(ids[i], CoverageNecessity::simple());
    }
    let instance = GridInstance::new(
        grid,
        Box::new(SimpleTouringCosts::new(1.0, 1.0)),
        coverage,
    )
    .unwrap();
    let tour = GridSolver::new(quick_params()).solve(&instance).unwrap();
    assert!(tour.is_connected());
    assert_abs_diff_eq!(tour.length(instance.grid()), 14.0, epsilon = 1e-4);
    assert_abs_diff_eq!(tour.angle_sum(instance.grid()), 4.0 * PI, epsilon = 1e-3);
    let solution = tour.to_fractional_solution();
    for i in 0..8 {
        assert!(solution.coverage(ids[i]) >= 1.0 - 1e-6);
    }
}

/// Requiring the corner of a square `k` times yields exactly `k` visits.
#[test]
fn test_multi_coverage_counts_match() {
    for k in 1..=4usize {
        let mut grid = Grid::new();
        let ids = [
            grid.add_vertex(Point::new(0.0, 0.0)),
            grid.add_vertex(Point::new(1.0, 0.0)),
            grid.add_vertex(Point::new(1.0, 1.0)),
            grid.add_vertex(Point::new(0.0, 1.0)),
        ];
        for i in 0..4 {
            grid.add_edge(ids[i], ids[(i + 1) % 4]).unwrap();
        }
        let mut coverage = CoverageNecessities::new(CoverageNecessity::simple());
        coverage.set(ids[0], CoverageNecessity::multi(k));
        let instance = GridInstance::new(
            grid,
            Box::new(SimpleTouringCosts::new(1.0, 1.0)),
            coverage,
        )
        .unwrap();
        // The equiangular strategy keeps enough strips per vertex for the
        // required multiplicity.
        let params = GridSolverParameters {
            adaptive: false,
            ..quick_params()
        };
        let tour = GridSolver::new(params).solve(&instance).unwrap();
        let solution = tour.to_fractional_solution();
        assert_abs_diff_eq!(solution.coverage(ids[0]), k as f64, epsilon = 1e-6);
        for i in 1..4 {
            assert!(solution.coverage(ids[i]) >= 1.0 - 1e-6);
        }
    }
}

/// With cheap skip penalties at the far corners, shuttling to the nearest
/// neighbor beats touring the whole triangle.
#[test]
fn test_penalty_tradeoff_prefers_the_uturn_shuttle() {
    let mut coverage = CoverageNecessities::new(CoverageNecessity::simple());
    coverage.set(VertexId(1), CoverageNecessity::penalty(0.25 * PI));
    coverage.set(VertexId(2), CoverageNecessity::penalty(0.25 * PI));
    let instance = triangle(coverage);
    let reported_loss = Cell::new(f64::NAN);
    let mut callbacks = SolverCallbacks {
        on_fractional_solution: None,
        on_grid_solution: Some(Box::new(|_tour, _cost, loss| {
            reported_loss.set(loss);
        })),
    };
    let tour = GridSolver::new(quick_params())
        .solve_with_callbacks(&instance, &mut callbacks)
        .unwrap();
    let solution = tour.to_fractional_solution();
    // The shuttle to the nearer neighbor covers p0 and p1; p2 pays.
    assert!(solution.coverage(VertexId(0)) >= 1.0 - 1e-6);
    assert!(solution.coverage(VertexId(1)) >= 1.0 - 1e-6);
    assert_abs_diff_eq!(solution.coverage(VertexId(2)), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(
        tour.length(instance.grid()),
        2.0 * 2.0f64.sqrt(),
        epsilon = 1e-4
    );
    assert_abs_diff_eq!(tour.angle_sum(instance.grid()), 2.0 * PI, epsilon = 1e-4);
    assert_abs_diff_eq!(reported_loss.get(), 0.25 * PI, epsilon = 1e-6);
}

#[test]
fn test_zero_penalties_make_the_empty_tour_optimal() {
    // Penalty zero collapses to optional coverage; nothing is worth
    // touring.
    let instance = triangle(CoverageNecessities::new(CoverageNecessity::penalty(0.0)));
    let tour = GridSolver::new(quick_params()).solve(&instance).unwrap();
    assert!(tour.is_empty());
}

#[test]
fn test_isolated_mandatory_vertex_fails_cleanly() {
    let mut grid = Grid::new();
    grid.add_vertex(Point::new(0.0, 0.0));
    let instance = GridInstance::new(
        grid,
        Box::new(SimpleTouringCosts::new(1.0, 1.0)),
        CoverageNecessities::new(CoverageNecessity::simple()),
    )
    .unwrap();
    assert!(GridSolver::new(quick_params()).solve(&instance).is_err());
}

#[test]
fn test_empty_grid_is_an_empty_tour() {
    let instance = GridInstance::new(
        Grid::new(),
        Box::new(SimpleTouringCosts::new(1.0, 1.0)),
        CoverageNecessities::new(CoverageNecessity::simple()),
    )
    .unwrap();
    let tour = GridSolver::new(quick_params()).solve(&instance).unwrap();
    assert!(tour.is_empty());
}
