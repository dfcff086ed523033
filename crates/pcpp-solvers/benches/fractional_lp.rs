use criterion::{Criterion, criterion_group, criterion_main};
use pcpp_core::geometry::Point;
use pcpp_core::instance::{
    CoverageNecessities, CoverageNecessity, Grid, GridInstance, SimpleTouringCosts,
};
use pcpp_solvers::lp::FractionalLpSolver;

/// A fully mandatory n x n grid instance.
fn square_grid_instance(n: usize) -> GridInstance {
    let mut grid = Grid::new();
    let mut ids = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            ids.push(grid.add_vertex(Point::new(x as f64, y as f64)));
        }
    }
    for y in 0..n {
        for x in 0..n {
            let i = y * n + x;
            if x + 1 < n {
                grid.add_edge(ids[i], ids[i + 1]).unwrap();
            }
            if y + 1 < n {
                grid.add_edge(ids[i], ids[i + n]).unwrap();
            }
        }
    }
    GridInstance::new(
        grid,
        Box::new(SimpleTouringCosts::new(1.0, 1.0)),
        CoverageNecessities::new(CoverageNecessity::simple()),
    )
    .unwrap()
}

fn fractional_relaxation_benchmark(c: &mut Criterion) {
    let instance = square_grid_instance(6);

    c.bench_function("Solve fractional relaxation on a 6x6 grid", |b| {
        b.iter(|| FractionalLpSolver.solve(&instance).unwrap())
    });
}

criterion_group!(fractional_lp, fractional_relaxation_benchmark);
criterion_main!(fractional_lp);
