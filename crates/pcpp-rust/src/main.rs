use std::process::ExitCode;

use log::{error, info};
use pcpp_solvers::{GridSolver, GridSolverParameters};

fn main() -> ExitCode {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let Some(instance_path) = args.next() else {
        eprintln!("usage: pcpp-rust <instance.json> [tour.json]");
        return ExitCode::FAILURE;
    };
    let output_path = args.next();

    let instance = match pcpp_json::load_instance(&instance_path) {
        Ok(instance) => instance,
        Err(err) => {
            error!("failed to load {instance_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let solver = GridSolver::new(GridSolverParameters::default());
    let tour = match solver.solve(&instance) {
        Ok(tour) => tour,
        Err(err) => {
            error!("solving failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "tour with {} waypoints, length {:.3}, angle sum {:.3}",
        tour.len(),
        tour.length(instance.grid()),
        tour.angle_sum(instance.grid())
    );
    if let Some(path) = output_path {
        if let Err(err) = pcpp_json::save_tour(&path, &tour, instance.grid()) {
            error!("failed to write {path}: {err}");
            return ExitCode::FAILURE;
        }
        info!("tour written to {path}");
    }
    ExitCode::SUCCESS
}
