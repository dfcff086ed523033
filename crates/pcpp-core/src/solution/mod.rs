//! Solution types produced by the grid solver pipeline: sparse fractional
//! solutions, cycles, their decomposition and feasibility checks.

pub mod cycle;
pub mod decompose;
pub mod feasibility;
pub mod fractional;

pub use cycle::Cycle;
pub use decompose::decompose_cycles;
pub use feasibility::{SolutionError, is_feasible_cycle_cover};
pub use fractional::FractionalSolution;
