/*!
This crate implements the grid solver for the penalty-coverage path problem
with point-turn costs: given a [`pcpp_core::instance::GridInstance`], it
computes a single closed tour that trades touring costs (distance plus turn
angles) against the opportunity loss of skipping optional coverage.

The pipeline, in order:
- [`lp`]: a fractional cycle-cover relaxation, optionally tightened towards
  integrality with best-first branch-and-bound,
- [`strips`]: orientation selection turning the fractional solution into
  atomic strips per vertex,
- [`matching`]: a minimum-weight perfect matching on strip ends yielding an
  integral cycle cover,
- [`lns`]: large-neighborhood re-optimization of the cycle cover and the
  final tour,
- [`connect`]: connecting the cycle cover into one tour via a prize
  collecting Steiner tree over the cycles.

The [`GridSolver`] orchestrates these stages and enforces the invariants
between them.
 */

pub mod connect;
pub mod error;
pub mod lns;
pub mod lp;
pub mod matching;
pub mod solver;
pub mod strips;

pub use error::SolverError;
pub use solver::{GridSolver, GridSolverParameters, SolverCallbacks};
