use good_lp::ResolutionError;
use pcpp_core::instance::InstanceError;
use pcpp_core::solution::SolutionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error(transparent)]
    Solution(#[from] SolutionError),
    /// The LP/MIP backend reported no solution where one was required.
    #[error("optimization backend failed: {0}")]
    Backend(#[from] ResolutionError),
    /// The strip-end matching admits no perfect matching.
    #[error("atomic-strip matching is infeasible: {0}")]
    MatchingInfeasible(String),
    /// A local re-optimization produced a solution the surrounding stage
    /// cannot accept. Indicates an algorithm bug, not bad input.
    #[error("pipeline invariant violated: {0}")]
    InvariantViolated(String),
}
