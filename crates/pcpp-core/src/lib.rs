/*!
This crate provides the shared data model for the covering-crab workspace:
embedded grid graphs, touring cost functions, coverage necessities, vertex
passages, fractional solutions and cycles.

The solvers in `pcpp-solvers` operate exclusively on these types.
 */

pub mod geometry;
pub mod instance;
pub mod solution;
