//! Heuristic TSP solvers.
//!
//! Nearest neighbor construction plus the two population-based methods
//! (Genetic Algorithm and Ant Colony Optimization).

pub mod construction;
pub mod genetic;
pub mod aco;

pub use construction::*;
pub use genetic::*;
pub use aco::*;
