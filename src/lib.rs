//! TSP Solver Library
//!
//! Exact and heuristic solvers for the symmetric Euclidean Traveling Salesman
//! Problem.
//!
//! # Features
//!
//! - Dense distance matrix shared by every solver
//! - Exhaustive search with city 0 fixed (small instances)
//! - Nearest neighbor construction, single start or from every city
//! - Genetic Algorithm with Partially Mapped Crossover
//! - Ant Colony Optimization (Ant System) with three deposit rules
//! - Benchmarking against the exact optimum
//!
//! # Example
//!
//! ```no_run
//! use tsp_solvers::instance::TspInstance;
//! use tsp_solvers::heuristics::genetic::{GAConfig, GeneticAlgorithm};
//!
//! let instance = TspInstance::from_file("instance.tsp").unwrap();
//! let result = GeneticAlgorithm::new(instance, GAConfig::default()).run().unwrap();
//!
//! println!("Solution cost: {:.2}", result.solution.cost);
//! ```

pub mod error;
pub mod distance;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod exact;
pub mod benchmark;

pub use distance::DistanceMatrix;
pub use error::{Result, TspError};
pub use instance::{City, TspInstance};
pub use solution::Solution;
