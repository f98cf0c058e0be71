//! Solution representation for the TSP.

use crate::error::{Result, TspError};
use crate::instance::TspInstance;
use serde::{Deserialize, Serialize};

/// Represents a solution to the TSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a permutation of city indices; the edge back to the first city is implicit
    pub tour: Vec<usize>,
    /// Total tour length including the closing edge
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations/generations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: f64::INFINITY,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from a tour, costing it against the instance coordinates
    pub fn from_tour(instance: &TspInstance, tour: Vec<usize>, algorithm: &str) -> Self {
        let cost = instance.tour_length(&tour);
        Solution {
            tour,
            cost,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Check that all cities are visited exactly once
    pub fn is_complete(&self, instance: &TspInstance) -> bool {
        validate_tour(&self.tour, instance.dimension()).is_ok()
    }

    /// Get the position of a city in the tour
    pub fn position(&self, city: usize) -> Option<usize> {
        self.tour.iter().position(|&n| n == city)
    }

    /// Rotate the tour so it starts at `city`; the cycle is unchanged
    pub fn rotate_to(&mut self, city: usize) {
        if let Some(pos) = self.position(city) {
            self.tour.rotate_left(pos);
        }
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

/// Verify that `tour` is a permutation of `0..n`
pub fn validate_tour(tour: &[usize], n: usize) -> Result<()> {
    if tour.len() != n {
        return Err(TspError::InvalidTour {
            reason: format!("expected {} cities, found {}", n, tour.len()),
        });
    }

    let mut seen = vec![false; n];
    for &city in tour {
        if city >= n {
            return Err(TspError::InvalidTour {
                reason: format!("city {} is out of range", city),
            });
        }
        if seen[city] {
            return Err(TspError::InvalidTour {
                reason: format!("city {} is visited twice", city),
            });
        }
        seen[city] = true;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.tour.is_empty());
        assert_eq!(sol.cost, f64::INFINITY);
    }

    #[test]
    fn test_validate_tour() {
        assert!(validate_tour(&[2, 0, 1], 3).is_ok());
        assert!(validate_tour(&[], 0).is_ok());
        assert!(validate_tour(&[0, 0, 1], 3).is_err());
        assert!(validate_tour(&[0, 1], 3).is_err());
        assert!(validate_tour(&[0, 1, 3], 3).is_err());
    }

    #[test]
    fn test_rotate_keeps_cost() {
        let instance = TspInstance::new(
            "tri",
            vec![City::new(0.0, 0.0), City::new(3.0, 0.0), City::new(0.0, 4.0)],
        );
        let mut sol = Solution::from_tour(&instance, vec![1, 2, 0], "test");
        assert!((sol.cost - 12.0).abs() < 1e-9);
        sol.rotate_to(0);
        assert_eq!(sol.tour, vec![0, 1, 2]);
        assert!(sol.is_complete(&instance));
        assert!((instance.tour_length(&sol.tour) - sol.cost).abs() < 1e-9);
    }
}
