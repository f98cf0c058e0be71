use crate::error::{Result, TspError};
use crate::instance::TspInstance;
use crate::solution::Solution;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &TspInstance) -> Result<Solution>;
    fn name(&self) -> &str;
}

/// Partial tours recorded while a tour is being built, one per appended city.
pub type ConstructionTrace = Vec<Vec<usize>>;

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the nearest unvisited city. Ties go
/// to the lowest city index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestNeighborHeuristic {
    /// City the tour starts from
    pub start: usize,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic { start: 0 }
    }

    pub fn from_city(start: usize) -> Self {
        NearestNeighborHeuristic { start }
    }

    /// Build the tour and return, alongside it, the partial tour after each step.
    /// The first trace entry holds only the start city.
    pub fn construct_with_trace(&self, instance: &TspInstance) -> Result<(Solution, ConstructionTrace)> {
        let mut trace = Vec::with_capacity(instance.dimension());
        let solution = self.build(instance, |partial| trace.push(partial.to_vec()))?;
        Ok((solution, trace))
    }

    fn build<F>(&self, instance: &TspInstance, mut on_step: F) -> Result<Solution>
    where
        F: FnMut(&[usize]),
    {
        let start = std::time::Instant::now();
        let n = instance.dimension();

        if n == 0 {
            return Err(TspError::EmptyInstance);
        }
        if self.start >= n {
            return Err(TspError::InvalidStart {
                start: self.start,
                dimension: n,
            });
        }

        let matrix = instance.distance_matrix();
        let mut tour = Vec::with_capacity(n);
        let mut visited = vec![false; n];

        tour.push(self.start);
        visited[self.start] = true;
        on_step(&tour);

        while tour.len() < n {
            let current = tour[tour.len() - 1];
            let row = matrix.row(current);

            let mut nearest = None;
            let mut nearest_dist = f64::INFINITY;
            for (city, &d) in row.iter().enumerate() {
                if !visited[city] && (nearest.is_none() || d < nearest_dist) {
                    nearest = Some(city);
                    nearest_dist = d;
                }
            }

            // The loop guard leaves at least one unvisited city.
            let Some(next) = nearest else { break };
            tour.push(next);
            visited[next] = true;
            on_step(&tour);
        }

        let mut solution = Solution::from_tour(instance, tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(n);
        log::debug!(
            "Nearest neighbor from city {}: cost {:.4}",
            self.start,
            solution.cost
        );
        Ok(solution)
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, instance: &TspInstance) -> Result<Solution> {
        self.build(instance, |_| {})
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// Multi-Start Construction
///
/// Runs the nearest neighbor heuristic from every city and keeps the
/// shortest tour (lowest start city on ties).
pub struct MultiStartConstruction;

impl MultiStartConstruction {
    pub fn new() -> Self {
        MultiStartConstruction
    }
}

impl Default for MultiStartConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for MultiStartConstruction {
    fn construct(&self, instance: &TspInstance) -> Result<Solution> {
        let start = std::time::Instant::now();
        let n = instance.dimension();
        if n == 0 {
            return Err(TspError::EmptyInstance);
        }

        let solutions = (0..n)
            .into_par_iter()
            .map(|city| NearestNeighborHeuristic::from_city(city).construct(instance))
            .collect::<Result<Vec<_>>>()?;

        let mut best_solution = Solution::new();
        for solution in solutions {
            if solution.cost < best_solution.cost {
                best_solution = solution;
            }
        }

        best_solution.algorithm = self.name().to_string();
        best_solution.computation_time = start.elapsed().as_secs_f64();
        best_solution.iterations = Some(n);
        Ok(best_solution)
    }

    fn name(&self) -> &str {
        "MultiStartNearestNeighbor"
    }
}
