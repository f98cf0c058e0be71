//! Ant Colony Optimization for the TSP.
//!
//! Ant System with a configurable deposit rule. Every generation each ant
//! builds a full tour from a random city, choosing the next city with
//! probability proportional to `tau^alpha * (1/d)^beta`. Once all ants are
//! done the pheromone matrix evaporates and receives the sum of the ants'
//! deposits.

use crate::distance::{DistanceMatrix, DIAGONAL_EPSILON};
use crate::error::{check_probability, Result, TspError};
use crate::instance::TspInstance;
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// How much pheromone an ant leaves on each edge of its path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositStrategy {
    /// `Q` on every edge
    Constant,
    /// `Q / d(i, j)` on edge (i, j)
    EdgeDistance,
    /// `Q / L` where `L` is the ant's tour length
    TourCost,
}

/// ACO configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ACOConfig {
    /// Number of ants
    pub num_ants: usize,
    /// Number of generations
    pub max_iterations: usize,
    /// Pheromone importance (alpha)
    pub alpha: f64,
    /// Heuristic importance (beta)
    pub beta: f64,
    /// Evaporation rate (rho)
    pub evaporation_rate: f64,
    /// Pheromone deposit factor
    pub q: f64,
    /// Initial pheromone level
    pub initial_pheromone: f64,
    /// Floor applied after each update so no edge becomes unreachable
    pub min_pheromone: f64,
    pub strategy: DepositStrategy,
    /// Random seed
    pub seed: u64,
    /// Optional time limit in seconds, checked between generations
    pub time_limit: Option<f64>,
    /// Build the ants of a generation on the rayon thread pool
    pub parallel: bool,
}

impl Default for ACOConfig {
    fn default() -> Self {
        ACOConfig {
            num_ants: 10,
            max_iterations: 100,
            alpha: 1.0,
            beta: 2.0,
            evaporation_rate: 0.5,
            q: 100.0,
            initial_pheromone: 0.1,
            min_pheromone: 1e-12,
            strategy: DepositStrategy::EdgeDistance,
            seed: 42,
            time_limit: None,
            parallel: true,
        }
    }
}

impl ACOConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_ants == 0 {
            return Err(TspError::parameter("num_ants", "must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(TspError::parameter("max_iterations", "must be positive"));
        }
        if !self.alpha.is_finite() {
            return Err(TspError::parameter("alpha", "must be finite"));
        }
        if !self.beta.is_finite() {
            return Err(TspError::parameter("beta", "must be finite"));
        }
        check_probability("evaporation_rate", self.evaporation_rate)?;
        if !(self.q > 0.0 && self.q.is_finite()) {
            return Err(TspError::parameter("q", "must be positive and finite"));
        }
        if !(self.initial_pheromone > 0.0 && self.initial_pheromone.is_finite()) {
            return Err(TspError::parameter("initial_pheromone", "must be positive and finite"));
        }
        if !(self.min_pheromone > 0.0) {
            return Err(TspError::parameter("min_pheromone", "must be positive"));
        }
        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) {
                return Err(TspError::parameter("time_limit", "must be positive"));
            }
        }
        Ok(())
    }
}

/// Symmetric pheromone intensities, strictly positive
#[derive(Debug, Clone, PartialEq)]
pub struct PheromoneMatrix {
    data: Vec<f64>,
    size: usize,
}

impl PheromoneMatrix {
    pub fn new(size: usize, initial: f64) -> Self {
        PheromoneMatrix {
            data: vec![initial; size * size],
            size,
        }
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Scale every entry by `1 - rho`, add the colony's deposits, then clamp to `floor`.
    pub fn update(&mut self, rho: f64, deposits: &[PheromoneDelta], floor: f64) {
        for value in self.data.iter_mut() {
            *value *= 1.0 - rho;
        }

        for delta in deposits {
            for &(i, j, amount) in &delta.edges {
                self.data[i * self.size + j] += amount;
                if i != j {
                    self.data[j * self.size + i] += amount;
                }
            }
        }

        for value in self.data.iter_mut() {
            *value = value.max(floor);
        }
    }
}

/// One ant's deposit: a sparse symmetric matrix, zero outside the listed edges.
/// Each `(i, j, amount)` applies to both `(i, j)` and `(j, i)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PheromoneDelta {
    pub edges: Vec<(usize, usize, f64)>,
}

impl PheromoneDelta {
    /// Amount deposited on `(i, j)`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.edges
            .iter()
            .filter(|&&(a, b, _)| (a == i && b == j) || (a == j && b == i))
            .map(|&(_, _, amount)| amount)
            .sum()
    }
}

/// Agent state for one generation
#[derive(Debug, Clone)]
pub struct Ant {
    /// Cities in visiting order
    pub tour: Vec<usize>,
    /// Cities not yet visited, in ascending order
    pub unvisited: Vec<usize>,
    /// Length accumulated so far
    pub cost: f64,
}

impl Ant {
    pub fn new(start: usize, n: usize) -> Self {
        Ant {
            tour: vec![start],
            unvisited: (0..n).filter(|&c| c != start).collect(),
            cost: 0.0,
        }
    }

    #[inline]
    fn current(&self) -> usize {
        self.tour[self.tour.len() - 1]
    }

    /// Roulette selection among unvisited cities. Falls back to a uniform pick
    /// when the weights underflow, and to the first unvisited city when rounding
    /// leaves the draw above the last cumulative probability.
    pub fn select_next<R: Rng>(
        &self,
        pheromone: &PheromoneMatrix,
        distances: &DistanceMatrix,
        alpha: f64,
        beta: f64,
        rng: &mut R,
    ) -> usize {
        let current = self.current();
        let weights: Vec<f64> = self
            .unvisited
            .iter()
            .map(|&city| {
                let tau = pheromone.get(current, city).powf(alpha);
                let eta = (1.0 / distances.get(current, city).max(DIAGONAL_EPSILON)).powf(beta);
                tau * eta
            })
            .collect();

        let total: f64 = weights.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return self.unvisited[rng.gen_range(0..self.unvisited.len())];
        }

        let draw = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (&city, &w) in self.unvisited.iter().zip(weights.iter()) {
            cumulative += w / total;
            if draw <= cumulative {
                return city;
            }
        }

        self.unvisited[0]
    }

    /// Move to `city`, which must be unvisited
    pub fn visit(&mut self, city: usize, distances: &DistanceMatrix) {
        if let Some(pos) = self.unvisited.iter().position(|&c| c == city) {
            self.unvisited.remove(pos);
            self.cost += distances.get(self.current(), city);
            self.tour.push(city);
        }
    }

    /// Add the edge back to the start city
    pub fn close_tour(&mut self, distances: &DistanceMatrix) {
        if self.tour.len() > 1 {
            self.cost += distances.get(self.current(), self.tour[0]);
        }
    }

    /// Deposits along the path from the first to the last city
    pub fn pheromone_delta(&self, strategy: DepositStrategy, q: f64, distances: &DistanceMatrix) -> PheromoneDelta {
        let edges = self
            .tour
            .windows(2)
            .map(|edge| {
                let (from, to) = (edge[0], edge[1]);
                let amount = match strategy {
                    DepositStrategy::Constant => q,
                    DepositStrategy::EdgeDistance => q / distances.get(from, to).max(DIAGONAL_EPSILON),
                    DepositStrategy::TourCost => q / self.cost.max(DIAGONAL_EPSILON),
                };
                (from, to, amount)
            })
            .collect();

        PheromoneDelta { edges }
    }
}

/// Outcome of an ACO run
#[derive(Debug, Clone)]
pub struct ACOResult {
    pub solution: Solution,
    /// Best cost so far at the end of each generation
    pub best_costs: Vec<f64>,
    /// Pheromone matrix after the last generation
    pub pheromone: PheromoneMatrix,
}

impl ACOResult {
    /// Write `generation,best_cost` rows
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["generation", "best_cost"])?;
        for (g, cost) in self.best_costs.iter().enumerate() {
            writer.write_record(&[g.to_string(), cost.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(std::fs::File::create(path)?)
    }
}

/// Ant Colony Optimization solver
pub struct AntColonyOptimization {
    config: ACOConfig,
    instance: TspInstance,
    rng: ChaCha8Rng,
}

impl AntColonyOptimization {
    pub fn new(instance: TspInstance, config: ACOConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        AntColonyOptimization { config, instance, rng }
    }

    /// Let one ant walk a full tour
    fn construct_tour(
        &self,
        start: usize,
        seed: u64,
        pheromone: &PheromoneMatrix,
        distances: &DistanceMatrix,
    ) -> Ant {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ant = Ant::new(start, distances.size());

        while !ant.unvisited.is_empty() {
            let next = ant.select_next(pheromone, distances, self.config.alpha, self.config.beta, &mut rng);
            ant.visit(next, distances);
        }
        ant.close_tour(distances);

        ant
    }

    /// Run ACO algorithm
    pub fn run(&mut self) -> Result<ACOResult> {
        self.config.validate()?;
        if self.instance.is_empty() {
            return Err(TspError::EmptyInstance);
        }
        let n = self.instance.dimension();

        let start = std::time::Instant::now();
        let distances = self.instance.distance_matrix();
        let mut pheromone = PheromoneMatrix::new(n, self.config.initial_pheromone);

        let mut best_tour = Vec::new();
        let mut best_cost = f64::INFINITY;
        let mut best_costs = Vec::with_capacity(self.config.max_iterations);

        log::info!(
            "[ACO] {} cities, {} ants, {} generations, {:?} deposit",
            n,
            self.config.num_ants,
            self.config.max_iterations,
            self.config.strategy
        );

        for generation in 0..self.config.max_iterations {
            // Starting cities and per-ant seeds come from the master generator so
            // the run is reproducible whether or not ants are built in parallel.
            let launches: Vec<(usize, u64)> = (0..self.config.num_ants)
                .map(|_| (self.rng.gen_range(0..n), self.rng.gen::<u64>()))
                .collect();

            let ants: Vec<Ant> = if self.config.parallel {
                launches
                    .par_iter()
                    .map(|&(city, seed)| self.construct_tour(city, seed, &pheromone, &distances))
                    .collect()
            } else {
                launches
                    .iter()
                    .map(|&(city, seed)| self.construct_tour(city, seed, &pheromone, &distances))
                    .collect()
            };

            let mut deposits = Vec::with_capacity(ants.len());
            for ant in &ants {
                if best_tour.is_empty() || ant.cost < best_cost {
                    best_cost = ant.cost;
                    best_tour = ant.tour.clone();
                    log::debug!("[ACO] Gen {}  New best {:.4}", generation, best_cost);
                }
                deposits.push(ant.pheromone_delta(self.config.strategy, self.config.q, &distances));
            }

            pheromone.update(self.config.evaporation_rate, &deposits, self.config.min_pheromone);
            best_costs.push(best_cost);

            if generation % 10 == 0 || generation + 1 == self.config.max_iterations {
                log::info!(
                    "[ACO] Generation {}/{}, best cost {:.2}",
                    generation + 1,
                    self.config.max_iterations,
                    best_cost
                );
            }

            if let Some(limit) = self.config.time_limit {
                if start.elapsed().as_secs_f64() >= limit {
                    log::info!("[ACO] Time limit reached after {} generations", generation + 1);
                    break;
                }
            }
        }

        let mut solution = Solution::from_tour(&self.instance, best_tour, "AntColony");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(best_costs.len());

        Ok(ACOResult {
            solution,
            best_costs,
            pheromone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;
    use crate::solution::validate_tour;

    fn create_test_instance() -> TspInstance {
        TspInstance::new(
            "test",
            vec![
                City::new(0.0, 0.0),
                City::new(1.0, 5.0),
                City::new(5.0, 2.0),
                City::new(9.0, 8.0),
                City::new(4.0, 12.0),
                City::new(12.0, 6.0),
                City::new(8.0, 1.0),
                City::new(3.0, 6.0),
            ],
        )
    }

    fn small_config() -> ACOConfig {
        ACOConfig {
            num_ants: 8,
            max_iterations: 30,
            ..Default::default()
        }
    }

    #[test]
    fn test_aco() {
        let instance = create_test_instance();
        let result = AntColonyOptimization::new(instance.clone(), small_config()).run().unwrap();

        assert!(validate_tour(&result.solution.tour, 8).is_ok());
        assert!((instance.tour_length(&result.solution.tour) - result.solution.cost).abs() < 1e-9);
        assert_eq!(result.best_costs.len(), 30);
        assert!(result.best_costs.windows(2).all(|w| w[1] <= w[0]));
        assert!((result.best_costs.last().unwrap() - result.solution.cost).abs() < 1e-9);
    }

    #[test]
    fn test_cost_history_csv() {
        let config = ACOConfig {
            max_iterations: 3,
            ..small_config()
        };
        let result = AntColonyOptimization::new(create_test_instance(), config).run().unwrap();
        let mut buffer = Vec::new();
        result.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "generation,best_cost");
        assert!(lines[3].starts_with("2,"));
    }

    #[test]
    fn test_every_strategy() {
        let instance = create_test_instance();
        for strategy in [
            DepositStrategy::Constant,
            DepositStrategy::EdgeDistance,
            DepositStrategy::TourCost,
        ] {
            let config = ACOConfig {
                strategy,
                ..small_config()
            };
            let result = AntColonyOptimization::new(instance.clone(), config).run().unwrap();
            assert!(validate_tour(&result.solution.tour, 8).is_ok());
        }
    }

    #[test]
    fn test_reproducible_and_parallel_independent() {
        let instance = create_test_instance();
        let a = AntColonyOptimization::new(instance.clone(), small_config()).run().unwrap();
        let b = AntColonyOptimization::new(instance.clone(), small_config()).run().unwrap();
        let sequential = AntColonyOptimization::new(
            instance,
            ACOConfig {
                parallel: false,
                ..small_config()
            },
        )
        .run()
        .unwrap();

        assert_eq!(a.solution.tour, b.solution.tour);
        assert_eq!(a.best_costs, b.best_costs);
        assert_eq!(a.solution.tour, sequential.solution.tour);
        assert_eq!(a.pheromone, sequential.pheromone);
    }

    #[test]
    fn test_pheromone_stays_symmetric_and_positive() {
        let config = ACOConfig {
            evaporation_rate: 1.0,
            ..small_config()
        };
        let result = AntColonyOptimization::new(create_test_instance(), config).run().unwrap();
        let p = &result.pheromone;
        for i in 0..p.size() {
            for j in 0..p.size() {
                assert!(p.get(i, j) > 0.0);
                assert_eq!(p.get(i, j), p.get(j, i));
            }
        }
    }

    #[test]
    fn test_pheromone_update() {
        let mut p = PheromoneMatrix::new(3, 1.0);
        let deposits = vec![
            PheromoneDelta { edges: vec![(0, 1, 2.0)] },
            PheromoneDelta { edges: vec![(1, 0, 1.0), (1, 2, 0.5)] },
        ];
        p.update(0.5, &deposits, 1e-12);

        assert_eq!(p.get(0, 1), 3.5);
        assert_eq!(p.get(1, 0), 3.5);
        assert_eq!(p.get(1, 2), 1.0);
        assert_eq!(p.get(0, 2), 0.5);
        assert_eq!(p.get(2, 2), 0.5);
    }

    #[test]
    fn test_deposit_strategies() {
        let instance = TspInstance::new(
            "line",
            vec![City::new(0.0, 0.0), City::new(2.0, 0.0), City::new(6.0, 0.0)],
        );
        let distances = instance.distance_matrix();
        let mut ant = Ant::new(0, 3);
        ant.visit(1, &distances);
        ant.visit(2, &distances);
        ant.close_tour(&distances);
        assert_eq!(ant.cost, 12.0);

        let constant = ant.pheromone_delta(DepositStrategy::Constant, 10.0, &distances);
        assert_eq!(constant.get(0, 1), 10.0);
        assert_eq!(constant.get(2, 1), 10.0);
        // the closing edge receives nothing
        assert_eq!(constant.get(2, 0), 0.0);

        let per_edge = ant.pheromone_delta(DepositStrategy::EdgeDistance, 10.0, &distances);
        assert_eq!(per_edge.get(0, 1), 5.0);
        assert_eq!(per_edge.get(1, 2), 2.5);

        let per_tour = ant.pheromone_delta(DepositStrategy::TourCost, 12.0, &distances);
        assert_eq!(per_tour.get(0, 1), 1.0);
        assert_eq!(per_tour.get(1, 2), 1.0);
    }

    #[test]
    fn test_underflow_falls_back_to_uniform() {
        let instance = create_test_instance();
        let distances = instance.distance_matrix();
        let pheromone = PheromoneMatrix::new(8, 1e-300);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut ant = Ant::new(0, 8);
        while !ant.unvisited.is_empty() {
            // tau^alpha underflows to zero for every candidate
            let next = ant.select_next(&pheromone, &distances, 5.0, 1.0, &mut rng);
            assert!(ant.unvisited.contains(&next));
            ant.visit(next, &distances);
        }
        assert!(validate_tour(&ant.tour, 8).is_ok());
    }

    #[test]
    fn test_coincident_cities() {
        let instance = TspInstance::new(
            "stack",
            vec![City::new(1.0, 1.0), City::new(1.0, 1.0), City::new(1.0, 1.0)],
        );
        let result = AntColonyOptimization::new(instance, small_config()).run().unwrap();
        assert!(validate_tour(&result.solution.tour, 3).is_ok());
        assert_eq!(result.solution.cost, 0.0);
    }

    #[test]
    fn test_single_city() {
        let instance = TspInstance::new("one", vec![City::new(4.0, 4.0)]);
        let result = AntColonyOptimization::new(instance, small_config()).run().unwrap();
        assert_eq!(result.solution.tour, vec![0]);
        assert_eq!(result.solution.cost, 0.0);
    }

    #[test]
    fn test_invalid_config() {
        let instance = create_test_instance();
        let bad = [
            ACOConfig { num_ants: 0, ..Default::default() },
            ACOConfig { max_iterations: 0, ..Default::default() },
            ACOConfig { evaporation_rate: 1.5, ..Default::default() },
            ACOConfig { q: 0.0, ..Default::default() },
            ACOConfig { alpha: f64::NAN, ..Default::default() },
            ACOConfig { initial_pheromone: 0.0, ..Default::default() },
        ];
        for config in bad {
            let err = AntColonyOptimization::new(instance.clone(), config).run().unwrap_err();
            assert!(matches!(err, TspError::InvalidParameter { .. }));
        }
    }
}
