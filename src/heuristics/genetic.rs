//! Genetic Algorithm for the TSP.
//!
//! Individuals are permutations of the city indices. Each generation:
//! - fitness is `1 / (length + ε)` and the best individual ever seen is tracked
//! - fitness is rescaled into (0, 1] and parents are drawn in pairs
//! - pairs are recombined with Partially Mapped Crossover (PMX)
//! - children get a swap mutation with a fixed probability
//! - the best tour ever seen replaces the first child (elitism)

use crate::distance::DistanceMatrix;
use crate::error::{check_probability, Result, TspError};
use crate::instance::{City, TspInstance};
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// Added to tour lengths before inverting them into fitness.
pub const FITNESS_EPSILON: f64 = 1e-5;

/// Individual in the genetic algorithm population
#[derive(Debug, Clone)]
pub struct Individual {
    /// The tour representation
    pub tour: Vec<usize>,
    /// Closed tour length
    pub cost: f64,
    /// `1 / (cost + ε)`, higher is better
    pub fitness: f64,
}

impl Individual {
    pub fn new(tour: Vec<usize>, matrix: &DistanceMatrix) -> Self {
        let cost = matrix.tour_length(&tour);
        Individual {
            tour,
            cost,
            fitness: 1.0 / (cost + FITNESS_EPSILON),
        }
    }
}

/// Selection method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    /// Binary tournament on scaled fitness
    Tournament,
    /// Roulette wheel proportional to scaled fitness
    RouletteWheel,
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GAConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub max_generations: usize,
    /// Crossover probability
    pub crossover_prob: f64,
    /// Mutation probability
    pub mutation_prob: f64,
    /// Selection method
    pub selection_type: SelectionType,
    /// Random seed
    pub seed: u64,
    /// Optional time limit in seconds, checked between generations
    pub time_limit: Option<f64>,
    /// Evaluate individuals on the rayon thread pool
    pub parallel: bool,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: 100,
            max_generations: 200,
            crossover_prob: 0.8,
            mutation_prob: 0.1,
            selection_type: SelectionType::Tournament,
            seed: 42,
            time_limit: None,
            parallel: true,
        }
    }
}

impl GAConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(TspError::parameter("population_size", "must be positive"));
        }
        if self.max_generations == 0 {
            return Err(TspError::parameter("max_generations", "must be positive"));
        }
        check_probability("crossover_prob", self.crossover_prob)?;
        check_probability("mutation_prob", self.mutation_prob)?;
        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) {
                return Err(TspError::parameter("time_limit", "must be positive"));
            }
        }
        Ok(())
    }
}

/// Per-generation measurements, index `g` describing generation `g`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GATelemetry {
    /// Best length seen so far
    pub best_costs: Vec<f64>,
    /// Mean raw fitness of the population
    pub mean_fitness: Vec<f64>,
    /// Number of distinct tours in the population
    pub diversity: Vec<usize>,
}

impl GATelemetry {
    pub fn generations(&self) -> usize {
        self.best_costs.len()
    }

    /// Write `generation,best_cost,mean_fitness,diversity` rows
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["generation", "best_cost", "mean_fitness", "diversity"])?;
        for g in 0..self.generations() {
            writer.write_record(&[
                g.to_string(),
                self.best_costs[g].to_string(),
                self.mean_fitness[g].to_string(),
                self.diversity[g].to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(std::fs::File::create(path)?)
    }
}

/// Outcome of a genetic algorithm run
#[derive(Debug, Clone)]
pub struct GAResult {
    pub solution: Solution,
    /// Coordinates of the best tour, in visiting order
    pub best_coordinates: Vec<City>,
    pub telemetry: GATelemetry,
}

/// Best tour seen so far. The first offer is always taken, even at an
/// infinite cost; later offers only when strictly shorter.
#[derive(Debug, Clone)]
struct BestTour {
    tour: Vec<usize>,
    cost: f64,
}

impl BestTour {
    fn empty() -> Self {
        BestTour {
            tour: Vec::new(),
            cost: f64::INFINITY,
        }
    }

    fn offer(&mut self, tour: &[usize], cost: f64) -> bool {
        if self.tour.is_empty() || cost < self.cost {
            self.tour = tour.to_vec();
            self.cost = cost;
            return true;
        }
        false
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm {
    config: GAConfig,
    instance: TspInstance,
    rng: ChaCha8Rng,
}

impl GeneticAlgorithm {
    pub fn new(instance: TspInstance, config: GAConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        GeneticAlgorithm { config, instance, rng }
    }

    /// Run the genetic algorithm
    pub fn run(&mut self) -> Result<GAResult> {
        self.config.validate()?;
        if self.instance.is_empty() {
            return Err(TspError::EmptyInstance);
        }
        let n = self.instance.dimension();

        let start = std::time::Instant::now();
        let matrix = self.instance.distance_matrix();
        let size = self.config.population_size;

        log::info!(
            "[GA] {} cities, population {}, {} generations",
            n,
            size,
            self.config.max_generations
        );

        let initial = self.initialize_population(n);
        let mut population = self.evaluate(initial, &matrix);
        let mut best = BestTour::empty();
        let mut telemetry = GATelemetry::default();

        for generation in 0..self.config.max_generations {
            let best_idx = fittest_index(&population);
            if best.offer(&population[best_idx].tour, population[best_idx].cost) {
                log::debug!("[GA] Gen {}  New best {:.4}", generation, best.cost);
            }

            let mean_fitness = population.iter().map(|ind| ind.fitness).sum::<f64>() / size as f64;
            telemetry.best_costs.push(best.cost);
            telemetry.mean_fitness.push(mean_fitness);
            telemetry.diversity.push(diversity(&population));

            if generation % 10 == 0 || generation + 1 == self.config.max_generations {
                log::info!("[GA] Gen {}  Best cost {:.2}", generation, best.cost);
            }
            log::debug!(
                "[GA] Gen {}  Mean fitness {:.6e}  Diversity {}",
                generation,
                mean_fitness,
                telemetry.diversity[generation]
            );

            let fitness: Vec<f64> = population.iter().map(|ind| ind.fitness).collect();
            let scaled = scale_fitness(&fitness);
            let pairs = self.select_parents(&scaled);

            let mut children = Vec::with_capacity(pairs.len() * 2);
            for (a, b) in pairs {
                let (child1, child2) = self.crossover(&population[a].tour, &population[b].tour);
                children.push(child1);
                children.push(child2);
            }
            children.truncate(size);

            for child in children.iter_mut() {
                self.mutate(child);
            }

            children[0] = best.tour.clone();
            population = self.evaluate(children, &matrix);

            if let Some(limit) = self.config.time_limit {
                if start.elapsed().as_secs_f64() >= limit {
                    log::info!("[GA] Time limit reached after {} generations", generation + 1);
                    break;
                }
            }
        }

        log::info!("[GA] Shortest tour found: {:.2}", best.cost);

        let best_coordinates = self.instance.coordinates(&best.tour);
        let mut solution = Solution::from_tour(&self.instance, best.tour, "GeneticAlgorithm");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(telemetry.generations());

        Ok(GAResult {
            solution,
            best_coordinates,
            telemetry,
        })
    }

    /// Independent uniform shuffles of `0..n`
    fn initialize_population(&mut self, n: usize) -> Vec<Vec<usize>> {
        (0..self.config.population_size)
            .map(|_| {
                let mut tour: Vec<usize> = (0..n).collect();
                tour.shuffle(&mut self.rng);
                tour
            })
            .collect()
    }

    fn evaluate(&self, tours: Vec<Vec<usize>>, matrix: &DistanceMatrix) -> Vec<Individual> {
        if self.config.parallel {
            tours.into_par_iter().map(|t| Individual::new(t, matrix)).collect()
        } else {
            tours.into_iter().map(|t| Individual::new(t, matrix)).collect()
        }
    }

    /// Draw ⌈P/2⌉ parent pairs. The first parent's weight is zeroed before the
    /// second draw, which discourages but does not forbid self-pairing.
    fn select_parents(&mut self, scaled: &[f64]) -> Vec<(usize, usize)> {
        let num_pairs = (scaled.len() + 1) / 2;
        let mut weights = scaled.to_vec();
        let mut pairs = Vec::with_capacity(num_pairs);

        for _ in 0..num_pairs {
            let first = self.select(&weights);
            let saved = weights[first];
            weights[first] = 0.0;
            let second = self.select(&weights);
            weights[first] = saved;
            pairs.push((first, second));
        }

        pairs
    }

    fn select(&mut self, weights: &[f64]) -> usize {
        match self.config.selection_type {
            SelectionType::Tournament => tournament_select(weights, &mut self.rng),
            SelectionType::RouletteWheel => roulette_select(weights, &mut self.rng),
        }
    }

    /// PMX on both orderings of the pair, or plain copies below the crossover rate.
    fn crossover(&mut self, parent1: &[usize], parent2: &[usize]) -> (Vec<usize>, Vec<usize>) {
        if self.rng.gen::<f64>() < self.config.crossover_prob {
            (
                pmx_crossover(parent1, parent2, &mut self.rng),
                pmx_crossover(parent2, parent1, &mut self.rng),
            )
        } else {
            (parent1.to_vec(), parent2.to_vec())
        }
    }

    /// Swap mutation
    fn mutate(&mut self, tour: &mut [usize]) {
        if self.rng.gen::<f64>() < self.config.mutation_prob {
            swap_mutation(tour, &mut self.rng);
        }
    }
}

/// Index of the first individual with the highest fitness
fn fittest_index(population: &[Individual]) -> usize {
    let mut best = 0;
    for (i, ind) in population.iter().enumerate().skip(1) {
        if ind.fitness > population[best].fitness {
            best = i;
        }
    }
    best
}

/// Number of distinct tours
fn diversity(population: &[Individual]) -> usize {
    population
        .iter()
        .map(|ind| ind.tour.as_slice())
        .collect::<HashSet<_>>()
        .len()
}

/// Rescale fitness into (0, 1] as `(f - min + 1) / (max - min + 1)`.
/// A flat population gets weight 1 everywhere.
pub fn scale_fitness(fitness: &[f64]) -> Vec<f64> {
    let min = fitness.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = fitness.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return vec![1.0; fitness.len()];
    }

    fitness
        .iter()
        .map(|&f| (f - min + 1.0) / (max - min + 1.0))
        .collect()
}

/// Binary tournament: the fitter of two random picks, the second on ties
pub fn tournament_select<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let a = rng.gen_range(0..weights.len());
    let b = rng.gen_range(0..weights.len());
    if weights[a] > weights[b] {
        a
    } else {
        b
    }
}

/// Roulette wheel on the weights, uniform when they sum to zero
pub fn roulette_select<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return rng.gen_range(0..weights.len());
    }

    let mut pick = rng.gen::<f64>() * total;
    for (i, &w) in weights.iter().enumerate() {
        pick -= w;
        if pick <= 0.0 {
            return i;
        }
    }

    weights.len() - 1
}

/// PMX with random cut points `cut1 < cut2` in `[0, n-1]`.
/// Tours shorter than two cities are returned unchanged.
pub fn pmx_crossover<R: Rng>(parent1: &[usize], parent2: &[usize], rng: &mut R) -> Vec<usize> {
    let n = parent1.len();
    if n < 2 {
        return parent1.to_vec();
    }

    let cut1 = rng.gen_range(0..n - 1);
    let cut2 = rng.gen_range(cut1 + 1..n);
    pmx(parent1, parent2, cut1, cut2)
}

/// Partially Mapped Crossover with an inclusive segment `[cut1, cut2]`.
///
/// The child takes the segment from `parent2` verbatim. Every other position
/// takes `parent1`'s city; a city already in the segment is replaced by the
/// `parent1` city found at that city's position in `parent2`, repeated until
/// the value is free.
pub fn pmx(parent1: &[usize], parent2: &[usize], cut1: usize, cut2: usize) -> Vec<usize> {
    let n = parent1.len();
    debug_assert_eq!(n, parent2.len());
    debug_assert!(cut1 <= cut2 && cut2 < n);

    let mut position_in_p2 = vec![0; n];
    for (i, &city) in parent2.iter().enumerate() {
        position_in_p2[city] = i;
    }

    let mut in_segment = vec![false; n];
    let mut child = vec![0; n];
    for i in cut1..=cut2 {
        child[i] = parent2[i];
        in_segment[parent2[i]] = true;
    }

    for i in (0..cut1).chain(cut2 + 1..n) {
        let mut city = parent1[i];
        while in_segment[city] {
            city = parent1[position_in_p2[city]];
        }
        child[i] = city;
    }

    child
}

/// Swap two distinct random positions
pub fn swap_mutation<R: Rng>(tour: &mut [usize], rng: &mut R) {
    let n = tour.len();
    if n < 2 {
        return;
    }

    let a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n);
    while a == b {
        b = rng.gen_range(0..n);
    }
    tour.swap(a, b);
}
