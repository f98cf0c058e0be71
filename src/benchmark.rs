//! Benchmarking and experimentation module.
//!
//! Runs the solvers over a set of instances and seeds, collects one row per
//! run and aggregates them per algorithm. When brute force is affordable its
//! optimum is used to report the optimality gap of the heuristics.

use crate::error::{Result, TspError};
use crate::exact::BruteForceSolver;
use crate::heuristics::aco::{ACOConfig, AntColonyOptimization};
use crate::heuristics::construction::{ConstructionHeuristic, MultiStartConstruction, NearestNeighborHeuristic};
use crate::heuristics::genetic::{GAConfig, GeneticAlgorithm};
use crate::instance::TspInstance;
use crate::solution::Solution;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Number of cities
    pub dimension: usize,
    /// Seed of the run (stochastic solvers only)
    pub seed: Option<u64>,
    /// Tour length
    pub cost: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Gap to the brute force optimum in percent (if it ran)
    pub gap_to_optimal: Option<f64>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    /// Number of runs aggregated
    pub num_runs: usize,
    pub avg_cost: f64,
    pub best_cost: f64,
    pub worst_cost: f64,
    /// Standard deviation of cost
    pub std_cost: f64,
    pub avg_time: f64,
    pub total_time: f64,
    /// Average gap to the optimum, over runs where it is known
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of runs per stochastic algorithm, seeded 0..num_runs
    pub num_runs: usize,
    /// Run brute force on instances up to this many cities
    pub exact_max_size: usize,
    /// Time limit per stochastic run in seconds
    pub time_limit: Option<f64>,
    pub ga: GAConfig,
    pub aco: ACOConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            exact_max_size: 10,
            time_limit: None,
            ga: GAConfig::default(),
            aco: ACOConfig::default(),
        }
    }
}

/// Identifies an instance by name and coordinates, so two instances that
/// share a name never share an optimum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    name: String,
    dimension: usize,
    fingerprint: u64,
}

impl InstanceKey {
    fn of(instance: &TspInstance) -> Self {
        let mut hasher = DefaultHasher::new();
        for city in &instance.cities {
            city.x.to_bits().hash(&mut hasher);
            city.y.to_bits().hash(&mut hasher);
        }
        InstanceKey {
            name: instance.name.clone(),
            dimension: instance.dimension(),
            fingerprint: hasher.finish(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    optimal: HashMap<InstanceKey, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            optimal: HashMap::new(),
        }
    }

    /// Solve exactly when the instance is small enough
    pub fn run_exact(&mut self, instance: &TspInstance) -> Result<Option<Solution>> {
        if instance.dimension() > self.config.exact_max_size {
            log::info!(
                "Skipping brute force on {} ({} cities)",
                instance.name,
                instance.dimension()
            );
            return Ok(None);
        }

        let solution = BruteForceSolver::new().solve(instance)?;
        self.optimal.insert(InstanceKey::of(instance), solution.cost);
        self.record_result(instance, &solution, None);
        Ok(Some(solution))
    }

    /// Nearest neighbor from city 0 and from every city
    pub fn run_construction_heuristics(&mut self, instance: &TspInstance) -> Result<()> {
        let heuristics: Vec<Box<dyn ConstructionHeuristic>> = vec![
            Box::new(NearestNeighborHeuristic::new()),
            Box::new(MultiStartConstruction::new()),
        ];

        for heuristic in heuristics {
            let solution = heuristic.construct(instance)?;
            self.record_result(instance, &solution, None);
        }
        Ok(())
    }

    /// GA and ACO, once per seed
    pub fn run_metaheuristics(&mut self, instance: &TspInstance) -> Result<()> {
        for seed in 0..self.config.num_runs as u64 {
            let ga_config = GAConfig {
                seed,
                time_limit: self.config.time_limit,
                ..self.config.ga.clone()
            };
            let ga = GeneticAlgorithm::new(instance.clone(), ga_config).run()?;
            self.record_result(instance, &ga.solution, Some(seed));

            let aco_config = ACOConfig {
                seed,
                time_limit: self.config.time_limit,
                ..self.config.aco.clone()
            };
            let aco = AntColonyOptimization::new(instance.clone(), aco_config).run()?;
            self.record_result(instance, &aco.solution, Some(seed));
        }
        Ok(())
    }

    /// Run full benchmark on an instance
    pub fn run_full_benchmark(&mut self, instance: &TspInstance) -> Result<()> {
        log::info!("Running benchmark on instance: {}", instance.name);

        // The optimum has to be known before the heuristics are recorded.
        self.run_exact(instance)?;
        self.run_construction_heuristics(instance)?;
        self.run_metaheuristics(instance)
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[TspInstance]) -> Result<()> {
        for instance in instances {
            self.run_full_benchmark(instance)?;
        }
        Ok(())
    }

    fn record_result(&mut self, instance: &TspInstance, solution: &Solution, seed: Option<u64>) {
        let gap_to_optimal = self
            .optimal
            .get(&InstanceKey::of(instance))
            .map(|&best| gap_percent(solution.cost, best));

        self.results.push(AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            dimension: instance.dimension(),
            seed,
            cost: solution.cost,
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_optimal,
        });
    }

    /// Compute statistics for each algorithm, best average cost first
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut by_algorithm: BTreeMap<&str, Vec<&AlgorithmResult>> = BTreeMap::new();
        for result in &self.results {
            by_algorithm.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = by_algorithm
            .into_iter()
            .map(|(algorithm, results)| {
                let costs: Vec<f64> = results.iter().map(|r| r.cost).collect();
                let gaps: Vec<f64> = results.iter().filter_map(|r| r.gap_to_optimal).collect();
                let count = costs.len() as f64;

                let avg_cost = costs.iter().sum::<f64>() / count;
                let variance = costs.iter().map(|c| (c - avg_cost).powi(2)).sum::<f64>() / count;
                let total_time = results.iter().map(|r| r.time).sum::<f64>();

                AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    num_runs: results.len(),
                    avg_cost,
                    best_cost: costs.iter().cloned().fold(f64::INFINITY, f64::min),
                    worst_cost: costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    std_cost: variance.sqrt(),
                    avg_time: total_time / count,
                    total_time,
                    avg_gap: if gaps.is_empty() {
                        None
                    } else {
                        Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
                    },
                }
            })
            .collect();

        statistics.sort_by_key(|s| OrderedFloat(s.avg_cost));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("         TSP Benchmark Report\n");
        report.push_str("========================================\n\n");

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str(&"-".repeat(80));
        report.push('\n');
        report.push_str(&format!(
            "{:<20} {:>6} {:>12} {:>12} {:>12} {:>10}\n",
            "Algorithm", "Runs", "Avg Cost", "Best Cost", "Avg Gap%", "Avg Time"
        ));
        report.push_str(&"-".repeat(80));
        report.push('\n');

        for stat in self.compute_statistics() {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<20} {:>6} {:>12.2} {:>12.2} {:>12} {:>10.4}\n",
                stat.algorithm, stat.num_runs, stat.avg_cost, stat.best_cost, gap_str, stat.avg_time
            ));
        }

        report.push_str(&"-".repeat(80));
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");
        let mut instance_best: BTreeMap<&str, &AlgorithmResult> = BTreeMap::new();
        for result in &self.results {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.cost < entry.cost {
                *entry = result;
            }
        }
        for (instance, best) in instance_best {
            report.push_str(&format!("  {}: {:.2} ({})\n", instance, best.cost, best.algorithm));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Brute force optimum of `instance`, if it has been solved
    pub fn optimal_cost(&self, instance: &TspInstance) -> Option<f64> {
        self.optimal.get(&InstanceKey::of(instance)).copied()
    }
}

/// Brute force timing for one instance size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub cities: usize,
    /// Tours enumerated
    pub permutations: u64,
    pub cost: f64,
    /// Measured time in seconds
    pub time: f64,
    /// First measurement scaled by `n! / n0!`
    pub factorial_estimate: f64,
}

/// Time brute force on one random instance per size, to compare the measured
/// growth with factorial growth.
pub fn brute_force_sweep(sizes: RangeInclusive<usize>, seed: u64) -> Result<Vec<SweepPoint>> {
    if sizes.is_empty() || *sizes.start() == 0 {
        return Err(TspError::parameter(
            "sweep",
            "sizes must be a non-empty range of positive city counts",
        ));
    }

    let base_n = *sizes.start();
    let mut points: Vec<SweepPoint> = Vec::new();

    for n in sizes {
        let instance = TspInstance::random(n, 0.0, 100.0, seed)?;
        let solution = BruteForceSolver::new().solve(&instance)?;
        let time = solution.computation_time;

        let factorial_estimate = match points.first() {
            Some(base) => base.time * ((base_n + 1)..=n).map(|k| k as f64).product::<f64>(),
            None => time,
        };
        log::info!(
            "Brute force on {} cities: {:.4}s (factorial estimate {:.4}s)",
            n,
            time,
            factorial_estimate
        );

        points.push(SweepPoint {
            cities: n,
            permutations: solution.iterations.unwrap_or(0) as u64,
            cost: solution.cost,
            time,
            factorial_estimate,
        });
    }

    Ok(points)
}

/// Export sweep points to CSV
pub fn export_sweep_csv<P: AsRef<Path>>(points: &[SweepPoint], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

/// Relative gap in percent; zero when both lengths are zero
fn gap_percent(cost: f64, optimal: f64) -> f64 {
    if optimal > 0.0 {
        (cost - optimal) / optimal * 100.0
    } else {
        0.0
    }
}

/// Load every `*.tsp` file of a directory, smallest first.
/// Files that fail to parse are logged and skipped.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<TspInstance>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "tsp").unwrap_or(false) {
            match TspInstance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by(|a, b| a.dimension().cmp(&b.dimension()).then_with(|| a.name.cmp(&b.name)));
    Ok(instances)
}
