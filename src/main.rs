//! TSP Solvers - Command Line Interface
//!
//! Exact and heuristic solvers for the Euclidean Traveling Salesman Problem.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tsp_solvers::benchmark::{brute_force_sweep, export_sweep_csv, load_instances_from_dir, Benchmark, BenchmarkConfig};
use tsp_solvers::error::{Result, TspError};
use tsp_solvers::exact::{BruteForceConfig, BruteForceProgress, BruteForceSolver};
use tsp_solvers::heuristics::aco::{ACOConfig, AntColonyOptimization};
use tsp_solvers::heuristics::construction::*;
use tsp_solvers::heuristics::genetic::{GAConfig, GeneticAlgorithm};
use tsp_solvers::instance::TspInstance;
use tsp_solvers::solution::validate_tour;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Upper bound of the coordinates of generated instances
const RANDOM_COORD_MAX: f64 = 100.0;

#[derive(Parser)]
#[command(name = "tsp-solvers")]
#[command(version = "1.0")]
#[command(about = "Exact and heuristic solvers for the Euclidean TSP")]
struct Cli {
    /// Log solver progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InstanceSource {
    /// Path to a TSPLIB instance file
    #[arg(short, long)]
    instance: Option<PathBuf>,

    /// Generate this many random cities instead
    #[arg(long)]
    random: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance with one algorithm
    Solve {
        #[command(flatten)]
        source: InstanceSource,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "genetic")]
        algorithm: Algorithm,

        /// Random seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON file with solver parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the algorithm's progress trace as CSV
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Start city for the greedy heuristic
        #[arg(long)]
        start: Option<usize>,
    },

    /// Compare algorithms on an instance
    Compare {
        #[command(flatten)]
        source: InstanceSource,

        /// Number of runs
        #[arg(short, long, default_value = "10")]
        runs: usize,

        /// JSON file with solver parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run benchmarks on a directory of instances, or time brute force over a size range
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long, required_unless_present = "sweep")]
        dir: Option<PathBuf>,

        /// Time brute force on random instances of each size in `MIN..MAX` (inclusive)
        #[arg(long, value_parser = parse_size_range, conflicts_with = "dir")]
        sweep: Option<RangeInclusive<usize>>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Time limit per run
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Largest instance solved by brute force
        #[arg(long, default_value = "10")]
        exact_max_size: usize,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Exhaustive search (small instances only)
    BruteForce,
    /// Nearest neighbor construction
    Greedy,
    /// Genetic Algorithm with PMX
    Genetic,
    /// Ant Colony Optimization
    Aco,
}

/// Contents of a `--config` file; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    brute_force: BruteForceConfig,
    greedy: NearestNeighborHeuristic,
    ga: GAConfig,
    aco: ACOConfig,
}

impl Settings {
    fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(Settings::default()),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let outcome = match cli.command {
        Commands::Solve {
            source,
            algorithm,
            seed,
            config,
            output,
            trace,
            start,
        } => solve_instance(&source, algorithm, seed, config, output, trace, start, cli.verbose),

        Commands::Compare {
            source,
            runs,
            config,
            output,
        } => compare_algorithms(&source, runs, config, output),

        Commands::Benchmark {
            dir,
            sweep,
            output,
            runs,
            time_limit,
            exact_max_size,
            max_size,
        } => match (dir, sweep) {
            (_, Some(sizes)) => run_sweep(sizes, &output),
            (Some(dir), None) => run_benchmark(&dir, &output, runs, time_limit, exact_max_size, max_size),
            // clap requires one of the two
            (None, None) => Ok(()),
        },

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_instance(source: &InstanceSource, seed: u64) -> Result<TspInstance> {
    match (&source.instance, source.random) {
        (Some(path), _) => {
            println!("Loading instance from {:?}...", path);
            TspInstance::from_file(path)
        }
        (None, Some(n)) => TspInstance::random(n, 0.0, RANDOM_COORD_MAX, seed),
        // clap requires exactly one of the two
        (None, None) => Err(TspError::EmptyInstance),
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    source: &InstanceSource,
    algorithm: Algorithm,
    seed: Option<u64>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    trace: Option<PathBuf>,
    start: Option<usize>,
    verbose: bool,
) -> Result<()> {
    let mut settings = Settings::load(config.as_deref())?;
    if let Some(seed) = seed {
        settings.ga.seed = seed;
        settings.aco.seed = seed;
    }
    if let Some(start) = start {
        settings.greedy.start = start;
    }

    let instance = load_instance(source, seed.unwrap_or(42))?;
    if verbose {
        println!("{}", instance.statistics());
    }

    println!("Solving with {:?} algorithm...", algorithm);
    let timer = Instant::now();

    let solution = match algorithm {
        Algorithm::BruteForce => {
            let solver = BruteForceSolver::with_config(BruteForceConfig {
                show_progress: settings.brute_force.show_progress || verbose,
                ..settings.brute_force
            });
            let mut reports: Vec<BruteForceProgress> = Vec::new();
            let solution = solver.solve_with_progress(&instance, |p| reports.push(*p))?;
            if let Some(path) = &trace {
                let mut writer = csv::Writer::from_path(path)?;
                writer.write_record(["checked", "total", "best_cost"])?;
                for p in &reports {
                    writer.write_record(&[p.checked.to_string(), p.total.to_string(), p.best_cost.to_string()])?;
                }
                writer.flush()?;
            }
            solution
        }

        Algorithm::Greedy => {
            let (solution, steps) = settings.greedy.construct_with_trace(&instance)?;
            if let Some(path) = &trace {
                let mut writer = csv::Writer::from_path(path)?;
                writer.write_record(["step", "tour"])?;
                for (i, partial) in steps.iter().enumerate() {
                    let tour: Vec<String> = partial.iter().map(|c| c.to_string()).collect();
                    writer.write_record(&[i.to_string(), tour.join(" ")])?;
                }
                writer.flush()?;
            }
            solution
        }

        Algorithm::Genetic => {
            let result = GeneticAlgorithm::new(instance.clone(), settings.ga).run()?;
            if let Some(path) = &trace {
                result.telemetry.export_to_csv(path)?;
            }
            result.solution
        }

        Algorithm::Aco => {
            let result = AntColonyOptimization::new(instance.clone(), settings.aco).run()?;
            if let Some(path) = &trace {
                result.export_to_csv(path)?;
            }
            result.solution
        }
    };

    let elapsed = timer.elapsed();
    validate_tour(&solution.tour, instance.dimension())?;

    println!("\n========== Results ==========");
    println!("Instance: {} (n={})", instance.name, instance.dimension());
    println!("Algorithm: {}", solution.algorithm);
    println!("Cost: {:.2}", solution.cost);
    println!("Time: {:.4}s", elapsed.as_secs_f64());
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\nTour: {:?}", solution.tour);
    }

    if let Some(path) = &trace {
        println!("\nTrace saved to {:?}", path);
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&solution)?;
        std::fs::write(&out_path, json)?;
        println!("\nSolution saved to {:?}", out_path);
    }

    Ok(())
}

fn compare_algorithms(
    source: &InstanceSource,
    runs: usize,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let settings = Settings::load(config.as_deref())?;
    let instance = load_instance(source, settings.ga.seed)?;

    println!("Comparing algorithms on {} (n={})...\n", instance.name, instance.dimension());

    let mut benchmark = Benchmark::new(BenchmarkConfig {
        num_runs: runs,
        ga: settings.ga,
        aco: settings.aco,
        ..Default::default()
    });
    benchmark.run_full_benchmark(&instance)?;

    println!("========== Summary ==========");
    println!(
        "{:<28} {:>10} {:>10} {:>10} {:>10}",
        "Algorithm", "Best", "Average", "Worst", "Avg Time"
    );
    println!("{}", "-".repeat(72));

    for stat in benchmark.compute_statistics() {
        println!(
            "{:<28} {:>10.2} {:>10.2} {:>10.2} {:>10.4}",
            stat.algorithm, stat.best_cost, stat.avg_cost, stat.worst_cost, stat.avg_time
        );
    }

    if let Some(out_path) = output {
        benchmark.export_to_csv(&out_path)?;
        println!("\nResults exported to {:?}", out_path);
    }

    Ok(())
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    runs: usize,
    time_limit: Option<f64>,
    exact_max_size: usize,
    max_size: Option<usize>,
) -> Result<()> {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir)?;
    if let Some(max) = max_size {
        instances.retain(|i| i.dimension() <= max);
    }

    println!("Found {} instances", instances.len());
    if instances.is_empty() {
        eprintln!("No instances found!");
        return Ok(());
    }

    std::fs::create_dir_all(output)?;

    let mut benchmark = Benchmark::new(BenchmarkConfig {
        num_runs: runs,
        exact_max_size,
        time_limit,
        ..Default::default()
    });

    for (i, instance) in instances.iter().enumerate() {
        println!("[{}/{}] {} (n={})", i + 1, instances.len(), instance.name, instance.dimension());
    }
    benchmark.run_on_instances(&instances)?;

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

/// Parse `MIN..MAX` or `MIN..=MAX`, both inclusive
fn parse_size_range(text: &str) -> std::result::Result<RangeInclusive<usize>, String> {
    let (min, max) = text
        .split_once("..")
        .ok_or_else(|| format!("expected MIN..MAX, got `{}`", text))?;
    let max = max.strip_prefix('=').unwrap_or(max);
    let min: usize = min.trim().parse().map_err(|_| format!("invalid size `{}`", min))?;
    let max: usize = max.trim().parse().map_err(|_| format!("invalid size `{}`", max))?;
    if min == 0 || min > max {
        return Err(format!("`{}` is not a range of positive sizes", text));
    }
    Ok(min..=max)
}

fn run_sweep(sizes: RangeInclusive<usize>, output: &Path) -> Result<()> {
    println!("Timing brute force for {} to {} cities...\n", sizes.start(), sizes.end());

    let points = brute_force_sweep(sizes, 42)?;

    println!("{:>8} {:>14} {:>12} {:>16}", "Cities", "Permutations", "Time (s)", "n! estimate (s)");
    println!("{}", "-".repeat(54));
    for p in &points {
        println!(
            "{:>8} {:>14} {:>12.4} {:>16.4}",
            p.cities, p.permutations, p.time, p.factorial_estimate
        );
    }

    std::fs::create_dir_all(output)?;
    let sweep_path = output.join("sweep.csv");
    export_sweep_csv(&points, &sweep_path)?;
    println!("\nSweep exported to {:?}", sweep_path);

    Ok(())
}

fn analyze_instance(path: &Path) -> Result<()> {
    let instance = TspInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    if let Some(count) = BruteForceSolver::permutation_count(instance.dimension()) {
        println!("\nBrute force would enumerate {} tours", count);
    } else {
        println!("\nToo many cities for brute force");
    }

    let nn_sol = NearestNeighborHeuristic::new().construct(&instance)?;
    let multi_sol = MultiStartConstruction::new().construct(&instance)?;

    println!("\nQuick Solution Estimates:");
    println!("  Nearest Neighbor: {:.2}", nn_sol.cost);
    println!("  Multi-Start Nearest Neighbor: {:.2}", multi_sol.cost);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_range() {
        assert_eq!(parse_size_range("3..10").unwrap(), 3..=10);
        assert_eq!(parse_size_range("3..=10").unwrap(), 3..=10);
        assert!(parse_size_range("10..3").is_err());
        assert!(parse_size_range("0..4").is_err());
        assert!(parse_size_range("five").is_err());
    }
}
