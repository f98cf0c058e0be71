//! Exhaustive TSP solver.
//!
//! City 0 is fixed as the first element of every tour (rotations of a cycle
//! have the same length) and the remaining (N-1)! orderings are enumerated in
//! lexicographic order. Practical up to about a dozen cities.

use crate::error::{Result, TspError};
use crate::instance::TspInstance;
use crate::solution::Solution;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

/// Largest instance whose permutation count still fits in a `u64`.
pub const MAX_BRUTE_FORCE_CITIES: usize = 21;

/// Above this size enumeration takes minutes or more.
const PRACTICAL_LIMIT: usize = 12;

/// Brute force solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BruteForceConfig {
    /// Draw a progress bar on stderr
    pub show_progress: bool,
    /// Permutations between two progress reports
    pub progress_interval: u64,
}

impl Default for BruteForceConfig {
    fn default() -> Self {
        BruteForceConfig {
            show_progress: false,
            progress_interval: 10_000,
        }
    }
}

/// Progress snapshot handed to observers during enumeration
#[derive(Debug, Clone, Copy)]
pub struct BruteForceProgress {
    pub checked: u64,
    pub total: u64,
    pub best_cost: f64,
}

impl BruteForceProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.checked as f64 / self.total as f64
        }
    }
}

pub struct BruteForceSolver {
    pub config: BruteForceConfig,
}

impl BruteForceSolver {
    pub fn new() -> Self {
        BruteForceSolver {
            config: BruteForceConfig::default(),
        }
    }

    pub fn with_config(config: BruteForceConfig) -> Self {
        BruteForceSolver { config }
    }

    /// Number of tours enumerated for `n` cities, or `None` on overflow.
    pub fn permutation_count(n: usize) -> Option<u64> {
        (1..n as u64).try_fold(1u64, |acc, k| acc.checked_mul(k))
    }

    /// Find the optimal tour.
    pub fn solve(&self, instance: &TspInstance) -> Result<Solution> {
        self.solve_with_progress(instance, |_| {})
    }

    /// Find the optimal tour, calling `on_progress` every `progress_interval`
    /// permutations and once at the end.
    pub fn solve_with_progress<F>(&self, instance: &TspInstance, mut on_progress: F) -> Result<Solution>
    where
        F: FnMut(&BruteForceProgress),
    {
        let start = std::time::Instant::now();
        let n = instance.dimension();

        if n == 0 {
            return Err(TspError::EmptyInstance);
        }
        if self.config.progress_interval == 0 {
            return Err(TspError::parameter("progress_interval", "must be positive"));
        }
        let total = Self::permutation_count(n).ok_or(TspError::TooManyCities {
            dimension: n,
            max: MAX_BRUTE_FORCE_CITIES,
        })?;

        if n > PRACTICAL_LIMIT {
            log::warn!("Brute force on {} cities enumerates {} tours", n, total);
        }
        log::info!("Calculating {} possible permutations...", total);

        let matrix = instance.distance_matrix();
        let progress = self.progress_bar(total);

        let mut tour: Vec<usize> = (0..n).collect();
        let mut best_tour = tour.clone();
        let mut best_cost = matrix.tour_length(&tour);
        let mut checked = 1u64;

        while next_permutation(&mut tour[1..]) {
            let cost = matrix.tour_length(&tour);
            if cost < best_cost {
                best_cost = cost;
                best_tour.copy_from_slice(&tour);
            }

            checked += 1;
            if checked % self.config.progress_interval == 0 {
                progress.set_position(checked);
                let report = BruteForceProgress { checked, total, best_cost };
                log::debug!(
                    "Progress: {}/{} permutations ({:.2}%), elapsed {:.2}s",
                    checked,
                    total,
                    report.fraction() * 100.0,
                    start.elapsed().as_secs_f64()
                );
                on_progress(&report);
            }
        }

        progress.finish_and_clear();
        on_progress(&BruteForceProgress { checked, total, best_cost });

        let mut solution = Solution::from_tour(instance, best_tour, "BruteForce");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(checked as usize);

        log::info!(
            "Brute force finished: cost {:.4} after {} permutations in {:.2}s",
            solution.cost,
            checked,
            solution.computation_time
        );

        Ok(solution)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("[{bar:40}] {pos}/{len} permutations [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar
    }
}

impl Default for BruteForceSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Rearrange `items` into the next lexicographic permutation.
/// Returns `false` (leaving the slice untouched) when it is already the last one.
pub fn next_permutation(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }

    let mut i = items.len() - 1;
    while i > 0 && items[i - 1] >= items[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }

    let mut j = items.len() - 1;
    while items[j] <= items[i - 1] {
        j -= 1;
    }
    items.swap(i - 1, j);
    items[i..].reverse();
    true
}
