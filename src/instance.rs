//! Module for parsing and representing TSP instances.
//!
//! Instances are plain lists of 2D coordinates. They can be generated at random
//! or read from the NODE_COORD_SECTION of a TSP-LIB file; nothing else in the
//! file is interpreted.

use crate::distance::DistanceMatrix;
use crate::error::{Result, TspError};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A city, identified by its position in the instance's city list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub x: f64,
    pub y: f64,
}

impl City {
    pub fn new(x: f64, y: f64) -> Self {
        City { x, y }
    }

    /// Euclidean distance to another city
    #[inline]
    pub fn distance_to(&self, other: &City) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Represents a complete TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TspInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Cities, indexed from 0
    pub cities: Vec<City>,
}

impl TspInstance {
    pub fn new(name: &str, cities: Vec<City>) -> Self {
        TspInstance {
            name: name.to_string(),
            comment: String::new(),
            cities,
        }
    }

    /// Generate `n` cities with coordinates drawn uniformly from `[min_coord, max_coord]`.
    pub fn random(n: usize, min_coord: f64, max_coord: f64, seed: u64) -> Result<Self> {
        if !(min_coord.is_finite() && max_coord.is_finite()) {
            return Err(TspError::parameter("coordinate range", "bounds must be finite"));
        }
        if min_coord > max_coord {
            return Err(TspError::parameter(
                "coordinate range",
                format!("min {} is greater than max {}", min_coord, max_coord),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cities = (0..n)
            .map(|_| {
                City::new(
                    rng.gen_range(min_coord..=max_coord),
                    rng.gen_range(min_coord..=max_coord),
                )
            })
            .collect();

        let mut instance = TspInstance::new(&format!("random{}", n), cities);
        instance.comment = format!("{} random cities in [{}, {}], seed {}", n, min_coord, max_coord, seed);
        Ok(instance)
    }

    /// Parse the coordinates of a TSP-LIB file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mut instance = Self::from_reader(BufReader::new(file))?;

        if instance.name.is_empty() {
            instance.name = path
                .as_ref()
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
        }

        Ok(instance)
    }

    /// Parse TSP-LIB content. Only `NAME`, `COMMENT` and `id x y` lines of the
    /// coordinate section are read; coordinate lines with another field count are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut name = String::new();
        let mut comment = String::new();
        let mut cities = Vec::new();
        let mut in_coords = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            let line_no = idx + 1;

            if line == "EOF" {
                break;
            }
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("NAME") {
                name = rest.trim_start_matches([' ', ':']).trim().to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix("COMMENT") {
                comment = rest.trim_start_matches([' ', ':']).trim().to_string();
                continue;
            }
            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                continue;
            }
            if line.ends_with("_SECTION") {
                in_coords = false;
                continue;
            }

            if in_coords {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() != 3 {
                    continue;
                }
                let x = parse_coordinate(parts[1], line_no)?;
                let y = parse_coordinate(parts[2], line_no)?;
                cities.push(City::new(x, y));
            }
        }

        Ok(TspInstance { name, comment, cities })
    }

    /// Number of cities
    #[inline]
    pub fn dimension(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn distance_matrix(&self) -> DistanceMatrix {
        DistanceMatrix::from_cities(&self.cities)
    }

    /// Reference tour length computed straight from the coordinates.
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for i in 0..tour.len() - 1 {
            length += self.cities[tour[i]].distance_to(&self.cities[tour[i + 1]]);
        }

        length += self.cities[tour[tour.len() - 1]].distance_to(&self.cities[tour[0]]);

        length
    }

    /// Coordinates of the cities of a tour, in visiting order
    pub fn coordinates(&self, tour: &[usize]) -> Vec<City> {
        tour.iter().map(|&i| self.cities[i]).collect()
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for c in &self.cities {
            min_x = min_x.min(c.x);
            max_x = max_x.max(c.x);
            min_y = min_y.min(c.y);
            max_y = max_y.max(c.y);
        }

        let mut total = 0.0;
        let mut count = 0usize;
        let mut min_distance = f64::INFINITY;
        let mut max_distance = 0.0f64;
        for i in 0..n {
            for j in i + 1..n {
                let d = self.cities[i].distance_to(&self.cities[j]);
                total += d;
                count += 1;
                min_distance = min_distance.min(d);
                max_distance = max_distance.max(d);
            }
        }

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            bounds: (min_x, max_x, min_y, max_y),
            avg_distance: if count > 0 { total / count as f64 } else { 0.0 },
            min_distance: if count > 0 { min_distance } else { 0.0 },
            max_distance,
        }
    }
}

fn parse_coordinate(token: &str, line: usize) -> Result<f64> {
    let value: f64 = token.parse().map_err(|_| TspError::Parse {
        line,
        reason: format!("invalid coordinate `{}`", token),
    })?;
    if !value.is_finite() {
        return Err(TspError::Parse {
            line,
            reason: format!("non-finite coordinate `{}`", token),
        });
    }
    Ok(value)
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    /// (min_x, max_x, min_y, max_y)
    pub bounds: (f64, f64, f64, f64),
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(
            f,
            "  Bounds: x [{:.2}, {:.2}], y [{:.2}, {:.2}]",
            self.bounds.0, self.bounds.1, self.bounds.2, self.bounds.3
        )?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "NAME: tiny4
COMMENT: four corners
TYPE: TSP
DIMENSION: 4
EDGE_WEIGHT_TYPE: EUC_2D
NODE_COORD_SECTION
1 0 0
2 0 10
3 10 10
4 10.0 0.0
EOF
5 99 99
";

    #[test]
    fn test_parse_tsplib() {
        let instance = TspInstance::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(instance.name, "tiny4");
        assert_eq!(instance.comment, "four corners");
        assert_eq!(instance.dimension(), 4);
        assert_eq!(instance.cities[3], City::new(10.0, 0.0));
    }

    #[test]
    fn test_parse_rejects_bad_coordinate() {
        let input = "NODE_COORD_SECTION\n1 0 0\n2 abc 3\n";
        match TspInstance::from_reader(input.as_bytes()) {
            Err(TspError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_skips_other_sections() {
        let input = "NODE_COORD_SECTION\n1 1 1\n2 2 2 extra\nDEMAND_SECTION\n1 5 0\nEOF\n";
        let instance = TspInstance::from_reader(input.as_bytes()).unwrap();
        assert_eq!(instance.cities, vec![City::new(1.0, 1.0)]);
    }

    #[test]
    fn test_random_is_reproducible() {
        let a = TspInstance::random(20, 0.0, 100.0, 7).unwrap();
        let b = TspInstance::random(20, 0.0, 100.0, 7).unwrap();
        assert_eq!(a.cities, b.cities);
        assert!(a.cities.iter().all(|c| (0.0..=100.0).contains(&c.x) && (0.0..=100.0).contains(&c.y)));
    }

    #[test]
    fn test_random_rejects_bad_bounds() {
        for (min, max) in [(10.0, 0.0), (f64::NAN, 1.0), (0.0, f64::INFINITY)] {
            assert!(matches!(
                TspInstance::random(5, min, max, 1),
                Err(TspError::InvalidParameter { .. })
            ));
        }

        let flat = TspInstance::random(3, 2.0, 2.0, 1).unwrap();
        assert!(flat.cities.iter().all(|c| c.x == 2.0 && c.y == 2.0));
        assert!(TspInstance::random(0, 0.0, 1.0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_distance_far_apart() {
        // the squared difference would overflow
        let a = City::new(-1e200, 0.0);
        let b = City::new(1e200, 0.0);
        assert_eq!(a.distance_to(&b), 2e200);
    }

    #[test]
    fn test_tour_length_matches_matrix() {
        let instance = TspInstance::random(9, 0.0, 50.0, 3).unwrap();
        let tour: Vec<usize> = (0..9).rev().collect();
        let matrix = instance.distance_matrix();
        assert!((instance.tour_length(&tour) - matrix.tour_length(&tour)).abs() < 1e-9);
    }

    #[test]
    fn test_statistics() {
        let instance = TspInstance::from_reader(SAMPLE.as_bytes()).unwrap();
        let stats = instance.statistics();
        assert_eq!(stats.dimension, 4);
        assert!((stats.min_distance - 10.0).abs() < 1e-9);
        assert!((stats.max_distance - 200f64.sqrt()).abs() < 1e-9);
    }
}
