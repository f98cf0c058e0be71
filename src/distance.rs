//! Precomputed Euclidean distances between cities.

use crate::instance::City;

/// Value stored on the diagonal instead of zero, so that `1 / d` stays finite
/// when distances are turned into selection weights.
pub const DIAGONAL_EPSILON: f64 = 0.001;

/// Dense symmetric N×N distance matrix stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Compute all pairwise Euclidean distances.
    pub fn from_cities(cities: &[City]) -> Self {
        let n = cities.len();
        let mut data = vec![0.0; n * n];

        for i in 0..n {
            data[i * n + i] = DIAGONAL_EPSILON;
            for j in (i + 1)..n {
                let d = cities[i].distance_to(&cities[j]);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }

        DistanceMatrix { data, size: n }
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Number of cities.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Length of the closed tour: consecutive edges plus the edge back to the start.
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for pair in tour.windows(2) {
            length += self.get(pair[0], pair[1]);
        }
        length + self.get(tour[tour.len() - 1], tour[0])
    }

    /// Row of distances from `from` to every city.
    pub fn row(&self, from: usize) -> &[f64] {
        &self.data[from * self.size..(from + 1) * self.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square() -> Vec<City> {
        vec![
            City::new(0.0, 0.0),
            City::new(0.0, 10.0),
            City::new(10.0, 10.0),
            City::new(10.0, 0.0),
        ]
    }

    #[test]
    fn test_distance_calculation() {
        let m = DistanceMatrix::from_cities(&[City::new(0.0, 0.0), City::new(3.0, 4.0)]);
        assert!((m.get(0, 1) - 5.0).abs() < 1e-10);
        assert!((m.get(1, 0) - 5.0).abs() < 1e-10);
        assert_eq!(m.get(0, 0), DIAGONAL_EPSILON);
    }

    #[test]
    fn test_tour_length_includes_closing_edge() {
        let m = DistanceMatrix::from_cities(&square());
        assert!((m.tour_length(&[0, 1, 2, 3]) - 40.0).abs() < 1e-9);
        assert!((m.tour_length(&[0, 2, 1, 3]) - (20.0 + 2.0 * 200f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_sizes() {
        let empty = DistanceMatrix::from_cities(&[]);
        assert_eq!(empty.size(), 0);
        assert_eq!(empty.tour_length(&[]), 0.0);

        let single = DistanceMatrix::from_cities(&[City::new(1.0, 1.0)]);
        assert_eq!(single.tour_length(&[0]), 0.0);
        assert_eq!(single.row(0), &[DIAGONAL_EPSILON]);
    }

    proptest! {
        #[test]
        fn prop_symmetric_with_positive_diagonal(
            coords in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 1..30)
        ) {
            let cities: Vec<City> = coords.iter().map(|&(x, y)| City::new(x, y)).collect();
            let m = DistanceMatrix::from_cities(&cities);
            for i in 0..cities.len() {
                prop_assert!(m.get(i, i) > 0.0);
                for j in 0..cities.len() {
                    prop_assert_eq!(m.get(i, j), m.get(j, i));
                    prop_assert!(m.get(i, j) >= 0.0);
                }
            }
        }
    }
}
