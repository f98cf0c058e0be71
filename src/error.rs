//! Error type shared by the solvers, the instance loader and the CLI.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TspError>;

#[derive(Debug, Error)]
pub enum TspError {
    /// The instance has no cities.
    #[error("instance has no cities")]
    EmptyInstance,

    /// Greedy start index outside `[0, dimension)`.
    #[error("start city {start} is out of range for {dimension} cities")]
    InvalidStart { start: usize, dimension: usize },

    /// A solver parameter is out of its admissible range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A tour that is not a permutation of the city indices.
    #[error("invalid tour: {reason}")]
    InvalidTour { reason: String },

    /// Brute force enumeration would overflow the permutation counter.
    #[error("{dimension} cities is too many for brute force (max {max})")]
    TooManyCities { dimension: usize, max: usize },

    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TspError {
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        TspError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Checks that `value` is a probability in `[0, 1]`.
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TspError::parameter(name, format!("{} is not in [0, 1]", value)));
    }
    Ok(())
}
