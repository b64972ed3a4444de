//! Similarity metrics.
//!
//! Everything above this module works with *scores*, where higher means more
//! similar: cosine similarity in `[-1, 1]`, or `1 / (1 + d)` in `(0, 1]` for
//! Euclidean distance `d`. Both metrics score an exact match as `1.0`.

mod scalar;

use std::fmt;
use std::str::FromStr;

pub use scalar::{
    cosine_similarity, cosine_similarity_with_norms, dot_product, euclidean_distance,
    euclidean_distance_squared, euclidean_similarity, l2_norm, sum_of_squares,
};

use crate::error::VectorError;

/// The similarity metric of a catalog, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity of the vectors.
    #[default]
    Cosine,
    /// Euclidean (L2) distance mapped to `1 / (1 + d)`.
    Euclidean,
}

impl DistanceMetric {
    /// Score two vectors.
    #[inline]
    #[must_use]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Euclidean => euclidean_similarity(a, b),
        }
    }

    /// Score two vectors whose L2 norms are already known.
    ///
    /// Euclidean scoring ignores the norms.
    #[inline]
    #[must_use]
    pub fn score_with_norms(&self, a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
        match self {
            Self::Cosine => cosine_similarity_with_norms(a, b, norm_a, norm_b),
            Self::Euclidean => euclidean_similarity(a, b),
        }
    }

    /// The score of a vector against itself.
    #[inline]
    #[must_use]
    pub const fn max_score(&self) -> f32 {
        1.0
    }

    /// Whether zero vectors are meaningless under this metric.
    #[inline]
    #[must_use]
    pub const fn requires_direction(&self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// The persisted name of the metric.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            other => Err(VectorError::Encoding(format!("unknown metric '{other}'"))),
        }
    }
}
