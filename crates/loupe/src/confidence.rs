//! Score to confidence band mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfidenceConfig;
use crate::error::Result;

/// How much a match can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    /// Below the low cut; route to manual review.
    Low,
    /// Between the cuts.
    Medium,
    /// At or above the high cut; safe to merge automatically.
    High,
}

impl ConfidenceBand {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless classifier over two cut points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceClassifier {
    high_cut: f32,
    low_cut: f32,
}

impl ConfidenceClassifier {
    /// Create a classifier.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) if a cut is not finite or
    /// `low_cut > high_cut`.
    pub fn new(config: ConfidenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { high_cut: config.high_cut, low_cut: config.low_cut })
    }

    /// Band of a score. NaN falls to `Low`.
    #[must_use]
    pub fn classify(&self, score: f32) -> ConfidenceBand {
        if score >= self.high_cut {
            ConfidenceBand::High
        } else if score >= self.low_cut {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    /// Whether a match at `score` should go to manual review.
    #[must_use]
    pub fn needs_review(&self, score: f32) -> bool {
        self.classify(score) == ConfidenceBand::Low
    }

    /// Whether a duplicate at `score` can be merged without review.
    #[must_use]
    pub fn auto_merge(&self, score: f32) -> bool {
        self.classify(score) == ConfidenceBand::High
    }

    /// The high cut point.
    #[must_use]
    pub const fn high_cut(&self) -> f32 {
        self.high_cut
    }

    /// The low cut point.
    #[must_use]
    pub const fn low_cut(&self) -> f32 {
        self.low_cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(high_cut: f32, low_cut: f32) -> ConfidenceClassifier {
        ConfidenceClassifier::new(ConfidenceConfig { high_cut, low_cut }).unwrap()
    }

    #[test]
    fn test_bands_are_inclusive_at_the_cut() {
        let c = classifier(0.9, 0.7);
        assert_eq!(c.classify(0.9), ConfidenceBand::High);
        assert_eq!(c.classify(0.899), ConfidenceBand::Medium);
        assert_eq!(c.classify(0.7), ConfidenceBand::Medium);
        assert_eq!(c.classify(0.69), ConfidenceBand::Low);
        assert_eq!(c.classify(-1.0), ConfidenceBand::Low);
    }

    #[test]
    fn test_equal_cuts_have_no_medium_band() {
        let c = classifier(0.8, 0.8);
        assert_eq!(c.classify(0.8), ConfidenceBand::High);
        assert_eq!(c.classify(0.79), ConfidenceBand::Low);
    }

    #[test]
    fn test_nan_is_low() {
        assert_eq!(classifier(0.9, 0.7).classify(f32::NAN), ConfidenceBand::Low);
    }

    #[test]
    fn test_routing_helpers() {
        let c = classifier(0.95, 0.8);
        assert!(c.auto_merge(0.99));
        assert!(!c.needs_review(0.99));
        assert!(c.needs_review(0.5));
        assert!(!c.auto_merge(0.9));
        assert!(!c.needs_review(0.9));
    }

    #[test]
    fn test_crossed_cuts_rejected() {
        let err = ConfidenceClassifier::new(ConfidenceConfig { high_cut: 0.5, low_cut: 0.6 });
        assert!(err.is_err());
    }

    #[test]
    fn test_band_order_and_display() {
        assert!(ConfidenceBand::High > ConfidenceBand::Medium);
        assert!(ConfidenceBand::Medium > ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::Medium.to_string(), "medium");
    }
}
