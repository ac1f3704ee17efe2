//! Scoring metric definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::classification::{balanced_accuracy, ConfusionMatrix};
use crate::error::{Error, Result};

/// Metric used to score a fitted pipeline on a held-out partition.
///
/// Higher is better for every variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Mean per-class recall
    #[default]
    BalancedAccuracy,
    /// Fraction of correct predictions
    Accuracy,
}

impl Metric {
    /// Score predictions against ground truth.
    pub fn score(&self, y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(Error::InvalidInput("cannot score an empty partition".into()));
        }
        Ok(match self {
            Self::BalancedAccuracy => balanced_accuracy(y_true, y_pred),
            Self::Accuracy => ConfusionMatrix::from_predictions(y_true, y_pred).accuracy(),
        })
    }

    /// Metric name as used in tracking keys
    pub fn name(&self) -> &'static str {
        match self {
            Self::BalancedAccuracy => "balanced_accuracy",
            Self::Accuracy => "accuracy",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "balanced_accuracy" | "ba" => Ok(Self::BalancedAccuracy),
            "accuracy" | "acc" => Ok(Self::Accuracy),
            _ => Err(format!("Unknown metric: {s}. Valid: balanced_accuracy, accuracy")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_rejects_length_mismatch() {
        let err = Metric::BalancedAccuracy.score(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_score_rejects_empty() {
        assert!(Metric::Accuracy.score(&[], &[]).is_err());
    }

    #[test]
    fn test_metric_parse_and_display() {
        assert_eq!("BA".parse::<Metric>().unwrap(), Metric::BalancedAccuracy);
        assert_eq!("accuracy".parse::<Metric>().unwrap(), Metric::Accuracy);
        assert!("f1".parse::<Metric>().is_err());
        assert_eq!(Metric::BalancedAccuracy.to_string(), "balanced_accuracy");
    }
}
