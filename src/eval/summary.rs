//! Fold score aggregation and result persistence

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Aggregate of the per-fold scores of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// 2.5th percentile
    pub ci95_lo: f64,
    /// 97.5th percentile
    pub ci95_hi: f64,
    /// Number of scores aggregated
    pub n_folds: usize,
}

impl RunSummary {
    /// Aggregate fold scores.
    ///
    /// Percentiles interpolate linearly between order statistics. A single
    /// score yields zero spread with both bounds equal to it.
    pub fn from_scores(scores: &[f64]) -> Result<Self> {
        if scores.is_empty() {
            return Err(Error::InvalidInput(
                "cannot summarize a run with no fold scores".into(),
            ));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(Error::InvalidInput(format!("non-finite fold score {bad}")));
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (min, max) = (sorted[0], sorted[sorted.len() - 1]);

        // Clamped so that rounding never moves the mean outside the sample range
        let n = scores.len() as f64;
        let mean = (scores.iter().sum::<f64>() / n).clamp(min, max);
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        // The interval always contains the mean, even for heavily skewed scores
        Ok(Self {
            mean,
            std: variance.sqrt(),
            ci95_lo: percentile(&sorted, 2.5).min(mean),
            ci95_hi: percentile(&sorted, 97.5).max(mean),
            n_folds: scores.len(),
        })
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mean BA: {:.3} ± {:.3} (95% interval {:.3}–{:.3}, {} folds)",
            self.mean, self.std, self.ci95_lo, self.ci95_hi, self.n_folds
        )
    }
}

/// `q`-th percentile (0–100) of ascending `sorted`, linear interpolation.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// On-disk metrics document
#[derive(Debug, Serialize, Deserialize)]
struct MetricsFile {
    #[serde(rename = "mean BA")]
    mean: f64,
    std: f64,
}

/// Writes run results under an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    metrics_file: String,
    folds_scores_file: String,
    best_params_file: String,
}

impl ReportWriter {
    /// Writer with the conventional file names
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            metrics_file: "metrics.json".into(),
            folds_scores_file: "folds_scores.txt".into(),
            best_params_file: "best_params.json".into(),
        }
    }

    /// Override the file names
    pub fn with_file_names(
        mut self,
        metrics_file: impl Into<String>,
        folds_scores_file: impl Into<String>,
        best_params_file: impl Into<String>,
    ) -> Self {
        self.metrics_file = metrics_file.into();
        self.folds_scores_file = folds_scores_file.into();
        self.best_params_file = best_params_file.into();
        self
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the metrics file
    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join(&self.metrics_file)
    }

    /// Path of the fold scores file
    pub fn folds_scores_path(&self) -> PathBuf {
        self.dir.join(&self.folds_scores_file)
    }

    /// Path of the per-fold best parameters file
    pub fn best_params_path(&self) -> PathBuf {
        self.dir.join(&self.best_params_file)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::io(format!("creating output directory {}", self.dir.display()), e)
        })
    }

    /// Write `{"mean BA": .., "std": ..}`.
    pub fn write_metrics(&self, summary: &RunSummary) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.metrics_path();
        let doc = MetricsFile {
            mean: summary.mean,
            std: summary.std,
        };
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(&path, json)
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
        Ok(path)
    }

    /// Write one score per line with four fractional digits.
    pub fn write_fold_scores(&self, scores: &[f64]) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.folds_scores_path();
        let body: String = scores.iter().map(|s| format!("{s:.4}\n")).collect();
        fs::write(&path, body).map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
        Ok(path)
    }

    /// Write the per-fold best hyperparameters as a JSON list.
    pub fn write_best_params<T: Serialize>(&self, per_fold: &[T]) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.best_params_path();
        let json = serde_json::to_string_pretty(per_fold)?;
        fs::write(&path, json)
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
        Ok(path)
    }
}

/// Read fold scores back from a file written by [`ReportWriter::write_fold_scores`].
pub fn read_fold_scores(path: &Path) -> Result<Vec<f64>> {
    let body = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
    body.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            l.trim()
                .parse::<f64>()
                .map_err(|e| Error::Serialization(format!("bad fold score {l:?}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_summary_known_values() {
        let summary = RunSummary::from_scores(&[0.5, 0.6, 0.7, 0.8, 0.9]).unwrap();
        assert_abs_diff_eq!(summary.mean, 0.7, epsilon = 1e-12);
        // Population std of an arithmetic sequence with step 0.1
        assert_abs_diff_eq!(summary.std, 0.02_f64.sqrt(), epsilon = 1e-12);
        // rank = 0.025 * 4 = 0.1 → 0.5 + 0.1 * 0.1
        assert_abs_diff_eq!(summary.ci95_lo, 0.51, epsilon = 1e-12);
        // rank = 0.975 * 4 = 3.9 → 0.8 + 0.9 * 0.1
        assert_abs_diff_eq!(summary.ci95_hi, 0.89, epsilon = 1e-12);
        assert_eq!(summary.n_folds, 5);
    }

    #[test]
    fn test_summary_single_score() {
        let summary = RunSummary::from_scores(&[0.73]).unwrap();
        assert_eq!(summary.mean, 0.73);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.ci95_lo, 0.73);
        assert_eq!(summary.ci95_hi, 0.73);
    }

    #[test]
    fn test_summary_identical_scores_are_exact() {
        let summary = RunSummary::from_scores(&[0.1; 7]).unwrap();
        assert_eq!(summary.mean, 0.1);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.ci95_lo, 0.1);
        assert_eq!(summary.ci95_hi, 0.1);
    }

    #[test]
    fn test_summary_interval_contains_mean_when_skewed() {
        let mut scores = vec![1.0; 49];
        scores.push(0.0);
        let summary = RunSummary::from_scores(&scores).unwrap();
        assert_abs_diff_eq!(summary.mean, 0.98, epsilon = 1e-12);
        assert!(summary.ci95_lo <= summary.mean);
        assert_eq!(summary.ci95_hi, 1.0);
    }

    #[test]
    fn test_summary_is_order_independent() {
        let a = RunSummary::from_scores(&[0.9, 0.5, 0.7]).unwrap();
        let b = RunSummary::from_scores(&[0.5, 0.7, 0.9]).unwrap();
        assert_abs_diff_eq!(a.mean, b.mean, epsilon = 1e-12);
        assert_eq!(a.ci95_lo, b.ci95_lo);
        assert_eq!(a.ci95_hi, b.ci95_hi);
    }

    #[test]
    fn test_summary_rejects_empty_and_nan() {
        assert!(RunSummary::from_scores(&[]).is_err());
        assert!(RunSummary::from_scores(&[0.5, f64::NAN]).is_err());
    }

    #[test]
    fn test_report_files() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("results"));
        let scores = [0.75, 0.8125, 0.5];
        let summary = RunSummary::from_scores(&scores).unwrap();

        let metrics_path = writer.write_metrics(&summary).unwrap();
        let metrics: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(metrics_path).unwrap()).unwrap();
        assert_abs_diff_eq!(metrics["mean BA"].as_f64().unwrap(), summary.mean);
        assert_abs_diff_eq!(metrics["std"].as_f64().unwrap(), summary.std);

        let scores_path = writer.write_fold_scores(&scores).unwrap();
        let body = fs::read_to_string(&scores_path).unwrap();
        assert_eq!(body, "0.7500\n0.8125\n0.5000\n");
        assert_eq!(read_fold_scores(&scores_path).unwrap(), scores.to_vec());
    }

    #[test]
    fn test_custom_file_names() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).with_file_names("m.json", "f.txt", "b.json");
        writer.write_best_params(&[serde_json::json!({"fold": 0})]).unwrap();
        assert!(dir.path().join("b.json").exists());
        assert_eq!(writer.metrics_path(), dir.path().join("m.json"));
    }

    proptest! {
        #[test]
        fn prop_ci_bounds_ordered(scores in prop::collection::vec(0.0f64..=1.0, 1..50)) {
            let summary = RunSummary::from_scores(&scores).unwrap();
            let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(summary.ci95_lo <= summary.mean);
            prop_assert!(summary.mean <= summary.ci95_hi);
            prop_assert!(min <= summary.ci95_lo && summary.ci95_hi <= max);
            prop_assert!(summary.std >= 0.0);
        }
    }
}
