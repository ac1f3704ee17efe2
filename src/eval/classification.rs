//! Classification scoring
//!
//! Labels are arbitrary non-negative integers (motor-imagery datasets often use
//! 1/2 rather than 0/1); the confusion matrix maps them onto dense indices in
//! ascending label order.

use std::fmt;

/// Confusion matrix over the union of true and predicted labels.
///
/// Element `[i][j]` counts samples whose true label is `labels[i]` and whose
/// predicted label is `labels[j]`.
#[derive(Clone, Debug)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    labels: Vec<usize>,
}

impl ConfusionMatrix {
    /// Build from predictions and ground truth.
    ///
    /// Pairs beyond the shorter slice are ignored; callers check lengths.
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize]) -> Self {
        let mut labels: Vec<usize> = y_true.iter().chain(y_pred).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let n = labels.len();
        let mut matrix = vec![vec![0; n]; n];
        for (t, p) in y_true.iter().zip(y_pred) {
            // Both are present in `labels` by construction
            if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
                matrix[i][j] += 1;
            }
        }

        Self { matrix, labels }
    }

    /// Sorted class labels backing the rows/columns
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of distinct labels
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Count for (true label, predicted label); 0 for unknown labels
    pub fn get(&self, true_label: usize, predicted_label: usize) -> usize {
        match (
            self.labels.binary_search(&true_label),
            self.labels.binary_search(&predicted_label),
        ) {
            (Ok(i), Ok(j)) => self.matrix[i][j],
            _ => 0,
        }
    }

    /// Number of true instances of the class at row `idx`
    fn support_at(&self, idx: usize) -> usize {
        self.matrix[idx].iter().sum()
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Fraction of correct predictions
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        correct as f64 / total as f64
    }

    /// Recall of every class that occurs in the ground truth, in label order.
    ///
    /// Classes that were only ever predicted have no recall and are skipped.
    pub fn recalls(&self) -> Vec<(usize, f64)> {
        (0..self.n_classes())
            .filter_map(|i| {
                let support = self.support_at(i);
                (support > 0).then(|| (self.labels[i], self.matrix[i][i] as f64 / support as f64))
            })
            .collect()
    }

    /// Mean per-class recall over the classes present in the ground truth
    pub fn balanced_accuracy(&self) -> f64 {
        let recalls = self.recalls();
        if recalls.is_empty() {
            return 0.0;
        }
        recalls.iter().map(|(_, r)| r).sum::<f64>() / recalls.len() as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for label in &self.labels {
            write!(f, " {:>6}", format!("P{label}"))?;
        }
        writeln!(f)?;
        for (row, label) in self.matrix.iter().zip(&self.labels) {
            write!(f, "{:>8}", format!("T{label}"))?;
            for count in row {
                write!(f, " {count:>6}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Balanced accuracy: mean recall over the classes present in `y_true`.
///
/// Equivalent to accuracy on balanced data; robust to class imbalance.
pub fn balanced_accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    ConfusionMatrix::from_predictions(y_true, y_pred).balanced_accuracy()
}
