//! Error types with actionable diagnostics.
//!
//! Every fatal condition of an evaluation pass maps onto one variant here and
//! propagates to the top of the pass unchanged. Nothing is downgraded to a
//! warning inside the evaluation loop.

use thiserror::Error;

use crate::tracking::TrackingError;

/// Result type alias for nestcv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running an evaluation.
#[derive(Error, Debug)]
pub enum Error {
    /// A recognized configuration option is missing or malformed.
    #[error("Configuration error: {0}\n  → Check the experiment YAML against the documented options")]
    Config(String),

    /// X and y disagree in length, or X has a rank the extractor cannot consume.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A class has fewer members than the requested number of folds.
    #[error("Cannot stratify: class {class} has {count} samples but {n_splits} folds were requested\n  → Lower n_splits or collect more trials for this class")]
    Stratification {
        class: usize,
        count: usize,
        n_splits: usize,
    },

    /// `transform`/`predict` was called on a stage that was never fit.
    #[error("Stage '{stage}' is not fitted; call fit before transform/predict")]
    NotFitted { stage: &'static str },

    /// The hyperparameter grid has no combinations.
    #[error("Hyperparameter grid is empty\n  → Add at least one axis with at least one value under param_grid")]
    EmptyGrid,

    /// Numerical failure inside a stage's fit.
    #[error("Fit failed{}{}: {message}", fold_suffix(.fold), params_suffix(.params))]
    Fit {
        fold: Option<usize>,
        params: Option<String>,
        message: String,
    },

    /// Input that is structurally valid but semantically unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The tracking sink rejected a call.
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),
}

fn fold_suffix(fold: &Option<usize>) -> String {
    fold.map(|f| format!(" in outer fold {}", f + 1))
        .unwrap_or_default()
}

fn params_suffix(params: &Option<String>) -> String {
    params
        .as_deref()
        .map(|p| format!(" with {p}"))
        .unwrap_or_default()
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fit error without fold or parameter context.
    pub fn fit(message: impl Into<String>) -> Self {
        Self::Fit {
            fold: None,
            params: None,
            message: message.into(),
        }
    }

    /// Attach the outer fold index to a fit error. Other variants pass through.
    #[must_use]
    pub fn with_fold(self, index: usize) -> Self {
        match self {
            Self::Fit {
                fold: None,
                params,
                message,
            } => Self::Fit {
                fold: Some(index),
                params,
                message,
            },
            other => other,
        }
    }

    /// Attach the hyperparameter combination to a fit error.
    #[must_use]
    pub fn with_params(self, combination: impl std::fmt::Display) -> Self {
        match self {
            Self::Fit {
                fold,
                params: None,
                message,
            } => Self::Fit {
                fold,
                params: Some(combination.to_string()),
                message,
            },
            other => other,
        }
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E001",
            Self::ShapeMismatch(_) => "E010",
            Self::Stratification { .. } => "E011",
            Self::NotFitted { .. } => "E020",
            Self::EmptyGrid => "E021",
            Self::Fit { .. } => "E030",
            Self::InvalidInput(_) => "E040",
            Self::Io { .. } => "E050",
            Self::Serialization(_) => "E051",
            Self::Tracking(_) => "E060",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = vec![
            Error::Config(String::new()),
            Error::ShapeMismatch(String::new()),
            Error::Stratification {
                class: 0,
                count: 0,
                n_splits: 0,
            },
            Error::NotFitted { stage: "csp" },
            Error::EmptyGrid,
            Error::fit(""),
            Error::InvalidInput(String::new()),
            Error::io("", std::io::Error::other("x")),
            Error::Serialization(String::new()),
        ];

        let codes: Vec<_> = errors.iter().map(Error::code).collect();
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_fit_error_carries_fold_and_params() {
        let err = Error::fit("covariance is not positive definite")
            .with_params("csp.n_components=4")
            .with_fold(2);
        let msg = err.to_string();
        assert!(msg.contains("outer fold 3"));
        assert!(msg.contains("csp.n_components=4"));
        assert!(msg.contains("positive definite"));
    }

    #[test]
    fn test_with_fold_keeps_first_context() {
        let err = Error::fit("boom").with_fold(0).with_fold(4);
        assert!(matches!(err, Error::Fit { fold: Some(0), .. }));
    }

    #[test]
    fn test_with_fold_passes_other_variants_through() {
        let err = Error::EmptyGrid.with_fold(1);
        assert!(matches!(err, Error::EmptyGrid));
    }

    #[test]
    fn test_stratification_message_is_actionable() {
        let err = Error::Stratification {
            class: 2,
            count: 3,
            n_splits: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("class 2"));
        assert!(msg.contains("n_splits"));
    }
}
