//! Validation error types

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("experiment.name must not be empty")]
    EmptyExperimentName,

    #[error("data.{0} must not be empty")]
    EmptyDataPath(&'static str),

    #[error("Invalid {section}.n_splits: {value} (must be >= 2)")]
    InvalidSplits { section: &'static str, value: usize },

    #[error("Invalid cv.rskf.n_repeats: {0} (must be >= 1)")]
    InvalidRepeats(usize),

    #[error("pipeline.{0} must not be empty")]
    EmptyStageName(&'static str),

    #[error("Unknown stage section '{0}' (known stages: {known})", known = KNOWN_STAGES.join(", "))]
    UnknownStage(String),

    #[error("param_grid targets unknown stage '{0}' (known stages: {known})", known = KNOWN_STAGES.join(", "))]
    UnknownGridStage(String),

    #[error("output.{0} must not be empty")]
    EmptyOutputFile(&'static str),

    #[error("output.{first} and output.{second} both name '{file}'")]
    DuplicateOutputFile {
        first: &'static str,
        second: &'static str,
        file: String,
    },

    #[error("tracking.uri must not be empty")]
    EmptyTrackingUri,

    #[error("Unknown placeholder '{{{placeholder}}}' in '{template}' (supported: {{subject_id}}, {{dataset_type}})")]
    UnknownPlaceholder {
        placeholder: String,
        template: String,
    },
}

/// Stage names a configuration may refer to
pub(crate) const KNOWN_STAGES: &[&str] = &["csp", "lda", "scaler"];
