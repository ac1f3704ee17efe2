//! Configuration validation logic

use super::error::{ValidationError, KNOWN_STAGES};
use crate::config::schema::ExperimentSpec;
use crate::config::template::{format_path_template, PathContext};

/// Validate an experiment specification
///
/// Checks:
/// - Required names and paths are present
/// - Fold counts are in valid ranges
/// - Stage sections and grid axes name known stages
/// - Path templates only use supported placeholders
///
/// Stage hyperparameter values are checked later, when the stages are
/// built.
pub fn validate_config(spec: &ExperimentSpec) -> Result<(), ValidationError> {
    if spec.experiment.name.trim().is_empty() {
        return Err(ValidationError::EmptyExperimentName);
    }

    if spec.data.x_path.trim().is_empty() {
        return Err(ValidationError::EmptyDataPath("x_path"));
    }
    if spec.data.y_path.trim().is_empty() {
        return Err(ValidationError::EmptyDataPath("y_path"));
    }

    let rskf = &spec.cv.rskf;
    if rskf.n_splits < 2 {
        return Err(ValidationError::InvalidSplits {
            section: "cv.rskf",
            value: rskf.n_splits,
        });
    }
    if rskf.n_repeats == 0 {
        return Err(ValidationError::InvalidRepeats(rskf.n_repeats));
    }
    if spec.cv.skf.n_splits < 2 {
        return Err(ValidationError::InvalidSplits {
            section: "cv.skf",
            value: spec.cv.skf.n_splits,
        });
    }

    if spec.pipeline.classifier.trim().is_empty() {
        return Err(ValidationError::EmptyStageName("classifier"));
    }
    if let Some(extractor) = &spec.pipeline.extractor {
        if extractor.trim().is_empty() {
            return Err(ValidationError::EmptyStageName("extractor"));
        }
    }

    if let Some(stage) = spec
        .stages
        .keys()
        .find(|s| !KNOWN_STAGES.contains(&s.as_str()))
    {
        return Err(ValidationError::UnknownStage(stage.clone()));
    }
    if let Some((key, _)) = spec
        .param_grid
        .axes()
        .iter()
        .find(|(key, _)| !KNOWN_STAGES.contains(&key.stage.as_str()))
    {
        return Err(ValidationError::UnknownGridStage(key.stage.clone()));
    }

    let output = &spec.output;
    let files = [
        ("metrics_file", &output.metrics_file),
        ("folds_scores_file", &output.folds_scores_file),
        ("best_params_file", &output.best_params_file),
    ];
    for (i, (name, file)) in files.iter().enumerate() {
        if file.trim().is_empty() {
            return Err(ValidationError::EmptyOutputFile(*name));
        }
        if let Some((other, _)) = files[..i].iter().find(|(_, f)| f == file) {
            return Err(ValidationError::DuplicateOutputFile {
                first: *other,
                second: *name,
                file: (*file).clone(),
            });
        }
    }

    if let Some(tracking) = &spec.tracking {
        if tracking.uri.trim().is_empty() {
            return Err(ValidationError::EmptyTrackingUri);
        }
    }

    let context = PathContext::from_data(&spec.data);
    for template in [&spec.data.x_path, &spec.data.y_path, &output.dir] {
        format_path_template(template, &context)?;
    }

    Ok(())
}
