//! Loading and resolving experiment configuration files

use std::fs;
use std::path::{Path, PathBuf};

use super::schema::ExperimentSpec;
use super::template::{resolve_path, PathContext};
use super::validate::validate_config;
use crate::error::{Error, Result};
use crate::eval::ReportWriter;

/// File name of the configuration dump written next to the results
pub const EFFECTIVE_CONFIG_FILE: &str = "effective_config.yaml";

/// A validated specification plus the directory its relative paths
/// resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    /// Parsed specification
    pub spec: ExperimentSpec,
    /// Directory of the configuration file
    pub base_dir: PathBuf,
}

/// Concrete paths after template substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Feature matrix file
    pub x: PathBuf,
    /// Label file
    pub y: PathBuf,
    /// Results directory
    pub output_dir: PathBuf,
    /// Tracking store directory, if tracking is configured
    pub tracking_dir: Option<PathBuf>,
}

/// Read, parse and validate a YAML configuration file.
///
/// # Example
///
/// ```no_run
/// use nestcv::config::load_config;
///
/// let config = load_config("experiments/mi_csp_lda/config.yaml")?;
/// println!("{}", config.spec.run_name());
/// # Ok::<(), nestcv::Error>(())
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ExperimentConfig> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading config file {}", path.display()), e))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    parse_config(&yaml, base_dir)
}

/// Parse and validate YAML text whose relative paths resolve against `base_dir`.
pub fn parse_config(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<ExperimentConfig> {
    let spec: ExperimentSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;
    validate_config(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
    Ok(ExperimentConfig {
        spec,
        base_dir: base_dir.into(),
    })
}

impl ExperimentConfig {
    /// Re-validate after in-place edits (e.g. command-line overrides)
    pub fn validate(&self) -> Result<()> {
        validate_config(&self.spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))
    }

    /// Substitute path templates and resolve relative paths
    pub fn paths(&self) -> Result<ResolvedPaths> {
        let context = PathContext::from_data(&self.spec.data);
        let resolve = |template: &str| {
            resolve_path(template, &context, &self.base_dir)
                .map_err(|e| Error::Config(e.to_string()))
        };

        let tracking_dir = match &self.spec.tracking {
            Some(tracking) => {
                let uri = tracking.uri.strip_prefix("file://").unwrap_or(&tracking.uri);
                Some(resolve(uri)?)
            }
            None => None,
        };

        Ok(ResolvedPaths {
            x: resolve(&self.spec.data.x_path)?,
            y: resolve(&self.spec.data.y_path)?,
            output_dir: resolve(&self.spec.output.dir)?,
            tracking_dir,
        })
    }

    /// Report writer for `output_dir` using the configured file names
    pub fn report_writer(&self, output_dir: impl Into<PathBuf>) -> ReportWriter {
        let output = &self.spec.output;
        ReportWriter::new(output_dir).with_file_names(
            &output.metrics_file,
            &output.folds_scores_file,
            &output.best_params_file,
        )
    }

    /// The specification as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.spec).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// The specification as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.spec)?)
    }

    /// Write `effective_config.yaml` into `dir`, creating it if needed
    pub fn dump_effective(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating output directory {}", dir.display()), e))?;
        let path = dir.join(EFFECTIVE_CONFIG_FILE);
        fs::write(&path, self.to_yaml()?)
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
        Ok(path)
    }
}
