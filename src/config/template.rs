//! `{placeholder}` substitution in configured paths

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::schema::DataSection;
use super::validate::ValidationError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex")
});

/// Values substituted into path templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    /// `{subject_id}`
    pub subject_id: String,
    /// `{dataset_type}`
    pub dataset_type: String,
}

impl PathContext {
    /// Context from the `data:` section, with `unknown` / `unspecified`
    /// standing in for missing values
    pub fn from_data(data: &DataSection) -> Self {
        Self {
            subject_id: data.subject_id().to_string(),
            dataset_type: data.dataset_type().to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "subject_id" => Some(&self.subject_id),
            "dataset_type" => Some(&self.dataset_type),
            _ => None,
        }
    }
}

/// Replace every `{subject_id}` / `{dataset_type}` in `template`.
///
/// Any other placeholder is rejected.
pub fn format_path_template(
    template: &str,
    context: &PathContext,
) -> Result<String, ValidationError> {
    if let Some(unknown) = PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .find(|name| context.lookup(name).is_none())
    {
        return Err(ValidationError::UnknownPlaceholder {
            placeholder: unknown,
            template: template.to_string(),
        });
    }

    Ok(PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            context.lookup(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned())
}

/// Format `template` and resolve it against `base_dir` unless absolute.
pub fn resolve_path(
    template: &str,
    context: &PathContext,
    base_dir: &Path,
) -> Result<PathBuf, ValidationError> {
    let formatted = PathBuf::from(format_path_template(template, context)?);
    if formatted.is_absolute() {
        Ok(formatted)
    } else {
        Ok(base_dir.join(formatted))
    }
}
