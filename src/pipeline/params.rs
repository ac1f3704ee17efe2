//! Stage hyperparameter values

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single hyperparameter value as written in YAML.
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so `4` stays an `Int`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `null` / `~`
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Real number
    Float(f64),
    /// Named option (e.g. `"auto"`, `"lsqr"`)
    Categorical(String),
}

impl ParamValue {
    /// True for `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Boolean value, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen to float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String value, if this is a named option
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Categorical(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Categorical(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Categorical(s.to_string())
    }
}

/// Named hyperparameters of one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageParams(BTreeMap<String, ParamValue>);

impl StageParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Set a parameter, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    /// Raw value lookup
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Iterate parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no parameters are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject names outside `known`.
    pub fn check_known(&self, stage: &str, known: &[&str]) -> Result<()> {
        match self.0.keys().find(|k| !known.contains(&k.as_str())) {
            Some(unknown) => Err(Error::Config(format!(
                "unknown parameter '{unknown}' for stage '{stage}' (expected one of: {})",
                known.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Boolean parameter with default
    pub fn bool_or(&self, stage: &str, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None | Some(ParamValue::Null) => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| type_error(stage, name, "a bool", v)),
        }
    }

    /// Non-negative integer parameter with default
    pub fn usize_or(&self, stage: &str, name: &str, default: usize) -> Result<usize> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_int()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| type_error(stage, name, "a non-negative integer", v)),
        }
    }

    /// Float parameter with default
    pub fn f64_or(&self, stage: &str, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v.as_float().ok_or_else(|| type_error(stage, name, "a number", v)),
        }
    }

    /// Named option restricted to `choices`, with default
    pub fn choice_or<'a>(
        &self,
        stage: &str,
        name: &str,
        choices: &[&'a str],
        default: &'a str,
    ) -> Result<&'a str> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_str()
                .and_then(|s| choices.iter().find(|c| **c == s).copied())
                .ok_or_else(|| {
                    type_error(stage, name, &format!("one of {}", choices.join("/")), v)
                }),
        }
    }
}

impl FromIterator<(String, ParamValue)> for StageParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn type_error(stage: &str, name: &str, expected: &str, got: &ParamValue) -> Error {
    Error::Config(format!(
        "{stage}.{name} must be {expected}, got {got} ({})",
        got.kind()
    ))
}

/// `null` | float in `[0, 1]` | `"auto"`-style named estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shrinkage {
    /// Plain empirical covariance
    None,
    /// Fixed shrinkage intensity
    Fixed(f64),
    /// Ledoit-Wolf intensity estimated from the data
    LedoitWolf,
}

impl Shrinkage {
    /// Parse from a parameter value. `auto_names` are the strings accepted
    /// for Ledoit-Wolf (e.g. `"auto"` for LDA, `"ledoit_wolf"` for CSP).
    pub fn parse(
        stage: &str,
        name: &str,
        value: Option<&ParamValue>,
        auto_names: &[&str],
    ) -> Result<Self> {
        match value {
            None | Some(ParamValue::Null) => Ok(Self::None),
            Some(ParamValue::Categorical(s)) if s == "empirical" => Ok(Self::None),
            Some(ParamValue::Categorical(s)) if auto_names.contains(&s.as_str()) => {
                Ok(Self::LedoitWolf)
            }
            Some(v) => match v.as_float() {
                Some(x) if (0.0..=1.0).contains(&x) => Ok(Self::Fixed(x)),
                _ => Err(type_error(
                    stage,
                    name,
                    &format!("null, a float in [0, 1] or one of {}", auto_names.join("/")),
                    v,
                )),
            },
        }
    }

    /// Back to a parameter value, using `auto_name` for Ledoit-Wolf
    pub fn to_value(self, auto_name: &str) -> ParamValue {
        match self {
            Self::None => ParamValue::Null,
            Self::Fixed(x) => ParamValue::Float(x),
            Self::LedoitWolf => ParamValue::Categorical(auto_name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_untagged_yaml() {
        let values: Vec<ParamValue> =
            serde_yaml::from_str("[null, true, 4, 0.5, auto, ~]").unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Null,
                ParamValue::Bool(true),
                ParamValue::Int(4),
                ParamValue::Float(0.5),
                ParamValue::Categorical("auto".into()),
                ParamValue::Null,
            ]
        );
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::Int(4).to_string(), "4");
        assert_eq!(ParamValue::Float(0.1).to_string(), "0.1");
        assert_eq!(ParamValue::from("lsqr").to_string(), "lsqr");
        assert_eq!(ParamValue::Null.to_string(), "null");
    }

    #[test]
    fn test_typed_getters() {
        let params = StageParams::new()
            .with("n_components", 6i64)
            .with("log", true)
            .with("tol", 1e-3)
            .with("solver", "lsqr");

        assert_eq!(params.usize_or("csp", "n_components", 4).unwrap(), 6);
        assert_eq!(params.usize_or("csp", "missing", 4).unwrap(), 4);
        assert!(params.bool_or("csp", "log", false).unwrap());
        assert_eq!(params.f64_or("lda", "tol", 1e-4).unwrap(), 1e-3);
        assert_eq!(
            params
                .choice_or("lda", "solver", &["svd", "lsqr", "eigen"], "svd")
                .unwrap(),
            "lsqr"
        );
    }

    #[test]
    fn test_typed_getter_errors_name_the_parameter() {
        let params = StageParams::new().with("n_components", -2i64);
        let err = params.usize_or("csp", "n_components", 4).unwrap_err();
        assert!(err.to_string().contains("csp.n_components"));

        let params = StageParams::new().with("solver", "qr");
        assert!(params
            .choice_or("lda", "solver", &["svd", "lsqr"], "svd")
            .is_err());
    }

    #[test]
    fn test_check_known() {
        let params = StageParams::new().with("n_component", 4i64);
        let err = params
            .check_known("csp", &["n_components", "reg"])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("n_component"));
    }

    #[test]
    fn test_shrinkage_parse() {
        let auto = ParamValue::from("auto");
        assert_eq!(
            Shrinkage::parse("lda", "shrinkage", Some(&auto), &["auto"]).unwrap(),
            Shrinkage::LedoitWolf
        );
        assert_eq!(
            Shrinkage::parse("lda", "shrinkage", Some(&ParamValue::Float(0.3)), &["auto"])
                .unwrap(),
            Shrinkage::Fixed(0.3)
        );
        assert_eq!(
            Shrinkage::parse("lda", "shrinkage", None, &["auto"]).unwrap(),
            Shrinkage::None
        );
        assert!(
            Shrinkage::parse("lda", "shrinkage", Some(&ParamValue::Float(1.5)), &["auto"])
                .is_err()
        );
        assert!(Shrinkage::parse("csp", "reg", Some(&auto), &["ledoit_wolf"]).is_err());
    }
}
