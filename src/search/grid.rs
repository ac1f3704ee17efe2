//! Hyperparameter grids
//!
//! A grid is an ordered list of axes, one per `(stage, parameter)` pair, each
//! with a list of candidate values. In YAML it is nested by stage:
//!
//! ```yaml
//! param_grid:
//!   csp:
//!     n_components: [2, 4, 6]
//!   lda:
//!     shrinkage: [null, auto]
//! ```
//!
//! Declared order is preserved through (de)serialization so enumeration order,
//! and with it tie-breaking during search, is reproducible.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::pipeline::ParamValue;

/// `stage.parameter`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamKey {
    /// Stage name (e.g. `csp`)
    pub stage: String,
    /// Parameter name within the stage (e.g. `n_components`)
    pub name: String,
}

impl ParamKey {
    /// Key for `stage.name`
    pub fn new(stage: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage, self.name)
    }
}

impl Serialize for ParamKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One point of the grid: a value per axis, in axis order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Combination(Vec<(ParamKey, ParamValue)>);

impl Combination {
    /// Empty combination (base parameters only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    #[must_use]
    pub fn with(mut self, key: ParamKey, value: impl Into<ParamValue>) -> Self {
        self.0.push((key, value.into()));
        self
    }

    /// Iterate `(key, value)` pairs in axis order
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    /// Value for `stage.name`
    pub fn get(&self, stage: &str, name: &str) -> Option<&ParamValue> {
        self.0
            .iter()
            .find(|(k, _)| k.stage == stage && k.name == name)
            .map(|(_, v)| v)
    }

    /// Number of parameters set
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no parameters are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("base parameters");
        }
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for Combination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

/// Ordered hyperparameter grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    axes: Vec<(ParamKey, Vec<ParamValue>)>,
}

impl ParamGrid {
    /// Grid with no axes
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis. Each `stage.parameter` may appear once.
    pub fn add_axis(&mut self, key: ParamKey, values: Vec<ParamValue>) -> Result<()> {
        if self.axes.iter().any(|(k, _)| *k == key) {
            return Err(Error::Config(format!("param_grid lists {key} twice")));
        }
        self.axes.push((key, values));
        Ok(())
    }

    /// Builder-style [`add_axis`](Self::add_axis)
    pub fn with_axis(
        mut self,
        stage: &str,
        name: &str,
        values: impl IntoIterator<Item = impl Into<ParamValue>>,
    ) -> Result<Self> {
        self.add_axis(
            ParamKey::new(stage, name),
            values.into_iter().map(Into::into).collect(),
        )?;
        Ok(self)
    }

    /// Axes in declared order
    pub fn axes(&self) -> &[(ParamKey, Vec<ParamValue>)] {
        &self.axes
    }

    /// Number of combinations (0 when any axis is empty or there are none)
    pub fn len(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// True when the grid yields no combinations
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cartesian product in declared order, first axis varying slowest.
    pub fn combinations(&self) -> Result<Vec<Combination>> {
        if self.is_empty() {
            return Err(Error::EmptyGrid);
        }

        let mut out = Vec::with_capacity(self.len());
        let mut cursor = vec![0usize; self.axes.len()];
        loop {
            out.push(Combination(
                self.axes
                    .iter()
                    .zip(&cursor)
                    .map(|((key, values), &i)| (key.clone(), values[i].clone()))
                    .collect(),
            ));

            // Odometer increment, last axis fastest
            let mut axis = self.axes.len();
            loop {
                if axis == 0 {
                    return Ok(out);
                }
                axis -= 1;
                cursor[axis] += 1;
                if cursor[axis] < self.axes[axis].1.len() {
                    break;
                }
                cursor[axis] = 0;
            }
        }
    }
}

impl Serialize for ParamGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut stages: Vec<&str> = Vec::new();
        for (key, _) in &self.axes {
            if !stages.contains(&key.stage.as_str()) {
                stages.push(&key.stage);
            }
        }

        let mut map = serializer.serialize_map(Some(stages.len()))?;
        for stage in stages {
            let axes: Vec<(&str, &Vec<ParamValue>)> = self
                .axes
                .iter()
                .filter(|(k, _)| k.stage == stage)
                .map(|(k, v)| (k.name.as_str(), v))
                .collect();
            map.serialize_entry(stage, &OrderedAxes(axes))?;
        }
        map.end()
    }
}

/// Serializes `(name, values)` pairs as a map in slice order.
struct OrderedAxes<'a>(Vec<(&'a str, &'a Vec<ParamValue>)>);

impl Serialize for OrderedAxes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParamGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(GridVisitor)
    }
}

struct GridVisitor;

impl<'de> Visitor<'de> for GridVisitor {
    type Value = ParamGrid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of stage name to a map of parameter name to a list of values")
    }

    fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<ParamGrid, E> {
        Ok(ParamGrid::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<ParamGrid, A::Error> {
        let mut grid = ParamGrid::new();
        while let Some(stage) = access.next_key::<String>()? {
            let StageAxes(axes) = access.next_value()?;
            for (name, values) in axes {
                grid.add_axis(ParamKey::new(stage.clone(), name), values)
                    .map_err(<A::Error as serde::de::Error>::custom)?;
            }
        }
        Ok(grid)
    }
}

/// One stage's axes, order preserved
struct StageAxes(Vec<(String, Vec<ParamValue>)>);

impl<'de> Deserialize<'de> for StageAxes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AxesVisitor;

        impl<'de> Visitor<'de> for AxesVisitor {
            type Value = StageAxes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter name to a list of values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<StageAxes, A::Error> {
                let mut axes = Vec::new();
                while let Some(entry) = access.next_entry::<String, Vec<ParamValue>>()? {
                    axes.push(entry);
                }
                Ok(StageAxes(axes))
            }
        }

        deserializer.deserialize_map(AxesVisitor)
    }
}
