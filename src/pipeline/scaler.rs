//! Per-feature standardization

use ndarray::{Array1, Axis};

use super::{Features, Fittable, StageParams, Transformer};
use crate::error::{Error, Result};

/// Removes the training mean and scales to unit (population) variance.
///
/// Constant features keep a scale of 1 so they map to zero instead of NaN.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    /// Registry name
    pub const NAME: &'static str = "scaler";
    const PARAMS: &'static [&'static str] = &["with_mean", "with_std"];

    /// Scaler with both centering and scaling
    pub fn new() -> Self {
        Self {
            with_mean: true,
            with_std: true,
            mean: None,
            scale: None,
        }
    }

    /// Build from stage parameters
    pub fn from_params(params: &StageParams) -> Result<Self> {
        params.check_known(Self::NAME, Self::PARAMS)?;
        Ok(Self {
            with_mean: params.bool_or(Self::NAME, "with_mean", true)?,
            with_std: params.bool_or(Self::NAME, "with_std", true)?,
            ..Self::new()
        })
    }

    /// Learned per-feature mean
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Learned per-feature scale
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl Fittable<Features> for StandardScaler {
    fn fit(&mut self, x: &Features, _y: &[usize]) -> Result<()> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InvalidInput("cannot fit scaler on zero samples".into()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> StageParams {
        StageParams::new()
            .with("with_mean", self.with_mean)
            .with("with_std", self.with_std)
    }
}

impl Transformer<Features> for StandardScaler {
    fn transform(&self, x: &Features) -> Result<Features> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(Error::NotFitted { stage: Self::NAME });
        };
        if x.ncols() != mean.len() {
            return Err(Error::ShapeMismatch(format!(
                "scaler was fit on {} features but got {}",
                mean.len(),
                x.ncols()
            )));
        }

        let mut out = x.clone();
        if self.with_mean {
            out -= &mean.view().insert_axis(Axis(0));
        }
        if self.with_std {
            out /= &scale.view().insert_axis(Axis(0));
        }
        Ok(out)
    }
}
