//! Common spatial patterns
//!
//! Two-class CSP over multichannel trials `(n_trials, n_channels, n_times)`.
//! Spatial filters solve `C_a w = λ (C_a + C_b) w`; a filter with λ near 1
//! maximizes class-a variance relative to class b, one near 0 the reverse.
//! The transform is the average power of each filtered signal, either
//! log-transformed or standardized with the training statistics.

use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};

use super::params::{ParamValue, Shrinkage};
use super::{unique_labels, Features, Fittable, StageParams, Transformer};
use crate::error::{Error, Result};
use crate::linalg;

/// How filters are ranked before the first `n_components` are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOrder {
    /// By `|λ - 0.5|`, most discriminative first
    MutualInfo,
    /// Alternate between the largest and smallest eigenvalues
    Alternate,
}

impl ComponentOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::MutualInfo => "mutual_info",
            Self::Alternate => "alternate",
        }
    }

    /// Permutation of `values` indices in ranking order
    fn rank(self, values: &Array1<f64>) -> Vec<usize> {
        let mut ascending: Vec<usize> = (0..values.len()).collect();
        ascending.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

        match self {
            Self::MutualInfo => {
                let mut order = ascending;
                order.sort_by(|&i, &j| {
                    (values[j] - 0.5).abs().total_cmp(&(values[i] - 0.5).abs())
                });
                order
            }
            Self::Alternate => {
                let n = ascending.len();
                let (low, high) = ascending.split_at(n / 2);
                let mut high = high.iter().rev();
                let mut low = low.iter();
                (0..n)
                    .filter_map(|pos| {
                        if pos % 2 == 0 {
                            high.next().copied()
                        } else {
                            low.next().copied()
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Two-class common spatial patterns.
#[derive(Debug, Clone)]
pub struct Csp {
    n_components: usize,
    reg: Shrinkage,
    log: bool,
    norm_trace: bool,
    order: ComponentOrder,
    state: Option<CspState>,
}

#[derive(Debug, Clone)]
struct CspState {
    /// `(n_channels, n_components)`, one filter per column
    filters: Array2<f64>,
    /// Eigenvalues matching the filter columns
    eigenvalues: Array1<f64>,
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl Csp {
    /// Registry name
    pub const NAME: &'static str = "csp";
    const PARAMS: &'static [&'static str] =
        &["n_components", "reg", "log", "norm_trace", "component_order"];

    /// CSP keeping `n_components` filters, log-power output
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            reg: Shrinkage::None,
            log: true,
            norm_trace: false,
            order: ComponentOrder::MutualInfo,
            state: None,
        }
    }

    /// Build from stage parameters
    pub fn from_params(params: &StageParams) -> Result<Self> {
        params.check_known(Self::NAME, Self::PARAMS)?;
        let n_components = params.usize_or(Self::NAME, "n_components", 4)?;
        if n_components == 0 {
            return Err(Error::Config("csp.n_components must be at least 1".into()));
        }
        let order = match params.choice_or(
            Self::NAME,
            "component_order",
            &["mutual_info", "alternate"],
            "mutual_info",
        )? {
            "alternate" => ComponentOrder::Alternate,
            _ => ComponentOrder::MutualInfo,
        };

        Ok(Self {
            n_components,
            reg: Shrinkage::parse(Self::NAME, "reg", params.get("reg"), &["ledoit_wolf"])?,
            // null selects the default log-power output
            log: params.bool_or(Self::NAME, "log", true)?,
            norm_trace: params.bool_or(Self::NAME, "norm_trace", false)?,
            order,
            state: None,
        })
    }

    /// Use a regularized covariance estimate
    #[must_use]
    pub fn with_reg(mut self, reg: Shrinkage) -> Self {
        self.reg = reg;
        self
    }

    /// Log-power (`true`) or standardized power (`false`)
    #[must_use]
    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Component ranking
    #[must_use]
    pub fn with_order(mut self, order: ComponentOrder) -> Self {
        self.order = order;
        self
    }

    /// Learned spatial filters, one per column
    pub fn filters(&self) -> Option<&Array2<f64>> {
        self.state.as_ref().map(|s| &s.filters)
    }

    /// Eigenvalues of the kept filters, in ranking order
    pub fn eigenvalues(&self) -> Option<&Array1<f64>> {
        self.state.as_ref().map(|s| &s.eigenvalues)
    }

    fn class_covariance(&self, x: &Array3<f64>, y: &[usize], class: usize) -> Result<Array2<f64>> {
        let trials: Vec<ArrayView2<'_, f64>> = y
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(i, _)| x.index_axis(Axis(0), i).reversed_axes())
            .collect();
        // (n_trials_in_class * n_times, n_channels)
        let samples = ndarray::concatenate(Axis(0), &trials)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;

        let mut cov = match self.reg {
            Shrinkage::None => linalg::empirical_covariance(&samples),
            Shrinkage::Fixed(alpha) => {
                linalg::shrunk_covariance(&linalg::empirical_covariance(&samples), alpha)
            }
            Shrinkage::LedoitWolf => linalg::ledoit_wolf(&samples).0,
        };
        if self.norm_trace {
            let trace = cov.diag().sum();
            if trace <= 0.0 {
                return Err(Error::fit(format!(
                    "class {class} covariance has zero trace"
                )));
            }
            cov /= trace;
        }
        Ok(cov)
    }

    /// Average power of the filtered signals, `(n_trials, n_components)`
    fn power(filters: &Array2<f64>, x: &Array3<f64>) -> Features {
        let n_trials = x.len_of(Axis(0));
        let mut out = Array2::<f64>::zeros((n_trials, filters.ncols()));
        for (trial, mut row) in x.outer_iter().zip(out.outer_iter_mut()) {
            let projected = filters.t().dot(&trial);
            let power = projected.mapv(|v| v * v).mean_axis(Axis(1));
            if let Some(power) = power {
                row.assign(&power);
            }
        }
        out
    }
}

impl Fittable<Array3<f64>> for Csp {
    fn fit(&mut self, x: &Array3<f64>, y: &[usize]) -> Result<()> {
        let (n_trials, n_channels, _) = x.dim();
        if n_trials != y.len() {
            return Err(Error::ShapeMismatch(format!(
                "csp got {n_trials} trials but {} labels",
                y.len()
            )));
        }
        if self.n_components > n_channels {
            return Err(Error::ShapeMismatch(format!(
                "csp.n_components={} exceeds the {n_channels} available channels",
                self.n_components
            )));
        }
        let classes = unique_labels(y);
        if classes.len() != 2 {
            return Err(Error::fit(format!(
                "csp needs exactly two classes, got {} ({classes:?})",
                classes.len()
            )));
        }

        let cov_a = self.class_covariance(x, y, classes[0])?;
        let cov_b = self.class_covariance(x, y, classes[1])?;
        let composite = &cov_a + &cov_b;
        let (values, vectors) = linalg::generalized_symmetric_eigen(&cov_a, &composite)
            .ok_or_else(|| {
                Error::fit("composite class covariance is not positive definite; try csp.reg")
            })?;

        let keep: Vec<usize> = self
            .order
            .rank(&values)
            .into_iter()
            .take(self.n_components)
            .collect();
        let filters = vectors.select(Axis(1), &keep);
        let eigenvalues = values.select(Axis(0), &keep);

        let power = Self::power(&filters, x);
        let mean = power
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InvalidInput("csp got zero trials".into()))?;
        let std = power
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        self.state = Some(CspState {
            filters,
            eigenvalues,
            mean,
            std,
        });
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> StageParams {
        StageParams::new()
            .with("n_components", self.n_components as i64)
            .with("reg", self.reg.to_value("ledoit_wolf"))
            .with("log", ParamValue::Bool(self.log))
            .with("norm_trace", self.norm_trace)
            .with("component_order", self.order.as_str())
    }
}

impl Transformer<Array3<f64>> for Csp {
    fn transform(&self, x: &Array3<f64>) -> Result<Features> {
        let state = self
            .state
            .as_ref()
            .ok_or(Error::NotFitted { stage: Self::NAME })?;
        let n_channels = state.filters.nrows();
        if x.len_of(Axis(1)) != n_channels {
            return Err(Error::ShapeMismatch(format!(
                "csp was fit on {n_channels} channels but got {}",
                x.len_of(Axis(1))
            )));
        }

        let power = Self::power(&state.filters, x);
        if self.log {
            Ok(power.mapv(|p| p.max(f64::MIN_POSITIVE).ln()))
        } else {
            Ok((power - &state.mean.view().insert_axis(Axis(0)))
                / &state.std.view().insert_axis(Axis(0)))
        }
    }
}
