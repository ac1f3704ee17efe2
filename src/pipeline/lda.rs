//! Linear discriminant analysis
//!
//! Gaussian classes with a shared covariance `Σ`. For class `k` with mean
//! `μ_k` and prior `π_k`:
//!
//! ```text
//! coef_k      = Σ⁻¹ μ_k
//! intercept_k = -½ μ_kᵀ coef_k + ln π_k
//! predict(x)  = argmax_k (coef_k · x + intercept_k)
//! ```
//!
//! Solvers differ in how `Σ⁻¹` is applied:
//! - `svd`: pooled within-class covariance, pseudo-inverse after dropping
//!   directions whose standardized singular value is below `tol`. No shrinkage.
//! - `lsqr` / `eigen`: prior-weighted per-class covariance, optionally
//!   shrunk, solved by Cholesky. A rank-deficient estimate is solved in the
//!   least-squares sense through the symmetric pseudo-inverse.

use log::debug;
use ndarray::{Array1, Array2, Axis};

use super::params::Shrinkage;
use super::{unique_labels, Features, Fittable, Predictor, StageParams};
use crate::error::{Error, Result};
use crate::linalg;

/// Relative eigenvalue cutoff of the least-squares fallback
const LSTSQ_RCOND: f64 = 1e-12;

/// Covariance solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdaSolver {
    /// Pseudo-inverse of the pooled covariance
    Svd,
    /// Least squares on the weighted covariance
    Lsqr,
    /// Same decision rule as `Lsqr`
    Eigen,
}

impl LdaSolver {
    fn as_str(self) -> &'static str {
        match self {
            Self::Svd => "svd",
            Self::Lsqr => "lsqr",
            Self::Eigen => "eigen",
        }
    }
}

/// Linear discriminant analysis classifier.
#[derive(Debug, Clone)]
pub struct Lda {
    solver: LdaSolver,
    shrinkage: Shrinkage,
    tol: f64,
    state: Option<LdaState>,
}

#[derive(Debug, Clone)]
struct LdaState {
    classes: Vec<usize>,
    /// `(n_classes, n_features)`
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

impl Lda {
    /// Registry name
    pub const NAME: &'static str = "lda";
    const PARAMS: &'static [&'static str] = &["solver", "shrinkage", "tol"];

    /// LDA with the given solver and no shrinkage
    pub fn new(solver: LdaSolver) -> Self {
        Self {
            solver,
            shrinkage: Shrinkage::None,
            tol: 1e-4,
            state: None,
        }
    }

    /// Set the covariance shrinkage. Rejected for the `svd` solver.
    pub fn with_shrinkage(mut self, shrinkage: Shrinkage) -> Result<Self> {
        if self.solver == LdaSolver::Svd && shrinkage != Shrinkage::None {
            return Err(Error::Config(
                "lda.shrinkage is not supported with solver 'svd'; use 'lsqr' or 'eigen'".into(),
            ));
        }
        self.shrinkage = shrinkage;
        Ok(self)
    }

    /// Build from stage parameters
    pub fn from_params(params: &StageParams) -> Result<Self> {
        params.check_known(Self::NAME, Self::PARAMS)?;
        let solver = match params.choice_or(
            Self::NAME,
            "solver",
            &["svd", "lsqr", "eigen"],
            "svd",
        )? {
            "lsqr" => LdaSolver::Lsqr,
            "eigen" => LdaSolver::Eigen,
            _ => LdaSolver::Svd,
        };
        let tol = params.f64_or(Self::NAME, "tol", 1e-4)?;
        if tol.is_nan() || tol <= 0.0 {
            return Err(Error::Config(format!("lda.tol must be positive, got {tol}")));
        }
        let shrinkage =
            Shrinkage::parse(Self::NAME, "shrinkage", params.get("shrinkage"), &["auto"])?;

        let mut lda = Self::new(solver).with_shrinkage(shrinkage)?;
        lda.tol = tol;
        Ok(lda)
    }

    /// Classes seen during fit, ascending
    pub fn classes(&self) -> Option<&[usize]> {
        self.state.as_ref().map(|s| s.classes.as_slice())
    }

    /// Linear scores `(n_samples, n_classes)`
    pub fn decision_function(&self, x: &Features) -> Result<Array2<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or(Error::NotFitted { stage: Self::NAME })?;
        if x.ncols() != state.coef.ncols() {
            return Err(Error::ShapeMismatch(format!(
                "lda was fit on {} features but got {}",
                state.coef.ncols(),
                x.ncols()
            )));
        }
        Ok(x.dot(&state.coef.t()) + &state.intercept.view().insert_axis(Axis(0)))
    }

    /// Prior-weighted sum of per-class covariance estimates
    fn weighted_covariance(&self, groups: &[Array2<f64>], priors: &[f64]) -> Array2<f64> {
        let p = groups.first().map_or(0, |g| g.ncols());
        let mut sigma = Array2::<f64>::zeros((p, p));
        for (group, &prior) in groups.iter().zip(priors) {
            sigma.scaled_add(prior, &class_covariance(group, self.shrinkage));
        }
        sigma
    }

    /// Pseudo-inverse of the pooled within-class covariance
    fn pooled_pinv(&self, groups: &[Array2<f64>], means: &Array2<f64>) -> Result<Array2<f64>> {
        let n: usize = groups.iter().map(|g| g.nrows()).sum();
        let n_classes = groups.len();
        if n <= n_classes {
            return Err(Error::fit(format!(
                "lda(svd) needs more samples ({n}) than classes ({n_classes})"
            )));
        }

        let centered: Vec<Array2<f64>> = groups
            .iter()
            .zip(means.outer_iter())
            .map(|(g, mu)| g - &mu.insert_axis(Axis(0)))
            .collect();
        let views: Vec<_> = centered.iter().map(|c| c.view()).collect();
        let xc = ndarray::concatenate(Axis(0), &views)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;

        let std = xc
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        let scaled = &xc / &std.view().insert_axis(Axis(0));
        let within = scaled.t().dot(&scaled) / (n - n_classes) as f64;

        let (values, vectors) = linalg::symmetric_eigen(&within);
        let cutoff = self.tol * self.tol;
        let inv = values.mapv(|v| if v > cutoff { 1.0 / v } else { 0.0 });
        if inv.iter().all(|&v| v == 0.0) {
            return Err(Error::fit(
                "within-class covariance has rank zero; every feature is constant within classes",
            ));
        }
        let pinv_scaled = (&vectors * &inv.insert_axis(Axis(0))).dot(&vectors.t());

        // Undo the feature scaling: Σ⁺ = D⁻¹ Σ_s⁺ D⁻¹
        let outer = std
            .view()
            .insert_axis(Axis(1))
            .dot(&std.view().insert_axis(Axis(0)));
        Ok(pinv_scaled / &outer)
    }
}

impl Default for Lda {
    fn default() -> Self {
        Self::new(LdaSolver::Svd)
    }
}

/// Covariance of one class's rows under the given shrinkage.
///
/// Ledoit-Wolf is estimated on standardized features and rescaled.
fn class_covariance(x: &Array2<f64>, shrinkage: Shrinkage) -> Array2<f64> {
    match shrinkage {
        Shrinkage::None => linalg::empirical_covariance(x),
        Shrinkage::Fixed(alpha) => {
            linalg::shrunk_covariance(&linalg::empirical_covariance(x), alpha)
        }
        Shrinkage::LedoitWolf => {
            let scale = x
                .std_axis(Axis(0), 0.0)
                .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
            let standardized = x / &scale.view().insert_axis(Axis(0));
            let (cov, _) = linalg::ledoit_wolf(&standardized);
            let outer = scale
                .view()
                .insert_axis(Axis(1))
                .dot(&scale.view().insert_axis(Axis(0)));
            cov * &outer
        }
    }
}

impl Fittable<Features> for Lda {
    fn fit(&mut self, x: &Features, y: &[usize]) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(Error::ShapeMismatch(format!(
                "lda got {n_samples} samples but {} labels",
                y.len()
            )));
        }
        let classes = unique_labels(y);
        if classes.len() < 2 {
            return Err(Error::fit(format!(
                "lda needs at least two classes, got {}",
                classes.len()
            )));
        }

        let groups: Vec<Array2<f64>> = classes
            .iter()
            .map(|&c| {
                let rows: Vec<usize> = (0..n_samples).filter(|&i| y[i] == c).collect();
                x.select(Axis(0), &rows)
            })
            .collect();
        let priors: Vec<f64> = groups
            .iter()
            .map(|g| g.nrows() as f64 / n_samples as f64)
            .collect();
        let mut means = Array2::<f64>::zeros((classes.len(), n_features));
        for (mut row, group) in means.outer_iter_mut().zip(&groups) {
            if let Some(mu) = group.mean_axis(Axis(0)) {
                row.assign(&mu);
            }
        }

        let coef = match self.solver {
            LdaSolver::Svd => {
                let pinv = self.pooled_pinv(&groups, &means)?;
                means.dot(&pinv)
            }
            LdaSolver::Lsqr | LdaSolver::Eigen => {
                let sigma = linalg::symmetrize(&self.weighted_covariance(&groups, &priors));
                let mut coef = Array2::<f64>::zeros((classes.len(), n_features));
                match linalg::cholesky(&sigma) {
                    Some(l) => {
                        for (mut row, mu) in coef.outer_iter_mut().zip(means.outer_iter()) {
                            row.assign(&linalg::cholesky_solve(&l, &mu.to_owned()));
                        }
                    }
                    None => {
                        debug!("lda covariance is singular; solving by pseudo-inverse");
                        let pinv = linalg::pinv_symmetric(&sigma, LSTSQ_RCOND);
                        coef.assign(&means.dot(&pinv));
                    }
                }
                coef
            }
        };

        let intercept = Array1::from_iter(
            means
                .outer_iter()
                .zip(coef.outer_iter())
                .zip(&priors)
                .map(|((mu, w), &prior)| -0.5 * mu.dot(&w) + prior.ln()),
        );
        if coef.iter().chain(intercept.iter()).any(|v| !v.is_finite()) {
            return Err(Error::fit("lda produced non-finite coefficients"));
        }

        self.state = Some(LdaState {
            classes,
            coef,
            intercept,
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
            .with("solver", self.solver.as_str())
            .with("shrinkage", self.shrinkage.to_value("auto"))
            .with("tol", self.tol)
    }
}

impl Predictor for Lda {
    fn predict(&self, x: &Features) -> Result<Vec<usize>> {
        let scores = self.decision_function(x)?;
        let classes = self
            .state
            .as_ref()
            .map(|s| s.classes.as_slice())
            .ok_or(Error::NotFitted { stage: Self::NAME })?;

        Ok(scores
            .outer_iter()
            .map(|row| {
                // First maximum wins
                let mut best = 0;
                for (k, &s) in row.iter().enumerate() {
                    if s > row[best] {
                        best = k;
                    }
                }
                classes[best]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ParamValue, Transformer};
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two blobs centred at ±2 on the first feature.
    fn blobs(n_per_class: usize, n_features: usize, seed: u64) -> (Features, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = 2 * n_per_class;
        let mut x = Array2::<f64>::zeros((n, n_features));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let class = i % 2;
            y.push(class + 1);
            for j in 0..n_features {
                x[[i, j]] = rng.random::<f64>() - 0.5;
            }
            x[[i, 0]] += if class == 0 { -2.0 } else { 2.0 };
        }
        (x, y)
    }

    #[test]
    fn test_lda_separates_blobs_with_every_solver() {
        let (x, y) = blobs(20, 3, 11);
        let configs = [
            Lda::new(LdaSolver::Svd),
            Lda::new(LdaSolver::Lsqr),
            Lda::new(LdaSolver::Eigen),
            Lda::new(LdaSolver::Lsqr)
                .with_shrinkage(Shrinkage::LedoitWolf)
                .unwrap(),
            Lda::new(LdaSolver::Lsqr)
                .with_shrinkage(Shrinkage::Fixed(0.5))
                .unwrap(),
        ];
        for mut lda in configs {
            lda.fit(&x, &y).unwrap();
            assert_eq!(lda.predict(&x).unwrap(), y, "{:?}", lda.params());
            assert_eq!(lda.classes().unwrap(), &[1, 2]);
        }
    }

    #[test]
    fn test_lda_multiclass() {
        let x = array![
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [5.0, 0.1],
            [5.1, -0.2],
            [4.9, 0.0],
            [0.0, 5.0],
            [0.1, 5.2],
            [-0.2, 4.8]
        ];
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut lda = Lda::new(LdaSolver::Lsqr);
        lda.fit(&x, &y).unwrap();
        assert_eq!(lda.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_lda_svd_rejects_shrinkage() {
        let err = Lda::new(LdaSolver::Svd)
            .with_shrinkage(Shrinkage::LedoitWolf)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let params = StageParams::new().with("shrinkage", "auto");
        assert!(matches!(Lda::from_params(&params), Err(Error::Config(_))));
    }

    #[test]
    fn test_lda_lsqr_constant_feature_falls_back_to_least_squares() {
        let (mut x, y) = blobs(10, 3, 12);
        x.column_mut(2).fill(0.0);
        for solver in [LdaSolver::Lsqr, LdaSolver::Eigen] {
            let mut lda = Lda::new(solver);
            lda.fit(&x, &y).unwrap();
            assert_eq!(lda.predict(&x).unwrap(), y);
        }

        let mut shrunk = Lda::new(LdaSolver::Lsqr)
            .with_shrinkage(Shrinkage::Fixed(0.5))
            .unwrap();
        shrunk.fit(&x, &y).unwrap();
        assert_eq!(shrunk.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_lda_lsqr_collinear_features() {
        let x = array![
            [-2.0, -4.0],
            [-1.5, -3.0],
            [-1.0, -2.0],
            [1.0, 2.0],
            [1.5, 3.0],
            [2.0, 4.0]
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        for solver in [LdaSolver::Svd, LdaSolver::Lsqr] {
            let mut lda = Lda::new(solver);
            lda.fit(&x, &y).unwrap();
            assert_eq!(lda.predict(&x).unwrap(), y, "{solver:?}");
        }
    }

    #[test]
    fn test_lda_svd_handles_constant_feature() {
        let (mut x, y) = blobs(10, 3, 13);
        x.column_mut(2).fill(0.0);
        let mut lda = Lda::new(LdaSolver::Svd);
        lda.fit(&x, &y).unwrap();
        assert_eq!(lda.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_lda_requires_two_classes() {
        let x = array![[1.0], [2.0]];
        let err = Lda::default().fit(&x, &[0, 0]).unwrap_err();
        assert!(matches!(err, Error::Fit { .. }));
    }

    #[test]
    fn test_lda_not_fitted() {
        assert!(matches!(
            Lda::default().predict(&array![[1.0]]),
            Err(Error::NotFitted { stage: "lda" })
        ));
    }

    #[test]
    fn test_lda_from_params_round_trip() {
        let params = StageParams::new()
            .with("solver", "eigen")
            .with("shrinkage", 0.2)
            .with("tol", 1e-3);
        let lda = Lda::from_params(&params).unwrap();
        assert_eq!(lda.params(), params);

        let defaults = Lda::from_params(&StageParams::new()).unwrap().params();
        assert_eq!(defaults.get("solver"), Some(&ParamValue::from("svd")));
        assert_eq!(defaults.get("shrinkage"), Some(&ParamValue::Null));
    }

    #[test]
    fn test_lda_after_scaler() {
        let (x, y) = blobs(15, 2, 14);
        let x = &x * 1000.0;
        let mut scaler = crate::pipeline::StandardScaler::new();
        let features = scaler.fit_transform(&x, &y).unwrap();
        let mut lda = Lda::default();
        lda.fit(&features, &y).unwrap();
        assert_eq!(lda.predict(&features).unwrap(), y);
    }
}
