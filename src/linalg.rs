//! Dense linear algebra for the pipeline stages
//!
//! Small symmetric problems only (channel counts and feature counts in the
//! tens), so the routines favour clarity over blocking:
//! - Cholesky factorization and triangular solves
//! - Cyclic Jacobi eigendecomposition of symmetric matrices
//! - Generalized symmetric-definite eigenproblem `A v = λ B v`
//! - Empirical, shrunk and Ledoit-Wolf covariance estimates

use ndarray::{Array1, Array2, Axis};

const JACOBI_MAX_SWEEPS: usize = 100;

/// Smallest accepted Cholesky pivot relative to its diagonal entry
const CHOLESKY_PIVOT_RCOND: f64 = 1e-12;

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`.
///
/// Returns `None` when `a` is not symmetric positive definite, including
/// when a pivot is lost to rounding relative to its diagonal entry.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return None;
    }
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        let floor = CHOLESKY_PIVOT_RCOND * a[[j, j]].abs();
        if !(diag.is_finite() && diag > floor) {
            return None;
        }
        let d = diag.sqrt();
        l[[j, j]] = d;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / d;
        }
    }
    Some(l)
}

/// Solve `L x = b` for lower-triangular `L`.
pub fn solve_lower(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut x = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[[i, k]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }
    x
}

/// Solve `Lᵀ x = b` for lower-triangular `L`.
pub fn solve_lower_transposed(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut s = b[i];
        for k in (i + 1)..n {
            s -= l[[k, i]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }
    x
}

/// Solve `A x = b` given the Cholesky factor of `A`.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    solve_lower_transposed(l, &solve_lower(l, b))
}

/// Inverse of a lower-triangular matrix.
pub fn invert_lower(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    for col in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[col] = 1.0;
        inv.column_mut(col).assign(&solve_lower(l, &e));
    }
    inv
}

/// Eigendecomposition of a symmetric matrix.
///
/// Returns eigenvalues in ascending order and the matching unit eigenvectors
/// as columns.
pub fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut m = symmetrize(a);
    let mut v = Array2::<f64>::eye(n);

    let scale = m.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);
    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| m[[p, q]] * m[[p, q]])
            .sum();
        if off <= scale * 1e-30 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[[i, i]].total_cmp(&m[[j, j]]));

    let values = Array1::from_iter(order.iter().map(|&i| m[[i, i]]));
    let vectors = v.select(Axis(1), &order);
    (values, vectors)
}

/// Solve `A v = λ B v` for symmetric `A` and symmetric positive definite `B`.
///
/// Eigenvalues ascend; eigenvectors (columns) are `B`-orthonormal, i.e.
/// `Vᵀ B V = I`. Returns `None` when `B` is not positive definite.
pub fn generalized_symmetric_eigen(
    a: &Array2<f64>,
    b: &Array2<f64>,
) -> Option<(Array1<f64>, Array2<f64>)> {
    let l = cholesky(&symmetrize(b))?;
    let l_inv = invert_lower(&l);
    let c = l_inv.dot(a).dot(&l_inv.t());
    let (values, y) = symmetric_eigen(&c);
    Some((values, l_inv.t().dot(&y)))
}

/// Pseudo-inverse of a symmetric matrix, discarding eigenvalues below
/// `rcond * max |λ|`.
pub fn pinv_symmetric(a: &Array2<f64>, rcond: f64) -> Array2<f64> {
    let (values, vectors) = symmetric_eigen(a);
    let largest = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let cutoff = rcond * largest;
    let inv_values = values.mapv(|v| if v.abs() > cutoff { 1.0 / v } else { 0.0 });
    let scaled = &vectors * &inv_values.insert_axis(Axis(0));
    scaled.dot(&vectors.t())
}

/// `(A + Aᵀ) / 2`
pub fn symmetrize(a: &Array2<f64>) -> Array2<f64> {
    (a + &a.t()) * 0.5
}

/// Biased (divide by `n`) covariance of the rows of `x` (`n_samples × n_features`).
pub fn empirical_covariance(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows().max(1) as f64;
    let centered = center(x);
    centered.t().dot(&centered) / n
}

/// Shrink towards the scaled identity: `(1 - α) C + α (tr C / p) I`.
pub fn shrunk_covariance(cov: &Array2<f64>, shrinkage: f64) -> Array2<f64> {
    let p = cov.nrows();
    let mu = cov.diag().sum() / p.max(1) as f64;
    let mut out = cov * (1.0 - shrinkage);
    for i in 0..p {
        out[[i, i]] += shrinkage * mu;
    }
    out
}

/// Ledoit-Wolf shrunk covariance of the rows of `x`.
///
/// Returns the covariance and the shrinkage intensity in `[0, 1]`.
pub fn ledoit_wolf(x: &Array2<f64>) -> (Array2<f64>, f64) {
    let (n_samples, n_features) = x.dim();
    let centered = center(x);
    let n = n_samples.max(1) as f64;
    let p = n_features as f64;
    let emp = centered.t().dot(&centered) / n;
    if n_features <= 1 {
        return (emp, 0.0);
    }

    let x2 = centered.mapv(|v| v * v);
    let emp_trace = x2.sum_axis(Axis(0)) / n;
    let mu = emp_trace.sum() / p;
    let beta_ = x2.t().dot(&x2).sum();
    let delta_ = centered.t().dot(&centered).mapv(|v| v * v).sum() / (n * n);

    let beta = (beta_ / n - delta_) / (p * n);
    let delta = (delta_ - 2.0 * mu * emp_trace.sum() + p * mu * mu) / p;
    let beta = beta.min(delta);

    let shrinkage = if beta <= 0.0 || delta <= 0.0 {
        0.0
    } else {
        (beta / delta).clamp(0.0, 1.0)
    };
    (shrunk_covariance(&emp, shrinkage), shrinkage)
}

fn center(x: &Array2<f64>) -> Array2<f64> {
    match x.mean_axis(Axis(0)) {
        Some(mean) => x - &mean.insert_axis(Axis(0)),
        None => x.clone(),
    }
}
