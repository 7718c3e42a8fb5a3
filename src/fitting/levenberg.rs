//! Levenberg-Marquardt non-linear least squares.
//!
//! Minimizes `S(θ) = Σ (yᵢ - g(xᵢ; θ))²` for an arbitrary scalar model `g`.
//!
//! # Algorithm
//!
//! Each iteration linearizes the model around θ with a central-difference
//! Jacobian `J` and solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr,      r = y - g(x; θ)
//! ```
//!
//! by Cholesky decomposition. A step that lowers `S` is accepted and λ is
//! divided by `lambda_factor`; otherwise λ is multiplied by it. The diagonal
//! scaling (Marquardt, 1963) makes the step invariant to the very different
//! magnitudes of parameters such as p ≈ 0.03 and m ≈ 10⁶.
//!
//! Convergence is declared when any of the following holds:
//!
//! - the relative cost reduction of an accepted step is at most `f_tol`
//! - every component of the step is at most `x_tol` relative to its parameter
//! - the largest cosine between `r` and a column of `J` is at most `g_tol`
//! - the residuals vanish to machine precision
//!
//! # References
//!
//! - Levenberg, K. (1944). "A Method for the Solution of Certain Non-Linear
//!   Problems in Least Squares", *Quarterly of Applied Mathematics* 2(2).
//! - Marquardt, D.W. (1963). "An Algorithm for Least-Squares Estimation of
//!   Nonlinear Parameters", *SIAM J. Applied Mathematics* 11(2), pp. 431-441.
//! - Moré, J.J. (1978). "The Levenberg-Marquardt Algorithm: Implementation
//!   and Theory", *Numerical Analysis*, LNM 630, pp. 105-116.

use tracing::{debug, warn};
use u_numflow::matrix::Matrix;

use crate::error::{DiffusionError, Result};

/// Solver settings for [`curve_fit`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Maximum number of iterations (accepted or rejected steps).
    pub max_iter: usize,
    /// Relative cost reduction below which an accepted step ends the search.
    pub f_tol: f64,
    /// Relative step size below which the search ends.
    pub x_tol: f64,
    /// Gradient orthogonality threshold.
    pub g_tol: f64,
    /// Starting damping factor λ.
    pub initial_lambda: f64,
    /// Multiplier applied to λ after a rejected step (divisor after an accepted one).
    pub lambda_factor: f64,
    /// λ above which the search is abandoned.
    pub max_lambda: f64,
    /// Relative step for the finite-difference Jacobian.
    pub diff_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 200,
            f_tol: 1e-10,
            x_tol: 1e-10,
            g_tol: 1e-12,
            initial_lambda: 1e-3,
            lambda_factor: 10.0,
            max_lambda: 1e16,
            diff_step: 1e-7,
        }
    }
}

/// Result of a [`curve_fit`] run.
#[derive(Debug, Clone)]
pub struct CurveFitResult {
    /// Optimal parameters.
    pub params: Vec<f64>,
    /// Estimated covariance of the parameters (k × k).
    ///
    /// `(JᵀJ)⁻¹ · S/(n-k)`. Every entry is `+∞` when `n ≤ k` or `JᵀJ` is
    /// singular at the optimum.
    pub covariance: Vec<Vec<f64>>,
    /// Residuals `yᵢ - g(xᵢ; θ)` at the optimum.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals at the optimum.
    pub cost: f64,
    /// Number of iterations used.
    pub iterations: usize,
    /// Number of model evaluations over the whole data set.
    pub evaluations: usize,
}

/// Fits `model(x, θ)` to `(x, y)` by Levenberg-Marquardt, starting from `p0`.
///
/// # Errors
///
/// - [`DiffusionError::LengthMismatch`] if `x` and `y` differ in length
/// - [`DiffusionError::InsufficientData`] if there are fewer observations than parameters
/// - [`DiffusionError::InvalidParameter`] if `p0` is empty or non-finite
/// - [`DiffusionError::InvalidData`] if `x` or `y` contain non-finite values
/// - [`DiffusionError::NumericalError`] if the model is not finite at `p0`
/// - [`DiffusionError::ConvergenceFailure`] if no minimum is reached within
///   `max_iter` iterations or λ exceeds `max_lambda`
///
/// # Examples
///
/// ```
/// use u_diffusion::fitting::{curve_fit, FitOptions};
///
/// // y = a · exp(-b x)
/// let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
/// let y: Vec<f64> = x.iter().map(|&xi| 2.0 * (-0.5 * xi).exp()).collect();
/// let model = |x: f64, p: &[f64]| p[0] * (-p[1] * x).exp();
///
/// let r = curve_fit(model, &x, &y, &[1.0, 1.0], &FitOptions::default()).unwrap();
/// assert!((r.params[0] - 2.0).abs() < 1e-6);
/// assert!((r.params[1] - 0.5).abs() < 1e-6);
/// ```
pub fn curve_fit<F>(
    model: F,
    x: &[f64],
    y: &[f64],
    p0: &[f64],
    options: &FitOptions,
) -> Result<CurveFitResult>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n = x.len();
    let k = p0.len();

    if n != y.len() {
        return Err(DiffusionError::length_mismatch("x", n, "y", y.len()));
    }
    if k == 0 {
        return Err(DiffusionError::InvalidParameter {
            name: "p0".to_string(),
            reason: "at least one parameter is required".to_string(),
        });
    }
    if n < k {
        return Err(DiffusionError::InsufficientData {
            required: k,
            actual: n,
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(DiffusionError::InvalidData(
            "x and y must contain only finite values".to_string(),
        ));
    }
    if p0.iter().any(|v| !v.is_finite()) {
        return Err(DiffusionError::InvalidParameter {
            name: "p0".to_string(),
            reason: "initial parameters must be finite".to_string(),
        });
    }

    let residuals_at = |theta: &[f64]| -> Vec<f64> {
        x.iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| yi - model(xi, theta))
            .collect()
    };

    let mut theta = p0.to_vec();
    let mut residuals = residuals_at(&theta);
    let mut evaluations = 1usize;
    let mut cost = sum_of_squares(&residuals);
    if !cost.is_finite() {
        return Err(DiffusionError::NumericalError(
            "model is not finite at the initial parameters".to_string(),
        ));
    }

    // Residuals this small are exact up to rounding.
    let y_scale = sum_of_squares(y).max(f64::MIN_POSITIVE);
    let exact_cost = f64::EPSILON * y_scale;

    let mut lambda = options.initial_lambda;
    let mut iterations = 0usize;
    let mut converged = false;
    let mut normal = NormalEquations::assemble(&model, x, &theta, &residuals, options.diff_step);
    evaluations += 2 * k;

    while iterations < options.max_iter {
        iterations += 1;

        if cost <= exact_cost || normal.gradient_cosine(cost) <= options.g_tol {
            converged = true;
            break;
        }

        let step = normal.damped_step(lambda);
        let Some(step) = step else {
            lambda *= options.lambda_factor;
            if lambda > options.max_lambda {
                break;
            }
            continue;
        };

        let small_step = step
            .iter()
            .zip(theta.iter())
            .all(|(d, t)| d.abs() <= options.x_tol * (t.abs() + options.x_tol));

        let candidate: Vec<f64> = theta.iter().zip(step.iter()).map(|(t, d)| t + d).collect();
        let candidate_residuals = residuals_at(&candidate);
        evaluations += 1;
        let candidate_cost = sum_of_squares(&candidate_residuals);

        debug!(iteration = iterations, cost, candidate_cost, lambda, "levenberg-marquardt step");

        if candidate_cost.is_finite() && candidate_cost < cost {
            let reduction = (cost - candidate_cost) / cost;
            theta = candidate;
            residuals = candidate_residuals;
            cost = candidate_cost;
            lambda = (lambda / options.lambda_factor).max(f64::MIN_POSITIVE);

            if reduction <= options.f_tol || small_step {
                converged = true;
                break;
            }
            normal = NormalEquations::assemble(&model, x, &theta, &residuals, options.diff_step);
            evaluations += 2 * k;
        } else {
            if small_step {
                // No smaller step can improve on the current point.
                converged = true;
                break;
            }
            lambda *= options.lambda_factor;
            if lambda > options.max_lambda {
                break;
            }
        }
    }

    if !converged {
        warn!(iterations, cost, lambda, "levenberg-marquardt did not converge");
        return Err(DiffusionError::ConvergenceFailure { iterations });
    }
    debug!(iterations, cost, evaluations, "levenberg-marquardt converged");

    let normal = NormalEquations::assemble(&model, x, &theta, &residuals, options.diff_step);
    let covariance = normal.covariance(cost, n);

    Ok(CurveFitResult {
        params: theta,
        covariance,
        residuals,
        cost,
        iterations,
        evaluations,
    })
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// JᵀJ and Jᵀr at one parameter point.
struct NormalEquations {
    /// JᵀJ, row-major k × k.
    jtj: Vec<f64>,
    /// Jᵀr.
    jtr: Vec<f64>,
    k: usize,
}

impl NormalEquations {
    fn assemble<F>(model: &F, x: &[f64], theta: &[f64], residuals: &[f64], diff_step: f64) -> Self
    where
        F: Fn(f64, &[f64]) -> f64,
    {
        let k = theta.len();
        let n = x.len();

        // Column-major Jacobian of the model (∂g/∂θⱼ), central differences.
        let mut jac = vec![0.0; n * k];
        let mut shifted = theta.to_vec();
        for j in 0..k {
            let h = diff_step * theta[j].abs().max(1.0);
            shifted[j] = theta[j] + h;
            let upper: Vec<f64> = x.iter().map(|&xi| model(xi, &shifted)).collect();
            shifted[j] = theta[j] - h;
            let lower: Vec<f64> = x.iter().map(|&xi| model(xi, &shifted)).collect();
            shifted[j] = theta[j];
            for i in 0..n {
                jac[j * n + i] = (upper[i] - lower[i]) / (2.0 * h);
            }
        }

        let mut jtj = vec![0.0; k * k];
        let mut jtr = vec![0.0; k];
        for a in 0..k {
            let col_a = &jac[a * n..(a + 1) * n];
            jtr[a] = col_a.iter().zip(residuals).map(|(j, r)| j * r).sum();
            for b in a..k {
                let col_b = &jac[b * n..(b + 1) * n];
                let v: f64 = col_a.iter().zip(col_b).map(|(u, w)| u * w).sum();
                jtj[a * k + b] = v;
                jtj[b * k + a] = v;
            }
        }

        Self { jtj, jtr, k }
    }

    /// Largest |cos| between the residual vector and a Jacobian column.
    fn gradient_cosine(&self, cost: f64) -> f64 {
        let r_norm = cost.sqrt();
        if r_norm == 0.0 {
            return 0.0;
        }
        (0..self.k)
            .map(|j| {
                let col_norm = self.jtj[j * self.k + j].sqrt();
                if col_norm > 0.0 {
                    (self.jtr[j] / (col_norm * r_norm)).abs()
                } else {
                    0.0
                }
            })
            .fold(0.0, f64::max)
    }

    /// Solves (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr. `None` when the system is not
    /// positive definite or the solution is not finite.
    fn damped_step(&self, lambda: f64) -> Option<Vec<f64>> {
        let k = self.k;
        let mut damped = self.jtj.clone();
        for j in 0..k {
            let d = self.jtj[j * k + j].max(1e-300);
            damped[j * k + j] += lambda * d;
        }
        let mat = Matrix::new(k, k, damped).ok()?;
        let step = mat.cholesky_solve(&self.jtr).ok()?;
        step.iter().all(|v| v.is_finite()).then_some(step)
    }

    /// `(JᵀJ)⁻¹ · cost/(n - k)`, or all `+∞` when undefined.
    fn covariance(&self, cost: f64, n: usize) -> Vec<Vec<f64>> {
        let k = self.k;
        let undefined = vec![vec![f64::INFINITY; k]; k];
        if n <= k {
            warn!(n, k, "covariance undefined: no residual degrees of freedom");
            return undefined;
        }
        let s2 = cost / (n - k) as f64;

        let inverse = Matrix::new(k, k, self.jtj.clone())
            .ok()
            .and_then(|m| m.inverse().ok());
        let Some(inverse) = inverse else {
            warn!("covariance undefined: singular JᵀJ at the optimum");
            return undefined;
        };

        let cov: Vec<Vec<f64>> = (0..k)
            .map(|a| (0..k).map(|b| inverse.get(a, b) * s2).collect())
            .collect();
        if cov.iter().flatten().all(|v| v.is_finite()) {
            cov
        } else {
            warn!("covariance undefined: non-finite inverse");
            undefined
        }
    }
}
