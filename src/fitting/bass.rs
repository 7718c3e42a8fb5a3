//! Estimation of (p, q, m) from observed sales.

use tracing::debug;

use super::levenberg::{curve_fit, FitOptions};
use crate::bass::{Mode, ModelParameters};
use crate::error::{DiffusionError, Result};

/// Innovation coefficient used when no initial guess is given.
///
/// Cross-study mean reported by Sultan, Farley & Lehmann (1990).
pub const DEFAULT_P: f64 = 0.03;

/// Imitation coefficient used when no initial guess is given.
pub const DEFAULT_Q: f64 = 0.38;

/// Multiple of the observed total used as the starting market potential.
const MARKET_HEADROOM: f64 = 1.5;

/// Result of fitting the Bass model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitResult {
    /// Optimal parameters.
    pub params: ModelParameters,
    /// Covariance of (p, q, m), in that order.
    ///
    /// `None` when there are only three observations or the Jacobian is
    /// rank deficient at the optimum.
    pub covariance: Option<[[f64; 3]; 3]>,
    /// Curve the parameters were fitted against.
    pub mode: Mode,
    /// Sum of squared residuals at the optimum.
    pub residual_sum_of_squares: f64,
    /// Levenberg-Marquardt iterations used.
    pub iterations: usize,
}

impl FitResult {
    /// Standard errors of (p, q, m): √diag(covariance).
    ///
    /// `None` when the covariance is undefined.
    pub fn std_errors(&self) -> Option<[f64; 3]> {
        self.covariance
            .map(|cov| [cov[0][0].sqrt(), cov[1][1].sqrt(), cov[2][2].sqrt()])
    }

    /// Evaluates the fitted curve over a time axis.
    pub fn predict(&self, time_series: &[f64]) -> Vec<f64> {
        self.params.predict(time_series, self.mode)
    }
}

/// Fits the Bass model to observed sales by non-linear least squares.
///
/// `x` holds the time of each observation and `y` the sales at that time,
/// per period for [`Mode::Instantaneous`] or running totals for
/// [`Mode::Cumulative`]. No bounds are placed on p, q or m.
///
/// When `initial_guess` is `None` the search starts from p = 0.03,
/// q = 0.38 and m = 1.5 × the observed total.
///
/// # Errors
///
/// - [`DiffusionError::LengthMismatch`] if `x` and `y` differ in length
/// - [`DiffusionError::InsufficientData`] with fewer than 3 observations
/// - [`DiffusionError::InvalidData`] for non-finite observations
/// - [`DiffusionError::NumericalError`] if the curve is not finite at the start
/// - [`DiffusionError::ConvergenceFailure`] if the optimizer fails
///
/// # Examples
///
/// ```
/// use u_diffusion::bass::{cumulative, Mode};
/// use u_diffusion::fitting::fit;
///
/// let t: Vec<f64> = (0..=20).map(|i| i as f64).collect();
/// let sales: Vec<f64> = t.iter().map(|&ti| cumulative(ti, 0.03, 0.4, 1000.0)).collect();
///
/// let result = fit(&t, &sales, Mode::Cumulative, None).unwrap();
/// assert!((result.params.p - 0.03).abs() < 0.03 * 0.05);
/// assert!((result.params.q - 0.4).abs() < 0.4 * 0.05);
/// assert!((result.params.m - 1000.0).abs() < 1000.0 * 0.05);
/// ```
pub fn fit(
    x: &[f64],
    y: &[f64],
    mode: Mode,
    initial_guess: Option<ModelParameters>,
) -> Result<FitResult> {
    fit_with_options(x, y, mode, initial_guess, &FitOptions::default())
}

/// [`fit`] with explicit solver settings.
pub fn fit_with_options(
    x: &[f64],
    y: &[f64],
    mode: Mode,
    initial_guess: Option<ModelParameters>,
    options: &FitOptions,
) -> Result<FitResult> {
    if x.len() != y.len() {
        return Err(DiffusionError::length_mismatch("x", x.len(), "y", y.len()));
    }
    if x.len() < 3 {
        return Err(DiffusionError::InsufficientData {
            required: 3,
            actual: x.len(),
        });
    }

    let start = initial_guess.unwrap_or_else(|| default_guess(y, mode));
    debug!(?mode, p = start.p, q = start.q, m = start.m, "fitting bass model");

    let model = |t: f64, theta: &[f64]| mode.evaluate(t, theta[0], theta[1], theta[2]);
    let result = curve_fit(model, x, y, &start.to_array(), options)?;

    let covariance = if result.covariance.iter().flatten().all(|v| v.is_finite()) {
        let mut cov = [[0.0; 3]; 3];
        for (row, values) in cov.iter_mut().zip(result.covariance.iter()) {
            row.copy_from_slice(values);
        }
        Some(cov)
    } else {
        None
    };

    Ok(FitResult {
        params: ModelParameters::try_from(result.params.as_slice())?,
        covariance,
        mode,
        residual_sum_of_squares: result.cost,
        iterations: result.iterations,
    })
}

/// Starting point from literature means and the observed adoption total.
fn default_guess(y: &[f64], mode: Mode) -> ModelParameters {
    let total = if mode.is_cumulative() {
        y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    } else {
        y.iter().sum::<f64>()
    };
    let m = if total.is_finite() && total > 0.0 {
        MARKET_HEADROOM * total
    } else {
        1.0
    };
    ModelParameters::new(DEFAULT_P, DEFAULT_Q, m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bass::{cumulative, instantaneous};

    fn time_axis(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    fn within(actual: f64, expected: f64, rel: f64) -> bool {
        (actual - expected).abs() <= expected.abs() * rel
    }

    #[test]
    fn recovers_parameters_from_cumulative_data() {
        let t = time_axis(21);
        let y: Vec<f64> = t.iter().map(|&ti| cumulative(ti, 0.03, 0.4, 1000.0)).collect();
        let r = fit(&t, &y, Mode::Cumulative, None).expect("should converge");
        assert!(within(r.params.p, 0.03, 0.05), "p = {}", r.params.p);
        assert!(within(r.params.q, 0.4, 0.05), "q = {}", r.params.q);
        assert!(within(r.params.m, 1000.0, 0.05), "m = {}", r.params.m);
        assert_eq!(r.mode, Mode::Cumulative);
        assert!(r.residual_sum_of_squares < 1e-6);
    }

    #[test]
    fn recovers_parameters_from_period_sales() {
        let t = time_axis(21);
        let y: Vec<f64> = t
            .iter()
            .map(|&ti| instantaneous(ti, 0.03, 0.4, 1000.0))
            .collect();
        let r = fit(&t, &y, Mode::Instantaneous, None).expect("should converge");
        assert!(within(r.params.p, 0.03, 0.05), "p = {}", r.params.p);
        assert!(within(r.params.q, 0.4, 0.05), "q = {}", r.params.q);
        assert!(within(r.params.m, 1000.0, 0.05), "m = {}", r.params.m);
    }

    #[test]
    fn explicit_initial_guess() {
        let t = time_axis(21);
        let y: Vec<f64> = t.iter().map(|&ti| cumulative(ti, 0.01, 0.5, 250.0)).collect();
        let guess = ModelParameters::new(0.02, 0.3, 300.0);
        let r = fit(&t, &y, Mode::Cumulative, Some(guess)).expect("should converge");
        assert!(within(r.params.p, 0.01, 0.05), "p = {}", r.params.p);
        assert!(within(r.params.q, 0.5, 0.05), "q = {}", r.params.q);
        assert!(within(r.params.m, 250.0, 0.05), "m = {}", r.params.m);
    }

    #[test]
    fn noisy_data_has_finite_uncertainty() {
        let t = time_axis(25);
        // Deterministic ±2% perturbation.
        let y: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &ti)| {
                let wobble = if i % 2 == 0 { 1.02 } else { 0.98 };
                instantaneous(ti, 0.03, 0.4, 1000.0) * wobble
            })
            .collect();
        let r = fit(&t, &y, Mode::Instantaneous, None).expect("should converge");
        assert!(within(r.params.p, 0.03, 0.15), "p = {}", r.params.p);
        assert!(within(r.params.q, 0.4, 0.15), "q = {}", r.params.q);
        assert!(within(r.params.m, 1000.0, 0.15), "m = {}", r.params.m);

        let se = r.std_errors().expect("covariance defined");
        assert!(se.iter().all(|s| s.is_finite() && *s > 0.0), "se = {se:?}");
        let cov = r.covariance.expect("covariance defined");
        for a in 0..3 {
            for b in 0..3 {
                let (ab, ba) = (cov[a][b], cov[b][a]);
                assert!((ab - ba).abs() < 1e-6 * (1.0 + ab.abs()), "cov[{a}][{b}]");
            }
        }
        assert!(r.residual_sum_of_squares > 0.0);
    }

    #[test]
    fn fitted_curve_predicts_observations() {
        let t = time_axis(21);
        let y: Vec<f64> = t.iter().map(|&ti| cumulative(ti, 0.03, 0.4, 1000.0)).collect();
        let r = fit(&t, &y, Mode::Cumulative, None).expect("should converge");
        let pred = r.predict(&t);
        assert_eq!(pred.len(), y.len());
        for (a, b) in pred.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn three_points_leave_covariance_undefined() {
        let t = [1.0, 5.0, 10.0];
        let y: Vec<f64> = t.iter().map(|&ti| cumulative(ti, 0.03, 0.4, 1000.0)).collect();
        let guess = ModelParameters::new(0.03, 0.4, 1000.0);
        let r = fit(&t, &y, Mode::Cumulative, Some(guess)).expect("exact start");
        assert!(r.covariance.is_none());
        assert!(r.std_errors().is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            fit(&[1.0, 2.0, 3.0], &[1.0, 2.0], Mode::Instantaneous, None),
            Err(DiffusionError::LengthMismatch { .. })
        ));
        assert!(matches!(
            fit(&[1.0, 2.0], &[1.0, 2.0], Mode::Instantaneous, None),
            Err(DiffusionError::InsufficientData { required: 3, actual: 2 })
        ));
        assert!(matches!(
            fit(&[1.0, 2.0, 3.0], &[1.0, f64::INFINITY, 3.0], Mode::Cumulative, None),
            Err(DiffusionError::InvalidData(_))
        ));
    }

    #[test]
    fn zero_innovation_start_is_numerical_error() {
        let t = time_axis(10);
        let y: Vec<f64> = t.iter().map(|&ti| instantaneous(ti, 0.03, 0.4, 1000.0)).collect();
        let guess = ModelParameters::new(0.0, 0.4, 1000.0);
        assert!(matches!(
            fit(&t, &y, Mode::Instantaneous, Some(guess)),
            Err(DiffusionError::NumericalError(_))
        ));
    }

    #[test]
    fn default_guess_scales_with_observed_total() {
        let cum = default_guess(&[10.0, 40.0, 80.0], Mode::Cumulative);
        assert_eq!(cum, ModelParameters::new(DEFAULT_P, DEFAULT_Q, 120.0));
        let inst = default_guess(&[10.0, 30.0, 40.0], Mode::Instantaneous);
        assert_eq!(inst, ModelParameters::new(DEFAULT_P, DEFAULT_Q, 120.0));
        let empty = default_guess(&[0.0, 0.0], Mode::Instantaneous);
        assert_eq!(empty.m, 1.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip_with_defined_covariance() {
        let t = time_axis(25);
        let y: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &ti)| {
                let wobble = if i % 2 == 0 { 1.02 } else { 0.98 };
                instantaneous(ti, 0.03, 0.4, 1000.0) * wobble
            })
            .collect();
        let r = fit(&t, &y, Mode::Instantaneous, None).expect("should converge");
        assert!(r.covariance.is_some());

        let json = serde_json::to_string(&r).expect("serialize");
        let back: FitResult = serde_json::from_str(&json).expect("deserialize");
        assert_params_close(&back.params, &r.params);
        let (got, want) = (back.covariance.expect("kept"), r.covariance.expect("defined"));
        for (g, w) in got.iter().flatten().zip(want.iter().flatten()) {
            assert!(within(*g, *w, 1e-12), "{g} vs {w}");
        }
        assert_eq!(back.mode, r.mode);
        assert_eq!(back.iterations, r.iterations);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip_with_undefined_covariance() {
        let t = [1.0, 5.0, 10.0];
        let y: Vec<f64> = t.iter().map(|&ti| cumulative(ti, 0.03, 0.4, 1000.0)).collect();
        let guess = ModelParameters::new(0.03, 0.4, 1000.0);
        let r = fit(&t, &y, Mode::Cumulative, Some(guess)).expect("exact start");

        let json = serde_json::to_string(&r).expect("serialize");
        assert!(json.contains("\"covariance\":null"), "{json}");
        let back: FitResult = serde_json::from_str(&json).expect("deserialize");
        assert!(back.covariance.is_none());
        assert!(back.std_errors().is_none());
        assert_params_close(&back.params, &r.params);
        assert_eq!(back.mode, Mode::Cumulative);
    }

    #[cfg(feature = "serde")]
    fn assert_params_close(a: &ModelParameters, b: &ModelParameters) {
        for (x, y) in a.to_array().iter().zip(b.to_array().iter()) {
            assert!(within(*x, *y, 1e-12), "{x} vs {y}");
        }
    }
}
