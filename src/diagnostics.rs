//! Residual diagnostics.
//!
//! Regresses the prediction error of a fitted diffusion curve on time. A
//! significant slope means the error drifts over the life cycle, which
//! points at a misspecified model rather than noise.
//!
//! # Examples
//!
//! ```
//! use u_diffusion::diagnostics::summary;
//!
//! let t = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let real = [10.0, 21.0, 29.0, 41.0, 50.0, 61.0];
//! let predicted = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
//! let s = summary(&real, &predicted, &t).unwrap();
//! assert_eq!(s.n, 6);
//! assert!(s.slope.abs() < 0.5);
//! println!("{s}");
//! ```

use std::fmt;

use u_numflow::special;
use u_numflow::stats;

use crate::error::{DiffusionError, Result};

/// OLS fit of `residual = intercept + slope · t`.
#[derive(Debug, Clone)]
pub struct ResidualSummary {
    /// Intercept (β₀).
    pub intercept: f64,
    /// Slope on time (β₁).
    pub slope: f64,
    /// Standard error of the intercept.
    pub intercept_se: f64,
    /// Standard error of the slope.
    pub slope_se: f64,
    /// t-statistic for intercept (H₀: β₀ = 0).
    pub intercept_t: f64,
    /// t-statistic for slope (H₀: β₁ = 0).
    pub slope_t: f64,
    /// Two-sided p-value for the intercept.
    pub intercept_p: f64,
    /// Two-sided p-value for the slope.
    pub slope_p: f64,
    /// Coefficient of determination. NaN when the residuals have no variance.
    pub r_squared: f64,
    /// Adjusted R² = 1 - (1-R²)(n-1)/(n-2). NaN when R² is.
    pub adjusted_r_squared: f64,
    /// F-statistic (= t² of the slope).
    pub f_statistic: f64,
    /// p-value for the F-statistic.
    pub f_p_value: f64,
    /// Residual standard error of the regression, √(SSE/(n-2)).
    pub residual_se: f64,
    /// Prediction residuals (real − predicted) that were regressed.
    pub residuals: Vec<f64>,
    /// Sample size.
    pub n: usize,
}

impl ResidualSummary {
    /// Returns `true` when the slope is significant at level `alpha`.
    pub fn has_trend(&self, alpha: f64) -> bool {
        self.slope_p < alpha
    }
}

/// Computes residuals `real − predicted` and regresses them on `time_axis`
/// (with intercept) by ordinary least squares.
///
/// When the residuals are constant (for example, a perfect prediction) the
/// slope is zero and R² is undefined (NaN).
///
/// # Errors
///
/// - [`DiffusionError::LengthMismatch`] if the three series are not aligned
/// - [`DiffusionError::InsufficientData`] with fewer than 3 observations
/// - [`DiffusionError::InvalidData`] for non-finite values or a constant time axis
///
/// # References
///
/// Draper & Smith (1998). "Applied Regression Analysis", 3rd edition.
pub fn summary(
    real_values: &[f64],
    predicted_values: &[f64],
    time_axis: &[f64],
) -> Result<ResidualSummary> {
    let n = real_values.len();
    if predicted_values.len() != n {
        return Err(DiffusionError::length_mismatch(
            "real_values",
            n,
            "predicted_values",
            predicted_values.len(),
        ));
    }
    if time_axis.len() != n {
        return Err(DiffusionError::length_mismatch(
            "real_values",
            n,
            "time_axis",
            time_axis.len(),
        ));
    }
    if n < 3 {
        return Err(DiffusionError::InsufficientData {
            required: 3,
            actual: n,
        });
    }
    if real_values
        .iter()
        .chain(predicted_values)
        .chain(time_axis)
        .any(|v| !v.is_finite())
    {
        return Err(DiffusionError::InvalidData(
            "summary inputs must be finite".to_string(),
        ));
    }

    let residuals: Vec<f64> = real_values
        .iter()
        .zip(predicted_values)
        .map(|(&r, &p)| r - p)
        .collect();

    let degenerate = || DiffusionError::NumericalError("summary statistics undefined".to_string());
    let t_mean = stats::mean(time_axis).ok_or_else(degenerate)?;
    let e_mean = stats::mean(&residuals).ok_or_else(degenerate)?;
    let t_var = stats::variance(time_axis).ok_or_else(degenerate)?;
    let cov = stats::covariance(time_axis, &residuals).ok_or_else(degenerate)?;

    if t_var < 1e-300 {
        return Err(DiffusionError::InvalidData(
            "time axis has zero variance".to_string(),
        ));
    }

    let slope = cov / t_var;
    let intercept = e_mean - slope * t_mean;

    let ss_res: f64 = time_axis
        .iter()
        .zip(&residuals)
        .map(|(&t, &e)| (e - intercept - slope * t).powi(2))
        .sum();
    let ss_tot: f64 = residuals.iter().map(|&e| (e - e_mean).powi(2)).sum();

    let nf = n as f64;
    let df_res = nf - 2.0;

    // Constant residuals leave nothing to explain.
    let r_squared = if ss_tot > 1e-300 {
        1.0 - ss_res / ss_tot
    } else {
        f64::NAN
    };
    let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (nf - 1.0) / df_res;

    let mse = ss_res / df_res;
    let residual_se = mse.sqrt();

    let ss_t: f64 = time_axis.iter().map(|&t| (t - t_mean).powi(2)).sum();
    let slope_se = (mse / ss_t).sqrt();
    let intercept_se = (mse * (1.0 / nf + t_mean * t_mean / ss_t)).sqrt();

    let slope_t = t_statistic(slope, slope_se);
    let intercept_t = t_statistic(intercept, intercept_se);
    let slope_p = two_sided_p(slope_t, df_res);
    let intercept_p = two_sided_p(intercept_t, df_res);

    let f_statistic = slope_t * slope_t;
    let f_p_value = if f_statistic.is_nan() {
        f64::NAN
    } else if f_statistic.is_infinite() {
        0.0
    } else {
        1.0 - special::f_distribution_cdf(f_statistic, 1.0, df_res)
    };

    Ok(ResidualSummary {
        intercept,
        slope,
        intercept_se,
        slope_se,
        intercept_t,
        slope_t,
        intercept_p,
        slope_p,
        r_squared,
        adjusted_r_squared,
        f_statistic,
        f_p_value,
        residual_se,
        residuals,
        n,
    })
}

/// coef / se, with 0/0 → NaN and x/0 → ±∞.
fn t_statistic(coef: f64, se: f64) -> f64 {
    if se > 1e-300 {
        coef / se
    } else if coef.abs() < 1e-300 {
        f64::NAN
    } else {
        f64::INFINITY.copysign(coef)
    }
}

fn two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        2.0 * (1.0 - special::t_distribution_cdf(t.abs(), df))
    }
}

impl fmt::Display for ResidualSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(66);
        let thin = "-".repeat(66);
        writeln!(f, "{:^66}", "OLS Regression Results: residual ~ const + time")?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<20}{:>12}    {:<18}{:>12.4}",
            "No. Observations:", self.n, "R-squared:", self.r_squared
        )?;
        writeln!(
            f,
            "{:<20}{:>12}    {:<18}{:>12.4}",
            "Df Residuals:",
            self.n.saturating_sub(2),
            "Adj. R-squared:",
            self.adjusted_r_squared
        )?;
        writeln!(
            f,
            "{:<20}{:>12.4}    {:<18}{:>12.4e}",
            "F-statistic:", self.f_statistic, "Prob (F-statistic):", self.f_p_value
        )?;
        writeln!(f, "{:<20}{:>12.4}", "Residual std err:", self.residual_se)?;
        writeln!(f, "{thin}")?;
        writeln!(
            f,
            "{:<10}{:>14}{:>14}{:>14}{:>14}",
            "", "coef", "std err", "t", "P>|t|"
        )?;
        writeln!(f, "{thin}")?;
        for (name, coef, se, t, p) in [
            (
                "const",
                self.intercept,
                self.intercept_se,
                self.intercept_t,
                self.intercept_p,
            ),
            ("time", self.slope, self.slope_se, self.slope_t, self.slope_p),
        ] {
            writeln!(f, "{name:<10}{coef:>14.4}{se:>14.4}{t:>14.3}{p:>14.3}")?;
        }
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_error_trend_is_recovered() {
        let t: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let predicted = vec![100.0; 10];
        // residual = 1 + 2t
        let real: Vec<f64> = t.iter().map(|&ti| 101.0 + 2.0 * ti).collect();
        let s = summary(&real, &predicted, &t).expect("should compute");
        assert!((s.slope - 2.0).abs() < 1e-10);
        assert!((s.intercept - 1.0).abs() < 1e-10);
        assert!((s.r_squared - 1.0).abs() < 1e-10);
        assert!(s.has_trend(0.05));
    }

    #[test]
    fn perfect_prediction_has_zero_slope_and_undefined_r_squared() {
        let t: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let values: Vec<f64> = t.iter().map(|&ti| ti * ti).collect();
        let s = summary(&values, &values, &t).expect("should compute");
        assert!(s.slope.abs() < 1e-12);
        assert!(s.intercept.abs() < 1e-12);
        assert!(s.r_squared.is_nan());
        assert!(s.adjusted_r_squared.is_nan());
        assert!(s.residuals.iter().all(|&e| e == 0.0));
        assert!(!s.has_trend(0.05));
    }

    #[test]
    fn noise_without_trend() {
        let t: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let predicted = vec![0.0; 20];
        let real: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let s = summary(&real, &predicted, &t).expect("should compute");
        assert!(s.slope.abs() < 0.1, "slope = {}", s.slope);
        assert!(s.r_squared < 0.1, "R² = {}", s.r_squared);
        assert!(!s.has_trend(0.05), "slope p = {}", s.slope_p);
    }

    #[test]
    fn residuals_are_real_minus_predicted() {
        let t = [1.0, 2.0, 3.0, 4.0];
        let real = [5.0, 6.0, 7.0, 9.0];
        let predicted = [4.0, 6.5, 7.0, 8.0];
        let s = summary(&real, &predicted, &t).expect("should compute");
        assert_eq!(s.residuals, vec![1.0, -0.5, 0.0, 1.0]);
        assert_eq!(s.n, 4);
    }

    #[test]
    fn f_equals_slope_t_squared() {
        let t = [1.0, 2.0, 3.0, 4.0, 5.0];
        let real = [2.1, 3.9, 6.1, 7.9, 10.1];
        let predicted = [0.0; 5];
        let s = summary(&real, &predicted, &t).expect("should compute");
        assert!((s.f_statistic - s.slope_t * s.slope_t).abs() < 1e-8);
        assert!(s.adjusted_r_squared <= s.r_squared);
    }

    #[test]
    fn edge_cases() {
        assert!(matches!(
            summary(&[1.0, 2.0, 3.0], &[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(DiffusionError::LengthMismatch { .. })
        ));
        assert!(matches!(
            summary(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(DiffusionError::LengthMismatch { .. })
        ));
        assert!(matches!(
            summary(&[1.0, 2.0], &[1.0, 2.0], &[1.0, 2.0]),
            Err(DiffusionError::InsufficientData { required: 3, actual: 2 })
        ));
        assert!(matches!(
            summary(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]),
            Err(DiffusionError::InvalidData(_))
        ));
        assert!(matches!(
            summary(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0], &[5.0, 5.0, 5.0]),
            Err(DiffusionError::InvalidData(_))
        ));
    }

    #[test]
    fn report_lists_both_coefficients() {
        let t: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let real: Vec<f64> = t.iter().map(|&ti| 3.0 + 0.5 * ti + (ti * 1.7).sin()).collect();
        let predicted = vec![3.0; 10];
        let s = summary(&real, &predicted, &t).expect("should compute");
        let report = s.to_string();
        assert!(report.contains("OLS Regression Results"));
        assert!(report.contains("const"));
        assert!(report.contains("time"));
        assert!(report.contains("R-squared:"));
        assert!(report.contains("No. Observations:"));
    }
}
