//! The (p, q, m) parameter triple and the quantities derived from it.

use super::formula::{self, Mode};
use crate::error::DiffusionError;

/// Bass model parameters.
///
/// No invariant is enforced: a fit may legitimately return values outside
/// the usual p, q ∈ (0, 1), m > 0 region, and `p = 0` makes both curves
/// non-finite.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelParameters {
    /// Coefficient of innovation.
    pub p: f64,
    /// Coefficient of imitation.
    pub q: f64,
    /// Market potential.
    pub m: f64,
}

impl ModelParameters {
    /// Creates a parameter triple.
    pub fn new(p: f64, q: f64, m: f64) -> Self {
        Self { p, q, m }
    }

    /// Returns `[p, q, m]`.
    pub fn to_array(&self) -> [f64; 3] {
        [self.p, self.q, self.m]
    }

    /// Returns `true` when all three values are finite.
    pub fn is_finite(&self) -> bool {
        self.p.is_finite() && self.q.is_finite() && self.m.is_finite()
    }

    /// f(t) for these parameters.
    pub fn instantaneous(&self, t: f64) -> f64 {
        formula::instantaneous(t, self.p, self.q, self.m)
    }

    /// F(t) for these parameters.
    pub fn cumulative(&self, t: f64) -> f64 {
        formula::cumulative(t, self.p, self.q, self.m)
    }

    /// Evaluates the curve selected by `mode` at `t`.
    pub fn evaluate(&self, t: f64, mode: Mode) -> f64 {
        mode.evaluate(t, self.p, self.q, self.m)
    }

    /// Evaluates the curve selected by `mode` over a time axis.
    pub fn predict(&self, time_series: &[f64], mode: Mode) -> Vec<f64> {
        formula::predict(time_series, self.p, self.q, self.m, mode)
    }

    /// Time of peak adoption, t* = ln(q/p) / (p + q).
    ///
    /// Returns `None` when q ≤ p (adoption is highest at t = 0) or the
    /// result is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_diffusion::bass::ModelParameters;
    ///
    /// let params = ModelParameters::new(0.03, 0.38, 1000.0);
    /// let t_star = params.peak_time().unwrap();
    /// assert!((t_star - 6.1926).abs() < 1e-3);
    /// assert!(ModelParameters::new(0.5, 0.2, 100.0).peak_time().is_none());
    /// ```
    pub fn peak_time(&self) -> Option<f64> {
        if !(self.q > self.p && self.p > 0.0) {
            return None;
        }
        let t = (self.q / self.p).ln() / (self.p + self.q);
        t.is_finite().then_some(t)
    }

    /// Adoption rate at the peak, f(t*) = m (p + q)² / (4q).
    pub fn peak_adoption(&self) -> Option<f64> {
        self.peak_time()?;
        Some(self.m * (self.p + self.q).powi(2) / (4.0 * self.q))
    }

    /// Cumulative adoptions at the peak, F(t*) = m (q - p) / (2q).
    pub fn cumulative_at_peak(&self) -> Option<f64> {
        self.peak_time()?;
        Some(self.m * (self.q - self.p) / (2.0 * self.q))
    }
}

impl From<[f64; 3]> for ModelParameters {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<ModelParameters> for [f64; 3] {
    fn from(params: ModelParameters) -> Self {
        params.to_array()
    }
}

impl TryFrom<&[f64]> for ModelParameters {
    type Error = DiffusionError;

    /// Converts a `[p, q, m]` slice; any other length is rejected.
    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        match values {
            &[p, q, m] => Ok(Self::new(p, q, m)),
            _ => Err(DiffusionError::InvalidParameter {
                name: "parameters".to_string(),
                reason: format!("expected 3 values (p, q, m), got {}", values.len()),
            }),
        }
    }
}
