//! Closed-form Bass adoption curves.
//!
//! # Algorithm
//!
//! With `E(t) = e^{-(p+q)t}`:
//!
//! ```text
//! f(t) = m · ((p+q)²/p) · E(t) / (1 + (q/p)·E(t))²     (adoptions per period)
//! F(t) = m · (1 - E(t)) / (1 + (q/p)·E(t))              (cumulative adoptions)
//! ```
//!
//! `f` is the derivative of `F`. Neither function validates its inputs:
//! `p = 0` divides by zero and the result is NaN or infinite.
//!
//! # Reference
//!
//! Bass, F.M. (1969). "A New Product Growth for Model Consumer Durables",
//! *Management Science* 15(5), pp. 215-227.

/// Which Bass curve a fit or prediction works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Adoptions within each period, f(t).
    #[default]
    Instantaneous,
    /// Adoptions accumulated up to t, F(t).
    Cumulative,
}

impl Mode {
    /// Maps a "data is cumulative" flag onto a mode.
    ///
    /// ```
    /// use u_diffusion::bass::Mode;
    ///
    /// assert_eq!(Mode::from_cumulative(true), Mode::Cumulative);
    /// assert_eq!(Mode::from_cumulative(false), Mode::Instantaneous);
    /// ```
    pub fn from_cumulative(cumulative: bool) -> Self {
        if cumulative {
            Mode::Cumulative
        } else {
            Mode::Instantaneous
        }
    }

    /// Returns `true` for [`Mode::Cumulative`].
    pub fn is_cumulative(self) -> bool {
        matches!(self, Mode::Cumulative)
    }

    /// Evaluates the selected curve at `t`.
    pub fn evaluate(self, t: f64, p: f64, q: f64, m: f64) -> f64 {
        match self {
            Mode::Instantaneous => instantaneous(t, p, q, m),
            Mode::Cumulative => cumulative(t, p, q, m),
        }
    }
}

/// Adoptions per period at time `t`.
///
/// # Examples
///
/// ```
/// use u_diffusion::bass::instantaneous;
///
/// // At t = 0 only innovators adopt: f(0) = m·p.
/// let f0 = instantaneous(0.0, 0.03, 0.38, 1000.0);
/// assert!((f0 - 30.0).abs() < 1e-9);
/// ```
pub fn instantaneous(t: f64, p: f64, q: f64, m: f64) -> f64 {
    let decay = (-(p + q) * t).exp();
    let denom = 1.0 + (q / p) * decay;
    m * ((p + q).powi(2) / p) * decay / (denom * denom)
}

/// Cumulative adoptions up to time `t`.
///
/// # Examples
///
/// ```
/// use u_diffusion::bass::cumulative;
///
/// assert_eq!(cumulative(0.0, 0.03, 0.38, 1000.0), 0.0);
/// assert!((cumulative(500.0, 0.03, 0.38, 1000.0) - 1000.0).abs() < 1e-9);
/// ```
pub fn cumulative(t: f64, p: f64, q: f64, m: f64) -> f64 {
    let decay = (-(p + q) * t).exp();
    m * (1.0 - decay) / (1.0 + (q / p) * decay)
}

/// Evaluates the selected curve at every point of `time_series`.
///
/// The output has the same length as the input; an empty series gives an
/// empty result.
///
/// # Examples
///
/// ```
/// use u_diffusion::bass::{cumulative, predict, Mode};
///
/// let t = [0.0, 1.0, 2.0, 3.0];
/// let pred = predict(&t, 0.03, 0.38, 1000.0, Mode::Cumulative);
/// assert_eq!(pred.len(), 4);
/// assert_eq!(pred[2], cumulative(2.0, 0.03, 0.38, 1000.0));
/// ```
pub fn predict(time_series: &[f64], p: f64, q: f64, m: f64, mode: Mode) -> Vec<f64> {
    time_series
        .iter()
        .map(|&t| mode.evaluate(t, p, q, m))
        .collect()
}
