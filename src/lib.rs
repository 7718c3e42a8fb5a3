//! # u-diffusion
//!
//! Bass diffusion model: closed-form adoption curves, non-linear
//! least-squares estimation of (p, q, m), and residual diagnostics.
//!
//! The crate is stateless: every function takes plain `f64` slices and
//! returns values, so callers are free to fit many series concurrently.
//!
//! ## Modules
//!
//! - [`bass`] — f(t), F(t), vectorized prediction, peak timing
//! - [`fitting`] — Levenberg-Marquardt fitting of (p, q, m) with covariance
//! - [`diagnostics`] — OLS regression of prediction error on time
//! - [`plot`] — actual vs. predicted chart (feature `plotting`)
//! - [`error`] — [`DiffusionError`] and the crate [`Result`] alias
//!
//! ## Example
//!
//! ```
//! use u_diffusion::bass::{instantaneous, Mode};
//! use u_diffusion::{diagnostics, fitting};
//!
//! let t: Vec<f64> = (0..20).map(|i| i as f64).collect();
//! let sales: Vec<f64> = t.iter().map(|&ti| instantaneous(ti, 0.02, 0.45, 5000.0)).collect();
//!
//! let fitted = fitting::fit(&t, &sales, Mode::Instantaneous, None).unwrap();
//! let predicted = fitted.predict(&t);
//! let report = diagnostics::summary(&sales, &predicted, &t).unwrap();
//! assert!(report.slope.abs() < 1e-3);
//! ```
//!
//! ## Design Philosophy
//!
//! - **No hidden validation**: the closed forms mirror the textbook
//!   formulas, so `p = 0` yields NaN/Inf rather than an error
//! - **Unconstrained fitting**: p, q and m are estimated without bounds
//! - **Research-backed**: formulas and defaults cite the diffusion literature

pub mod bass;
pub mod diagnostics;
pub mod error;
pub mod fitting;
#[cfg(feature = "plotting")]
pub mod plot;

pub use error::{DiffusionError, Result};
