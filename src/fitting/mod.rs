//! Non-linear least-squares fitting.
//!
//! # Functions
//!
//! - [`fit`] — estimate Bass (p, q, m) from observed sales, with covariance
//! - [`curve_fit`] — the underlying Levenberg-Marquardt solver for any
//!   scalar model `g(x; θ)`
//!
//! # References
//!
//! - Srinivasan, V. & Mason, C.H. (1986). "Nonlinear Least Squares Estimation
//!   of New Product Diffusion Models", *Marketing Science* 5(2), pp. 169-178.
//! - Sultan, F., Farley, J.U. & Lehmann, D.R. (1990). "A Meta-Analysis of
//!   Applications of Diffusion Models", *J. Marketing Research* 27(1), pp. 70-77.

mod bass;
mod levenberg;

pub use bass::{fit, fit_with_options, FitResult, DEFAULT_P, DEFAULT_Q};
pub use levenberg::{curve_fit, CurveFitResult, FitOptions};
