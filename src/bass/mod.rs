//! Bass diffusion curves.
//!
//! Closed-form evaluation of the adoption rate f(t) and cumulative
//! adoptions F(t), vectorized prediction over a time axis, and the classical
//! quantities derived from a parameter triple.
//!
//! # Parameters
//!
//! - `p` — coefficient of innovation (external influence)
//! - `q` — coefficient of imitation (word of mouth)
//! - `m` — market potential, the eventual number of adopters
//!
//! # References
//!
//! - Bass, F.M. (1969). "A New Product Growth for Model Consumer Durables",
//!   *Management Science* 15(5), pp. 215-227.
//! - Mahajan, V., Muller, E. & Bass, F.M. (1990). "New Product Diffusion
//!   Models in Marketing", *Journal of Marketing* 54(1), pp. 1-26.

mod formula;
mod params;

pub use formula::{cumulative, instantaneous, predict, Mode};
pub use params::ModelParameters;
