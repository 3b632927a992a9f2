//! numerical_stability — guarded scalar arithmetic and shared margins.
//!
//! Purpose
//! -------
//! Keep the handful of numerically delicate operations and tolerances used
//! across the crate in one place, so distributions, combinators, and
//! inference agree on them.
//!
//! Key behaviors
//! -------------
//! - [`log_sum_exp`]: `ln Σ exp(xᵢ)` without overflow, used for mixture
//!   densities.
//! - [`POSITIVITY_MARGIN`]: smallest value a strictly positive parameter is
//!   projected to by distribution constraints.
//! - [`EIGEN_EPS`]: eigenvalue floor below which an information matrix is
//!   treated as singular.
//!
//! Conventions
//! -----------
//! - Pure functions over `f64`; no logging, no allocation beyond the input.

pub mod transformations;

pub use self::transformations::{EIGEN_EPS, POSITIVITY_MARGIN, log_sum_exp};

pub mod prelude {
    pub use super::transformations::{EIGEN_EPS, POSITIVITY_MARGIN, log_sum_exp};
}
