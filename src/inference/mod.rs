//! inference — uncertainty of fitted parameters.
//!
//! Purpose
//! -------
//! Post-estimation covariance for any fitted model, expressed over the
//! model's packed parameter vector.
//!
//! Key behaviors
//! -------------
//! - [`hessian`]: observed information from finite differences of the
//!   score, and its eigen-based inverse.
//! - [`bootstrap`]: covariance of the estimator across row-resampled
//!   replicates, fitted in parallel.
//!
//! Conventions
//! -----------
//! - Failures are `ModelError`s; a singular information matrix is
//!   `ModelError::SingularHessian`.

pub mod bootstrap;
pub mod hessian;

pub use self::bootstrap::bootstrap_covariance;
pub use self::hessian::{
    covariance_from_information, model_covariance, observed_information, standard_errors,
};

pub mod prelude {
    pub use super::bootstrap::bootstrap_covariance;
    pub use super::hessian::{covariance_from_information, model_covariance, standard_errors};
}
