//! optimization — log-likelihood optimizer, numerical helpers, error surface.
//!
//! Purpose
//! -------
//! Provide the generic machinery that `mle` builds on: an argmin-backed
//! maximizer of `ℓ(θ)`, a few numerically careful scalar helpers, and one
//! error enum for everything that can go wrong while optimizing.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: [`loglik_optimizer::maximize`] over any
//!   [`loglik_optimizer::LogLikelihood`], with L-BFGS or Nelder–Mead.
//! - `numerical_stability`: log-sum-exp and shared numeric margins.
//! - `errors`: [`errors::OptError`] / [`errors::OptResult`], including the
//!   conversion from argmin's error type.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ` by minimizing `-ℓ`; outcomes are reported in
//!   log-likelihood units.
//! - Model failures raised during an evaluation travel through the solver
//!   as `OptError::Model` and are unwrapped again by the model layer.
//!
//! Downstream usage
//! ----------------
//! - Prefer `optimization::prelude::*` for the main surface.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
