//! loglik_optimizer — argmin-powered log-likelihood maximization.
//!
//! Purpose
//! -------
//! Maximize any log-likelihood `ℓ(θ)` over a flat parameter vector. The
//! model layer implements [`LogLikelihood`] for a model/data pair and calls
//! [`maximize`]; everything argmin-specific stays inside this module.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ` into the cost `c(θ) = -ℓ(θ)`, with
//!   finite-difference gradients when no analytic gradient exists.
//! - [`maximize`] validates the start, builds the solver selected by
//!   [`OptimMethod`] (L-BFGS with More–Thuente or Hager–Zhang, or
//!   Nelder–Mead), runs it, and normalizes the result into an
//!   [`OptimOutcome`].
//! - [`finite_diff`] supplies symmetric/forward gradients and Hessians;
//!   [`validation`] centralizes the finiteness and option checks.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer always maximizes `ℓ` by minimizing `-ℓ`; implementors
//!   return `ℓ` and `∇ℓ`, never the cost.
//! - `value`/`grad` report invalid inputs as `OptError`, never panics.
//! - Options are validated on construction.
//!
//! Conventions
//! -----------
//! - Parameters are unconstrained from the optimizer's point of view;
//!   feasibility is the model layer's business (projection plus penalty).
//! - [`OptimOutcome::value`] is a log-likelihood, not a cost.
//!
//! Testing notes
//! -------------
//! - Submodule tests cover sign conventions, solver wiring, finite
//!   differences, and a full run of every method on a toy surface.
//! - Model-level fits are exercised in `mle` and `tests/`.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{
    LineSearcher, LogLikelihood, MLEOptions, OptimMethod, OptimOutcome, Tolerances,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{
        LineSearcher, LogLikelihood, MLEOptions, OptimMethod, OptimOutcome, Tolerances,
    };
    pub use super::types::{Cost, Grad, Theta};
}
