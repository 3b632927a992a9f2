//! rust_models — polymorphic statistical models with generic estimation.
//!
//! Purpose
//! -------
//! Describe probability models as data-plus-behavior descriptors so that
//! estimation, evaluation, sampling, and model composition work on any model
//! without knowing which concrete distribution it is.
//!
//! Key behaviors
//! -------------
//! - [`model`]: the [`Model`](model::Model) descriptor, its per-instance
//!   settings registry, the [`ModelMethods`](model::ModelMethods) slot trait,
//!   and the dispatch functions (`prep`, `estimate`, `log_likelihood`, `p`,
//!   `draw`, `cdf`, `constraint`, `score`) with their fallback chains.
//! - [`distributions`]: Normal, Exponential, Bernoulli, and Poisson built on
//!   the slot trait.
//! - [`transform`]: combinators producing new models from existing ones
//!   (`fix_params`, `coordinate_transform`, `cross`, `mixture`,
//!   `dconstrain`, `dcompose`).
//! - [`mle`]: the generic maximum-likelihood fallback over argmin solvers,
//!   with restarts and optional covariance.
//! - [`mcmc`]: a random-walk Metropolis chain as a lazy iterator.
//! - [`inference`]: Hessian-based covariance and a parallel bootstrap.
//! - [`optimization`]: the argmin adapter, tolerances, and numerical
//!   stability helpers the estimators share.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every model operation takes an optional [`Dataset`](data::Dataset) and a
//!   model; none assumes a concrete model type.
//! - Estimation returns a fitted copy; the caller's model is never mutated.
//! - Combinators hold their bases behind `Arc` and evaluate on private
//!   copies carrying the wrapper's parameters.
//!
//! Conventions
//! -----------
//! - Parameters are exchanged with solvers as one flat vector
//!   (`Parameters::pack`/`unpack`), vector part first then the matrix in
//!   row-major order.
//! - Log-likelihoods are natural-log; infeasible points evaluate to `-∞`
//!   rather than erroring.
//! - Errors surface as [`ModelError`](model::ModelError); solver
//!   non-convergence is recorded on the fitted model's `info` instead.
//!
//! Downstream usage
//! ----------------
//! - `use rust_models::prelude::*;` brings the descriptor, dispatch
//!   functions, distributions, and combinators into scope.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each module; `tests/` exercises the
//!   build-compose-estimate-sample pipeline end to end.

pub mod data;
pub mod distributions;
pub mod inference;
pub mod mcmc;
pub mod mle;
pub mod model;
pub mod optimization;
pub mod transform;

pub mod prelude {
    pub use crate::data::{Dataset, Dim, ParamShape, Parameters};
    pub use crate::distributions::{
        bernoulli, bernoulli_with, exponential, exponential_with, normal, normal_with, poisson,
        poisson_with,
    };
    pub use crate::inference::prelude::*;
    pub use crate::mcmc::{McmcDraw, McmcSettings, MetropolisChain, metropolis_draw};
    pub use crate::mle::{MleSettings, estimate_restart, maximum_likelihood};
    pub use crate::model::prelude::*;
    pub use crate::transform::prelude::*;
}
