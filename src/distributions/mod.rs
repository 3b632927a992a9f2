//! distributions — primitive models built on the method-table abstraction.
//!
//! Purpose
//! -------
//! Provide a small set of concrete models (Normal, Exponential, Bernoulli,
//! Poisson) that exercise the framework's slots and fallbacks: each one
//! implements a different subset of [`ModelMethods`](crate::model::ModelMethods).
//!
//! Key behaviors
//! -------------
//! | model       | params   | slots                                                  |
//! |-------------|----------|--------------------------------------------------------|
//! | Normal      | [μ, σ]   | estimate, log_likelihood, score, draw, cdf, constraint |
//! | Exponential | [μ]      | estimate, log_likelihood, score, draw, cdf, constraint |
//! | Bernoulli   | [p]      | estimate, p, draw, constraint                          |
//! | Poisson     | [λ]      | estimate, log_likelihood, draw, constraint             |
//!
//! Every `estimate` slot is a closed form recorded through
//! [`record_closed_form`](crate::mle::record_closed_form).
//!
//! Invariants & assumptions
//! ------------------------
//! - Every data entry is one observation; all columns are read.
//! - Density slots need data and fail with `ModelError::DataRequired`
//!   without it.
//! - Infeasible parameters give a log density of `-∞` (density 0); the
//!   `constraint` slots project them back, at least
//!   [`POSITIVITY_MARGIN`](crate::optimization::numerical_stability::POSITIVITY_MARGIN)
//!   above zero for scale and rate parameters.
//!
//! Conventions
//! -----------
//! - `normal()` etc. build unparametrized models; `normal_with(..)` etc.
//!   validate and set parameters, returning
//!   `ModelError::InvalidDistributionParameter` on bad input.

pub mod bernoulli;
pub mod exponential;
pub mod normal;
pub mod poisson;

pub use self::bernoulli::{Bernoulli, bernoulli, bernoulli_with};
pub use self::exponential::{Exponential, exponential, exponential_with};
pub use self::normal::{Normal, normal, normal_with};
pub use self::poisson::{Poisson, poisson, poisson_with};

use crate::data::Dataset;
use crate::model::{
    Model,
    errors::{ModelError, ModelResult},
};

// ---- Helper methods ----

/// The dataset, or `DataRequired` naming `operation`.
pub(crate) fn require_data<'a>(
    data: Option<&'a Dataset>, model: &Model, operation: &'static str,
) -> ModelResult<&'a Dataset> {
    data.ok_or_else(|| ModelError::DataRequired { model: model.name().to_string(), operation })
}

/// The value a `cdf` slot evaluates at: the first entry of the first row.
pub(crate) fn cdf_point(data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
    require_data(data, model, "cdf")?
        .get(0, 0)
        .ok_or_else(|| ModelError::ShapeError { reason: "cdf needs at least one value".into() })
}

/// Sample mean of every value in `data`, for closed-form fits.
pub(crate) fn sample_mean(data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
    let data = require_data(data, model, "estimate")?;
    let n = data.values().count();
    if n == 0 {
        return Err(ModelError::ShapeError {
            reason: format!("cannot fit '{}' to no data", model.name()),
        });
    }
    Ok(data.values().sum::<f64>() / n as f64)
}

/// `Ok(value)` when `valid`, else `InvalidDistributionParameter`.
pub(crate) fn check_param(
    name: &'static str, value: f64, valid: bool, reason: &'static str,
) -> ModelResult<f64> {
    if valid {
        Ok(value)
    } else {
        Err(ModelError::InvalidDistributionParameter { name, value, reason })
    }
}

/// Clamp a scale/rate parameter to `[floor, ∞)` and report the move.
pub(crate) fn floor_at(value: &mut f64, floor: f64) -> f64 {
    if value.is_nan() || *value < floor {
        let moved = if value.is_nan() { f64::INFINITY } else { floor - *value };
        *value = floor;
        moved
    } else {
        0.0
    }
}
