//! Poisson(λ) with parameters `[λ]`.
//!
//! `p` is the dispatch fallback over `log_likelihood`; the
//! maximum-likelihood estimate is the sample mean.
use crate::data::{Dataset, Dim, ParamShape};
use crate::distributions::{check_param, floor_at, require_data, sample_mean};
use crate::mle::record_closed_form;
use crate::model::{
    Model, ModelMethods,
    errors::{ModelError, ModelResult},
};
use crate::optimization::numerical_stability::POSITIVITY_MARGIN;
use ndarray::{Array1, array};
use rand::RngCore;
use rand_distr::Distribution;
use statrs::function::gamma::ln_gamma;
use std::sync::Arc;

/// Method table of the Poisson distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poisson;

/// Unparametrized Poisson model.
pub fn poisson() -> Model {
    Model::new("Poisson", ParamShape::vector(Dim::Fixed(1)), Dim::Fixed(1), Arc::new(Poisson))
}

/// Poisson with rate `lambda`.
///
/// # Errors
/// - `ModelError::InvalidDistributionParameter` unless `lambda` is finite
///   and positive.
pub fn poisson_with(lambda: f64) -> ModelResult<Model> {
    let valid = lambda.is_finite() && lambda > 0.0;
    check_param("lambda", lambda, valid, "must be finite and positive")?;
    poisson().with_parameters(&[lambda])
}

impl ModelMethods for Poisson {
    /// Closed form: λ̂ = x̄.
    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let mean = sample_mean(data, model)?;
        model.set_packed(array![mean].view())?;
        record_closed_form(data, model)
    }

    /// `Σ x ln λ − λ − ln Γ(x + 1)`; non-integer or negative counts have
    /// density 0.
    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let data = require_data(data, model, "log_likelihood")?;
        let lambda = model.param_vector()?[0];
        if !(lambda > 0.0) || data.values().any(|x| x < 0.0 || x.fract() != 0.0) {
            return Ok(f64::NEG_INFINITY);
        }
        let ln_lambda = lambda.ln();
        Ok(data.values().map(|x| x * ln_lambda - lambda - ln_gamma(x + 1.0)).sum())
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let lambda = model.param_vector()?[0];
        let dist = rand_distr::Poisson::new(lambda).map_err(|_| {
            ModelError::InvalidDistributionParameter {
                name: "lambda",
                value: lambda,
                reason: "must be finite and positive",
            }
        })?;
        let count: f64 = dist.sample(rng);
        Ok(array![count])
    }

    /// λ ≥ `POSITIVITY_MARGIN`.
    fn constraint(&self, _data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let theta = model.param_vector_mut()?;
        Ok(floor_at(&mut theta[0], POSITIVITY_MARGIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dispatch;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The log density against a hand computation.
    // - The closed-form estimate, and the generic optimizer agreeing with it.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The log density matches the probability mass function.
    //
    // Given
    // -----
    // - λ = 2 and data [0, 3].
    //
    // Expect
    // ------
    // - ℓ = −2 + (3 ln 2 − 2 − ln 6).
    fn log_density_matches_pmf() {
        // Arrange
        let model = poisson_with(2.0).expect("valid");
        let data = Dataset::from_column(&[0.0, 3.0]);

        // Act
        let ll = dispatch::log_likelihood(Some(&data), &model).expect("slot");

        // Assert
        assert_relative_eq!(ll, -2.0 + 3.0 * 2.0_f64.ln() - 2.0 - 6.0_f64.ln(), epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // `estimate` is the sample mean; the generic optimizer, which has no
    // `score` slot and differences ℓ numerically, lands on the same point.
    //
    // Given
    // -----
    // - Counts [1, 2, 2, 4, 6] (mean 3) and a bare `poisson()`.
    //
    // Expect
    // ------
    // - λ̂ = 3 exactly from `estimate`; ≈ 3 from `maximum_likelihood`.
    fn closed_form_and_generic_mle_agree() {
        // Arrange
        let data = Dataset::from_column(&[1.0, 2.0, 2.0, 4.0, 6.0]);

        // Act
        let closed = dispatch::estimate(Some(&data), &poisson()).expect("closed form");
        let generic = crate::mle::maximum_likelihood(Some(&data), &poisson()).expect("runs");

        // Assert
        assert_eq!(closed.packed().expect("fitted")[0], 3.0);
        assert_eq!(closed.info().expect("info").iterations, 0);
        assert_relative_eq!(generic.packed().expect("fitted")[0], 3.0, epsilon = 1e-4);
    }
}
