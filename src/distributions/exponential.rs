//! Exponential distribution parametrized by its mean μ (`[μ]`).
//!
//! The maximum-likelihood estimate is the sample mean.
use crate::data::{Dataset, Dim, ParamShape};
use crate::distributions::{cdf_point, check_param, floor_at, require_data, sample_mean};
use crate::mle::record_closed_form;
use crate::model::{
    Model, ModelMethods,
    errors::{ModelError, ModelResult},
};
use crate::optimization::numerical_stability::POSITIVITY_MARGIN;
use ndarray::{Array1, array};
use rand::RngCore;
use rand_distr::{Distribution, Exp};
use statrs::distribution::ContinuousCDF;
use std::sync::Arc;

/// Method table of the Exponential distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

/// Unparametrized Exponential model.
pub fn exponential() -> Model {
    let shape = ParamShape::vector(Dim::Fixed(1));
    Model::new("Exponential", shape, Dim::Fixed(1), Arc::new(Exponential))
}

/// Exponential with mean `mu`.
///
/// # Errors
/// - `ModelError::InvalidDistributionParameter` unless `mu` is finite and
///   positive.
pub fn exponential_with(mu: f64) -> ModelResult<Model> {
    check_param("mu", mu, mu.is_finite() && mu > 0.0, "must be finite and positive")?;
    exponential().with_parameters(&[mu])
}

fn invalid_mean(mu: f64) -> ModelError {
    ModelError::InvalidDistributionParameter {
        name: "mu",
        value: mu,
        reason: "must be finite and positive",
    }
}

impl ModelMethods for Exponential {
    /// Closed form: μ̂ = x̄.
    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let mean = sample_mean(data, model)?;
        model.set_packed(array![mean].view())?;
        record_closed_form(data, model)
    }

    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let data = require_data(data, model, "log_likelihood")?;
        let mu = model.param_vector()?[0];
        if !(mu > 0.0) || data.values().any(|x| x < 0.0) {
            return Ok(f64::NEG_INFINITY);
        }
        let n = data.values().count() as f64;
        let total: f64 = data.values().sum();
        Ok(-n * mu.ln() - total / mu)
    }

    /// ∂ℓ/∂μ = −n/μ + Σx/μ².
    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        let data = require_data(data, model, "score")?;
        let mu = model.param_vector()?[0];
        let n = data.values().count() as f64;
        let total: f64 = data.values().sum();
        Ok(array![-n / mu + total / (mu * mu)])
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let mu = model.param_vector()?[0];
        let dist = Exp::new(1.0 / mu).map_err(|_| invalid_mean(mu))?;
        Ok(array![dist.sample(rng)])
    }

    fn cdf(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let x = cdf_point(data, model)?;
        let mu = model.param_vector()?[0];
        if !(mu > 0.0) {
            return Err(invalid_mean(mu));
        }
        let dist = statrs::distribution::Exp::new(1.0 / mu).map_err(|_| invalid_mean(mu))?;
        Ok(dist.cdf(x))
    }

    /// μ ≥ `POSITIVITY_MARGIN`.
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
    // - Log density, score and cdf against closed forms.
    // - Negative observations and constructor validation.
    // - The closed-form estimate.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `estimate` on a bare Exponential returns the sample mean in closed
    // form.
    //
    // Given
    // -----
    // - `exponential()` without parameters or settings, data [1..5].
    //
    // Expect
    // ------
    // - μ̂ = 3 exactly, a converged closed-form info with ℓ = −5 ln 3 − 5.
    fn estimate_is_the_sample_mean() {
        // Arrange
        let data = Dataset::from_column(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        // Act
        let fitted = dispatch::estimate(Some(&data), &exponential()).expect("closed form");

        // Assert
        let info = fitted.info().expect("info recorded");
        assert_eq!(fitted.packed().expect("fitted")[0], 3.0);
        assert!(info.converged);
        assert_eq!(info.iterations, 0);
        assert_relative_eq!(info.log_likelihood, -5.0 * 3.0_f64.ln() - 5.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The log density, score and cdf agree with their closed forms.
    //
    // Given
    // -----
    // - Mean 2 and data [1, 3].
    //
    // Expect
    // ------
    // - ℓ = −2 ln 2 − 2, score = −1 + 1 = 0, cdf(1) = 1 − e^{−1/2}.
    fn closed_forms_match() {
        // Arrange
        let model = exponential_with(2.0).expect("valid");
        let data = Dataset::from_column(&[1.0, 3.0]);

        // Act
        let ll = dispatch::log_likelihood(Some(&data), &model).expect("slot");
        let score = dispatch::score(Some(&data), &model).expect("slot");
        let cdf = dispatch::cdf(Some(&data), &model).expect("slot");

        // Assert
        assert_relative_eq!(ll, -2.0 * 2.0_f64.ln() - 2.0, epsilon = 1e-12);
        assert_relative_eq!(score[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cdf, 1.0 - (-0.5_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Negative data has zero density; bad means are rejected up front.
    //
    // Given
    // -----
    // - Mean 1 with data [−1]; `exponential_with(-3)`.
    //
    // Expect
    // ------
    // - ℓ = −∞ and `InvalidDistributionParameter`.
    fn negative_data_and_bad_mean() {
        // Arrange
        let model = exponential_with(1.0).expect("valid");
        let data = Dataset::from_column(&[-1.0]);

        // Act
        let ll = dispatch::log_likelihood(Some(&data), &model).expect("slot");

        // Assert
        assert_eq!(ll, f64::NEG_INFINITY);
        assert!(matches!(
            exponential_with(-3.0),
            Err(ModelError::InvalidDistributionParameter { name: "mu", .. })
        ));
    }
}
