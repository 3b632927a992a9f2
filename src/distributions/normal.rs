//! Normal(μ, σ) with parameters packed as `[μ, σ]`.
use crate::data::{Dataset, Dim, ParamShape};
use crate::distributions::{cdf_point, check_param, floor_at, require_data};
use crate::mle::record_closed_form;
use crate::model::{
    Model, ModelMethods,
    errors::{ModelError, ModelResult},
};
use crate::optimization::numerical_stability::POSITIVITY_MARGIN;
use ndarray::{Array1, array};
use rand::RngCore;
use rand_distr::Distribution;
use statrs::distribution::ContinuousCDF;
use std::f64::consts::PI;
use std::sync::Arc;

/// Method table of the Normal distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

/// Unparametrized Normal model.
pub fn normal() -> Model {
    Model::new("Normal", ParamShape::vector(Dim::Fixed(2)), Dim::Fixed(1), Arc::new(Normal))
}

/// Normal(μ, σ).
///
/// # Errors
/// - `ModelError::InvalidDistributionParameter` unless μ is finite and σ is
///   finite and positive.
pub fn normal_with(mu: f64, sigma: f64) -> ModelResult<Model> {
    check_param("mu", mu, mu.is_finite(), "must be finite")?;
    check_param("sigma", sigma, sigma.is_finite() && sigma > 0.0, "must be finite and positive")?;
    normal().with_parameters(&[mu, sigma])
}

fn mu_sigma(model: &Model) -> ModelResult<(f64, f64)> {
    let theta = model.param_vector()?;
    Ok((theta[0], theta[1]))
}

impl ModelMethods for Normal {
    /// Closed form: sample mean and the `n`-denominator standard deviation.
    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let data = require_data(data, model, "estimate")?;
        let n = data.values().count();
        if n == 0 {
            return Err(ModelError::ShapeError { reason: "cannot fit a Normal to no data".into() });
        }
        let mean = data.values().sum::<f64>() / n as f64;
        let var = data.values().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        model.set_packed(array![mean, var.sqrt()].view())?;
        record_closed_form(Some(data), model)
    }

    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let data = require_data(data, model, "log_likelihood")?;
        let (mu, sigma) = mu_sigma(model)?;
        if !(sigma > 0.0) {
            return Ok(f64::NEG_INFINITY);
        }
        let n = data.values().count() as f64;
        let ss: f64 = data.values().map(|x| (x - mu).powi(2)).sum();
        Ok(-0.5 * n * (2.0 * PI).ln() - n * sigma.ln() - ss / (2.0 * sigma * sigma))
    }

    /// ∂ℓ/∂μ = Σ(x−μ)/σ², ∂ℓ/∂σ = −n/σ + Σ(x−μ)²/σ³.
    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        let data = require_data(data, model, "score")?;
        let (mu, sigma) = mu_sigma(model)?;
        let n = data.values().count() as f64;
        let s1: f64 = data.values().map(|x| x - mu).sum();
        let s2: f64 = data.values().map(|x| (x - mu).powi(2)).sum();
        Ok(array![s1 / (sigma * sigma), -n / sigma + s2 / sigma.powi(3)])
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let (mu, sigma) = mu_sigma(model)?;
        let dist = rand_distr::Normal::new(mu, sigma).map_err(|_| {
            ModelError::InvalidDistributionParameter {
                name: "sigma",
                value: sigma,
                reason: "must be finite and positive",
            }
        })?;
        Ok(array![dist.sample(rng)])
    }

    fn cdf(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let x = cdf_point(data, model)?;
        let (mu, sigma) = mu_sigma(model)?;
        let dist = statrs::distribution::Normal::new(mu, sigma).map_err(|_| {
            ModelError::InvalidDistributionParameter {
                name: "sigma",
                value: sigma,
                reason: "must be finite and positive",
            }
        })?;
        Ok(dist.cdf(x))
    }

    /// σ ≥ `POSITIVITY_MARGIN`.
    fn constraint(&self, _data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let theta = model.param_vector_mut()?;
        Ok(floor_at(&mut theta[1], POSITIVITY_MARGIN))
    }
}
