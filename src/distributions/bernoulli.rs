//! Bernoulli(p) with parameters `[p]`.
//!
//! The density `p` is implemented; the log-likelihood comes from the
//! dispatch fallback `Σ_rows ln p(row)`. The estimate is the share of ones.
use crate::data::{Dataset, Dim, ParamShape};
use crate::distributions::{check_param, require_data, sample_mean};
use crate::mle::record_closed_form;
use crate::model::{
    Model, ModelMethods,
    errors::{ModelError, ModelResult},
};
use ndarray::{Array1, array};
use rand::RngCore;
use rand_distr::Distribution;
use std::sync::Arc;

/// Method table of the Bernoulli distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bernoulli;

/// Unparametrized Bernoulli model.
pub fn bernoulli() -> Model {
    Model::new("Bernoulli", ParamShape::vector(Dim::Fixed(1)), Dim::Fixed(1), Arc::new(Bernoulli))
}

/// Bernoulli with success probability `prob`.
///
/// # Errors
/// - `ModelError::InvalidDistributionParameter` unless `0 ≤ prob ≤ 1`.
pub fn bernoulli_with(prob: f64) -> ModelResult<Model> {
    check_param("p", prob, (0.0..=1.0).contains(&prob), "must lie in [0, 1]")?;
    bernoulli().with_parameters(&[prob])
}

impl ModelMethods for Bernoulli {
    /// Closed form: p̂ = share of ones.
    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let share = sample_mean(data, model)?;
        model.set_packed(array![share].view())?;
        record_closed_form(data, model)
    }

    /// Product of `p^x (1−p)^(1−x)`; any value other than 0/1 has density 0.
    fn p(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let data = require_data(data, model, "p")?;
        let prob = model.param_vector()?[0];
        if !(0.0..=1.0).contains(&prob) {
            return Ok(0.0);
        }
        Ok(data
            .values()
            .map(|x| match x {
                x if x == 1.0 => prob,
                x if x == 0.0 => 1.0 - prob,
                _ => 0.0,
            })
            .product())
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let prob = model.param_vector()?[0];
        let dist = rand_distr::Bernoulli::new(prob).map_err(|_| {
            ModelError::InvalidDistributionParameter {
                name: "p",
                value: prob,
                reason: "must lie in [0, 1]",
            }
        })?;
        Ok(array![if dist.sample(rng) { 1.0 } else { 0.0 }])
    }

    /// `p` is clamped to `[0, 1]`.
    fn constraint(&self, _data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let theta = model.param_vector_mut()?;
        let prob = theta[0];
        let clamped = if prob.is_nan() { 0.5 } else { prob.clamp(0.0, 1.0) };
        theta[0] = clamped;
        Ok(if prob.is_nan() { f64::INFINITY } else { (prob - clamped).abs() })
    }
}
