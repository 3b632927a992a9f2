//! transform::mixture — finite mixtures of component models.
//!
//! Purpose
//! -------
//! Combine N weighted component models into the model with density
//! `Σ_k w_k p_k(x)` per observation.
//!
//! Key behaviors
//! -------------
//! - `log_likelihood = Σ_rows ln Σ_k w_k p_k(row)`, computed in log space
//!   with [`log_sum_exp`] over `ln w_k + ℓ_k(row)`.
//! - `draw` picks a component with probability `w_k`, then draws from it.
//! - `cdf` is `Σ_k w_k F_k`; `constraint` projects every component and
//!   reports the summed distance.
//! - `estimate` alternates two steps: a maximum-likelihood search over the
//!   component parameters with the weights held fixed, then a tally of the
//!   weights as the mean per-row responsibility `w_k p_k(row) / p(row)`.
//!   It stops once no weight moves by more than [`WEIGHT_CHANGE_TOLERANCE`]
//!   or after [`MAX_WEIGHT_ROUNDS`] rounds.
//!
//! Invariants & assumptions
//! ------------------------
//! - Weights are finite, non-negative, one per component, and sum to 1
//!   within [`WEIGHT_TOLERANCE`].
//! - Parameters are the component packs concatenated in order; the weights
//!   live in [`MixtureSettings`].
//! - Every component sees every column of the data.
use crate::data::{Dataset, Dim, ParamShape, Parameters};
use crate::mle::{MleSettings, maximum_likelihood};
use crate::model::{
    EstimationInfo, Model, ModelMethods, dispatch,
    errors::{ModelError, ModelResult},
    settings::SettingsGroup,
};
use crate::optimization::numerical_stability::log_sum_exp;
use crate::transform::{components_with_params, concatenated_layout, store_concatenated};
use ndarray::Array1;
use rand::RngCore;
use rand_distr::{Distribution, WeightedIndex};
use std::sync::Arc;

/// Allowed deviation of the weight sum from 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-8;

/// Largest weight change at which `estimate` stops re-tallying.
pub const WEIGHT_CHANGE_TOLERANCE: f64 = 1e-6;

/// Bound on search-then-tally rounds in `estimate`.
pub const MAX_WEIGHT_ROUNDS: usize = 25;

/// Components and their mixing weights.
#[derive(Debug, Clone)]
pub struct MixtureSettings {
    pub components: Vec<Arc<Model>>,
    pub weights: Vec<f64>,
}

impl SettingsGroup for MixtureSettings {
    const TAG: &'static str = "mixture";

    fn deep_copy(&self) -> Self {
        Self {
            components: self.components.iter().map(|c| Arc::new(c.copy_deep())).collect(),
            weights: self.weights.clone(),
        }
    }
}

/// Method table of mixture models.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mixture;

/// Mixture of `components` with the given `weights`.
///
/// # Errors
/// - `ModelError::InvalidWeights` if the weights are empty, differ in
///   length from `components`, contain a negative or non-finite entry, or
///   do not sum to 1 within [`WEIGHT_TOLERANCE`].
pub fn mixture(components: Vec<Model>, weights: &[f64]) -> ModelResult<Model> {
    validate_weights(weights, components.len())?;
    let refs: Vec<&Model> = components.iter().collect();
    let (shape, params) = concatenated_layout(&refs);
    let dsize = components.first().map_or(Dim::FromData, Model::dsize);
    let names: Vec<&str> = components.iter().map(Model::name).collect();
    let mut wrapper =
        Model::new(format!("Mixture of {}", names.join(", ")), shape, dsize, Arc::new(Mixture));
    wrapper.parameters = params.map(Parameters::from_vector);
    wrapper.add_group(MixtureSettings {
        components: components.into_iter().map(Arc::new).collect(),
        weights: weights.to_vec(),
    });
    Ok(wrapper)
}

/// Mixture with equal weights `1/N`.
///
/// # Errors
/// - `ModelError::InvalidWeights` if `components` is empty.
pub fn mixture_equal(components: Vec<Model>) -> ModelResult<Model> {
    let n = components.len();
    mixture(components, &vec![1.0 / n as f64; n])
}

fn validate_weights(weights: &[f64], components: usize) -> ModelResult<()> {
    let reason = if weights.is_empty() {
        Some("a mixture needs at least one component".to_string())
    } else if weights.len() != components {
        Some(format!("{} weights for {components} components", weights.len()))
    } else if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
        Some(format!("weight {w} is not a finite non-negative number"))
    } else {
        let total: f64 = weights.iter().sum();
        ((total - 1.0).abs() > WEIGHT_TOLERANCE).then(|| format!("weights sum to {total}"))
    };
    match reason {
        Some(reason) => Err(ModelError::InvalidWeights { reason }),
        None => Ok(()),
    }
}

/// Component views at the wrapper's parameters, with the weights.
fn resolve(model: &Model) -> ModelResult<(Vec<Model>, Vec<f64>)> {
    let settings = model.group::<MixtureSettings>()?;
    Ok((components_with_params(&settings.components, model)?, settings.weights.clone()))
}

/// `ln Σ_k w_k p_k(row)` for one single-row dataset.
fn row_log_density(row: &Dataset, views: &[Model], weights: &[f64]) -> ModelResult<f64> {
    let mut terms = Vec::with_capacity(views.len());
    for (view, &w) in views.iter().zip(weights) {
        if w > 0.0 {
            terms.push(w.ln() + dispatch::log_likelihood(Some(row), view)?);
        }
    }
    Ok(log_sum_exp(&terms))
}

/// Mean responsibility of each component over the rows of `data`.
///
/// Rows no component can explain are skipped; if none remain the weights
/// are returned unchanged.
fn tally_weights(data: &Dataset, views: &[Model], weights: &[f64]) -> ModelResult<Vec<f64>> {
    let mut tally = vec![0.0; weights.len()];
    let mut rows = 0usize;
    for index in 0..data.nrows() {
        let row = data.row_dataset(index)?;
        let mut terms = Vec::with_capacity(views.len());
        for (view, &w) in views.iter().zip(weights) {
            terms.push(if w > 0.0 {
                w.ln() + dispatch::log_likelihood(Some(&row), view)?
            } else {
                f64::NEG_INFINITY
            });
        }
        let total = log_sum_exp(&terms);
        if !total.is_finite() {
            continue;
        }
        for (slot, term) in tally.iter_mut().zip(&terms) {
            *slot += (term - total).exp();
        }
        rows += 1;
    }
    if rows == 0 {
        return Ok(weights.to_vec());
    }
    let sum: f64 = tally.iter().sum();
    Ok(tally.into_iter().map(|t| t / sum).collect())
}

impl ModelMethods for Mixture {
    fn prep(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let mut settings = model.group::<MixtureSettings>()?.clone();
        let mut prepped = Vec::with_capacity(settings.components.len());
        for component in &settings.components {
            let mut view = (**component).clone();
            dispatch::prep(data, &mut view)?;
            prepped.push(view);
        }
        if model.parameters.is_none() {
            let mut joined = Vec::new();
            for view in &prepped {
                joined.extend(view.packed()?.iter().copied());
            }
            model.parameters = Some(Parameters::from_vector(Array1::from(joined)));
        }
        model.shape = ParamShape::vector(Dim::Fixed(model.packed_len()?));
        if let Some(first) = prepped.first() {
            model.dsize = first.dsize();
        }
        settings.components = prepped.into_iter().map(Arc::new).collect();
        model.add_group(settings);
        Ok(())
    }

    /// Search with fixed weights, tally, repeat until the weights settle.
    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let data = data.ok_or_else(|| ModelError::DataRequired {
            model: model.name().to_string(),
            operation: "estimate",
        })?;
        let installed = model.group::<MleSettings>().ok().cloned();
        let mut search = installed.clone().unwrap_or_default();
        let mut iterations = 0;
        let mut rounds = 0;
        let mut change = f64::INFINITY;
        while rounds < MAX_WEIGHT_ROUNDS && change > WEIGHT_CHANGE_TOLERANCE {
            rounds += 1;
            let candidate = model.clone().with_group(search.clone());
            let fitted = maximum_likelihood(Some(data), &candidate)?;
            iterations += fitted.info().map_or(0, |info| info.iterations);
            let (views, weights) = resolve(&fitted)?;
            let tallied = tally_weights(data, &views, &weights)?;
            change = tallied.iter().zip(&weights).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
            *model = fitted;
            model.group_mut::<MixtureSettings>()?.weights = tallied;
            search.starting_point = Some(model.packed()?.to_vec());
        }
        log::debug!("{}: weights settled after {rounds} rounds (Δ = {change})", model.name());

        let ll = dispatch::log_likelihood(Some(data), model)?;
        let mut info = model.info().cloned().unwrap_or_else(|| EstimationInfo::closed_form(ll));
        info.log_likelihood = ll;
        info.iterations = iterations;
        let free_weights = model.group::<MixtureSettings>()?.weights.len() - 1;
        let k = model.packed_len()? + free_weights;
        model.set_info(info.with_information_criteria(k, Some(data.nrows())));
        match installed {
            Some(settings) => model.add_group(settings),
            None => {
                model.settings_mut().remove_group(MleSettings::TAG);
            }
        }
        Ok(())
    }

    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let data = data.ok_or_else(|| ModelError::DataRequired {
            model: model.name().to_string(),
            operation: "log_likelihood",
        })?;
        let (views, weights) = resolve(model)?;
        let mut total = 0.0;
        for index in 0..data.nrows() {
            total += row_log_density(&data.row_dataset(index)?, &views, &weights)?;
        }
        Ok(total)
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let (views, weights) = resolve(model)?;
        let picker = WeightedIndex::new(&weights)
            .map_err(|e| ModelError::InvalidWeights { reason: e.to_string() })?;
        let index = picker.sample(rng);
        dispatch::draw(rng, &views[index])
    }

    fn cdf(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let (views, weights) = resolve(model)?;
        let mut total = 0.0;
        for (view, w) in views.iter().zip(&weights) {
            total += w * dispatch::cdf(data, view)?;
        }
        Ok(total)
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let (mut views, _) = resolve(model)?;
        let mut moved = 0.0;
        for view in &mut views {
            moved += dispatch::constraint(data, view)?;
        }
        if moved > 0.0 {
            store_concatenated(&views, model)?;
        }
        Ok(moved)
    }
}
