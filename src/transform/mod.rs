//! transform — combinators that build new models from existing ones.
//!
//! Purpose
//! -------
//! Wrap one or more base models into a new [`Model`] whose method table
//! translates each operation into calls on the bases through
//! `model::dispatch`.
//!
//! Key behaviors
//! -------------
//! - [`fix_params`]: hold some base parameters fixed; only the free ones are
//!   visible to optimizers and samplers.
//! - [`coordinate_transform`]: Jacobian-adjusted density of a base model
//!   under an invertible change of variables.
//! - [`cross`]: independent product of two models over disjoint columns.
//! - [`mixture`]: weighted mixture of component densities.
//! - [`dconstrain`]: a base model restricted to a feasible region of the
//!   data space, drawn by rejection sampling.
//! - [`dcompose`]: a likelihood model scored on draws from a generator
//!   model.
//!
//! Invariants & assumptions
//! ------------------------
//! - Base models are held as `Arc<Model>` in the wrapper's settings group;
//!   a plain copy of the wrapper shares them, `Model::copy_deep` duplicates
//!   them.
//! - The wrapper's packed parameters are exactly what its optimizer sees:
//!   the free subset for `fix_params`, the base's for single-base wrappers,
//!   the concatenation of component packs for `cross`, `mixture`, and
//!   `dcompose`.
//! - Bases are only read during evaluation; each call works on a private
//!   copy carrying the wrapper's current parameters.
//!
//! Conventions
//! -----------
//! - Constructor misuse (lengths, weights, empty inputs) is reported as
//!   `ShapeError` / `InvalidWeights` immediately.

pub mod coordinate_transform;
pub mod cross;
pub mod dcompose;
pub mod dconstrain;
pub mod fix_params;
pub mod mixture;

pub use self::coordinate_transform::{
    CoordinateTransform, TransformSettings, coordinate_transform,
};
pub use self::cross::{CrossSettings, cross, cross_many};
pub use self::dcompose::{CompositionSettings, DcomposeOptions, dcompose, dcompose_with};
pub use self::dconstrain::{DconstrainOptions, DconstrainSettings, dconstrain, dconstrain_with};
pub use self::fix_params::{
    FixedParamsSettings, fix_params, fix_params_get_base, fix_params_nan, fix_params_with_values,
};
pub use self::mixture::{MixtureSettings, mixture, mixture_equal};

use crate::data::{Dataset, Dim, ParamShape};
use crate::model::{
    Model, dispatch,
    errors::{ModelError, ModelResult},
};
use ndarray::{Array1, s};
use std::sync::Arc;

// ---- Helper methods ----

/// Copy of `base` carrying `wrapper`'s current parameters, if it has any.
pub(crate) fn base_with_params(base: &Model, wrapper: &Model) -> Model {
    let mut view = base.clone();
    if let Some(params) = wrapper.parameters() {
        view.replace_parameters(params.clone());
    }
    view
}

/// Prep a copy of a single base on `data` and adopt its sizes.
///
/// The wrapper keeps parameters it already has; otherwise it takes the
/// prepped base's. Returns the prepped base for the caller to store.
pub(crate) fn prep_single_base(
    data: Option<&Dataset>, base: &Model, wrapper: &mut Model,
) -> ModelResult<Arc<Model>> {
    let mut prepped = base_with_params(base, wrapper);
    dispatch::prep(data, &mut prepped)?;
    if wrapper.parameters.is_none() {
        wrapper.parameters = prepped.parameters.clone();
    }
    wrapper.shape = prepped.shape;
    wrapper.dsize = prepped.dsize;
    Ok(Arc::new(prepped))
}

/// Sum of declared widths, when every width is known.
pub(crate) fn total_dsize(models: &[&Model]) -> Dim {
    let mut total = 0;
    for model in models {
        match model.dsize() {
            Dim::Fixed(width) => total += width,
            Dim::FromData => return Dim::FromData,
        }
    }
    Dim::Fixed(total)
}

/// Declared shape and starting parameters of a wrapper over `components`.
///
/// When every component's parameter count is known the shape is a fixed
/// vector of their total; otherwise it stays data-dependent until prep.
/// Parameters are set only when every component already has some.
pub(crate) fn concatenated_layout(
    components: &[&Model],
) -> (ParamShape, Option<Array1<f64>>) {
    let lens: Option<Vec<usize>> = components.iter().map(|m| m.packed_len().ok()).collect();
    let shape = match &lens {
        Some(lens) => ParamShape::vector(Dim::Fixed(lens.iter().sum())),
        None => ParamShape::vector(Dim::FromData),
    };
    let packs: Option<Vec<Array1<f64>>> =
        components.iter().map(|m| m.packed().ok()).collect();
    let joined = packs.map(|packs| packs.iter().flat_map(|p| p.iter().copied()).collect());
    (shape, joined)
}

/// Copies of `components` carrying consecutive slices of `wrapper`'s
/// packed parameters.
///
/// # Errors
/// - `ModelError::MissingParameters` before prep.
/// - `ModelError::ShapeError` if the lengths do not add up.
pub(crate) fn components_with_params(
    components: &[Arc<Model>], wrapper: &Model,
) -> ModelResult<Vec<Model>> {
    let theta = wrapper.packed()?;
    let mut offset = 0;
    let mut views = Vec::with_capacity(components.len());
    for component in components {
        let len = component.packed_len()?;
        if offset + len > theta.len() {
            return Err(ModelError::ShapeError {
                reason: format!(
                    "'{}' holds {} parameters, fewer than its components need",
                    wrapper.name(),
                    theta.len()
                ),
            });
        }
        let mut view = (**component).clone();
        view.set_packed(theta.slice(s![offset..offset + len]))?;
        views.push(view);
        offset += len;
    }
    if offset != theta.len() {
        return Err(ModelError::ShapeError {
            reason: format!(
                "'{}' holds {} parameters but its components use {offset}",
                wrapper.name(),
                theta.len()
            ),
        });
    }
    Ok(views)
}

/// Concatenate the packed parameters of `views` into `wrapper`.
pub(crate) fn store_concatenated(views: &[Model], wrapper: &mut Model) -> ModelResult<()> {
    let mut joined = Vec::new();
    for view in views {
        joined.extend(view.packed()?.iter().copied());
    }
    wrapper.set_packed(Array1::from(joined).view())
}

pub mod prelude {
    pub use super::coordinate_transform::{CoordinateTransform, coordinate_transform};
    pub use super::cross::{cross, cross_many};
    pub use super::dcompose::{DcomposeOptions, dcompose, dcompose_with};
    pub use super::dconstrain::{DconstrainOptions, dconstrain, dconstrain_with};
    pub use super::fix_params::{
        fix_params, fix_params_get_base, fix_params_nan, fix_params_with_values,
    };
    pub use super::mixture::{mixture, mixture_equal};
}
