//! transform::coordinate_transform — change of variables in the data space.
//!
//! Purpose
//! -------
//! Given a base model over `x` and an invertible map `y ↦ x = g(y)`, build
//! the model over `y` with density `f_Y(y) = f_X(g(y)) · |det J_g(y)|`.
//!
//! Key behaviors
//! -------------
//! - `log_likelihood = ℓ_base(g(data)) + Σ_rows ln|det J_g(row)|`.
//! - `score` is the base score on the mapped data (the Jacobian does not
//!   depend on the parameters).
//! - `draw` applies the forward map `g⁻¹` to a base draw and is
//!   unsupported when no forward map was given.
//! - `estimate` fits the base on the mapped data and adds the Jacobian term
//!   to the recorded log-likelihood.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are the base's, unchanged.
//! - The caller guarantees `to_base` and `from_base` are mutual inverses
//!   and that `log_jacobian` belongs to `to_base`.
use crate::data::Dataset;
use crate::model::{
    Model, ModelMethods, dispatch,
    errors::{ModelError, ModelResult},
    settings::SettingsGroup,
};
use crate::transform::{base_with_params, prep_single_base};
use ndarray::{Array1, ArrayView1};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

type RowMap = Arc<dyn Fn(ArrayView1<f64>) -> ModelResult<Array1<f64>> + Send + Sync>;
type RowScalar = Arc<dyn Fn(ArrayView1<f64>) -> ModelResult<f64> + Send + Sync>;

/// An invertible map between the transformed space and the base space.
#[derive(Clone)]
pub struct CoordinateTransform {
    to_base: RowMap,
    log_jacobian: RowScalar,
    from_base: Option<RowMap>,
}

impl CoordinateTransform {
    /// `to_base` maps a transformed row to a base row; `log_jacobian` gives
    /// `ln|det J|` of that map at the transformed row.
    pub fn new<G, J>(to_base: G, log_jacobian: J) -> Self
    where
        G: Fn(ArrayView1<f64>) -> ModelResult<Array1<f64>> + Send + Sync + 'static,
        J: Fn(ArrayView1<f64>) -> ModelResult<f64> + Send + Sync + 'static,
    {
        Self { to_base: Arc::new(to_base), log_jacobian: Arc::new(log_jacobian), from_base: None }
    }

    /// Forward map from base rows to transformed rows, enabling `draw`.
    pub fn with_from_base<F>(mut self, from_base: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> ModelResult<Array1<f64>> + Send + Sync + 'static,
    {
        self.from_base = Some(Arc::new(from_base));
        self
    }

    /// `data` mapped into the base space, with the summed log-Jacobian.
    fn pull_back(&self, data: &Dataset) -> ModelResult<(Dataset, f64)> {
        let mapped = data.map_rows(|row| (self.to_base)(row))?;
        let mut log_jac = 0.0;
        for row in data.rows() {
            log_jac += (self.log_jacobian)(row)?;
        }
        Ok((mapped, log_jac))
    }
}

impl fmt::Debug for CoordinateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinateTransform")
            .field("from_base", &self.from_base.is_some())
            .finish_non_exhaustive()
    }
}

/// Base model plus its change of variables.
#[derive(Debug, Clone)]
pub struct TransformSettings {
    pub base: Arc<Model>,
    pub transform: CoordinateTransform,
}

impl SettingsGroup for TransformSettings {
    const TAG: &'static str = "coordinate_transform";

    fn deep_copy(&self) -> Self {
        Self { base: Arc::new(self.base.copy_deep()), transform: self.transform.clone() }
    }
}

/// Method table of coordinate-transformed models.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformed;

/// Model of `y` where `to_base(y)` follows `base`.
pub fn coordinate_transform(base: Model, transform: CoordinateTransform) -> Model {
    let mut wrapper = Model::new(
        format!("{} (transformed)", base.name()),
        base.shape(),
        base.dsize(),
        Arc::new(Transformed),
    );
    wrapper.parameters = base.parameters.clone();
    wrapper.add_group(TransformSettings { base: Arc::new(base), transform });
    wrapper
}

/// Base view at the wrapper's parameters plus the mapped data.
fn resolve(data: Option<&Dataset>, model: &Model) -> ModelResult<(Model, Option<Dataset>, f64)> {
    let settings = model.group::<TransformSettings>()?;
    let base = base_with_params(&settings.base, model);
    match data {
        Some(d) => {
            let (mapped, log_jac) = settings.transform.pull_back(d)?;
            Ok((base, Some(mapped), log_jac))
        }
        None => Ok((base, None, 0.0)),
    }
}

impl ModelMethods for Transformed {
    fn prep(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let settings = model.group::<TransformSettings>()?.clone();
        let mapped = match data {
            Some(d) => Some(settings.transform.pull_back(d)?.0),
            None => None,
        };
        let prepped = prep_single_base(mapped.as_ref(), &settings.base, model)?;
        model.group_mut::<TransformSettings>()?.base = prepped;
        Ok(())
    }

    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let (base, mapped, log_jac) = resolve(data, model)?;
        let fitted = dispatch::estimate(mapped.as_ref(), &base)?;
        model.parameters = fitted.parameters.clone();
        if let Some(info) = fitted.info() {
            let mut info = info.clone();
            info.log_likelihood += log_jac;
            let n = data.map(Dataset::nrows);
            model.set_info(info.with_information_criteria(model.packed_len()?, n));
        }
        Ok(())
    }

    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let (base, mapped, log_jac) = resolve(data, model)?;
        Ok(dispatch::log_likelihood(mapped.as_ref(), &base)? + log_jac)
    }

    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        let (base, mapped, _) = resolve(data, model)?;
        dispatch::score(mapped.as_ref(), &base)
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let settings = model.group::<TransformSettings>()?;
        let from_base = settings.transform.from_base.as_ref().ok_or_else(|| {
            ModelError::UnsupportedOperation { model: model.name().to_string(), operation: "draw" }
        })?;
        let base = base_with_params(&settings.base, model);
        from_base(dispatch::draw(rng, &base)?.view())
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let (mut base, mapped, _) = resolve(data, model)?;
        let moved = dispatch::constraint(mapped.as_ref(), &mut base)?;
        if moved > 0.0 {
            model.parameters = base.parameters.clone();
        }
        Ok(moved)
    }
}
