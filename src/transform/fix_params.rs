//! transform::fix_params — hold a subset of a model's parameters fixed.
//!
//! Purpose
//! -------
//! Build a model whose parameter vector holds only the *free* entries of a
//! base model's packed parameters. Every operation rebuilds the full base
//! vector (fixed values substituted back in) and delegates to the base.
//!
//! Key behaviors
//! -------------
//! - `log_likelihood`, `p`, `draw`, `cdf` evaluate the base at the expanded
//!   vector; `score` returns only the free components of the base score.
//! - `constraint` projects the expanded vector and keeps the free part.
//! - There is no `estimate` slot: fitting is always maximum likelihood over
//!   the free entries.
//! - A `"mle"` settings group on the base is carried over, with any full
//!   starting point reduced to its free entries.
//!
//! Invariants & assumptions
//! ------------------------
//! - `mask[i] == true` marks base parameter `i` as fixed at `values[i]`.
//! - Expanding the wrapper's free vector reproduces the base vector it was
//!   built from.
//! - At least one parameter stays free.
use crate::data::{Dataset, Dim, ParamShape};
use crate::mle::MleSettings;
use crate::model::{
    Model, ModelMethods, dispatch,
    errors::{ModelError, ModelResult},
    settings::{SettingsGroup, copy_group},
};
use ndarray::Array1;
use rand::RngCore;
use std::sync::Arc;

/// Base model plus the fixed mask and full value vector.
#[derive(Debug, Clone)]
pub struct FixedParamsSettings {
    pub base: Arc<Model>,
    pub mask: Vec<bool>,
    pub values: Array1<f64>,
}

impl SettingsGroup for FixedParamsSettings {
    const TAG: &'static str = "fix_params";

    fn deep_copy(&self) -> Self {
        Self { base: Arc::new(self.base.copy_deep()), ..self.clone() }
    }
}

impl FixedParamsSettings {
    pub fn free_count(&self) -> usize {
        self.mask.iter().filter(|fixed| !**fixed).count()
    }

    /// Full base vector with `free` substituted into the unfixed slots.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` if `free` has the wrong length.
    pub fn expand(&self, free: &Array1<f64>) -> ModelResult<Array1<f64>> {
        if free.len() != self.free_count() {
            return Err(ModelError::ShapeError {
                reason: format!("{} free values for {} free slots", free.len(), self.free_count()),
            });
        }
        let mut full = self.values.clone();
        let slots = self.mask.iter().enumerate().filter(|(_, fixed)| !**fixed).map(|(i, _)| i);
        for (slot, value) in slots.zip(free.iter()) {
            full[slot] = *value;
        }
        Ok(full)
    }

    /// Entries of a full base vector at the free slots.
    pub fn contract(&self, full: &Array1<f64>) -> Array1<f64> {
        full.iter().zip(&self.mask).filter(|(_, fixed)| !**fixed).map(|(v, _)| *v).collect()
    }
}

/// Method table of parameter-fixed models.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedParams;

/// Fix the entries of `base`'s current parameters where `mask` is `true`.
///
/// # Errors
/// - `ModelError::MissingParameters` if `base` has no parameters.
/// - See [`fix_params_with_values`].
pub fn fix_params(base: Model, mask: &[bool]) -> ModelResult<Model> {
    let values = base.packed()?;
    fix_params_with_values(base, mask, &values.to_vec())
}

/// Fix `base`'s parameters at `values` where `mask` is `true`.
///
/// Free entries start at their value in `values` (0 when not finite).
///
/// # Errors
/// - `ModelError::ShapeError` if `mask` or `values` differ in length from
///   the base's parameter count, or if no parameter is left free.
pub fn fix_params_with_values(base: Model, mask: &[bool], values: &[f64]) -> ModelResult<Model> {
    let len = base.packed_len()?;
    if mask.len() != len || values.len() != len {
        return Err(ModelError::ShapeError {
            reason: format!(
                "mask has {} entries and values {}, but '{}' has {len} parameters",
                mask.len(),
                values.len(),
                base.name()
            ),
        });
    }
    let settings = FixedParamsSettings {
        base: Arc::new(base),
        mask: mask.to_vec(),
        values: Array1::from(values.to_vec()),
    };
    let free_count = settings.free_count();
    if free_count == 0 {
        return Err(ModelError::ShapeError { reason: "every parameter is fixed".into() });
    }
    let start = settings.contract(&settings.values).mapv(|v| if v.is_finite() { v } else { 0.0 });
    let base = Arc::clone(&settings.base);

    let mut wrapper = Model::new(
        format!("{} (fixed params)", base.name()),
        ParamShape::vector(Dim::Fixed(free_count)),
        base.dsize(),
        Arc::new(FixedParams),
    );
    if base.settings().contains(MleSettings::TAG) {
        copy_group(&base, &mut wrapper, MleSettings::TAG)?;
        let mle = wrapper.group_mut::<MleSettings>()?;
        if let Some(point) = mle.starting_point.take() {
            if point.len() == len {
                mle.starting_point = Some(settings.contract(&Array1::from(point)).to_vec());
            } else if point.len() == free_count {
                mle.starting_point = Some(point);
            }
        }
    }
    wrapper.add_group(settings);
    wrapper.set_parameters(&start.to_vec())?;
    Ok(wrapper)
}

/// Fix every parameter of `base` that is not NaN; NaN entries are free.
///
/// # Errors
/// - See [`fix_params_with_values`].
pub fn fix_params_nan(base: Model) -> ModelResult<Model> {
    let values = base.packed()?.to_vec();
    let mask: Vec<bool> = values.iter().map(|v| !v.is_nan()).collect();
    fix_params_with_values(base, &mask, &values)
}

/// Copy of the base model carrying the full parameter vector.
///
/// # Errors
/// - `ModelError::SettingsNotFound` if `model` is not a `fix_params` model.
/// - `ModelError::MissingParameters` before the wrapper has parameters.
pub fn fix_params_get_base(model: &Model) -> ModelResult<Model> {
    let settings = model.group::<FixedParamsSettings>()?;
    let mut base = (*settings.base).clone();
    base.set_packed(settings.expand(&model.packed()?)?.view())?;
    Ok(base)
}

impl ModelMethods for FixedParams {
    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        dispatch::log_likelihood(data, &fix_params_get_base(model)?)
    }

    fn p(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        dispatch::p(data, &fix_params_get_base(model)?)
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        dispatch::draw(rng, &fix_params_get_base(model)?)
    }

    fn cdf(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        dispatch::cdf(data, &fix_params_get_base(model)?)
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let mut base = fix_params_get_base(model)?;
        let moved = dispatch::constraint(data, &mut base)?;
        if moved > 0.0 {
            let free = model.group::<FixedParamsSettings>()?.contract(&base.packed()?);
            model.set_packed(free.view())?;
        }
        Ok(moved)
    }

    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        let full = dispatch::score(data, &fix_params_get_base(model)?)?;
        Ok(model.group::<FixedParamsSettings>()?.contract(&full))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{normal, normal_with};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Reconstruction of the base vector from the free entries.
    // - Delegated densities and the contracted score.
    // - Fitting only the free parameter.
    // - NaN-marked fixing and constructor errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Expanding the free vector reproduces the base vector.
    //
    // Given
    // -----
    // - Normal(1.5, 0.7) with σ fixed.
    //
    // Expect
    // ------
    // - One free parameter (1.5) and `fix_params_get_base` packing to
    //   [1.5, 0.7].
    fn free_vector_round_trips_to_base() {
        // Arrange
        let base = normal_with(1.5, 0.7).expect("valid");

        // Act
        let fixed = fix_params(base, &[false, true]).expect("one free");

        // Assert
        assert_eq!(fixed.packed().expect("set"), array![1.5]);
        let recovered = fix_params_get_base(&fixed).expect("base");
        assert_eq!(recovered.packed().expect("set"), array![1.5, 0.7]);
    }

    #[test]
    // Purpose
    // -------
    // Densities delegate at the expanded vector; the score keeps only free
    // components.
    //
    // Given
    // -----
    // - Normal(0, 2) with μ fixed, data [1, −1, 3].
    //
    // Expect
    // ------
    // - ℓ equals the base ℓ; the score is the base's σ component.
    fn delegates_with_contracted_score() {
        // Arrange
        let base = normal_with(0.0, 2.0).expect("valid");
        let data = Dataset::from_column(&[1.0, -1.0, 3.0]);
        let fixed = fix_params(base.clone(), &[true, false]).expect("one free");

        // Act
        let ll = dispatch::log_likelihood(Some(&data), &fixed).expect("delegated");
        let score = dispatch::score(Some(&data), &fixed).expect("delegated");

        // Assert
        let base_score = dispatch::score(Some(&data), &base).expect("slot");
        assert_relative_eq!(
            ll,
            dispatch::log_likelihood(Some(&data), &base).expect("slot"),
            epsilon = 1e-12
        );
        assert_eq!(score.len(), 1);
        assert_relative_eq!(score[0], base_score[1], epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Estimation moves only the free parameter.
    //
    // Given
    // -----
    // - Normal with σ fixed at 1 and μ free (NaN-marked), data with mean 2.
    //
    // Expect
    // ------
    // - μ̂ ≈ 2; the base vector keeps σ = 1.
    fn estimate_fits_free_entries_only() {
        // Arrange
        let base = normal().with_parameters(&[f64::NAN, 1.0]).expect("two values");
        let fixed = fix_params_nan(base).expect("μ free");
        let data = Dataset::from_column(&[1.0, 2.5, 2.0, 3.5, 1.0]);

        // Act
        let fitted = dispatch::estimate(Some(&data), &fixed).expect("mle");

        // Assert
        let full = fix_params_get_base(&fitted).expect("base").packed().expect("set");
        assert_relative_eq!(full[0], 2.0, epsilon = 1e-5);
        assert_eq!(full[1], 1.0);
    }

    #[test]
    // Purpose
    // -------
    // Bad masks are rejected and MLE settings are carried over.
    //
    // Given
    // -----
    // - A three-entry mask for a two-parameter base; an all-fixed mask; a
    //   base with a full starting point installed.
    //
    // Expect
    // ------
    // - `ShapeError` twice; the wrapper's starting point is the free entry.
    fn constructor_errors_and_settings_copy() {
        // Arrange
        let base = normal_with(0.0, 1.0)
            .expect("valid")
            .with_group(MleSettings::default().with_starting_point(&[0.5, 2.0]));

        // Act
        let too_long = fix_params(base.clone(), &[false, true, true]);
        let all_fixed = fix_params(base.clone(), &[true, true]);
        let fixed = fix_params(base, &[true, false]).expect("one free");

        // Assert
        assert!(matches!(too_long, Err(ModelError::ShapeError { .. })));
        assert!(matches!(all_fixed, Err(ModelError::ShapeError { .. })));
        let start = fixed.group::<MleSettings>().expect("copied").starting_point.clone();
        assert_eq!(start, Some(vec![2.0]));
    }
}
