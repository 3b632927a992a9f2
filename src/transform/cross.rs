//! transform::cross — independent product of two models.
//!
//! Purpose
//! -------
//! Model two groups of columns as independent: the left model sees the
//! first `dsize(left)` columns, the right model the rest.
//!
//! Key behaviors
//! -------------
//! - `log_likelihood` is the sum of the two marginal log-likelihoods on
//!   their column slices; `p` is the product; `cdf` the product of marginal
//!   cdfs at the first row.
//! - `draw` concatenates independent draws.
//! - `estimate` fits each side on its own slice.
//! - `constraint` projects both sides and reports the summed distance.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are the left pack followed by the right pack.
//! - The left model's `dsize` must be known once data is split.
use crate::data::{Dataset, Dim, ParamShape, Parameters};
use crate::model::{
    EstimationInfo, Model, ModelMethods, dispatch,
    errors::{ModelError, ModelResult},
    info::MleState,
    settings::SettingsGroup,
};
use crate::transform::{
    components_with_params, concatenated_layout, store_concatenated, total_dsize,
};
use ndarray::{Array1, Axis, concatenate};
use rand::RngCore;
use std::sync::Arc;

/// The two sides of a cross product.
#[derive(Debug, Clone)]
pub struct CrossSettings {
    pub left: Arc<Model>,
    pub right: Arc<Model>,
}

impl SettingsGroup for CrossSettings {
    const TAG: &'static str = "cross";

    fn deep_copy(&self) -> Self {
        Self { left: Arc::new(self.left.copy_deep()), right: Arc::new(self.right.copy_deep()) }
    }
}

impl CrossSettings {
    fn sides(&self) -> [Arc<Model>; 2] {
        [Arc::clone(&self.left), Arc::clone(&self.right)]
    }
}

/// Method table of cross-product models.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cross;

/// Independent product of `left` and `right`.
pub fn cross(left: Model, right: Model) -> Model {
    let (shape, params) = concatenated_layout(&[&left, &right]);
    let mut wrapper = Model::new(
        format!("{} x {}", left.name(), right.name()),
        shape,
        total_dsize(&[&left, &right]),
        Arc::new(Cross),
    );
    wrapper.parameters = params.map(Parameters::from_vector);
    wrapper.add_group(CrossSettings { left: Arc::new(left), right: Arc::new(right) });
    wrapper
}

/// Fold `models` into nested crosses, left to right.
///
/// # Errors
/// - `ModelError::ShapeError` if `models` is empty.
pub fn cross_many(models: Vec<Model>) -> ModelResult<Model> {
    let mut models = models.into_iter();
    let first = models
        .next()
        .ok_or_else(|| ModelError::ShapeError { reason: "cross of no models".into() })?;
    Ok(models.fold(first, cross))
}

/// Column slices of `data` for the two sides.
fn split(data: Option<&Dataset>, left: &Model) -> ModelResult<(Option<Dataset>, Option<Dataset>)> {
    let Some(d) = data else {
        return Ok((None, None));
    };
    let width = match left.dsize() {
        Dim::Fixed(width) => width,
        Dim::FromData => {
            return Err(ModelError::ShapeError {
                reason: format!("cannot split data: width of '{}' is unknown", left.name()),
            });
        }
    };
    Ok((Some(d.columns(0..width)?), Some(d.columns(width..d.ncols())?)))
}

/// Side views at the wrapper's parameters and their data slices.
fn resolve(
    data: Option<&Dataset>, model: &Model,
) -> ModelResult<(Vec<Model>, Option<Dataset>, Option<Dataset>)> {
    let settings = model.group::<CrossSettings>()?;
    let views = components_with_params(&settings.sides(), model)?;
    let (left_data, right_data) = split(data, &views[0])?;
    Ok((views, left_data, right_data))
}

impl ModelMethods for Cross {
    fn prep(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let settings = model.group::<CrossSettings>()?.clone();
        let mut left = (*settings.left).clone();
        let (left_data, right_data) = split(data, &left)?;
        dispatch::prep(left_data.as_ref(), &mut left)?;
        let mut right = (*settings.right).clone();
        dispatch::prep(right_data.as_ref(), &mut right)?;

        if model.parameters.is_none() {
            let mut joined = left.packed()?.to_vec();
            joined.extend(right.packed()?.iter().copied());
            model.parameters = Some(Parameters::from_vector(Array1::from(joined)));
        }
        model.shape = ParamShape::vector(Dim::Fixed(model.packed_len()?));
        model.dsize = total_dsize(&[&left, &right]);
        model.add_group(CrossSettings { left: Arc::new(left), right: Arc::new(right) });
        Ok(())
    }

    fn estimate(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let (views, left_data, right_data) = resolve(data, model)?;
        let left = dispatch::estimate(left_data.as_ref(), &views[0])?;
        let right = dispatch::estimate(right_data.as_ref(), &views[1])?;
        store_concatenated(&[left.clone(), right.clone()], model)?;

        let ll = dispatch::log_likelihood(left_data.as_ref(), &left)?
            + dispatch::log_likelihood(right_data.as_ref(), &right)?;
        let infos = [left.info(), right.info()];
        let converged = infos.iter().all(|i| i.map_or(true, |i| i.converged));
        let mut info = EstimationInfo {
            iterations: infos.iter().flatten().map(|i| i.iterations).sum(),
            converged,
            state: if converged { MleState::Converged } else { MleState::Failed },
            status: if converged { "Both sides converged" } else { "A side did not converge" }
                .to_string(),
            ..EstimationInfo::closed_form(ll)
        };
        info.failure = infos.iter().flatten().find_map(|i| i.failure.clone());
        let n = data.map(Dataset::nrows);
        model.set_info(info.with_information_criteria(model.packed_len()?, n));
        Ok(())
    }

    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let (views, left_data, right_data) = resolve(data, model)?;
        Ok(dispatch::log_likelihood(left_data.as_ref(), &views[0])?
            + dispatch::log_likelihood(right_data.as_ref(), &views[1])?)
    }

    fn p(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let (views, left_data, right_data) = resolve(data, model)?;
        let left = dispatch::p(left_data.as_ref(), &views[0])?;
        Ok(left * dispatch::p(right_data.as_ref(), &views[1])?)
    }

    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        let (views, left_data, right_data) = resolve(data, model)?;
        let left = dispatch::score(left_data.as_ref(), &views[0])?;
        let right = dispatch::score(right_data.as_ref(), &views[1])?;
        concatenate(Axis(0), &[left.view(), right.view()])
            .map_err(|e| ModelError::ShapeError { reason: e.to_string() })
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let (views, _, _) = resolve(None, model)?;
        let left = dispatch::draw(rng, &views[0])?;
        let right = dispatch::draw(rng, &views[1])?;
        concatenate(Axis(0), &[left.view(), right.view()])
            .map_err(|e| ModelError::ShapeError { reason: e.to_string() })
    }

    fn cdf(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let (views, left_data, right_data) = resolve(data, model)?;
        Ok(dispatch::cdf(left_data.as_ref(), &views[0])?
            * dispatch::cdf(right_data.as_ref(), &views[1])?)
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let (mut views, left_data, right_data) = resolve(data, model)?;
        let moved = dispatch::constraint(left_data.as_ref(), &mut views[0])?
            + dispatch::constraint(right_data.as_ref(), &mut views[1])?;
        if moved > 0.0 {
            store_concatenated(&views, model)?;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{exponential_with, normal, normal_with};
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The joint log density as a sum of column-slice marginals.
    // - Concatenated parameters and draws.
    // - Per-side estimation and nested crosses.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The joint log density is the sum of the marginals on their columns.
    //
    // Given
    // -----
    // - Normal(0, 1) × Exponential(2) and two-column data.
    //
    // Expect
    // ------
    // - ℓ = ℓ_N(col 0) + ℓ_E(col 1); parameters [0, 1, 2].
    fn log_likelihood_sums_marginals() {
        // Arrange
        let left = normal_with(0.0, 1.0).expect("valid");
        let right = exponential_with(2.0).expect("valid");
        let data = Dataset::new(array![[0.5, 1.0], [-1.0, 3.0], [0.2, 0.5]]);
        let joint = cross(left.clone(), right.clone());

        // Act
        let ll = dispatch::log_likelihood(Some(&data), &joint).expect("both sides");

        // Assert
        let expected = dispatch::log_likelihood(Some(&data.columns(0..1).expect("col")), &left)
            .expect("left")
            + dispatch::log_likelihood(Some(&data.columns(1..2).expect("col")), &right)
                .expect("right");
        assert_relative_eq!(ll, expected, epsilon = 1e-12);
        assert_eq!(joint.packed().expect("joined"), array![0.0, 1.0, 2.0]);
        assert_eq!(joint.dsize(), Dim::Fixed(2));
    }

    #[test]
    // Purpose
    // -------
    // Draws concatenate and estimation fits each side on its own slice.
    //
    // Given
    // -----
    // - Normal × Normal, data with column means 1 and 10.
    //
    // Expect
    // ------
    // - Two-element draws; μ̂ = (1, 10) in packed positions 0 and 2.
    fn draws_concatenate_and_sides_fit_separately() {
        // Arrange
        let joint = cross(normal(), normal());
        let data = Dataset::new(array![[0.0, 9.0], [2.0, 11.0], [1.0, 10.0]]);
        let mut rng = StdRng::seed_from_u64(1);

        // Act
        let fitted = dispatch::estimate(Some(&data), &joint).expect("closed forms");
        let draw = dispatch::draw(&mut rng, &fitted).expect("both sides draw");

        // Assert
        let theta = fitted.packed().expect("fitted");
        assert_relative_eq!(theta[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(theta[2], 10.0, epsilon = 1e-12);
        assert_eq!(draw.len(), 2);
        assert!(fitted.info().expect("info").converged);
    }

    #[test]
    // Purpose
    // -------
    // `cross_many` nests left to right and rejects an empty list.
    //
    // Given
    // -----
    // - Three unit Normals; an empty list.
    //
    // Expect
    // ------
    // - Six parameters and width 3; `ShapeError`.
    fn cross_many_nests() {
        // Arrange
        let parts = vec![
            normal_with(0.0, 1.0).expect("valid"),
            normal_with(0.0, 1.0).expect("valid"),
            normal_with(0.0, 1.0).expect("valid"),
        ];

        // Act
        let joint = cross_many(parts).expect("non-empty");

        // Assert
        assert_eq!(joint.packed().expect("joined").len(), 6);
        assert_eq!(joint.dsize(), Dim::Fixed(3));
        assert!(matches!(cross_many(Vec::new()), Err(ModelError::ShapeError { .. })));
    }
}
