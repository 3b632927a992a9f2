//! transform::dcompose — data composition: draws from one model become the
//! data of another.
//!
//! Purpose
//! -------
//! Chain a generator model into a likelihood model. The composed model's
//! log-likelihood is the likelihood model's ℓ on a batch of draws from the
//! generator, so fitting it moves both models' parameters toward agreement.
//!
//! Key behaviors
//! -------------
//! - Parameters are the generator's pack followed by the likelihood
//!   model's.
//! - `log_likelihood` draws `draw_count` rows from the generator with an
//!   RNG seeded from `seed` and evaluates the likelihood model on them. The
//!   caller's data only reaches the generator's `prep` and `constraint`.
//! - `constraint` projects the generator (with the caller's data) and the
//!   likelihood model (without data) and reports the summed distance.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every evaluation reseeds, so ℓ is a deterministic function of θ and
//!   optimizers and samplers see one fixed surface.
//! - The likelihood model's parameter count must be known without data.
use crate::data::{Dataset, Dim, ParamShape, Parameters};
use crate::model::{
    Model, ModelMethods, dispatch,
    errors::{ModelError, ModelResult},
    settings::SettingsGroup,
};
use crate::transform::{components_with_params, concatenated_layout, store_concatenated};
use ndarray::Array1;
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;

/// Default number of generator draws per evaluation.
pub const DEFAULT_DRAW_COUNT: usize = 10_000;

/// Draw count and seed for [`dcompose_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcomposeOptions {
    pub draw_count: usize,
    pub seed: u64,
}

impl Default for DcomposeOptions {
    fn default() -> Self {
        Self { draw_count: DEFAULT_DRAW_COUNT, seed: 0 }
    }
}

impl DcomposeOptions {
    /// # Errors
    /// - `ModelError::InvalidSettings` if `draw_count` is 0.
    pub fn with_draw_count(mut self, draw_count: usize) -> ModelResult<Self> {
        if draw_count == 0 {
            return Err(ModelError::InvalidSettings {
                name: "draw_count",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        self.draw_count = draw_count;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Generator, likelihood model, and options.
#[derive(Debug, Clone)]
pub struct CompositionSettings {
    pub generator: Arc<Model>,
    pub likelihood: Arc<Model>,
    pub options: DcomposeOptions,
}

impl SettingsGroup for CompositionSettings {
    const TAG: &'static str = "composition";

    fn deep_copy(&self) -> Self {
        Self {
            generator: Arc::new(self.generator.copy_deep()),
            likelihood: Arc::new(self.likelihood.copy_deep()),
            options: self.options,
        }
    }
}

impl CompositionSettings {
    fn parts(&self) -> [Arc<Model>; 2] {
        [Arc::clone(&self.generator), Arc::clone(&self.likelihood)]
    }
}

/// Method table of data-composed models.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dcomposed;

/// `likelihood` evaluated on draws from `generator`, with default options.
pub fn dcompose(generator: Model, likelihood: Model) -> Model {
    dcompose_with(generator, likelihood, DcomposeOptions::default())
}

/// `likelihood` evaluated on draws from `generator`.
pub fn dcompose_with(generator: Model, likelihood: Model, options: DcomposeOptions) -> Model {
    let (shape, params) = concatenated_layout(&[&generator, &likelihood]);
    let mut wrapper = Model::new(
        format!("{} -> {}", generator.name(), likelihood.name()),
        shape,
        likelihood.dsize(),
        Arc::new(Dcomposed),
    );
    wrapper.parameters = params.map(Parameters::from_vector);
    wrapper.add_group(CompositionSettings {
        generator: Arc::new(generator),
        likelihood: Arc::new(likelihood),
        options,
    });
    wrapper
}

/// `count` generator draws from a fresh RNG seeded with `seed`.
fn seeded_draws(generator: &Model, count: usize, seed: u64) -> ModelResult<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        rows.push(dispatch::draw(&mut rng, generator)?.to_vec());
    }
    Dataset::from_rows(&rows)
}

impl ModelMethods for Dcomposed {
    fn prep(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let mut settings = model.group::<CompositionSettings>()?.clone();
        let mut generator = (*settings.generator).clone();
        dispatch::prep(data, &mut generator)?;
        let mut likelihood = (*settings.likelihood).clone();
        dispatch::prep(None, &mut likelihood)?;

        if model.parameters.is_none() {
            let mut joined = generator.packed()?.to_vec();
            joined.extend(likelihood.packed()?.iter().copied());
            model.parameters = Some(Parameters::from_vector(Array1::from(joined)));
        }
        model.shape = ParamShape::vector(Dim::Fixed(model.packed_len()?));
        model.dsize = likelihood.dsize();
        settings.generator = Arc::new(generator);
        settings.likelihood = Arc::new(likelihood);
        model.add_group(settings);
        Ok(())
    }

    fn log_likelihood(&self, _data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let settings = model.group::<CompositionSettings>()?;
        let views = components_with_params(&settings.parts(), model)?;
        let draws = seeded_draws(&views[0], settings.options.draw_count, settings.options.seed)?;
        dispatch::log_likelihood(Some(&draws), &views[1])
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let settings = model.group::<CompositionSettings>()?;
        let mut views = components_with_params(&settings.parts(), model)?;
        let moved = dispatch::constraint(data, &mut views[0])?
            + dispatch::constraint(None, &mut views[1])?;
        if moved > 0.0 {
            store_concatenated(&views, model)?;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::normal_with;
    use crate::optimization::numerical_stability::POSITIVITY_MARGIN;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parameter layout and option validation.
    // - ℓ as the likelihood model's ℓ on reproducible generator draws.
    // - ℓ favoring a generator that matches the likelihood model.
    // - Constraint projection of both parts.
    // -------------------------------------------------------------------------

    fn options() -> DcomposeOptions {
        DcomposeOptions::default().with_draw_count(200).expect("positive").with_seed(31)
    }

    #[test]
    // Purpose
    // -------
    // Parameters concatenate generator then likelihood model; a zero draw
    // count is refused.
    //
    // Given
    // -----
    // - Generator Normal(1, 2) and likelihood model Normal(0, 1).
    //
    // Expect
    // ------
    // - Packed θ = [1, 2, 0, 1]; `with_draw_count(0)` is `InvalidSettings`.
    fn parameters_stack_generator_first() {
        // Arrange
        let generator = normal_with(1.0, 2.0).expect("valid");
        let likelihood = normal_with(0.0, 1.0).expect("valid");

        // Act
        let model = dcompose(generator, likelihood);

        // Assert
        assert_eq!(model.packed().expect("set"), array![1.0, 2.0, 0.0, 1.0]);
        assert!(matches!(
            DcomposeOptions::default().with_draw_count(0),
            Err(ModelError::InvalidSettings { name: "draw_count", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // ℓ is the likelihood model's ℓ on seeded generator draws and does not
    // change between evaluations.
    //
    // Given
    // -----
    // - Generator Normal(1, 2), likelihood model Normal(0, 1), 200 draws
    //   with seed 31.
    //
    // Expect
    // ------
    // - ℓ equals the likelihood model's ℓ on the same 200 draws, exactly,
    //   on both of two evaluations.
    fn log_likelihood_scores_seeded_draws() {
        // Arrange
        let generator = normal_with(1.0, 2.0).expect("valid");
        let likelihood = normal_with(0.0, 1.0).expect("valid");
        let model = dcompose_with(generator.clone(), likelihood.clone(), options());

        // Act
        let first = dispatch::log_likelihood(None, &model).expect("evaluates");
        let second = dispatch::log_likelihood(None, &model).expect("evaluates");

        // Assert
        let draws = seeded_draws(&generator, 200, 31).expect("draws");
        let direct = dispatch::log_likelihood(Some(&draws), &likelihood).expect("slot");
        assert_eq!(first, direct);
        assert_eq!(first, second);
    }

    #[test]
    // Purpose
    // -------
    // A generator agreeing with the likelihood model scores higher than a
    // shifted one.
    //
    // Given
    // -----
    // - Likelihood model Normal(2, 1); generators Normal(2, 1) and
    //   Normal(0, 1) under the same seed.
    //
    // Expect
    // ------
    // - ℓ(matching) > ℓ(shifted).
    fn matching_generator_scores_higher() {
        // Arrange
        let target = normal_with(2.0, 1.0).expect("valid");
        let matching =
            dcompose_with(normal_with(2.0, 1.0).expect("valid"), target.clone(), options());
        let shifted = dcompose_with(normal_with(0.0, 1.0).expect("valid"), target, options());

        // Act
        let ll_matching = dispatch::log_likelihood(None, &matching).expect("evaluates");
        let ll_shifted = dispatch::log_likelihood(None, &shifted).expect("evaluates");

        // Assert
        assert!(ll_matching > ll_shifted, "{ll_matching} <= {ll_shifted}");
    }

    #[test]
    // Purpose
    // -------
    // The constraint projects both parts and writes them back.
    //
    // Given
    // -----
    // - θ = [0, −1, 0, −2]: both Normal scales negative.
    //
    // Expect
    // ------
    // - Distance 3 + 2·margin; both scales moved to the positivity margin.
    fn constraint_projects_both_parts() {
        // Arrange
        let generator = normal_with(0.0, 1.0).expect("valid");
        let likelihood = normal_with(0.0, 1.0).expect("valid");
        let mut model = dcompose(generator, likelihood)
            .with_parameters(&[0.0, -1.0, 0.0, -2.0])
            .expect("four parameters");

        // Act
        let moved = dispatch::constraint(None, &mut model).expect("slot");

        // Assert
        let theta = model.packed().expect("set");
        assert_relative_eq!(moved, 3.0 + 2.0 * POSITIVITY_MARGIN, epsilon = 1e-12);
        assert_eq!(theta[1], POSITIVITY_MARGIN);
        assert_eq!(theta[3], POSITIVITY_MARGIN);
    }
}
