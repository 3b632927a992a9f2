//! mcmc — random-walk Metropolis sampling of model parameters.
//!
//! Purpose
//! -------
//! Draw parameter vectors from the density proportional to `exp(ℓ(θ))`
//! for any model with a log-likelihood, as a lazy iterator.
//!
//! Key behaviors
//! -------------
//! - [`metropolis_draw`] preps a private copy of the model and returns a
//!   [`MetropolisChain`] started at its (projected) current parameters.
//! - Each step proposes a Gaussian random-walk move scaled by
//!   [`McmcSettings::step_scale`]; infeasible proposals, non-finite
//!   log-likelihoods, and numeric evaluation errors are rejected without
//!   consulting the acceptance ratio.
//! - A configuration error (shape, missing data, unsupported slot) stops
//!   the chain and is kept on [`MetropolisChain::halted`].
//! - With `adapt` the scale is nudged every step toward the target
//!   acceptance rate.
//!
//! Invariants & assumptions
//! ------------------------
//! - The chain never stores a state with non-finite ℓ.
//! - The caller's model is never mutated.
//!
//! Downstream usage
//! ----------------
//! - Install [`McmcSettings`] on the model with `with_group`, then take
//!   draws with `chain.take(n)` or `chain.skip(burn_in)`.
//!
//! Testing notes
//! -------------
//! - Acceptance behavior is checked on a standard-normal target for a
//!   far-too-wide proposal and a well-tuned one; adaptation is checked to
//!   shrink an oversized scale.
pub mod metropolis;
pub mod settings;

pub use self::metropolis::{McmcDraw, MetropolisChain, metropolis_draw};
pub use self::settings::McmcSettings;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Dim, ParamShape};
    use crate::distributions::normal_with;
    use crate::model::{MethodTable, Model, ModelError, ModelMethods};
    use std::sync::Arc;
    use approx::assert_relative_eq;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Acceptance rates for badly and well scaled proposals.
    // - Rejection of proposals outside the feasible region.
    // - Scale adaptation, restarts, and non-finite starting points.
    // - Numeric evaluation errors rejecting, configuration errors stopping.
    // -------------------------------------------------------------------------

    /// One-parameter model with ℓ(θ) = −θ²/2 and a constraint θ ≥ `floor`.
    fn standard_normal_target(floor: Option<f64>, settings: McmcSettings) -> Model {
        let methods = MethodTable::builder()
            .log_likelihood(|_, m| {
                let theta = m.packed()?;
                Ok(-0.5 * theta[0] * theta[0])
            })
            .constraint(move |_, m| {
                let Some(floor) = floor else {
                    return Ok(0.0);
                };
                let theta = m.param_vector_mut()?;
                if theta[0] >= floor {
                    return Ok(0.0);
                }
                let moved = floor - theta[0];
                theta[0] = floor;
                Ok(moved)
            })
            .build();
        one_parameter("standard normal target", methods, settings)
    }

    fn one_parameter(name: &str, methods: Arc<dyn ModelMethods>, settings: McmcSettings) -> Model {
        Model::new(name, ParamShape::vector(Dim::Fixed(1)), Dim::Fixed(0), methods)
            .with_parameters(&[0.5])
            .expect("one parameter")
            .with_group(settings)
    }

    /// ℓ(θ) = −θ²/2 below θ = 2, and `above(θ)` as an error beyond it.
    fn failing_above_two(above: fn(f64) -> ModelError) -> Model {
        let methods = MethodTable::builder()
            .log_likelihood(move |_, m| {
                let theta = m.packed()?;
                if theta[0] > 2.0 {
                    return Err(above(theta[0]));
                }
                Ok(-0.5 * theta[0] * theta[0])
            })
            .build();
        let settings = McmcSettings::new(1.0, false, 0.35).expect("valid");
        one_parameter("failing target", methods, settings)
    }

    #[test]
    // Purpose
    // -------
    // A proposal scale far wider than the target is almost always rejected.
    //
    // Given
    // -----
    // - Standard-normal target, step scale 100, 10,000 draws.
    //
    // Expect
    // ------
    // - Acceptance rate below 5%.
    fn wide_proposals_are_mostly_rejected() {
        // Arrange
        let settings = McmcSettings::new(100.0, false, 0.35).expect("valid");
        let model = standard_normal_target(None, settings);
        let mut chain = metropolis_draw(None, &model, StdRng::seed_from_u64(5)).expect("finite");

        // Act
        let accepted = chain.by_ref().take(10_000).filter(|d| d.accepted).count();

        // Assert
        assert!(chain.acceptance_rate() < 0.05, "rate = {}", chain.acceptance_rate());
        assert_relative_eq!(chain.acceptance_rate(), accepted as f64 / 10_000.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A well-scaled proposal accepts at a moderate rate and explores the
    // target.
    //
    // Given
    // -----
    // - Standard-normal target, step scale 2.4, 10,000 draws.
    //
    // Expect
    // ------
    // - Acceptance rate in (0.2, 0.6); sample mean within 0.15 of 0 and
    //   sample variance within 0.25 of 1.
    fn tuned_proposals_explore_target() {
        // Arrange
        let settings = McmcSettings::new(2.4, false, 0.35).expect("valid");
        let model = standard_normal_target(None, settings);
        let mut chain = metropolis_draw(None, &model, StdRng::seed_from_u64(11)).expect("finite");

        // Act
        let draws: Vec<f64> = chain.by_ref().take(10_000).map(|d| d.theta[0]).collect();

        // Assert
        let rate = chain.acceptance_rate();
        assert!(rate > 0.2 && rate < 0.6, "rate = {rate}");
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.15, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.25, "var = {var}");
    }

    #[test]
    // Purpose
    // -------
    // Proposals the constraint would move are rejected, so the chain stays
    // feasible.
    //
    // Given
    // -----
    // - Standard-normal target restricted to θ ≥ 0, 2000 draws.
    //
    // Expect
    // ------
    // - Every state is non-negative.
    fn infeasible_proposals_are_rejected() {
        // Arrange
        let model = standard_normal_target(Some(0.0), McmcSettings::default());
        let chain = metropolis_draw(None, &model, StdRng::seed_from_u64(2)).expect("finite");

        // Act
        let draws: Vec<McmcDraw> = chain.take(2000).collect();

        // Assert
        assert!(draws.iter().all(|d| d.theta[0] >= 0.0));
        assert!(draws.iter().all(|d| d.log_likelihood.is_finite()));
    }

    #[test]
    // Purpose
    // -------
    // Adaptation shrinks an oversized step scale.
    //
    // Given
    // -----
    // - Standard-normal target, step scale 100 with `adapt` on, 2000 draws.
    //
    // Expect
    // ------
    // - Final scale below 10; without `adapt` the scale is unchanged.
    fn adaptation_shrinks_oversized_scale() {
        // Arrange
        let adaptive_settings = McmcSettings::new(100.0, true, 0.35).expect("valid");
        let fixed_settings = McmcSettings::new(100.0, false, 0.35).expect("valid");
        let adaptive = standard_normal_target(None, adaptive_settings);
        let fixed = standard_normal_target(None, fixed_settings);
        let mut a = metropolis_draw(None, &adaptive, StdRng::seed_from_u64(8)).expect("finite");
        let mut f = metropolis_draw(None, &fixed, StdRng::seed_from_u64(8)).expect("finite");

        // Act
        a.by_ref().take(2000).for_each(drop);
        f.by_ref().take(2000).for_each(drop);

        // Assert
        assert!(a.step_scale() < 10.0, "scale = {}", a.step_scale());
        assert_eq!(f.step_scale(), 100.0);
    }

    #[test]
    // Purpose
    // -------
    // Restarts move the chain and reset the counters; a start with
    // non-finite ℓ is refused.
    //
    // Given
    // -----
    // - A Normal(0, 1) model on data [0.1, −0.3]; a restart at (1, 2); a
    //   target whose ℓ is −∞ everywhere.
    //
    // Expect
    // ------
    // - The restarted state is (1, 2) with zero acceptance rate;
    //   `into_model` carries the state; `NonFiniteLogLikelihood` otherwise.
    fn restart_and_non_finite_start() {
        // Arrange
        let data = Dataset::from_column(&[0.1, -0.3]);
        let model = normal_with(0.0, 1.0).expect("valid");
        let mut chain =
            metropolis_draw(Some(&data), &model, StdRng::seed_from_u64(4)).expect("finite");
        chain.by_ref().take(50).for_each(drop);
        let flat = MethodTable::builder().log_likelihood(|_, _| Ok(f64::NEG_INFINITY)).build();
        let hopeless = Model::new("flat", ParamShape::vector(Dim::Fixed(1)), Dim::Fixed(0), flat);

        // Act
        chain.restart_from(ndarray::array![1.0, 2.0].view()).expect("finite there");

        // Assert
        assert_eq!(chain.acceptance_rate(), 0.0);
        assert_eq!(chain.state(), &ndarray::array![1.0, 2.0]);
        let moved = chain.into_model().expect("parametrized");
        assert_eq!(moved.packed().expect("set"), ndarray::array![1.0, 2.0]);
        assert!(matches!(
            metropolis_draw(None, &hopeless, StdRng::seed_from_u64(0)),
            Err(ModelError::NonFiniteLogLikelihood { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A numeric failure while evaluating a proposal is a rejection; the
    // chain keeps running.
    //
    // Given
    // -----
    // - ℓ = −θ²/2 that errors with `NonFiniteLogLikelihood` above θ = 2,
    //   step scale 1, 5000 draws.
    //
    // Expect
    // ------
    // - All 5000 draws are produced, every state is at most 2, and the chain
    //   is not halted.
    fn numeric_errors_reject_the_proposal() {
        // Arrange
        let model = failing_above_two(|value| ModelError::NonFiniteLogLikelihood { value });
        let mut chain = metropolis_draw(None, &model, StdRng::seed_from_u64(6)).expect("finite");

        // Act
        let draws: Vec<McmcDraw> = chain.by_ref().take(5000).collect();

        // Assert
        assert_eq!(draws.len(), 5000);
        assert!(draws.iter().all(|d| d.theta[0] <= 2.0));
        assert!(chain.halted().is_none());
    }

    #[test]
    // Purpose
    // -------
    // A configuration error while evaluating a proposal stops the chain
    // instead of being counted as a rejection.
    //
    // Given
    // -----
    // - ℓ = −θ²/2 that errors with `ShapeError` above θ = 2, step scale 1.
    //
    // Expect
    // ------
    // - Fewer than 5000 draws come out, `halted` holds the `ShapeError`, and
    //   `next` keeps returning `None`.
    fn configuration_errors_stop_the_chain() {
        // Arrange
        let model = failing_above_two(|value| ModelError::ShapeError {
            reason: format!("θ = {value} outside the tabulated range"),
        });
        let mut chain = metropolis_draw(None, &model, StdRng::seed_from_u64(6)).expect("finite");

        // Act
        let produced = chain.by_ref().take(5000).count();

        // Assert
        assert!(produced < 5000, "produced = {produced}");
        assert!(matches!(chain.halted(), Some(ModelError::ShapeError { .. })));
        assert!(chain.next().is_none());
    }
}
