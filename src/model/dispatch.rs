//! model::dispatch — uniform operations over any model, with fallbacks.
//!
//! Purpose
//! -------
//! Provide the calling convention every caller (and every combinator) uses
//! to operate on a model without knowing its concrete type. Each operation
//! invokes the model's method slot and, when the slot reports
//! `SlotNotImplemented`, follows an explicit fallback chain.
//!
//! Key behaviors
//! -------------
//! - [`prep`]: slot, else allocate zeroed parameters from the declared
//!   shape (data-sized dimensions resolved from the column count).
//!   Idempotent.
//! - [`estimate`]: prep a copy, then the `estimate` slot, else
//!   `maximum_likelihood`. The input model is never mutated.
//! - [`log_likelihood`]: slot, else `Σ_rows ln p(row)`, else
//!   `UnsupportedOperation`.
//! - [`p`]: slot, else `exp(log_likelihood slot)`, else
//!   `UnsupportedOperation`.
//! - [`draw`], [`cdf`]: slot, else `UnsupportedOperation`. `cdf` is never
//!   simulated from draws.
//! - [`constraint`]: slot, else "always feasible" (0.0).
//! - [`score`]: slot, else a symmetric finite-difference gradient of
//!   [`log_likelihood`] over the packed parameters.
//!
//! Invariants & assumptions
//! ------------------------
//! - The `p`/`log_likelihood` fallbacks consult the other *slot* only, so the
//!   two can never recurse into each other.
//! - Only configuration-free failures are converted: a slot returning any
//!   error other than `SlotNotImplemented` is propagated unchanged.
//!
//! Downstream usage
//! ----------------
//! - Combinators call these functions on their base models, so fallbacks
//!   compose: a `fix_params` over a `p`-only model still has a
//!   log-likelihood.
//! - The optimizer and sampler only ever use this module.
//!
//! Testing notes
//! -------------
//! - Unit tests check the `p`↔`log_likelihood` equivalence, prep
//!   idempotence and shape failures, unsupported operations, and the
//!   numerical score against an analytic one.
use crate::data::{Dataset, Parameters};
use crate::mle::{maximum_likelihood, settings::MleSettings};
use crate::model::{
    descriptor::Model,
    errors::{ModelError, ModelResult},
};
use crate::optimization::loglik_optimizer::{Theta, finite_diff::symmetric_gradient};
use ndarray::Array1;
use rand::RngCore;
use std::cell::RefCell;
use std::sync::Arc;

/// Resolve sizes and allocate parameters. A second call is a no-op.
///
/// # Errors
/// - `ModelError::ShapeError` if a data-sized dimension has no data.
/// - Errors from the model's own `prep` slot.
pub fn prep(data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
    if model.prepared {
        return Ok(());
    }
    let methods = Arc::clone(model.methods());
    match methods.prep(data, model) {
        Ok(()) => {}
        Err(ModelError::SlotNotImplemented) => default_prep(data, model)?,
        Err(e) => return Err(e),
    }
    model.prepared = true;
    Ok(())
}

/// Generic prep: resolve `shape`/`dsize` and allocate zeroed parameters
/// unless the model already carries some.
pub(crate) fn default_prep(data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
    let cols = data.map(Dataset::ncols);
    let shape = model.shape.resolve(cols)?;
    if model.parameters.is_none() {
        model.parameters = Some(Parameters::zeros(&shape));
    }
    model.shape = shape.into();
    if let Ok(width) = model.dsize.resolve(cols, "dsize") {
        model.dsize = crate::data::Dim::Fixed(width);
    }
    Ok(())
}

/// Fit `model` to `data` and return the fitted copy.
///
/// # Errors
/// - Errors from `prep`, the `estimate` slot, or `maximum_likelihood`.
///   Non-convergence is not an error; it is recorded on the returned
///   model's `info`.
pub fn estimate(data: Option<&Dataset>, model: &Model) -> ModelResult<Model> {
    let mut fitted = model.clone();
    prep(data, &mut fitted)?;
    let methods = Arc::clone(fitted.methods());
    match methods.estimate(data, &mut fitted) {
        Ok(()) => Ok(fitted),
        Err(ModelError::SlotNotImplemented) => maximum_likelihood(data, &fitted),
        Err(e) => Err(e),
    }
}

/// Log-likelihood of `data` under `model`.
///
/// # Errors
/// - `ModelError::UnsupportedOperation` if neither `log_likelihood` nor `p`
///   is implemented.
pub fn log_likelihood(data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
    let methods = model.methods();
    match methods.log_likelihood(data, model) {
        Err(ModelError::SlotNotImplemented) => {}
        other => return other,
    }
    let not_supported = || unsupported(model, "log_likelihood");
    match data {
        Some(d) if d.nrows() > 0 => {
            let mut total = 0.0;
            for index in 0..d.nrows() {
                let row = d.row_dataset(index)?;
                match methods.p(Some(&row), model) {
                    Ok(density) => total += density.ln(),
                    Err(ModelError::SlotNotImplemented) => return Err(not_supported()),
                    Err(e) => return Err(e),
                }
            }
            Ok(total)
        }
        _ => match methods.p(data, model) {
            Ok(density) => Ok(density.ln()),
            Err(ModelError::SlotNotImplemented) => Err(not_supported()),
            Err(e) => Err(e),
        },
    }
}

/// Joint density of `data` under `model`.
///
/// # Errors
/// - `ModelError::UnsupportedOperation` if neither `p` nor `log_likelihood`
///   is implemented.
pub fn p(data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
    let methods = model.methods();
    match methods.p(data, model) {
        Err(ModelError::SlotNotImplemented) => {}
        other => return other,
    }
    match methods.log_likelihood(data, model) {
        Ok(ll) => Ok(ll.exp()),
        Err(ModelError::SlotNotImplemented) => Err(unsupported(model, "p")),
        Err(e) => Err(e),
    }
}

/// One draw from `model`.
///
/// # Errors
/// - `ModelError::UnsupportedOperation` if the model has no `draw` slot.
/// - `ModelError::ConstraintUnsatisfiable` from rejection samplers.
pub fn draw(rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
    match model.methods().draw(rng, model) {
        Err(ModelError::SlotNotImplemented) => Err(unsupported(model, "draw")),
        other => other,
    }
}

/// Cumulative probability at the first row of `data`.
///
/// # Errors
/// - `ModelError::UnsupportedOperation` if the model has no `cdf` slot.
pub fn cdf(data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
    match model.methods().cdf(data, model) {
        Err(ModelError::SlotNotImplemented) => Err(unsupported(model, "cdf")),
        other => other,
    }
}

/// Project `model`'s parameters into the feasible region.
///
/// Returns the distance moved; models without a constraint are always
/// feasible and return `0.0`.
pub fn constraint(data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
    let methods = Arc::clone(model.methods());
    match methods.constraint(data, model) {
        Err(ModelError::SlotNotImplemented) => Ok(0.0),
        other => other,
    }
}

/// Gradient of the log-likelihood with respect to the packed parameters.
///
/// Without a `score` slot this is a symmetric finite difference of
/// [`log_likelihood`]. The step comes from `MleSettings::fd_step` when that
/// group is installed.
///
/// # Errors
/// - `ModelError::MissingParameters` before prep.
/// - Errors raised by the log-likelihood during differencing.
pub fn score(data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
    match model.methods().score(data, model) {
        Err(ModelError::SlotNotImplemented) => numeric_score(data, model),
        other => other,
    }
}

// ---- Helper methods ----

fn unsupported(model: &Model, operation: &'static str) -> ModelError {
    ModelError::UnsupportedOperation { model: model.name().to_string(), operation }
}

fn numeric_score(data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
    let theta = model.packed()?;
    let step = model.group::<MleSettings>().ok().and_then(|s| s.fd_step);
    let working = RefCell::new(model.clone());
    let closure_err: RefCell<Option<ModelError>> = RefCell::new(None);
    let ll = |t: &Theta| -> f64 {
        let mut m = working.borrow_mut();
        let value = match m.set_packed(t.view()) {
            Ok(()) => log_likelihood(data, &m),
            Err(e) => Err(e),
        };
        match value {
            Ok(v) => v,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };
    let grad = symmetric_gradient(&theta, &ll, step);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    Ok(grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dim, ParamShape};
    use crate::distributions::{bernoulli_with, exponential_with, normal_with, poisson_with};
    use crate::model::methods::MethodTable;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `p` ↔ `log_likelihood` fallbacks in both directions.
    // - Unsupported operations when no slot or fallback applies.
    // - `prep` idempotence and data-sized shape resolution.
    // - `constraint` default and the numerical `score` fallback.
    // - `estimate` leaving its input untouched.
    //
    // They intentionally DO NOT cover:
    // - Optimizer convergence details (see `mle`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A `p`-only model gets its log-likelihood as the sum of per-row logs.
    //
    // Given
    // -----
    // - Bernoulli(0.3) (only `p` implemented) and data [1, 0, 1, 1].
    //
    // Expect
    // ------
    // - `log_likelihood` equals `ln p` of the whole dataset and
    //   3 ln 0.3 + ln 0.7.
    fn log_likelihood_falls_back_to_log_of_p() {
        // Arrange
        let model = bernoulli_with(0.3).expect("valid probability");
        let data = Dataset::from_column(&[1.0, 0.0, 1.0, 1.0]);

        // Act
        let ll = log_likelihood(Some(&data), &model).expect("derived from p");
        let joint = p(Some(&data), &model).expect("slot present");

        // Assert
        assert_relative_eq!(ll, joint.ln(), epsilon = 1e-12);
        assert_relative_eq!(ll, 3.0 * 0.3_f64.ln() + 0.7_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A `log_likelihood`-only model gets `p` by exponentiation.
    //
    // Given
    // -----
    // - Poisson(2) (only `log_likelihood` implemented) and data [0, 1, 3].
    //
    // Expect
    // ------
    // - `p` equals `exp(log_likelihood)`.
    fn p_falls_back_to_exp_of_log_likelihood() {
        // Arrange
        let model = poisson_with(2.0).expect("valid rate");
        let data = Dataset::from_column(&[0.0, 1.0, 3.0]);

        // Act
        let density = p(Some(&data), &model).expect("derived from log_likelihood");
        let ll = log_likelihood(Some(&data), &model).expect("slot present");

        // Assert
        assert_relative_eq!(density, ll.exp(), max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // With neither density slot, both operations are unsupported, as are
    // `draw` and `cdf`.
    //
    // Given
    // -----
    // - A method table with no slots.
    //
    // Expect
    // ------
    // - `UnsupportedOperation` from `log_likelihood`, `p`, `draw`, `cdf`;
    //   `constraint` reports a feasible model.
    fn missing_slots_are_unsupported() {
        // Arrange
        let mut model = Model::new(
            "empty",
            ParamShape::vector(Dim::Fixed(1)),
            Dim::Fixed(1),
            MethodTable::builder().build(),
        );
        let data = Dataset::from_column(&[1.0]);
        let mut rng = rand::thread_rng();

        // Act / Assert
        assert!(matches!(
            log_likelihood(Some(&data), &model),
            Err(ModelError::UnsupportedOperation { operation: "log_likelihood", .. })
        ));
        assert!(matches!(
            p(Some(&data), &model),
            Err(ModelError::UnsupportedOperation { operation: "p", .. })
        ));
        assert!(matches!(draw(&mut rng, &model), Err(ModelError::UnsupportedOperation { .. })));
        assert!(matches!(cdf(Some(&data), &model), Err(ModelError::UnsupportedOperation { .. })));
        assert_eq!(constraint(Some(&data), &mut model).expect("default"), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Prep resolves data-sized shapes, fails without data, and is idempotent.
    //
    // Given
    // -----
    // - A model whose vector size is `Dim::FromData`.
    //
    // Expect
    // ------
    // - `ShapeError` without data; three zeros with 3-column data; a second
    //   prep keeps parameters written in between.
    fn prep_resolves_from_data_and_is_idempotent() {
        // Arrange
        let mut model = Model::new(
            "wide",
            ParamShape::vector(Dim::FromData),
            Dim::FromData,
            MethodTable::builder().build(),
        );
        let data = Dataset::new(array![[1.0, 2.0, 3.0]]);

        // Act
        let without = prep(None, &mut model.clone());
        prep(Some(&data), &mut model).expect("columns resolve the size");
        model.set_packed(array![7.0, 8.0, 9.0].view()).expect("three parameters");
        prep(Some(&data), &mut model).expect("second prep is a no-op");

        // Assert
        assert!(matches!(without, Err(ModelError::ShapeError { .. })));
        assert_eq!(model.packed().expect("allocated"), array![7.0, 8.0, 9.0]);
        assert_eq!(model.dsize(), Dim::Fixed(3));
    }

    #[test]
    // Purpose
    // -------
    // The numerical score agrees with an analytic one.
    //
    // Given
    // -----
    // - Normal(0.5, 1.5) with its analytic score, and a copy whose score is
    //   forced through the finite-difference fallback.
    //
    // Expect
    // ------
    // - Both gradients agree to ~1e-6.
    fn numeric_score_matches_analytic_score() {
        // Arrange
        let model = normal_with(0.5, 1.5).expect("valid normal");
        let data = Dataset::from_column(&[0.1, 1.2, -0.7, 2.2]);
        let ll_only = Model::new(
            "normal-ll",
            ParamShape::vector(Dim::Fixed(2)),
            Dim::Fixed(1),
            MethodTable::builder()
                .log_likelihood(|d, m| {
                    let theta = m.packed()?;
                    let d = d.ok_or_else(|| ModelError::DataRequired {
                        model: m.name().to_string(),
                        operation: "log_likelihood",
                    })?;
                    Ok(d.values()
                        .map(|x| {
                            let z = (x - theta[0]) / theta[1];
                            -0.5 * z * z - theta[1].ln()
                        })
                        .sum())
                })
                .build(),
        )
        .with_parameters(&[0.5, 1.5])
        .expect("two parameters");

        // Act
        let analytic = score(Some(&data), &model).expect("slot present");
        let numeric = score(Some(&data), &ll_only).expect("finite differences");

        // Assert
        assert_relative_eq!(analytic[0], numeric[0], epsilon = 1e-6);
        assert_relative_eq!(analytic[1], numeric[1], epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // `estimate` returns a fitted copy and leaves its input unfitted.
    //
    // Given
    // -----
    // - An Exponential model parametrized at 1.0 and data [1, 2, 3].
    //
    // Expect
    // ------
    // - The input keeps μ = 1 and has no info; the fitted copy has info.
    fn estimate_does_not_mutate_input() {
        // Arrange
        let model = exponential_with(1.0).expect("valid mean");
        let data = Dataset::from_column(&[1.0, 2.0, 3.0]);

        // Act
        let fitted = estimate(Some(&data), &model).expect("estimation runs");

        // Assert
        assert_eq!(model.packed().expect("set"), array![1.0]);
        assert!(model.info().is_none());
        assert!(fitted.info().is_some());
    }
}
