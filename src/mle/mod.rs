//! mle — generic maximum-likelihood estimation for any model.
//!
//! Purpose
//! -------
//! Fit any model that exposes `log_likelihood` (or `p`) by numerically
//! maximizing its likelihood surface over the packed parameter vector. This
//! is the `estimate` fallback for every model without a closed form.
//!
//! Key behaviors
//! -------------
//! - [`maximum_likelihood`] preps a copy, picks θ₀ (the installed
//!   [`MleSettings`] start, else parameters the caller already set, else
//!   all ones), projects it through the constraint, runs the optimizer, and
//!   records an [`EstimationInfo`].
//! - A run that reports convergence at a point beyond [`RESTART_BOUNDARY`]
//!   (or at a non-finite point) is treated as diverged and recorded as a
//!   failure.
//! - Runs that stop without converging, or end on the constraint boundary,
//!   are retried from the best point perturbed by N(0, restart_scale²), up
//!   to `restarts` times; a diverged run restarts from θ₀ instead. Runs
//!   inside the boundary beat diverged ones; among those the best
//!   log-likelihood wins.
//! - [`record_closed_form`] fills `info` for models whose `estimate` slot
//!   solves the problem analytically.
//! - [`estimate_restart`] re-runs from an existing fit and keeps whichever
//!   of the two fits is better.
//! - With `want_covariance`, the inverse observed information is attached;
//!   a singular information matrix is recorded, not raised.
//!
//! Invariants & assumptions
//! ------------------------
//! - The input model is never mutated.
//! - State machine: `Initialized → Iterating → Converged | Failed`. A
//!   non-finite ℓ at θ₀ goes straight to `Failed`.
//! - Non-convergence is not an error: the fitted copy carries
//!   `info.failure = Some(ConvergenceFailure)`.
//! - Configuration errors (shape, unsupported operation, invalid settings)
//!   are returned as errors and never retried.
//!
//! Conventions
//! -----------
//! - Reported `log_likelihood` is the unpenalized ℓ at the final, projected
//!   parameters.
//! - AIC is `2k − 2ℓ`; BIC `k ln n − 2ℓ` is filled only with data.
//!
//! Testing notes
//! -------------
//! - Unit tests fit the Exponential mean with L-BFGS and Nelder–Mead,
//!   check determinism, iteration caps, restarts, and the Normal
//!   covariance against σ²/n.
pub mod objective;
pub mod settings;

pub use self::objective::ModelObjective;
pub use self::settings::MleSettings;

use crate::data::Dataset;
use crate::inference::hessian::model_covariance;
use crate::model::{
    Model, dispatch,
    errors::{ModelError, ModelResult},
    info::{EstimationInfo, MleState},
};
use crate::optimization::loglik_optimizer::{
    FnEvalMap, LogLikelihood, MLEOptions, OptimOutcome, Theta, maximize,
};
use ndarray::Array1;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

/// Parameters beyond this magnitude mark a run as diverged.
pub const RESTART_BOUNDARY: f64 = 1e8;

/// One optimizer run, reduced to what restart selection needs.
#[derive(Debug, Clone)]
struct Attempt {
    theta: Theta,
    log_likelihood: f64,
    converged: bool,
    binding: bool,
    diverged: bool,
    status: String,
    iterations: usize,
    fn_evals: FnEvalMap,
    grad_norm: Option<f64>,
    failure: Option<ModelError>,
}

/// Fit `model` to `data` by maximum likelihood and return the fitted copy.
///
/// # Errors
/// - Errors from `prep` and from evaluating ℓ at the starting point.
/// - `ModelError::ShapeError` if `starting_point` has the wrong length.
/// - Configuration errors raised by the model during optimization.
///
/// Convergence failures and singular Hessians are recorded on `info`.
pub fn maximum_likelihood(data: Option<&Dataset>, model: &Model) -> ModelResult<Model> {
    let mut fitted = model.clone();
    dispatch::prep(data, &mut fitted)?;
    let settings = fitted.settings().get_or_default::<MleSettings>();
    let opts = settings.to_options()?;
    let k = fitted.packed_len()?;
    let n = data.map(Dataset::nrows);

    let mut state = MleState::Initialized;
    match &settings.starting_point {
        Some(start) => fitted.set_packed(Array1::from(start.clone()).view())?,
        None if model.parameters.is_none() => fitted.set_packed(Array1::ones(k).view())?,
        None => {}
    }
    dispatch::constraint(data, &mut fitted)?;
    let ll0 = dispatch::log_likelihood(data, &fitted)?;
    if !ll0.is_finite() {
        log::warn!("{}: log-likelihood at the starting point is {ll0}", fitted.name());
        let failure = ModelError::NonFiniteLogLikelihood { value: ll0 };
        fitted.set_info(EstimationInfo::failed(ll0, failure).with_information_criteria(k, n));
        return Ok(fitted);
    }

    log::debug!("{}: {state:?} -> {:?} at ℓ = {ll0}", fitted.name(), MleState::Iterating);
    state = MleState::Iterating;
    let theta0 = fitted.packed()?;
    let mut best = run_attempt(data, &fitted, theta0.clone(), ll0, &opts)?;
    let mut restarts = 0;
    if settings.restarts > 0 && (!best.converged || best.binding) {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let noise = Normal::new(0.0, settings.restart_scale).map_err(|_| {
            ModelError::InvalidSettings {
                name: "restart_scale",
                value: settings.restart_scale,
                reason: "must be finite and positive",
            }
        })?;
        while restarts < settings.restarts && (!best.converged || best.binding) {
            restarts += 1;
            let base = if best.diverged { &theta0 } else { &best.theta };
            let start = base.mapv(|t| t + noise.sample(&mut rng));
            let start_ll = ModelObjective::new(&fitted, data)
                .value(&start, &())
                .unwrap_or(f64::NEG_INFINITY);
            let attempt = run_attempt(data, &fitted, start, start_ll, &opts)?;
            log::info!(
                "{}: restart {restarts}/{} reached ℓ = {} ({})",
                fitted.name(),
                settings.restarts,
                attempt.log_likelihood,
                attempt.status
            );
            if attempt.beats(&best) {
                best = attempt;
            }
        }
    }

    fitted.set_packed(best.theta.view())?;
    dispatch::constraint(data, &mut fitted)?;
    let ll = dispatch::log_likelihood(data, &fitted)?;
    let mut info = EstimationInfo {
        log_likelihood: ll,
        iterations: best.iterations,
        converged: best.converged,
        state: if best.converged { MleState::Converged } else { MleState::Failed },
        status: best.status.clone(),
        restarts,
        fn_evals: best.fn_evals.clone(),
        grad_norm: best.grad_norm,
        ..EstimationInfo::closed_form(ll)
    };
    if !best.converged {
        let failure = best.failure.clone().unwrap_or(ModelError::ConvergenceFailure {
            iterations: best.iterations,
            status: best.status.clone(),
        });
        log::warn!("{}: estimation did not converge: {failure}", fitted.name());
        info.failure = Some(failure);
    }
    log::debug!("{}: {state:?} -> {:?} at ℓ = {ll}", fitted.name(), info.state);

    if settings.want_covariance {
        attach_covariance(data, &fitted, &mut info)?;
    }
    fitted.set_info(info.with_information_criteria(k, n));
    Ok(fitted)
}

/// Record the outcome of an analytic `estimate` on `model`.
///
/// `info` becomes a converged, zero-iteration fit at the current
/// parameters, with AIC/BIC and, when the model's [`MleSettings`] ask for
/// it, the inverse observed information.
///
/// # Errors
/// - Errors from evaluating ℓ, and configuration errors from the
///   covariance.
pub fn record_closed_form(data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
    let ll = dispatch::log_likelihood(data, model)?;
    let k = model.packed_len()?;
    let mut info = EstimationInfo::closed_form(ll);
    if model.settings().get_or_default::<MleSettings>().want_covariance {
        attach_covariance(data, model, &mut info)?;
    }
    model.set_info(info.with_information_criteria(k, data.map(Dataset::nrows)));
    Ok(())
}

/// Re-estimate from an existing fit and keep the better result.
///
/// The rerun starts at `fitted`'s parameters, using `settings` when given
/// (for example a different method or tighter tolerances) and otherwise the
/// fit's own `MleSettings`. The rerun is discarded if it lowers ℓ or if any
/// parameter is non-finite or exceeds [`RESTART_BOUNDARY`] in magnitude.
///
/// # Errors
/// - `ModelError::MissingParameters` if `fitted` has no parameters.
/// - Errors from [`maximum_likelihood`] or from evaluating ℓ.
pub fn estimate_restart(
    data: Option<&Dataset>, fitted: &Model, settings: Option<MleSettings>,
) -> ModelResult<Model> {
    let theta = fitted.packed()?;
    let mut settings = settings.unwrap_or_else(|| fitted.settings().get_or_default());
    settings.starting_point = Some(theta.to_vec());
    let rerun = maximum_likelihood(data, &fitted.clone().with_group(settings))?;

    let old_ll = match fitted.info() {
        Some(info) => info.log_likelihood,
        None => dispatch::log_likelihood(data, fitted)?,
    };
    let new_ll = rerun.info().map_or(f64::NEG_INFINITY, |info| info.log_likelihood);
    let diverged = is_diverged(&rerun.packed()?);
    if diverged || !(new_ll > old_ll) {
        log::debug!("{}: restart kept the previous fit (ℓ = {old_ll})", fitted.name());
        return Ok(fitted.clone());
    }
    Ok(rerun)
}

// ---- Helper methods ----

impl Attempt {
    /// Runs inside the boundary beat diverged runs, then higher ℓ wins.
    fn beats(&self, other: &Attempt) -> bool {
        match (self.diverged, other.diverged) {
            (false, true) => true,
            (true, false) => false,
            _ => self.log_likelihood > other.log_likelihood,
        }
    }
}

fn attach_covariance(
    data: Option<&Dataset>, fitted: &Model, info: &mut EstimationInfo,
) -> ModelResult<()> {
    match model_covariance(data, fitted) {
        Ok(cov) => info.covariance = Some(cov),
        Err(e) if e.is_configuration_error() => return Err(e),
        Err(e) => {
            log::warn!("{}: covariance omitted: {e}", fitted.name());
            info.covariance_error = Some(e);
        }
    }
    Ok(())
}

fn is_diverged(theta: &Theta) -> bool {
    theta.iter().any(|v| !v.is_finite() || v.abs() > RESTART_BOUNDARY)
}

fn run_attempt(
    data: Option<&Dataset>, template: &Model, theta0: Theta, ll0: f64, opts: &MLEOptions,
) -> ModelResult<Attempt> {
    let objective = ModelObjective::new(template, data);
    match maximize(&objective, theta0.clone(), &(), opts) {
        Ok(outcome) => finish_attempt(data, template, outcome),
        Err(err) => {
            let err = ModelError::from(err);
            if err.is_configuration_error() {
                return Err(err);
            }
            log::warn!("{}: optimizer stopped early: {err}", template.name());
            Ok(Attempt {
                diverged: is_diverged(&theta0),
                theta: theta0,
                log_likelihood: ll0,
                converged: false,
                binding: false,
                status: err.to_string(),
                iterations: 0,
                fn_evals: FnEvalMap::new(),
                grad_norm: None,
                failure: Some(err),
            })
        }
    }
}

fn finish_attempt(
    data: Option<&Dataset>, template: &Model, outcome: OptimOutcome,
) -> ModelResult<Attempt> {
    let mut at_best = template.clone();
    at_best.set_packed(outcome.theta_hat.view())?;
    let distance = dispatch::constraint(data, &mut at_best)?;
    let log_likelihood = dispatch::log_likelihood(data, &at_best)?;
    let theta = at_best.packed()?;
    let diverged = is_diverged(&theta);
    let failure = diverged.then(|| {
        log::warn!("{}: optimizer left the region |θ| ≤ {RESTART_BOUNDARY}", template.name());
        ModelError::ConvergenceFailure {
            iterations: outcome.iterations,
            status: format!("diverged beyond |θ| = {RESTART_BOUNDARY}"),
        }
    });
    Ok(Attempt {
        theta,
        log_likelihood,
        converged: outcome.converged && !diverged,
        binding: distance > 0.0,
        diverged,
        status: outcome.status,
        iterations: outcome.iterations,
        fn_evals: outcome.fn_evals,
        grad_norm: outcome.grad_norm,
        failure,
    })
}
