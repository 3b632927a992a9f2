//! Input and output checks around one maximization of a model's ℓ.
//!
//! Before a run, the solver configuration assembled from `MleSettings` is
//! checked: stopping tolerances and finite-difference or simplex steps must
//! be finite and strictly positive. During and after a run, gradients,
//! Hessians, the returned parameter vector, and the final ℓ must be finite
//! and sized to the model's packed parameter count.
//!
//! Every failure is an [`OptError`] naming the offending value; the MLE
//! layer lifts these into `ModelError::Optimization` and treats the
//! configuration ones as fatal.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};

/// `None` when `value` is usable as a tolerance or step, else why not.
fn positive_finite(value: f64) -> Option<&'static str> {
    if !value.is_finite() {
        Some("must be finite")
    } else if value <= 0.0 {
        Some("must be strictly positive")
    } else {
        None
    }
}

/// Gradient-norm stopping tolerance; `None` disables the rule.
///
/// # Errors
/// [`OptError::InvalidTolGrad`] for a non-finite or non-positive value.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| positive_finite(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolGrad { tol, reason }),
        None => Ok(()),
    }
}

/// Change-in-ℓ stopping tolerance; `None` disables the rule.
///
/// # Errors
/// [`OptError::InvalidTolCost`] for a non-finite or non-positive value.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| positive_finite(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolCost { tol, reason }),
        None => Ok(()),
    }
}

/// Finite-difference step or Nelder–Mead simplex edge.
///
/// # Errors
/// [`OptError::InvalidStepSize`] for a non-finite or non-positive step.
pub fn verify_step(step: f64) -> OptResult<()> {
    match positive_finite(step) {
        Some(reason) => Err(OptError::InvalidStepSize { step, reason }),
        None => Ok(()),
    }
}

/// ∇ℓ must have one finite entry per packed parameter.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] on a length other than `dim`.
/// - [`OptError::InvalidGradient`] at the first non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match grad.iter().position(|g| !g.is_finite()) {
        Some(index) => Err(OptError::InvalidGradient {
            index,
            value: grad[index],
            reason: "score entries must be finite",
        }),
        None => Ok(()),
    }
}

/// The parameter vector a run ended on, required present and finite.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver returned no point.
/// - [`OptError::InvalidThetaHat`] at the first non-finite parameter.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    match theta.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(OptError::InvalidThetaHat {
            index,
            value: theta[index],
            reason: "fitted parameters must be finite",
        }),
        None => Ok(theta),
    }
}

/// ℓ at the returned point must be finite.
///
/// # Errors
/// [`OptError::NonFiniteCost`] for NaN or ±∞.
pub fn validate_value(value: f64) -> OptResult<()> {
    if value.is_finite() { Ok(()) } else { Err(OptError::NonFiniteCost { value }) }
}

/// Observed information must be `dim × dim` with finite entries.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] on the wrong shape.
/// - [`OptError::InvalidHessian`] at the first non-finite entry.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}
