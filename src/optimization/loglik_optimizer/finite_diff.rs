//! loglik_optimizer::finite_diff — numerical derivatives of log-likelihoods.
//!
//! Purpose
//! -------
//! Supply gradients and Hessians for models that do not implement an
//! analytic `score`, so that L-BFGS, the score fallback, and the observed
//! information all work from the log-likelihood alone.
//!
//! Key behaviors
//! -------------
//! - [`symmetric_gradient`]: central differences, either with
//!   `finitediff`'s default step or a caller-chosen relative step.
//! - [`run_fd_diff`]: forward-difference gradient with error capture,
//!   used as the fallback when central differences hit an invalid region.
//! - [`compute_hessian`]: central-difference Hessian of a gradient
//!   function, forward differences as fallback, then symmetrized.
//!
//! Invariants & assumptions
//! ------------------------
//! - Objective closures cannot return `Result`; callers route failures
//!   into a `RefCell` side channel and return `NaN`. The helpers here
//!   inspect that channel after differencing.
//! - Hessians returned by [`compute_hessian`] are finite and exactly
//!   symmetric.
//!
//! Conventions
//! -----------
//! - An explicit step `h` is relative: coordinate `i` moves by
//!   `h · max(1, |θᵢ|)`, so large parameters are not differenced at a
//!   scale below their own rounding error.
//!
//! Testing notes
//! -------------
//! - Unit tests check gradients of quadratics for both step modes, the
//!   error side channel, and Hessian symmetry/validation.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Central-difference gradient of `func` at `theta`.
///
/// With `step = None` the `finitediff` default step is used; with
/// `Some(h)` each coordinate moves by `h · max(1, |θᵢ|)` in both
/// directions.
///
/// No validation is performed: non-finite objective values produce
/// non-finite entries, which callers check with [`validate_grad`].
pub fn symmetric_gradient<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, step: Option<f64>,
) -> Grad {
    let Some(h) = step else {
        return theta.central_diff(func);
    };
    let mut grad = Grad::zeros(theta.len());
    let mut shifted = theta.clone();
    for i in 0..theta.len() {
        let hi = h * theta[i].abs().max(1.0);
        shifted[i] = theta[i] + hi;
        let up = func(&shifted);
        shifted[i] = theta[i] - hi;
        let down = func(&shifted);
        shifted[i] = theta[i];
        grad[i] = (up - down) / (2.0 * hi);
    }
    grad
}

/// Forward-difference gradient with error capture and validation.
///
/// `closure_err` is cleared on entry; any error that `func` stored there
/// during differencing is returned instead of the gradient.
///
/// # Errors
/// - The captured closure error, converted to `OptError`.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Finite-difference Hessian of the gradient function `f` at `theta`.
///
/// Central differences are tried first; if that matrix fails validation the
/// forward-difference matrix is used. The result is symmetrized.
///
/// # Errors
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when the
///   forward-difference fallback is also invalid.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(f);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(f);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

// ---- Helper methods ----

/// Average each off-diagonal pair in place; the diagonal is untouched.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
