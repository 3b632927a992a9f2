//! inference::hessian — observed information and its inverse.
//!
//! Purpose
//! -------
//! Turn a fitted model into a parameter covariance estimate: the observed
//! information `J(θ̂) = -∇²ℓ(θ̂)` from finite differences of the model's
//! score, inverted through a symmetric eigendecomposition.
//!
//! Key behaviors
//! -------------
//! - [`observed_information`] differentiates `dispatch::score` (analytic
//!   when the model has one, numeric otherwise) at the model's packed
//!   parameters.
//! - [`covariance_from_information`] inverts `J` as `Q Λ⁻¹ Qᵀ`, refusing
//!   when the smallest eigenvalue is at or below [`EIGEN_EPS`].
//! - [`model_covariance`] chains the two; [`standard_errors`] takes the
//!   square root of a covariance diagonal.
//!
//! Invariants & assumptions
//! ------------------------
//! - `J` is symmetric (symmetrized by `compute_hessian`).
//! - Derivatives are taken with respect to the packed parameters exactly
//!   as the model stores them; no reparameterization happens here.
//! - A singular or indefinite `J` is reported as
//!   `ModelError::SingularHessian`, never as a pseudoinverse.
//!
//! Downstream usage
//! ----------------
//! - `mle::maximum_likelihood` calls [`model_covariance`] when
//!   `want_covariance` is set and records failures on `info`.
//!
//! Testing notes
//! -------------
//! - Unit tests check the inverse of a known matrix, the singular path,
//!   and the observed information of a Normal mean.
use crate::data::Dataset;
use crate::model::{
    Model, dispatch,
    errors::{ModelError, ModelResult},
};
use crate::optimization::{
    loglik_optimizer::{Grad, Theta, finite_diff::compute_hessian},
    numerical_stability::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use std::cell::RefCell;

/// Observed information `J(θ) = -∇²ℓ(θ)` at the model's parameters.
///
/// # Errors
/// - `ModelError::MissingParameters` before prep/estimation.
/// - Errors raised by the score while differencing.
/// - `ModelError::Optimization` if the Hessian is not finite.
pub fn observed_information(data: Option<&Dataset>, model: &Model) -> ModelResult<Array2<f64>> {
    let theta = model.packed()?;
    let working = RefCell::new(model.clone());
    let closure_err: RefCell<Option<ModelError>> = RefCell::new(None);
    let neg_score = |t: &Theta| -> Grad {
        let mut m = working.borrow_mut();
        let score = match m.set_packed(t.view()) {
            Ok(()) => dispatch::score(data, &m),
            Err(e) => Err(e),
        };
        match score {
            Ok(g) => -g,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                Array1::from_elem(t.len(), f64::NAN)
            }
        }
    };
    let info = compute_hessian(&neg_score, &theta);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    Ok(info?)
}

/// Invert an information matrix through its eigendecomposition.
///
/// # Errors
/// - `ModelError::ShapeError` if `info` is not square.
/// - `ModelError::SingularHessian` if the smallest eigenvalue is
///   `≤ EIGEN_EPS` (singular or not positive definite).
pub fn covariance_from_information(info: &Array2<f64>) -> ModelResult<Array2<f64>> {
    let n = info.nrows();
    if info.ncols() != n {
        return Err(ModelError::ShapeError {
            reason: format!("information matrix is {}x{}, expected square", n, info.ncols()),
        });
    }
    let mut info_nalg = DMatrix::<f64>::zeros(n, n);
    fill_dmatrix(info, &mut info_nalg);
    let eigen = info_nalg.symmetric_eigen();
    let min_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min_eigenvalue > EIGEN_EPS) {
        return Err(ModelError::SingularHessian { min_eigenvalue });
    }
    let q = &eigen.eigenvectors;
    let mut cov = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let v: f64 =
                eigen.eigenvalues.iter().enumerate().map(|(k, &l)| q[(i, k)] * q[(j, k)] / l).sum();
            cov[[i, j]] = v;
            cov[[j, i]] = v;
        }
    }
    Ok(cov)
}

/// Inverse observed information at the model's parameters.
///
/// # Errors
/// - See [`observed_information`] and [`covariance_from_information`].
pub fn model_covariance(data: Option<&Dataset>, model: &Model) -> ModelResult<Array2<f64>> {
    covariance_from_information(&observed_information(data, model)?)
}

/// Square roots of the covariance diagonal.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(f64::sqrt)
}

// ---- Helper methods ----

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`.
fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    for ((i, j), &v) in src.indexed_iter() {
        dst[(i, j)] = v;
    }
}
