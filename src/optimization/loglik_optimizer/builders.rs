//! loglik_optimizer::builders — solver construction.
//!
//! Purpose
//! -------
//! Turn an [`MLEOptions`] into a ready argmin solver: L-BFGS with either
//! line search, or a Nelder–Mead simplex seeded around `θ₀`.
//!
//! Key behaviors
//! -------------
//! - L-BFGS memory is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - Gradient / cost-change tolerances are applied by [`configure_lbfgs`]
//!   only when present; argmin's defaults apply otherwise.
//! - The Nelder–Mead stopping rule is the standard deviation of the simplex
//!   costs, taken from `tol_cost`, else `tol_grad`.
//!
//! Conventions
//! -----------
//! - Builders never set `max_iters` or the initial parameter of the
//!   executor state; the runners in `run` do.
//! - argmin configuration failures come back as `OptError` through the
//!   crate's `From<argmin::core::Error>`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, NelderMeadSolver, Theta,
        },
        validation::verify_step,
    },
};

/// L-BFGS with the Hager–Zhang line search.
///
/// # Errors
/// - `OptError` if argmin rejects a tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with the More–Thuente line search.
///
/// # Errors
/// - `OptError` if argmin rejects a tolerance.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the optional gradient and cost-change tolerances to an L-BFGS
/// solver, whatever its line search.
///
/// # Errors
/// - `OptError` if argmin rejects a tolerance.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// Nelder–Mead with an axis-aligned initial simplex.
///
/// Vertex `0` is `θ₀`; vertex `i + 1` moves coordinate `i` by
/// `initial_step · max(1, |θ₀ᵢ|)`.
///
/// # Errors
/// - `OptError::InvalidStepSize` for a non-positive or non-finite step.
/// - `OptError` if argmin rejects the tolerance.
pub fn build_nelder_mead(
    theta0: &Theta, initial_step: f64, opts: &MLEOptions,
) -> OptResult<NelderMeadSolver> {
    verify_step(initial_step)?;
    let mut simplex = Vec::with_capacity(theta0.len() + 1);
    simplex.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += initial_step * theta0[i].abs().max(1.0);
        simplex.push(vertex);
    }
    let mut solver = NelderMeadSolver::new(simplex);
    if let Some(tol) = opts.tols.tol_cost.or(opts.tols.tol_grad) {
        solver = solver.with_sd_tolerance(tol)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        loglik_optimizer::traits::{LineSearcher, OptimMethod, Tolerances},
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction of both L-BFGS variants with default and explicit memory.
    // - Tolerance wiring with and without tolerances.
    // - Nelder–Mead simplex construction and step validation.
    //
    // They intentionally DO NOT cover:
    // - Running the solvers (see `api`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Both L-BFGS builders succeed with default and explicit memory.
    //
    // Given
    // -----
    // - Valid tolerances; `lbfgs_mem` of `None` and `Some(11)`.
    //
    // Expect
    // ------
    // - All four builds return `Ok`.
    fn lbfgs_builders_accept_default_and_explicit_memory() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).expect("valid tolerances");
        let hz = OptimMethod::Lbfgs(LineSearcher::HagerZhang);
        let default_mem = MLEOptions::new(tols, hz, None).expect("valid options");
        let explicit_mem = MLEOptions::new(tols, hz, Some(11)).expect("valid options");

        // Act / Assert
        assert!(build_optimizer_hager_zhang(&default_mem).is_ok());
        assert!(build_optimizer_hager_zhang(&explicit_mem).is_ok());
        assert!(build_optimizer_more_thuente(&default_mem).is_ok());
        assert!(build_optimizer_more_thuente(&explicit_mem).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` tolerates absent tolerances.
    //
    // Given
    // -----
    // - Tolerances with only `max_iter`.
    //
    // Expect
    // ------
    // - `Ok`, relying on argmin's defaults.
    fn configure_lbfgs_respects_absent_tolerances() {
        // Arrange
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("valid tolerances");
        let opts = MLEOptions::new(tols, OptimMethod::default(), None).expect("valid options");

        // Act
        let configured = configure_lbfgs(raw, &opts);

        // Assert
        assert!(configured.is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The simplex builder validates its step.
    //
    // Given
    // -----
    // - θ₀ = (0, 10), steps 0.05 and -1.
    //
    // Expect
    // ------
    // - 0.05 builds; -1 is `InvalidStepSize`.
    fn nelder_mead_builder_validates_step() {
        // Arrange
        let theta0 = array![0.0, 10.0];
        let opts = MLEOptions::default();

        // Act
        let good = build_nelder_mead(&theta0, 0.05, &opts);
        let bad = build_nelder_mead(&theta0, -1.0, &opts);

        // Assert
        assert!(good.is_ok());
        assert!(matches!(bad, Err(OptError::InvalidStepSize { .. })));
    }
}
