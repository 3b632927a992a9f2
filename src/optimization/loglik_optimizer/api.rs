//! High-level entry point for maximizing a `LogLikelihood`.
//!
//! Selects the solver named by `opts.method`, wraps the model in an
//! `ArgMinAdapter` (which *minimizes* `-ℓ(θ)`), and delegates to the
//! matching runner.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_nelder_mead, build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::{run_lbfgs, run_nelder_mead},
        traits::{LineSearcher, LogLikelihood, MLEOptions, OptimMethod},
    },
};

/// Maximize a log-likelihood `ℓ(θ)` starting from `theta0`.
///
/// # Behavior
/// - Validates the start via `f.check(theta0, data)`.
/// - `OptimMethod::Lbfgs(ls)`: L-BFGS with the chosen line search; analytic
///   gradients when `f.grad` provides them, finite differences with
///   `opts.fd_step` otherwise.
/// - `OptimMethod::NelderMead { initial_step }`: simplex search, no
///   gradients.
///
/// # Errors
/// - Errors from `f.check`.
/// - Builder errors (tolerances, step size).
/// - Runtime errors from the solver, including errors raised by `f`.
///
/// # Example
/// ```
/// use ndarray::{array, Array1};
/// use rust_models::optimization::errors::OptResult;
/// use rust_models::optimization::loglik_optimizer::{maximize, LogLikelihood, MLEOptions};
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Array1<f64>, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Array1<f64>, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Bowl, array![0.5, -0.3], &(), &MLEOptions::default())?;
/// assert!(out.theta_hat.iter().all(|t| t.abs() < 1e-4));
/// # Ok::<(), rust_models::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data).with_fd_step(opts.fd_step);
    match opts.method {
        OptimMethod::Lbfgs(LineSearcher::MoreThuente) => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        OptimMethod::Lbfgs(LineSearcher::HagerZhang) => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        OptimMethod::NelderMead { initial_step } => {
            let solver = build_nelder_mead(&theta0, initial_step, opts)?;
            run_nelder_mead(opts, problem, solver)
        }
    }
}
