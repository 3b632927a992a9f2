//! Public API surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait implemented by anything the optimizer can fit.
//! - [`MLEOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`OptimMethod`] / [`LineSearcher`]: L-BFGS (with a line search) or
//!   derivative-free Nelder–Mead.
//! - [`OptimOutcome`]: normalized result returned by the high-level `maximize` API.
//!
//! Convention: we *maximize* a log-likelihood `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. If an analytic gradient is provided, it should be the gradient
//! of the log-likelihood (`∇ℓ(θ)`); the adapter flips the sign as needed.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{
            validate_theta_hat, validate_value, verify_step, verify_tol_cost, verify_tol_grad,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Log-likelihood interface consumed by the optimizer.
///
/// You maximize `ℓ(θ)`; internally we minimize the cost `c(θ) = -ℓ(θ)`.
/// If you provide an analytic gradient, return the gradient of the
/// log-likelihood `∇ℓ(θ)` (the adapter flips the sign to match the cost).
///
/// - `type Data`: per-problem data carried into `value`/`grad`/`check`.
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook to reject
///   obviously invalid `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   Returning `OptError::GradientNotImplemented` selects finite differences.
pub trait LogLikelihood {
    type Data;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// Parsing:
/// This enum implements `FromStr` and accepts case-insensitive names
/// (`"MoreThuente"`, `"HagerZhang"`). Unknown names return
/// `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Update rule used by the optimizer.
///
/// - `Lbfgs(ls)`: quasi-Newton with the given line search; uses analytic
///   gradients when available, finite differences otherwise.
/// - `NelderMead { initial_step }`: derivative-free simplex search. The
///   initial simplex is `θ₀` plus `initial_step · max(1, |θ₀ᵢ|)` along each
///   coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimMethod {
    Lbfgs(LineSearcher),
    NelderMead { initial_step: f64 },
}

impl Default for OptimMethod {
    fn default() -> Self {
        OptimMethod::Lbfgs(LineSearcher::MoreThuente)
    }
}

impl FromStr for OptimMethod {
    type Err = OptError;

    /// Accepts `"lbfgs"` (More–Thuente), any [`LineSearcher`] name, or
    /// `"neldermead"` / `"simplex"` (initial step 0.05), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lbfgs" => Ok(OptimMethod::default()),
            "neldermead" | "simplex" => Ok(OptimMethod::NelderMead { initial_step: 0.05 }),
            _ => s.parse::<LineSearcher>().map(OptimMethod::Lbfgs),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — numerical tolerances and iteration limits.
/// - `method: OptimMethod` — L-BFGS with a line search, or Nelder–Mead.
/// - `verbose: bool` — if `true`, attaches an observer (behind the `obs_slog`
///   feature) and prints progress.
/// - `lbfgs_mem: Option<usize>` — L-BFGS history (default 7).
/// - `fd_step: Option<f64>` — step for symmetric finite-difference
///   gradients; `None` uses `finitediff`'s default step.
///
/// Default:
/// - `tols`: `tol_grad = 1e-6`, `tol_cost = None`, `max_iter = 5000`
/// - `method`: L-BFGS with `MoreThuente`
/// - `verbose`: `false`
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub method: OptimMethod,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
    pub fd_step: Option<f64>,
}

impl MLEOptions {
    /// Create a new set of optimizer options.
    ///
    /// # Errors
    /// - `OptError::InvalidLBFGSMem` if `lbfgs_mem == Some(0)`.
    /// - `OptError::InvalidStepSize` for a non-positive Nelder–Mead step.
    pub fn new(tols: Tolerances, method: OptimMethod, lbfgs_mem: Option<usize>) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        if let OptimMethod::NelderMead { initial_step } = method {
            verify_step(initial_step)?;
        }
        Ok(Self { tols, method, verbose: false, lbfgs_mem, fd_step: None })
    }

    /// Set an explicit finite-difference step.
    ///
    /// # Errors
    /// - `OptError::InvalidStepSize` unless `step` is finite and positive.
    pub fn with_fd_step(mut self, step: f64) -> OptResult<Self> {
        verify_step(step)?;
        self.fd_step = Some(step);
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            method: OptimMethod::default(),
            verbose: false,
            lbfgs_mem: None,
            fd_step: None,
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold.
/// - `tol_cost`: terminate when the change in cost falls below this threshold
///   (for Nelder–Mead: when the spread of simplex costs does).
/// - `max_iter`: hard cap on the number of iterations.
///
/// Any field can be `None` but **at least one** of the three must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of `tol_grad`, `tol_cost`, or `max_iter` must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - `OptError::InvalidMaxIter` if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(5000) }
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** value `ℓ(θ)` (not the cost).
/// - `converged`: `true` only if the solver met a tolerance
///   (`SolverConverged` or `TargetCostReached`); hitting the iteration cap
///   is not convergence.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates any validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
        );
        let status = match &termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self { theta_hat, value, converged, status, iterations, fn_evals, grad_norm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tolerance and option validation.
    // - Method parsing.
    // - Mapping of argmin termination reasons onto `converged`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Tolerances require at least one criterion and positive values.
    //
    // Given
    // -----
    // - All-`None`, a negative gradient tolerance, and `max_iter = 0`.
    //
    // Expect
    // ------
    // - Each is rejected with its specific error.
    fn tolerances_reject_invalid_inputs() {
        // Act / Assert
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Method names parse case-insensitively.
    //
    // Given
    // -----
    // - "LBFGS", "hagerzhang", "NelderMead", and "newton".
    //
    // Expect
    // ------
    // - The first three parse; "newton" is `InvalidLineSearch`.
    fn optim_method_parses_names() {
        // Act / Assert
        assert_eq!("LBFGS".parse::<OptimMethod>(), Ok(OptimMethod::default()));
        assert_eq!(
            "hagerzhang".parse::<OptimMethod>(),
            Ok(OptimMethod::Lbfgs(LineSearcher::HagerZhang))
        );
        assert_eq!(
            "NelderMead".parse::<OptimMethod>(),
            Ok(OptimMethod::NelderMead { initial_step: 0.05 })
        );
        assert!(matches!(
            "newton".parse::<OptimMethod>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration cap is reported as not converged.
    //
    // Given
    // -----
    // - One outcome built from `MaxItersReached`, one from `SolverConverged`.
    //
    // Expect
    // ------
    // - Only the second has `converged == true`.
    fn max_iters_is_not_convergence() {
        // Arrange
        let capped = TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        let done = TerminationStatus::Terminated(TerminationReason::SolverConverged);

        // Act
        let a = OptimOutcome::new(Some(array![1.0]), -1.0, capped, 10, FnEvalMap::new(), None)
            .expect("valid outcome");
        let b = OptimOutcome::new(Some(array![1.0]), -1.0, done, 3, FnEvalMap::new(), None)
            .expect("valid outcome");

        // Assert
        assert!(!a.converged);
        assert_eq!(a.status, "MaxItersReached");
        assert!(b.converged);
    }
}
