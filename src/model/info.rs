//! Auxiliary estimation output carried on a fitted model.
use crate::model::errors::ModelError;
use crate::optimization::loglik_optimizer::FnEvalMap;
use ndarray::Array2;

/// Optimizer state machine: `Initialized → Iterating → Converged | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MleState {
    Initialized,
    Iterating,
    Converged,
    Failed,
}

/// Diagnostics recorded by `estimate` / `maximum_likelihood`.
///
/// - `log_likelihood`: ℓ at the reported parameters.
/// - `converged` / `state` / `status`: how the optimizer stopped.
/// - `failure`: the recoverable error behind a `Failed` state, if any.
/// - `covariance` / `covariance_error`: the inverse observed information,
///   or why it was omitted (typically `SingularHessian`).
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationInfo {
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
    pub state: MleState,
    pub status: String,
    pub restarts: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub failure: Option<ModelError>,
    pub covariance: Option<Array2<f64>>,
    pub covariance_error: Option<ModelError>,
}

impl EstimationInfo {
    /// Info for a closed-form fit: converged in zero iterations.
    pub fn closed_form(log_likelihood: f64) -> Self {
        Self {
            log_likelihood,
            iterations: 0,
            converged: true,
            state: MleState::Converged,
            status: "Closed form".to_string(),
            restarts: 0,
            fn_evals: FnEvalMap::new(),
            grad_norm: None,
            aic: None,
            bic: None,
            failure: None,
            covariance: None,
            covariance_error: None,
        }
    }

    /// Info for a run that could not start or stopped without converging.
    pub fn failed(log_likelihood: f64, failure: ModelError) -> Self {
        Self {
            converged: false,
            state: MleState::Failed,
            status: failure.to_string(),
            failure: Some(failure),
            ..Self::closed_form(log_likelihood)
        }
    }

    /// Fill AIC `2k − 2ℓ` and, when `n` is known, BIC `k ln n − 2ℓ`.
    pub fn with_information_criteria(mut self, k: usize, n: Option<usize>) -> Self {
        let k = k as f64;
        self.aic = Some(2.0 * k - 2.0 * self.log_likelihood);
        self.bic = n.filter(|&n| n > 0).map(|n| k * (n as f64).ln() - 2.0 * self.log_likelihood);
        self
    }

    /// Surface a recorded failure as an error.
    ///
    /// # Errors
    /// - The stored `failure` when the run did not converge.
    pub fn ensure_converged(&self) -> Result<(), ModelError> {
        match &self.failure {
            Some(err) if !self.converged => Err(err.clone()),
            _ => Ok(()),
        }
    }
}
