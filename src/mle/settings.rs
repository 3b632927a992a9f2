//! The `"mle"` settings group.
use crate::model::{
    errors::{ModelError, ModelResult},
    settings::SettingsGroup,
};
use crate::optimization::loglik_optimizer::{MLEOptions, OptimMethod, Tolerances};

/// Maximum-likelihood configuration installed on a model.
///
/// Fields:
/// - `starting_point`: packed θ₀; `None` starts from the model's current
///   parameters when the caller set them, else from all ones. Either way θ₀
///   is projected through the model's constraint first.
/// - `method`: L-BFGS with a line search (default More–Thuente) or
///   Nelder–Mead with its initial simplex step (default 0.05).
/// - `tols`: gradient / cost-change tolerances and the iteration cap.
/// - `lbfgs_mem`: L-BFGS history length; `None` uses the optimizer default.
/// - `fd_step`: relative step for finite-difference gradients; `None` uses
///   the `finitediff` default.
/// - `restarts` / `restart_scale` / `seed`: how many perturbed restarts to
///   try after a failed or boundary-bound run, the N(0, scale²)
///   perturbation, and its RNG seed.
/// - `want_covariance`: compute the inverse observed information.
/// - `verbose`: attach the slog observer (feature `obs_slog`).
#[derive(Debug, Clone, PartialEq)]
pub struct MleSettings {
    pub starting_point: Option<Vec<f64>>,
    pub method: OptimMethod,
    pub tols: Tolerances,
    pub lbfgs_mem: Option<usize>,
    pub fd_step: Option<f64>,
    pub restarts: usize,
    pub restart_scale: f64,
    pub seed: u64,
    pub want_covariance: bool,
    pub verbose: bool,
}

impl Default for MleSettings {
    fn default() -> Self {
        Self {
            starting_point: None,
            method: OptimMethod::default(),
            tols: Tolerances::default(),
            lbfgs_mem: None,
            fd_step: None,
            restarts: 0,
            restart_scale: 1.0,
            seed: 0,
            want_covariance: false,
            verbose: false,
        }
    }
}

impl SettingsGroup for MleSettings {
    const TAG: &'static str = "mle";
}

impl MleSettings {
    pub fn with_starting_point(mut self, theta0: &[f64]) -> Self {
        self.starting_point = Some(theta0.to_vec());
        self
    }

    pub fn with_method(mut self, method: OptimMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_tolerances(mut self, tols: Tolerances) -> Self {
        self.tols = tols;
        self
    }

    pub fn with_covariance(mut self, want_covariance: bool) -> Self {
        self.want_covariance = want_covariance;
        self
    }

    /// Finite-difference step for gradients without an analytic score.
    ///
    /// # Errors
    /// - `ModelError::InvalidSettings` unless `step` is finite and positive.
    pub fn with_fd_step(mut self, step: f64) -> ModelResult<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(ModelError::InvalidSettings {
                name: "fd_step",
                value: step,
                reason: "must be finite and positive",
            });
        }
        self.fd_step = Some(step);
        Ok(self)
    }

    /// Up to `restarts` perturbed restarts with N(0, `scale`²) noise.
    ///
    /// # Errors
    /// - `ModelError::InvalidSettings` unless `scale` is finite and positive.
    pub fn with_restarts(mut self, restarts: usize, scale: f64, seed: u64) -> ModelResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ModelError::InvalidSettings {
                name: "restart_scale",
                value: scale,
                reason: "must be finite and positive",
            });
        }
        self.restarts = restarts;
        self.restart_scale = scale;
        self.seed = seed;
        Ok(self)
    }

    /// Optimizer options for one run.
    ///
    /// # Errors
    /// - Option validation failures (`lbfgs_mem == Some(0)`, bad steps),
    ///   wrapped as `ModelError::Optimization`.
    pub fn to_options(&self) -> ModelResult<MLEOptions> {
        let mut opts =
            MLEOptions::new(self.tols, self.method, self.lbfgs_mem)?.with_verbose(self.verbose);
        if let Some(step) = self.fd_step {
            opts = opts.with_fd_step(step)?;
        }
        Ok(opts)
    }
}
