//! Random-walk Metropolis chain over a model's packed parameters.
use crate::data::Dataset;
use crate::mcmc::settings::McmcSettings;
use crate::model::{
    Model, dispatch,
    errors::{ModelError, ModelResult},
};
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

/// One step of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct McmcDraw {
    /// Full parameter vector after the step.
    pub theta: Array1<f64>,
    /// ℓ at `theta`.
    pub log_likelihood: f64,
    /// Whether this step moved the chain.
    pub accepted: bool,
}

/// Lazy Metropolis sampler targeting `exp(ℓ(θ))`.
///
/// Each call to `next` proposes `θ' = θ + step · N(0, I)`. Proposals the
/// constraint would move, or whose ℓ is not finite or fails numerically,
/// are rejected; otherwise θ' is accepted with probability
/// `min(1, exp(ℓ' − ℓ))`. A configuration error while evaluating a
/// proposal ends the chain: `next` returns `None` from then on and
/// [`MetropolisChain::halted`] holds the error.
#[derive(Debug)]
pub struct MetropolisChain<'a, R: Rng> {
    data: Option<&'a Dataset>,
    working: Model,
    theta: Array1<f64>,
    log_likelihood: f64,
    settings: McmcSettings,
    step_scale: f64,
    rng: R,
    proposals: u64,
    accepted: u64,
    halted: Option<ModelError>,
}

/// Start a Metropolis chain at `model`'s current parameters.
///
/// Uses the model's [`McmcSettings`] when installed, defaults otherwise.
/// The starting point is projected through the constraint first.
///
/// # Errors
/// - Errors from `prep` or from evaluating ℓ at the start.
/// - `ModelError::NonFiniteLogLikelihood` if ℓ at the start is not finite.
pub fn metropolis_draw<'a, R: Rng>(
    data: Option<&'a Dataset>, model: &Model, rng: R,
) -> ModelResult<MetropolisChain<'a, R>> {
    let mut working = model.clone();
    dispatch::prep(data, &mut working)?;
    let settings = working.settings().get_or_default::<McmcSettings>();
    let mut chain = MetropolisChain {
        data,
        theta: working.packed()?,
        working,
        log_likelihood: f64::NAN,
        settings,
        step_scale: settings.step_scale,
        rng,
        proposals: 0,
        accepted: 0,
        halted: None,
    };
    let start = chain.theta.clone();
    chain.restart_from(start.view())?;
    Ok(chain)
}

impl<'a, R: Rng> MetropolisChain<'a, R> {
    /// Share of proposals accepted so far (0 before the first step).
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposals == 0 { 0.0 } else { self.accepted as f64 / self.proposals as f64 }
    }

    /// Current parameter vector.
    pub fn state(&self) -> &Array1<f64> {
        &self.theta
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Current proposal scale (changes only with `adapt`).
    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    /// The configuration error that stopped the chain, if any.
    pub fn halted(&self) -> Option<&ModelError> {
        self.halted.as_ref()
    }

    /// Move the chain to `theta` and reset the acceptance counters.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` on a wrong-length `theta`.
    /// - `ModelError::NonFiniteLogLikelihood` if ℓ is not finite there.
    pub fn restart_from(&mut self, theta: ArrayView1<f64>) -> ModelResult<()> {
        self.working.set_packed(theta)?;
        dispatch::constraint(self.data, &mut self.working)?;
        let ll = dispatch::log_likelihood(self.data, &self.working)?;
        if !ll.is_finite() {
            return Err(ModelError::NonFiniteLogLikelihood { value: ll });
        }
        self.theta = self.working.packed()?;
        self.log_likelihood = ll;
        self.proposals = 0;
        self.accepted = 0;
        self.halted = None;
        Ok(())
    }

    /// The model parametrized at the chain's current state.
    pub fn into_model(mut self) -> ModelResult<Model> {
        self.working.set_packed(self.theta.view())?;
        Ok(self.working)
    }

    /// ℓ at a proposal, `Ok(None)` when it must be rejected outright.
    ///
    /// Only configuration errors propagate; numeric failures reject.
    fn evaluate(&mut self, proposal: &Array1<f64>) -> ModelResult<Option<f64>> {
        let outcome = self.working.set_packed(proposal.view()).and_then(|()| {
            let moved = dispatch::constraint(self.data, &mut self.working)?;
            if moved > 0.0 {
                return Ok(None);
            }
            dispatch::log_likelihood(self.data, &self.working).map(Some)
        });
        match outcome {
            Ok(Some(ll)) if ll.is_finite() => Ok(Some(ll)),
            Ok(_) => Ok(None),
            Err(e) if e.is_configuration_error() => Err(e),
            Err(e) => {
                log::debug!("{}: proposal rejected: {e}", self.working.name());
                Ok(None)
            }
        }
    }

    fn step(&mut self) -> ModelResult<McmcDraw> {
        let scale = self.step_scale;
        let rng = &mut self.rng;
        let proposal = self.theta.mapv(|t| t + scale * rng.sample::<f64, _>(StandardNormal));
        self.proposals += 1;
        let accepted = match self.evaluate(&proposal)? {
            Some(ll) => {
                let log_u: f64 = self.rng.gen::<f64>().ln();
                if log_u < ll - self.log_likelihood {
                    self.theta = proposal;
                    self.log_likelihood = ll;
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        if accepted {
            self.accepted += 1;
        }
        if self.settings.adapt {
            self.step_scale = self.settings.adapted_scale(self.step_scale, self.acceptance_rate());
        }
        Ok(McmcDraw { theta: self.theta.clone(), log_likelihood: self.log_likelihood, accepted })
    }
}

impl<R: Rng> Iterator for MetropolisChain<'_, R> {
    type Item = McmcDraw;

    fn next(&mut self) -> Option<McmcDraw> {
        if self.halted.is_some() {
            return None;
        }
        match self.step() {
            Ok(draw) => Some(draw),
            Err(e) => {
                log::warn!("{}: chain stopped: {e}", self.working.name());
                self.halted = Some(e);
                None
            }
        }
    }
}
