//! Bridge from a model's likelihood surface to the optimizer.
use crate::data::Dataset;
use crate::model::{Model, dispatch, errors::ModelError};
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, LogLikelihood, Theta},
};
use std::cell::RefCell;

/// `ℓ(θ)` of a model over fixed data, as seen by the optimizer.
///
/// Each evaluation unpacks θ into a private working copy, projects it with
/// the model's constraint, and returns `ℓ(projected) - distance`. The
/// penalty keeps the surface continuous across the feasible boundary, so
/// gradient-based solvers are steered back inside.
///
/// The analytic `score` slot is used as the gradient only when θ is
/// already feasible; otherwise the optimizer falls back to finite
/// differences of the penalized surface.
#[derive(Debug)]
pub struct ModelObjective<'a> {
    working: RefCell<Model>,
    data: Option<&'a Dataset>,
}

impl<'a> ModelObjective<'a> {
    /// `template` must already be prepped.
    pub fn new(template: &Model, data: Option<&'a Dataset>) -> Self {
        Self { working: RefCell::new(template.clone()), data }
    }

    /// Unpack θ, project it, and report the distance moved.
    fn project(&self, theta: &Theta) -> OptResult<f64> {
        let mut model = self.working.borrow_mut();
        model.set_packed(theta.view())?;
        Ok(dispatch::constraint(self.data, &mut model)?)
    }
}

impl LogLikelihood for ModelObjective<'_> {
    type Data = ();

    fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
        let distance = self.project(theta)?;
        let model = self.working.borrow();
        let ll = dispatch::log_likelihood(self.data, &model)?;
        Ok(ll - distance)
    }

    fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
        let model = self.working.borrow();
        let expected = model.packed_len()?;
        if theta.len() != expected {
            return Err(ModelError::ShapeError {
                reason: format!(
                    "starting point has {} values, model '{}' has {expected} parameters",
                    theta.len(),
                    model.name()
                ),
            }
            .into());
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
        if self.project(theta)? > 0.0 {
            return Err(OptError::GradientNotImplemented);
        }
        let model = self.working.borrow();
        match model.methods().score(self.data, &model) {
            Ok(g) => Ok(g),
            Err(ModelError::SlotNotImplemented) => Err(OptError::GradientNotImplemented),
            Err(e) => Err(e.into()),
        }
    }
}
