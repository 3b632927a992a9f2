//! transform::dconstrain — a base model truncated to a region of the data
//! space.
//!
//! Purpose
//! -------
//! Restrict a base model to observations satisfying a predicate, with the
//! density renormalized by a caller-supplied constant `c`, the base mass
//! inside the region.
//!
//! Key behaviors
//! -------------
//! - `log_likelihood` is `-∞` if any row fails the predicate, otherwise
//!   `ℓ_base − n_rows · ln c`. Without data the base density is one
//!   evaluation and is shifted by `− ln c` once.
//! - `draw` rejection-samples from the base, giving up after
//!   `max_draw_attempts` with `ModelError::ConstraintUnsatisfiable`.
//! - `score` and `constraint` are the base's (`c` does not depend on the
//!   parameters).
//!
//! Invariants & assumptions
//! ------------------------
//! - `0 < c ≤ 1`; it is never estimated from draws.
//! - Parameters are the base's, unchanged.
use crate::data::Dataset;
use crate::model::{
    Model, ModelMethods, dispatch,
    errors::{ModelError, ModelResult},
    settings::SettingsGroup,
};
use crate::transform::{base_with_params, prep_single_base};
use ndarray::{Array1, ArrayView1};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// Default bound on rejection-sampling attempts per draw.
pub const DEFAULT_MAX_DRAW_ATTEMPTS: usize = 10_000;

type Predicate = Arc<dyn Fn(ArrayView1<f64>) -> bool + Send + Sync>;

/// Renormalization constant and draw bound for [`dconstrain_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DconstrainOptions {
    pub scaling: f64,
    pub max_draw_attempts: usize,
}

impl Default for DconstrainOptions {
    fn default() -> Self {
        Self { scaling: 1.0, max_draw_attempts: DEFAULT_MAX_DRAW_ATTEMPTS }
    }
}

impl DconstrainOptions {
    /// Base probability mass inside the feasible region.
    ///
    /// # Errors
    /// - `ModelError::InvalidSettings` unless `0 < scaling ≤ 1`.
    pub fn with_scaling(mut self, scaling: f64) -> ModelResult<Self> {
        if !(scaling > 0.0 && scaling <= 1.0) {
            return Err(ModelError::InvalidSettings {
                name: "scaling",
                value: scaling,
                reason: "must lie in (0, 1]",
            });
        }
        self.scaling = scaling;
        Ok(self)
    }

    /// # Errors
    /// - `ModelError::InvalidSettings` if `attempts` is 0.
    pub fn with_max_draw_attempts(mut self, attempts: usize) -> ModelResult<Self> {
        if attempts == 0 {
            return Err(ModelError::InvalidSettings {
                name: "max_draw_attempts",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        self.max_draw_attempts = attempts;
        Ok(self)
    }
}

/// Base model, feasibility predicate, and options.
#[derive(Clone)]
pub struct DconstrainSettings {
    pub base: Arc<Model>,
    predicate: Predicate,
    pub options: DconstrainOptions,
}

impl DconstrainSettings {
    pub fn is_feasible(&self, row: ArrayView1<f64>) -> bool {
        (self.predicate)(row)
    }
}

impl fmt::Debug for DconstrainSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DconstrainSettings")
            .field("base", &self.base.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SettingsGroup for DconstrainSettings {
    const TAG: &'static str = "dconstrain";

    fn deep_copy(&self) -> Self {
        Self { base: Arc::new(self.base.copy_deep()), ..self.clone() }
    }
}

/// Method table of data-constrained models.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dconstrained;

/// `base` restricted to rows where `predicate` holds, with default options.
pub fn dconstrain<P>(base: Model, predicate: P) -> Model
where
    P: Fn(ArrayView1<f64>) -> bool + Send + Sync + 'static,
{
    dconstrain_with(base, predicate, DconstrainOptions::default())
}

/// `base` restricted to rows where `predicate` holds.
pub fn dconstrain_with<P>(base: Model, predicate: P, options: DconstrainOptions) -> Model
where
    P: Fn(ArrayView1<f64>) -> bool + Send + Sync + 'static,
{
    let mut wrapper = Model::new(
        format!("{} (constrained)", base.name()),
        base.shape(),
        base.dsize(),
        Arc::new(Dconstrained),
    );
    wrapper.parameters = base.parameters.clone();
    wrapper.add_group(DconstrainSettings {
        base: Arc::new(base),
        predicate: Arc::new(predicate),
        options,
    });
    wrapper
}

impl ModelMethods for Dconstrained {
    fn prep(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<()> {
        let base = Arc::clone(&model.group::<DconstrainSettings>()?.base);
        let prepped = prep_single_base(data, &base, model)?;
        model.group_mut::<DconstrainSettings>()?.base = prepped;
        Ok(())
    }

    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        let settings = model.group::<DconstrainSettings>()?;
        let base = base_with_params(&settings.base, model);
        let ln_c = settings.options.scaling.ln();
        let Some(d) = data else {
            return Ok(dispatch::log_likelihood(None, &base)? - ln_c);
        };
        if !d.rows().all(|row| settings.is_feasible(row)) {
            return Ok(f64::NEG_INFINITY);
        }
        let ll = dispatch::log_likelihood(Some(d), &base)?;
        Ok(ll - d.nrows() as f64 * ln_c)
    }

    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        let settings = model.group::<DconstrainSettings>()?;
        dispatch::score(data, &base_with_params(&settings.base, model))
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        let settings = model.group::<DconstrainSettings>()?;
        let base = base_with_params(&settings.base, model);
        let attempts = settings.options.max_draw_attempts;
        for _ in 0..attempts {
            let candidate = dispatch::draw(rng, &base)?;
            if settings.is_feasible(candidate.view()) {
                return Ok(candidate);
            }
        }
        log::warn!("{}: no feasible draw after {attempts} attempts", model.name());
        Err(ModelError::ConstraintUnsatisfiable { attempts })
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        let mut base = base_with_params(&model.group::<DconstrainSettings>()?.base, model);
        let moved = dispatch::constraint(data, &mut base)?;
        if moved > 0.0 {
            model.parameters = base.parameters.clone();
        }
        Ok(moved)
    }
}
