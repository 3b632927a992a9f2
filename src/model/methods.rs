//! model::methods — the per-type method table behind every model.
//!
//! Purpose
//! -------
//! Express the optional method slots of a model (`prep`, `estimate`,
//! `log_likelihood`, `p`, `draw`, `cdf`, `constraint`, `score`) as one
//! object-safe trait, [`ModelMethods`]. Every slot has a default body that
//! returns `ModelError::SlotNotImplemented`, so a model type implements
//! exactly the slots it has and the dispatch layer decides the fallback.
//!
//! Key behaviors
//! -------------
//! - Concrete distributions and combinators implement [`ModelMethods`] on a
//!   zero-sized or settings-free struct; per-instance state lives on the
//!   [`Model`] (parameters, settings), never in the method table.
//! - [`MethodTable`] builds an immutable table from closures for ad-hoc
//!   models (tests, quick likelihood surfaces).
//!
//! Invariants & assumptions
//! ------------------------
//! - Method tables are immutable and shared by `Arc` between a model and
//!   all of its copies.
//! - Slots receive the model by reference. Only `prep` and `constraint`
//!   may mutate it; `estimate` mutates the already-copied, already-prepped
//!   fitted model handed to it by dispatch.
//! - `p` returns the joint density of the whole dataset (product over rows);
//!   `log_likelihood` returns its logarithm.
//!
//! Conventions
//! -----------
//! - Callers should go through `model::dispatch` rather than invoking slots
//!   directly; only dispatch knows the fallback chains.
//! - Draw slots take `&mut dyn RngCore` so they stay object safe.
use crate::data::Dataset;
use crate::model::{
    descriptor::Model,
    errors::{ModelError, ModelResult},
};
use ndarray::Array1;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// Optional method slots of a model type.
pub trait ModelMethods: Send + Sync + fmt::Debug {
    /// Allocate parameters and resolve sizes. Replaces the generic prep.
    fn prep(&self, _data: Option<&Dataset>, _model: &mut Model) -> ModelResult<()> {
        Err(ModelError::SlotNotImplemented)
    }

    /// Fit `model` in place (it is already a prepped copy).
    fn estimate(&self, _data: Option<&Dataset>, _model: &mut Model) -> ModelResult<()> {
        Err(ModelError::SlotNotImplemented)
    }

    fn log_likelihood(&self, _data: Option<&Dataset>, _model: &Model) -> ModelResult<f64> {
        Err(ModelError::SlotNotImplemented)
    }

    fn p(&self, _data: Option<&Dataset>, _model: &Model) -> ModelResult<f64> {
        Err(ModelError::SlotNotImplemented)
    }

    /// One observation of width `dsize`.
    fn draw(&self, _rng: &mut dyn RngCore, _model: &Model) -> ModelResult<Array1<f64>> {
        Err(ModelError::SlotNotImplemented)
    }

    /// Cumulative probability at the first row of `data`.
    fn cdf(&self, _data: Option<&Dataset>, _model: &Model) -> ModelResult<f64> {
        Err(ModelError::SlotNotImplemented)
    }

    /// Move `model`'s parameters into the feasible region and return the
    /// distance moved (0 when already feasible).
    fn constraint(&self, _data: Option<&Dataset>, _model: &mut Model) -> ModelResult<f64> {
        Err(ModelError::SlotNotImplemented)
    }

    /// Gradient of the log-likelihood with respect to the packed parameters.
    fn score(&self, _data: Option<&Dataset>, _model: &Model) -> ModelResult<Array1<f64>> {
        Err(ModelError::SlotNotImplemented)
    }
}

type ScalarFn = Arc<dyn Fn(Option<&Dataset>, &Model) -> ModelResult<f64> + Send + Sync>;
type VectorFn = Arc<dyn Fn(Option<&Dataset>, &Model) -> ModelResult<Array1<f64>> + Send + Sync>;
type DrawFn = Arc<dyn Fn(&mut dyn RngCore, &Model) -> ModelResult<Array1<f64>> + Send + Sync>;
type ConstraintFn = Arc<dyn Fn(Option<&Dataset>, &mut Model) -> ModelResult<f64> + Send + Sync>;

/// Closure-backed method table.
///
/// Unset slots behave exactly like the trait defaults.
///
/// ```
/// use rust_models::model::{Model, MethodTable};
/// use rust_models::data::{Dim, ParamShape};
///
/// let methods = MethodTable::builder()
///     .log_likelihood(|_, m| {
///         let theta = m.packed()?;
///         Ok(-theta.dot(&theta))
///     })
///     .build();
/// let model = Model::new("bowl", ParamShape::vector(Dim::Fixed(2)), Dim::Fixed(0), methods);
/// assert_eq!(model.name(), "bowl");
/// ```
#[derive(Clone, Default)]
pub struct MethodTable {
    log_likelihood: Option<ScalarFn>,
    p: Option<ScalarFn>,
    cdf: Option<ScalarFn>,
    draw: Option<DrawFn>,
    constraint: Option<ConstraintFn>,
    score: Option<VectorFn>,
}

impl MethodTable {
    pub fn builder() -> MethodTableBuilder {
        MethodTableBuilder { table: MethodTable::default() }
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("log_likelihood", &self.log_likelihood.is_some())
            .field("p", &self.p.is_some())
            .field("cdf", &self.cdf.is_some())
            .field("draw", &self.draw.is_some())
            .field("constraint", &self.constraint.is_some())
            .field("score", &self.score.is_some())
            .finish()
    }
}

/// Builder for [`MethodTable`]; `build` freezes the table behind an `Arc`.
pub struct MethodTableBuilder {
    table: MethodTable,
}

impl MethodTableBuilder {
    pub fn log_likelihood<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Dataset>, &Model) -> ModelResult<f64> + Send + Sync + 'static,
    {
        self.table.log_likelihood = Some(Arc::new(f));
        self
    }

    pub fn p<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Dataset>, &Model) -> ModelResult<f64> + Send + Sync + 'static,
    {
        self.table.p = Some(Arc::new(f));
        self
    }

    pub fn cdf<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Dataset>, &Model) -> ModelResult<f64> + Send + Sync + 'static,
    {
        self.table.cdf = Some(Arc::new(f));
        self
    }

    pub fn draw<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut dyn RngCore, &Model) -> ModelResult<Array1<f64>> + Send + Sync + 'static,
    {
        self.table.draw = Some(Arc::new(f));
        self
    }

    pub fn constraint<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Dataset>, &mut Model) -> ModelResult<f64> + Send + Sync + 'static,
    {
        self.table.constraint = Some(Arc::new(f));
        self
    }

    pub fn score<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Dataset>, &Model) -> ModelResult<Array1<f64>> + Send + Sync + 'static,
    {
        self.table.score = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Arc<dyn ModelMethods> {
        Arc::new(self.table)
    }
}

impl ModelMethods for MethodTable {
    fn log_likelihood(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        self.log_likelihood.as_ref().ok_or(ModelError::SlotNotImplemented)?(data, model)
    }

    fn p(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        self.p.as_ref().ok_or(ModelError::SlotNotImplemented)?(data, model)
    }

    fn cdf(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<f64> {
        self.cdf.as_ref().ok_or(ModelError::SlotNotImplemented)?(data, model)
    }

    fn draw(&self, rng: &mut dyn RngCore, model: &Model) -> ModelResult<Array1<f64>> {
        self.draw.as_ref().ok_or(ModelError::SlotNotImplemented)?(rng, model)
    }

    fn constraint(&self, data: Option<&Dataset>, model: &mut Model) -> ModelResult<f64> {
        self.constraint.as_ref().ok_or(ModelError::SlotNotImplemented)?(data, model)
    }

    fn score(&self, data: Option<&Dataset>, model: &Model) -> ModelResult<Array1<f64>> {
        self.score.as_ref().ok_or(ModelError::SlotNotImplemented)?(data, model)
    }
}
