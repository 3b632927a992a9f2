//! model::descriptor — the polymorphic model record.
//!
//! Purpose
//! -------
//! Define [`Model`]: a named record holding parameter storage, estimation
//! info, a declared parameter shape, a settings registry, and a shared,
//! immutable method table. Distributions, estimators, and every combinator
//! output are all `Model` values.
//!
//! Key behaviors
//! -------------
//! - `Clone` is the framework's `copy`: parameters, info, and every
//!   settings block are duplicated, while the method table is shared.
//!   Combinator settings keep sharing their wrapped base models.
//! - [`Model::copy_deep`] additionally duplicates wrapped base models.
//! - [`Model::packed`] / [`Model::set_packed`] expose parameters as the flat
//!   vector used by the optimizer and the sampler.
//! - [`Model::set_parameters`] parametrizes a model with a fixed shape
//!   directly, without data.
//!
//! Invariants & assumptions
//! ------------------------
//! - `parameters` and `info` are allocated lazily (by `prep`, `estimate`, or
//!   `set_parameters`); `None` means "not yet prepped / not yet fitted".
//! - After a successful `prep`, `shape` and `dsize` hold only `Dim::Fixed`.
//! - Mutation of `parameters`/`info` requires `&mut Model`; models are
//!   `Send + Sync`, so independent copies can be fitted on other threads.
//!
//! Conventions
//! -----------
//! - Display names are informational and need not be unique.
//! - Distribution parameters live in the vector block; matrix blocks are
//!   available for models that need them.
use crate::data::{Dim, ParamShape, Parameters};
use crate::model::{
    errors::{ModelError, ModelResult},
    info::EstimationInfo,
    methods::ModelMethods,
    settings::{Settings, SettingsGroup},
};
use ndarray::{Array1, ArrayView1};
use std::sync::Arc;

/// Named, polymorphic statistical model.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    pub(crate) parameters: Option<Parameters>,
    pub(crate) info: Option<EstimationInfo>,
    pub(crate) shape: ParamShape,
    pub(crate) dsize: Dim,
    pub(crate) prepared: bool,
    settings: Settings,
    methods: Arc<dyn ModelMethods>,
}

impl Model {
    /// Create an unparametrized model with the given declared shape, data
    /// width (`dsize`), and method table.
    pub fn new(
        name: impl Into<String>, shape: ParamShape, dsize: Dim, methods: Arc<dyn ModelMethods>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters: None,
            info: None,
            shape,
            dsize,
            prepared: false,
            settings: Settings::new(),
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn shape(&self) -> ParamShape {
        self.shape
    }

    pub fn dsize(&self) -> Dim {
        self.dsize
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn methods(&self) -> &Arc<dyn ModelMethods> {
        &self.methods
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn parameters_mut(&mut self) -> Option<&mut Parameters> {
        self.parameters.as_mut()
    }

    /// Replace the parameter container wholesale.
    pub fn replace_parameters(&mut self, parameters: Parameters) {
        self.parameters = Some(parameters);
    }

    pub fn info(&self) -> Option<&EstimationInfo> {
        self.info.as_ref()
    }

    pub fn set_info(&mut self, info: EstimationInfo) {
        self.info = Some(info);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Install or replace a settings group.
    pub fn add_group<T: SettingsGroup>(&mut self, group: T) {
        self.settings.add_group(group);
    }

    /// Builder form of [`add_group`](Self::add_group).
    pub fn with_group<T: SettingsGroup>(mut self, group: T) -> Self {
        self.settings.add_group(group);
        self
    }

    /// Typed settings lookup.
    ///
    /// # Errors
    /// - `ModelError::SettingsNotFound` if the group is not installed.
    pub fn group<T: SettingsGroup>(&self) -> ModelResult<&T> {
        self.settings.group::<T>()
    }

    /// Typed mutable settings lookup.
    ///
    /// # Errors
    /// - `ModelError::SettingsNotFound` if the group is not installed.
    pub fn group_mut<T: SettingsGroup>(&mut self) -> ModelResult<&mut T> {
        self.settings.group_mut::<T>()
    }

    /// Copy that also duplicates any base models held by combinator settings.
    pub fn copy_deep(&self) -> Self {
        Self { settings: self.settings.deep_clone(), ..self.clone() }
    }

    /// The vector block of the parameters.
    ///
    /// # Errors
    /// - `ModelError::MissingParameters` if parameters or the vector block
    ///   are absent.
    pub fn param_vector(&self) -> ModelResult<&Array1<f64>> {
        self.parameters
            .as_ref()
            .and_then(|p| p.vector.as_ref())
            .ok_or_else(|| ModelError::MissingParameters { model: self.name.clone() })
    }

    /// Mutable vector block of the parameters.
    ///
    /// # Errors
    /// - `ModelError::MissingParameters` if parameters or the vector block
    ///   are absent.
    pub fn param_vector_mut(&mut self) -> ModelResult<&mut Array1<f64>> {
        let name = &self.name;
        self.parameters
            .as_mut()
            .and_then(|p| p.vector.as_mut())
            .ok_or_else(|| ModelError::MissingParameters { model: name.clone() })
    }

    /// Packed parameter vector.
    ///
    /// # Errors
    /// - `ModelError::MissingParameters` before prep/estimation.
    pub fn packed(&self) -> ModelResult<Array1<f64>> {
        self.parameters
            .as_ref()
            .map(Parameters::pack)
            .ok_or_else(|| ModelError::MissingParameters { model: self.name.clone() })
    }

    /// Number of packed parameters, allocated or declared.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` when unallocated and sized from data.
    pub fn packed_len(&self) -> ModelResult<usize> {
        match &self.parameters {
            Some(p) => Ok(p.len()),
            None => Ok(self.shape.resolve(None)?.len()),
        }
    }

    /// Overwrite the parameters from a packed vector, allocating them from
    /// the declared shape first if needed.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` on length mismatch or when allocation
    ///   needs data.
    pub fn set_packed(&mut self, theta: ArrayView1<f64>) -> ModelResult<()> {
        if self.parameters.is_none() {
            let shape = self.shape.resolve(None)?;
            self.parameters = Some(Parameters::zeros(&shape));
        }
        match self.parameters.as_mut() {
            Some(params) => params.unpack(theta),
            None => Err(ModelError::MissingParameters { model: self.name.clone() }),
        }
    }

    /// Parametrize a model whose shape does not depend on data.
    ///
    /// The model counts as prepped afterwards.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` for data-sized shapes or a wrong number of
    ///   values.
    pub fn set_parameters(&mut self, values: &[f64]) -> ModelResult<()> {
        let shape = self.shape.resolve(None)?;
        let mut params = Parameters::zeros(&shape);
        params.unpack(ArrayView1::from(values))?;
        self.parameters = Some(params);
        self.shape = shape.into();
        self.prepared = true;
        Ok(())
    }

    /// Builder form of [`set_parameters`](Self::set_parameters).
    pub fn with_parameters(mut self, values: &[f64]) -> ModelResult<Self> {
        self.set_parameters(values)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{exponential, normal_with};
    use crate::transform::fix_params::fix_params;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The copy invariant: copies own their parameters and settings.
    // - Shallow vs deep copies of combinator base models.
    // - Direct parametrization of fixed-shape models.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Mutating a copy's parameters leaves the original untouched.
    //
    // Given
    // -----
    // - Normal(1, 2) and a clone of it.
    //
    // Expect
    // ------
    // - After overwriting the clone, the original still packs to [1, 2] and
    //   both share one method table.
    fn copy_does_not_alias_parameters() {
        // Arrange
        let original = normal_with(1.0, 2.0).expect("valid normal");
        let mut copy = original.clone();

        // Act
        copy.set_packed(array![5.0, 6.0].view()).expect("two parameters");

        // Assert
        assert_eq!(original.packed().expect("set"), array![1.0, 2.0]);
        assert_eq!(copy.packed().expect("set"), array![5.0, 6.0]);
        assert!(Arc::ptr_eq(original.methods(), copy.methods()));
    }

    #[test]
    // Purpose
    // -------
    // A plain copy of a combinator shares its base model; a deep copy
    // duplicates it.
    //
    // Given
    // -----
    // - `fix_params` over Normal(0, 1) with σ fixed.
    //
    // Expect
    // ------
    // - The shallow copy's base is the same `Arc`; the deep copy's is not.
    fn copy_deep_duplicates_wrapped_base() {
        // Arrange
        use crate::transform::fix_params::FixedParamsSettings;
        let base = normal_with(0.0, 1.0).expect("valid normal");
        let wrapped = fix_params(base, &[false, true]).expect("one free parameter");

        // Act
        let shallow = wrapped.clone();
        let deep = wrapped.copy_deep();

        // Assert
        let original = &wrapped.group::<FixedParamsSettings>().expect("installed").base;
        let shallow_base = &shallow.group::<FixedParamsSettings>().expect("installed").base;
        let deep_base = &deep.group::<FixedParamsSettings>().expect("installed").base;
        assert!(Arc::ptr_eq(original, shallow_base));
        assert!(!Arc::ptr_eq(original, deep_base));
    }

    #[test]
    // Purpose
    // -------
    // `set_parameters` fills a fixed-shape model and rejects wrong lengths.
    //
    // Given
    // -----
    // - An unparametrized Exponential model (one parameter).
    //
    // Expect
    // ------
    // - `[2.5]` is accepted and marks the model prepped; `[1, 2]` fails.
    fn set_parameters_checks_length() {
        // Arrange
        let mut model = exponential();

        // Act
        let bad = model.clone().with_parameters(&[1.0, 2.0]);
        model.set_parameters(&[2.5]).expect("one parameter");

        // Assert
        assert!(matches!(bad, Err(ModelError::ShapeError { .. })));
        assert!(model.is_prepared());
        assert_eq!(model.packed().expect("set"), array![2.5]);
    }
}
