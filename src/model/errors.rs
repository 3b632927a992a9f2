//! Unified error handling for the model framework.
//!
//! `ModelError` covers shape resolution, method dispatch, settings lookup,
//! combinator construction, and estimation outcomes. The alias
//! `ModelResult<T>` is used by every public operation on a model.
//!
//! `ShapeError`, `InvalidWeights`, and `UnsupportedOperation` are
//! configuration errors and surface immediately. `ConstraintUnsatisfiable`
//! and `ConvergenceFailure` are recoverable and are also recorded on
//! `EstimationInfo` when they arise during fitting. `SingularHessian` only
//! ever suppresses the covariance of an otherwise valid estimate.
use crate::optimization::errors::OptError;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Shape ----
    /// Parameter or data size cannot be resolved or does not match.
    ShapeError { reason: String },

    /// The model has no parameters yet and none could be allocated.
    MissingParameters { model: String },

    /// The operation needs a dataset but was called without one.
    DataRequired { model: String, operation: &'static str },

    // ---- Dispatch ----
    /// A required method slot is absent and no fallback applies.
    UnsupportedOperation { model: String, operation: &'static str },

    /// Returned by default method slots. Dispatch converts it into a
    /// fallback path or into `UnsupportedOperation`.
    SlotNotImplemented,

    // ---- Settings ----
    /// No settings group with this tag is installed on the model.
    SettingsNotFound { tag: &'static str },

    /// A settings value failed validation.
    InvalidSettings { name: &'static str, value: f64, reason: &'static str },

    // ---- Combinators ----
    /// Mixture weights are not a probability vector.
    InvalidWeights { reason: String },

    /// Rejection sampling exhausted its retry bound.
    ConstraintUnsatisfiable { attempts: usize },

    // ---- Distributions ----
    /// A distribution parameter is outside its domain.
    InvalidDistributionParameter { name: &'static str, value: f64, reason: &'static str },

    // ---- Estimation ----
    /// The optimizer hit its iteration cap without converging.
    ConvergenceFailure { iterations: usize, status: String },

    /// The observed information matrix is not invertible.
    SingularHessian { min_eigenvalue: f64 },

    /// The log-likelihood is NaN or infinite where a finite value is needed.
    NonFiniteLogLikelihood { value: f64 },

    // ---- Optimizer ----
    /// Error surfaced by the optimization backend.
    Optimization(OptError),
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shape ----
            ModelError::ShapeError { reason } => write!(f, "Shape error: {reason}"),
            ModelError::MissingParameters { model } => {
                write!(f, "Model '{model}' has no parameters")
            }
            ModelError::DataRequired { model, operation } => {
                write!(f, "Model '{model}' needs data for `{operation}`")
            }

            // ---- Dispatch ----
            ModelError::UnsupportedOperation { model, operation } => {
                write!(f, "Model '{model}' does not support `{operation}`")
            }
            ModelError::SlotNotImplemented => write!(f, "Method slot not implemented"),

            // ---- Settings ----
            ModelError::SettingsNotFound { tag } => {
                write!(f, "Settings group '{tag}' not found")
            }
            ModelError::InvalidSettings { name, value, reason } => {
                write!(f, "Invalid setting `{name}` = {value}: {reason}")
            }

            // ---- Combinators ----
            ModelError::InvalidWeights { reason } => write!(f, "Invalid mixture weights: {reason}"),
            ModelError::ConstraintUnsatisfiable { attempts } => {
                write!(f, "No draw satisfied the constraint after {attempts} attempts")
            }

            // ---- Distributions ----
            ModelError::InvalidDistributionParameter { name, value, reason } => {
                write!(f, "Invalid distribution parameter `{name}` = {value}: {reason}")
            }

            // ---- Estimation ----
            ModelError::ConvergenceFailure { iterations, status } => {
                write!(f, "Optimizer did not converge after {iterations} iterations ({status})")
            }
            ModelError::SingularHessian { min_eigenvalue } => {
                write!(f, "Singular Hessian: smallest eigenvalue {min_eigenvalue}")
            }
            ModelError::NonFiniteLogLikelihood { value } => {
                write!(f, "Non-finite log-likelihood: {value}")
            }

            // ---- Optimizer ----
            ModelError::Optimization(err) => write!(f, "Optimization error: {err}"),
        }
    }
}

impl From<OptError> for ModelError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::Model(inner) => *inner,
            other => ModelError::Optimization(other),
        }
    }
}

impl ModelError {
    /// `true` for errors that no retry or different starting point can fix.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ModelError::ShapeError { .. }
                | ModelError::MissingParameters { .. }
                | ModelError::DataRequired { .. }
                | ModelError::UnsupportedOperation { .. }
                | ModelError::SettingsNotFound { .. }
                | ModelError::InvalidSettings { .. }
                | ModelError::InvalidWeights { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Round-tripping model errors through the optimizer error surface.
    // - Classification of configuration errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A model error carried through `OptError::Model` comes back unchanged.
    //
    // Given
    // -----
    // - `ModelError::SettingsNotFound` boxed into `OptError`.
    //
    // Expect
    // ------
    // - `ModelError::from(OptError)` yields the original variant.
    fn model_error_survives_optimizer_round_trip() {
        // Arrange
        let original = ModelError::SettingsNotFound { tag: "mle" };

        // Act
        let through: ModelError = OptError::from(original.clone()).into();

        // Assert
        assert_eq!(through, original);
    }

    #[test]
    // Purpose
    // -------
    // Recoverable outcomes are not classified as configuration errors.
    //
    // Given
    // -----
    // - `ConvergenceFailure` and `InvalidWeights`.
    //
    // Expect
    // ------
    // - Only `InvalidWeights` is a configuration error.
    fn recoverable_errors_are_not_configuration_errors() {
        // Arrange
        let conv =
            ModelError::ConvergenceFailure { iterations: 5, status: "MaxItersReached".into() };
        let weights = ModelError::InvalidWeights { reason: "sum 0.9".into() };

        // Act / Assert
        assert!(!conv.is_configuration_error());
        assert!(weights.is_configuration_error());
    }
}
