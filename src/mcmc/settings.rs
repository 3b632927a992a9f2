//! The `"mcmc"` settings group.
use crate::model::{
    errors::{ModelError, ModelResult},
    settings::SettingsGroup,
};

/// Metropolis proposal configuration.
///
/// - `step_scale`: standard deviation of the Gaussian random-walk proposal.
/// - `adapt`: nudge `step_scale` after every step toward
///   `target_accept_rate`, by `scale ← scale · (1 + (ar/target − 1)/100)`.
/// - `target_accept_rate`: acceptance rate the adaptation aims for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McmcSettings {
    pub step_scale: f64,
    pub adapt: bool,
    pub target_accept_rate: f64,
}

impl Default for McmcSettings {
    fn default() -> Self {
        Self { step_scale: 1.0, adapt: false, target_accept_rate: 0.35 }
    }
}

impl SettingsGroup for McmcSettings {
    const TAG: &'static str = "mcmc";
}

impl McmcSettings {
    /// # Errors
    /// - `ModelError::InvalidSettings` unless `step_scale` is finite and
    ///   positive and `0 < target_accept_rate < 1`.
    pub fn new(step_scale: f64, adapt: bool, target_accept_rate: f64) -> ModelResult<Self> {
        if !(step_scale.is_finite() && step_scale > 0.0) {
            return Err(ModelError::InvalidSettings {
                name: "step_scale",
                value: step_scale,
                reason: "must be finite and positive",
            });
        }
        if !(target_accept_rate > 0.0 && target_accept_rate < 1.0) {
            return Err(ModelError::InvalidSettings {
                name: "target_accept_rate",
                value: target_accept_rate,
                reason: "must lie in (0, 1)",
            });
        }
        Ok(Self { step_scale, adapt, target_accept_rate })
    }

    /// Adapted scale after a step with cumulative acceptance rate `rate`.
    pub fn adapted_scale(&self, scale: f64, rate: f64) -> f64 {
        scale * (1.0 + (rate / self.target_accept_rate - 1.0) / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Validation and the adaptation direction.
    //
    // Given
    // -----
    // - A zero step scale; a target rate of 1; defaults with rates above
    //   and below the target.
    //
    // Expect
    // ------
    // - `InvalidSettings` twice; the scale grows when accepting too often
    //   and shrinks otherwise.
    fn validation_and_adaptation_direction() {
        // Arrange
        let settings = McmcSettings::default();

        // Act / Assert
        assert!(matches!(
            McmcSettings::new(0.0, false, 0.35),
            Err(ModelError::InvalidSettings { name: "step_scale", .. })
        ));
        assert!(matches!(
            McmcSettings::new(1.0, true, 1.0),
            Err(ModelError::InvalidSettings { name: "target_accept_rate", .. })
        ));
        assert!(settings.adapted_scale(1.0, 0.7) > 1.0);
        assert!(settings.adapted_scale(1.0, 0.1) < 1.0);
    }
}
