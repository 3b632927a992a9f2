//! Numerically stable helpers and tolerances.

/// Lower bound that constraints project strictly positive parameters onto
/// (standard deviations, exponential means).
pub const POSITIVITY_MARGIN: f64 = 1e-4;

/// Eigenvalues at or below this are treated as zero when inverting an
/// information matrix.
pub const EIGEN_EPS: f64 = 1e-10;

/// `ln Σᵢ exp(xᵢ)` computed with a max shift.
///
/// - Empty input gives `-∞` (log of an empty sum).
/// - If every term is `-∞` the result is `-∞`; a `+∞` term gives `+∞`.
/// - `NaN` terms propagate.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    let shifted: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + shifted.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of `log_sum_exp` with the naive formula on a safe range.
    // - Behavior with huge, empty, and all -∞ inputs.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // On moderate inputs the stable form equals the naive one.
    //
    // Given
    // -----
    // - Values [-1, 0, 2.5].
    //
    // Expect
    // ------
    // - Agreement to 1e-12.
    fn log_sum_exp_matches_naive_on_safe_inputs() {
        // Arrange
        let values = [-1.0, 0.0, 2.5];
        let naive = values.iter().map(|v: &f64| v.exp()).sum::<f64>().ln();

        // Act
        let stable = log_sum_exp(&values);

        // Assert
        assert!((stable - naive).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Extreme inputs neither overflow nor produce NaN.
    //
    // Given
    // -----
    // - [1000, 1000], an empty slice, and [-∞, -∞].
    //
    // Expect
    // ------
    // - 1000 + ln 2, -∞, and -∞.
    fn log_sum_exp_handles_extremes() {
        // Act / Assert
        assert!((log_sum_exp(&[1000.0, 1000.0]) - (1000.0 + 2f64.ln())).abs() < 1e-9);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }
}
