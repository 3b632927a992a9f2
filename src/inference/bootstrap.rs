//! inference::bootstrap — resampling covariance of an estimator.
//!
//! Purpose
//! -------
//! Estimate the sampling covariance of any model's estimator by fitting it
//! to row-resampled copies of the data.
//!
//! Key behaviors
//! -------------
//! - Replicate `r` draws `n` row indices with replacement from its own
//!   `StdRng` seeded with `seed + r`, so results do not depend on thread
//!   scheduling.
//! - Each replicate estimates a deep copy of the model; replicates run in
//!   parallel on the rayon pool.
//! - The result is the sample covariance (denominator `R − 1`) of the
//!   replicate parameter vectors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Any replicate failing to estimate fails the whole call; replicates
//!   that merely did not converge still contribute their parameters.
use crate::data::Dataset;
use crate::model::{
    Model, dispatch,
    errors::{ModelError, ModelResult},
};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

/// Bootstrap covariance of `model`'s estimator on `data`.
///
/// # Errors
/// - `ModelError::InvalidSettings` if `replicates < 2`.
/// - `ModelError::ShapeError` if `data` has no rows.
/// - The first estimation error raised by any replicate.
pub fn bootstrap_covariance(
    data: &Dataset, model: &Model, replicates: usize, seed: u64,
) -> ModelResult<Array2<f64>> {
    if replicates < 2 {
        return Err(ModelError::InvalidSettings {
            name: "replicates",
            value: replicates as f64,
            reason: "at least two replicates are needed for a covariance",
        });
    }
    let n = data.nrows();
    if n == 0 {
        return Err(ModelError::ShapeError { reason: "cannot bootstrap an empty dataset".into() });
    }

    let estimates = (0..replicates)
        .into_par_iter()
        .map(|r| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(r as u64));
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let resampled = data.select_rows(&rows);
            let fitted = dispatch::estimate(Some(&resampled), &model.copy_deep())?;
            fitted.packed()
        })
        .collect::<ModelResult<Vec<Array1<f64>>>>()?;

    let k = estimates[0].len();
    let mut draws = Array2::<f64>::zeros((replicates, k));
    for (mut row, estimate) in draws.axis_iter_mut(Axis(0)).zip(&estimates) {
        row.assign(estimate);
    }
    let mean = draws.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(k));
    let centered = &draws - &mean;
    Ok(centered.t().dot(&centered) / (replicates as f64 - 1.0))
}
