//! loglik_optimizer::types — numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Name the vector, matrix, and solver types used across the optimizer so
//! the rest of the crate never spells out `ndarray` or argmin generics.
//!
//! Conventions
//! -----------
//! - `Theta` is always a model's packed parameter vector; `Grad` has the
//!   same length.
//! - `Cost` is `-ℓ(θ)`; sign flips happen in the adapter only.
//! - Line-search and solver aliases follow argmin's
//!   `(Param, Gradient, Float)` ordering.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    neldermead::NelderMead,
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Packed parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient `∇ℓ(θ)` or `∇c(θ)`, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `n × n` second-derivative matrix, `n = θ.len()`.
pub type Hessian = Array2<f64>;

/// Scalar cost `c(θ) = -ℓ(θ)`.
pub type Cost = f64;

/// argmin's evaluation counters (`"cost_count"`, `"gradient_count"`, ...).
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history length.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

/// Derivative-free simplex solver over the same parameter type.
pub type NelderMeadSolver = NelderMead<Theta, Cost>;
