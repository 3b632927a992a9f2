//! data — the narrow numeric container contract consumed by models.
//!
//! Purpose
//! -------
//! Provide the minimal data surface the model framework needs: an
//! observation matrix ([`Dataset`]) and a parameter container
//! ([`Parameters`]) that packs to, and unpacks from, a flat vector. Full
//! matrix I/O, printing, and persistence live outside this crate.
//!
//! Key behaviors
//! -------------
//! - [`Dataset`] exposes row/column counts, element access, column-range
//!   slicing, row selection, and per-row mapping.
//! - [`Parameters`] carries an optional vector block and an optional matrix
//!   block and converts between that structured form and a flat `Array1`.
//! - [`ParamShape`] and [`Dim`] describe declared parameter sizes, including
//!   the "resolve from data" sentinel.
//!
//! Invariants & assumptions
//! ------------------------
//! - Rows are observations; columns are variables.
//! - The packed layout is the vector block first, then the matrix block in
//!   row-major order. `unpack` requires exactly `len()` values.
//!
//! Conventions
//! -----------
//! - Shape violations are reported as `ModelError::ShapeError`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each type and cover slicing, packing, and
//!   shape resolution.

pub mod dataset;
pub mod parameters;

pub use self::dataset::Dataset;
pub use self::parameters::{Dim, ParamShape, Parameters, ResolvedShape};
