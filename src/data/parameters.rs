//! Parameter storage, declared shapes, and the flat pack/unpack contract.
//!
//! Optimizers and samplers work on a flat `Array1<f64>`; models keep their
//! parameters as an optional vector block plus an optional matrix block.
//! [`Parameters::pack`] and [`Parameters::unpack`] convert between the two
//! (vector first, then the matrix in row-major order).
use crate::model::errors::{ModelError, ModelResult};
use ndarray::{Array1, Array2, ArrayView1};

/// Declared size of one parameter block dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    /// Exactly this many entries.
    Fixed(usize),
    /// Equal to the column count of the data seen at prep time.
    FromData,
}

impl Dim {
    /// Resolve against an optional data column count.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` when the size depends on data and none was
    ///   supplied.
    pub fn resolve(self, data_cols: Option<usize>, field: &str) -> ModelResult<usize> {
        match (self, data_cols) {
            (Dim::Fixed(n), _) => Ok(n),
            (Dim::FromData, Some(cols)) => Ok(cols),
            (Dim::FromData, None) => Err(ModelError::ShapeError {
                reason: format!("`{field}` is sized from the data but no data was supplied"),
            }),
        }
    }
}

/// Declared shape of a model's parameters (`vsize`, `msize1 × msize2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamShape {
    pub vsize: Dim,
    pub msize1: Dim,
    pub msize2: Dim,
}

impl ParamShape {
    /// Vector-only parameters.
    pub fn vector(vsize: Dim) -> Self {
        Self { vsize, msize1: Dim::Fixed(0), msize2: Dim::Fixed(0) }
    }

    /// Matrix-only parameters.
    pub fn matrix(msize1: Dim, msize2: Dim) -> Self {
        Self { vsize: Dim::Fixed(0), msize1, msize2 }
    }

    pub fn resolve(&self, data_cols: Option<usize>) -> ModelResult<ResolvedShape> {
        Ok(ResolvedShape {
            vsize: self.vsize.resolve(data_cols, "vsize")?,
            msize1: self.msize1.resolve(data_cols, "msize1")?,
            msize2: self.msize2.resolve(data_cols, "msize2")?,
        })
    }
}

impl From<ResolvedShape> for ParamShape {
    fn from(shape: ResolvedShape) -> Self {
        Self {
            vsize: Dim::Fixed(shape.vsize),
            msize1: Dim::Fixed(shape.msize1),
            msize2: Dim::Fixed(shape.msize2),
        }
    }
}

/// A [`ParamShape`] with every dimension known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedShape {
    pub vsize: usize,
    pub msize1: usize,
    pub msize2: usize,
}

impl ResolvedShape {
    pub fn len(&self) -> usize {
        self.vsize + self.msize1 * self.msize2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structured parameter container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    pub vector: Option<Array1<f64>>,
    pub matrix: Option<Array2<f64>>,
}

impl Parameters {
    /// Zero-filled parameters for a resolved shape; empty blocks stay `None`.
    pub fn zeros(shape: &ResolvedShape) -> Self {
        let vector = (shape.vsize > 0).then(|| Array1::zeros(shape.vsize));
        let matrix =
            (shape.msize1 * shape.msize2 > 0).then(|| Array2::zeros((shape.msize1, shape.msize2)));
        Self { vector, matrix }
    }

    pub fn from_vector(vector: Array1<f64>) -> Self {
        Self { vector: Some(vector), matrix: None }
    }

    pub fn len(&self) -> usize {
        self.vector.as_ref().map_or(0, Array1::len) + self.matrix.as_ref().map_or(0, Array2::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into one vector: vector block, then matrix rows.
    pub fn pack(&self) -> Array1<f64> {
        let mut flat = Vec::with_capacity(self.len());
        if let Some(v) = &self.vector {
            flat.extend(v.iter().copied());
        }
        if let Some(m) = &self.matrix {
            flat.extend(m.iter().copied());
        }
        Array1::from(flat)
    }

    /// Overwrite every entry from a flat vector produced by [`pack`](Self::pack).
    ///
    /// # Errors
    /// - `ModelError::ShapeError` if `flat.len() != self.len()`.
    pub fn unpack(&mut self, flat: ArrayView1<f64>) -> ModelResult<()> {
        if flat.len() != self.len() {
            return Err(ModelError::ShapeError {
                reason: format!("expected {} packed parameters, got {}", self.len(), flat.len()),
            });
        }
        let mut values = flat.iter().copied();
        if let Some(v) = self.vector.as_mut() {
            v.iter_mut().zip(values.by_ref()).for_each(|(slot, x)| *slot = x);
        }
        if let Some(m) = self.matrix.as_mut() {
            m.iter_mut().zip(values).for_each(|(slot, x)| *slot = x);
        }
        Ok(())
    }
}
