//! Observation matrix with optional column names.
//!
//! A [`Dataset`] wraps an `ndarray::Array2<f64>` whose rows are observations.
//! Combinators use the slicing helpers to route column ranges to their
//! component models (`cross`), evaluate one row at a time (`mixture`,
//! the `p`→`log_likelihood` fallback), or remap rows (`coordinate_transform`).
use crate::model::errors::{ModelError, ModelResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use std::ops::Range;

/// Row-major observation matrix consumed by model methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    matrix: Array2<f64>,
    names: Option<Vec<String>>,
}

impl Dataset {
    /// Wrap an existing matrix (rows = observations).
    pub fn new(matrix: Array2<f64>) -> Self {
        Self { matrix, names: None }
    }

    /// Build an `n × 1` dataset from a slice of scalar observations.
    pub fn from_column(values: &[f64]) -> Self {
        let matrix = Array1::from(values.to_vec()).insert_axis(Axis(1));
        Self { matrix, names: None }
    }

    /// Build a `1 × k` dataset holding a single observation.
    pub fn from_row(row: ArrayView1<f64>) -> Self {
        let matrix = row.to_owned().insert_axis(Axis(0));
        Self { matrix, names: None }
    }

    /// Build a dataset from equally sized rows.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f64>]) -> ModelResult<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * ncols);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(ModelError::ShapeError {
                    reason: format!("row {index} has {} columns, expected {ncols}", row.len()),
                });
            }
            flat.extend_from_slice(row);
        }
        let matrix = Array2::from_shape_vec((rows.len(), ncols), flat)
            .map_err(|e| ModelError::ShapeError { reason: e.to_string() })?;
        Ok(Self { matrix, names: None })
    }

    /// Attach column names.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` if the name count differs from `ncols()`.
    pub fn with_names(mut self, names: Vec<String>) -> ModelResult<Self> {
        if names.len() != self.ncols() {
            return Err(ModelError::ShapeError {
                reason: format!("{} names supplied for {} columns", names.len(), self.ncols()),
            });
        }
        self.names = Some(names);
        Ok(self)
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.matrix.get((row, col)).copied()
    }

    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// Every element, row by row.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.matrix.iter().copied()
    }

    /// View of row `index`, or `None` when out of bounds.
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.nrows()).then(|| self.matrix.row(index))
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> + '_ {
        self.matrix.rows().into_iter()
    }

    /// Copy of row `index` as a one-row dataset.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` if `index` is out of bounds.
    pub fn row_dataset(&self, index: usize) -> ModelResult<Dataset> {
        let row = self.row(index).ok_or_else(|| ModelError::ShapeError {
            reason: format!("row {index} out of bounds for {} rows", self.nrows()),
        })?;
        Ok(Dataset::from_row(row))
    }

    /// Copy of the column range `cols`, keeping names when present.
    ///
    /// # Errors
    /// - `ModelError::ShapeError` if the range exceeds `ncols()`.
    pub fn columns(&self, cols: Range<usize>) -> ModelResult<Dataset> {
        if cols.start > cols.end || cols.end > self.ncols() {
            return Err(ModelError::ShapeError {
                reason: format!(
                    "column range {}..{} out of bounds for {} columns",
                    cols.start,
                    cols.end,
                    self.ncols()
                ),
            });
        }
        let names = self.names.as_ref().map(|n| n[cols.clone()].to_vec());
        Ok(Dataset { matrix: self.matrix.slice(s![.., cols]).to_owned(), names })
    }

    /// Copy of the listed rows, in order and with repetition (resampling).
    ///
    /// Indices past the end are skipped.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let kept: Vec<usize> = indices.iter().copied().filter(|&i| i < self.nrows()).collect();
        Dataset { matrix: self.matrix.select(Axis(0), &kept), names: self.names.clone() }
    }

    /// Apply `f` to every row and stack the outputs.
    ///
    /// # Errors
    /// - Propagates errors from `f`.
    /// - `ModelError::ShapeError` if `f` returns rows of differing lengths.
    pub fn map_rows<F>(&self, f: F) -> ModelResult<Dataset>
    where
        F: Fn(ArrayView1<f64>) -> ModelResult<Array1<f64>>,
    {
        let mapped = self.rows().map(f).collect::<ModelResult<Vec<_>>>()?;
        let rows: Vec<Vec<f64>> = mapped.into_iter().map(|r| r.to_vec()).collect();
        if rows.is_empty() {
            return Ok(Dataset::new(Array2::zeros((0, self.ncols()))));
        }
        Dataset::from_rows(&rows)
    }
}

impl From<Array2<f64>> for Dataset {
    fn from(matrix: Array2<f64>) -> Self {
        Dataset::new(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction from columns and rows, including ragged-row rejection.
    // - Column slicing with names and out-of-range handling.
    // - Row selection with repetition and per-row mapping.
    //
    // They intentionally DO NOT cover:
    // - Any model behavior; datasets are plain containers here.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure `from_rows` rejects rows of unequal length.
    //
    // Given
    // -----
    // - Two rows with 2 and 3 entries.
    //
    // Expect
    // ------
    // - `ModelError::ShapeError`.
    fn from_rows_rejects_ragged_input() {
        // Arrange
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]];

        // Act
        let result = Dataset::from_rows(&rows);

        // Assert
        assert!(matches!(result, Err(ModelError::ShapeError { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Verify that `columns` slices values and names together.
    //
    // Given
    // -----
    // - A 2×3 named dataset.
    //
    // Expect
    // ------
    // - Columns 1..3 keep the right values and names; 2..4 is rejected.
    fn columns_slices_values_and_names() {
        // Arrange
        let data = Dataset::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])
            .with_names(vec!["a".into(), "b".into(), "c".into()])
            .expect("three names for three columns");

        // Act
        let right = data.columns(1..3).expect("in range");
        let bad = data.columns(2..4);

        // Assert
        assert_eq!(right.matrix(), array![[2.0, 3.0], [5.0, 6.0]].view());
        assert_eq!(right.names(), Some(&["b".to_string(), "c".to_string()][..]));
        assert!(matches!(bad, Err(ModelError::ShapeError { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Check that `select_rows` honors order and repetition.
    //
    // Given
    // -----
    // - A 3-row column dataset and indices [2, 0, 2].
    //
    // Expect
    // ------
    // - Rows come back as [3, 1, 3].
    fn select_rows_resamples_with_repetition() {
        // Arrange
        let data = Dataset::from_column(&[1.0, 2.0, 3.0]);

        // Act
        let picked = data.select_rows(&[2, 0, 2]);

        // Assert
        assert_eq!(picked.values().collect::<Vec<_>>(), vec![3.0, 1.0, 3.0]);
    }

    #[test]
    // Purpose
    // -------
    // Verify `map_rows` applies a row map and keeps the row count.
    //
    // Given
    // -----
    // - A 2-row column dataset and the map x ↦ (x, 2x).
    //
    // Expect
    // ------
    // - A 2×2 dataset with the mapped entries.
    fn map_rows_stacks_mapped_rows() {
        // Arrange
        let data = Dataset::from_column(&[1.0, 2.0]);

        // Act
        let mapped = data.map_rows(|r| Ok(array![r[0], 2.0 * r[0]])).expect("map succeeds");

        // Assert
        assert_eq!(mapped.matrix(), array![[1.0, 2.0], [2.0, 4.0]].view());
    }
}
