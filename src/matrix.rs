//! Dense column-major matrix used for feature matrices and distance matrices.
//!
//! [`DenseMatrix`] carries its dimensions alongside a flat `Vec<f64>` so that
//! callers never do `data[i + j * n]` arithmetic by hand.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Column-major dense matrix.
///
/// Element `(row, col)` lives at index `row + col * nrows`. For feature
/// matrices rows are items (texts) and columns are features; for distance
/// matrices rows are queries and columns are candidates.
///
/// # Examples
///
/// ```
/// use textnet::matrix::DenseMatrix;
///
/// let mat = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
/// assert_eq!(mat.shape(), (3, 2));
/// assert_eq!(mat[(1, 0)], 3.0);
/// assert_eq!(mat.column(1), &[2.0, 4.0, 6.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl DenseMatrix {
    /// Create from flat column-major data.
    ///
    /// Returns `None` if `data.len() != nrows * ncols`.
    pub fn from_column_major(data: Vec<f64>, nrows: usize, ncols: usize) -> Option<Self> {
        if data.len() != nrows * ncols {
            return None;
        }
        Some(Self { data, nrows, ncols })
    }

    /// Create from a list of equally long rows.
    ///
    /// Returns `None` if the rows are ragged. An empty list gives a 0 x 0 matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncols) {
            return None;
        }
        let mut data = vec![0.0; nrows * ncols];
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                data[i + j * nrows] = v;
            }
        }
        Some(Self { data, nrows, ncols })
    }

    /// Zero-filled matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::filled(nrows, ncols, 0.0)
    }

    /// Matrix with every element set to `value`.
    pub fn filled(nrows: usize, ncols: usize, value: f64) -> Self {
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Dimensions as `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contiguous column slice.
    ///
    /// # Panics
    /// Panics if `col >= ncols`.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let start = col * self.nrows;
        &self.data[start..start + self.nrows]
    }

    /// Copy of a single row. Rows are strided in column-major layout.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols)
            .map(|j| self.data[row + j * self.nrows])
            .collect()
    }

    /// All rows as owned vectors.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.nrows).map(|i| self.row(i)).collect()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Bounds-checked element access.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.nrows && col < self.ncols {
            Some(self.data[row + col * self.nrows])
        } else {
            None
        }
    }

    /// New matrix made of the given columns, in order. Indices may repeat,
    /// which is how bootstrap feature samples drawn with replacement are
    /// materialized.
    ///
    /// # Panics
    /// Panics if any index is `>= ncols`.
    pub fn select_columns(&self, cols: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.nrows * cols.len());
        for &c in cols {
            data.extend_from_slice(self.column(c));
        }
        Self {
            data,
            nrows: self.nrows,
            ncols: cols.len(),
        }
    }

    /// New matrix made of the given rows, in order.
    ///
    /// # Panics
    /// Panics if any index is `>= nrows`.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let n = rows.len();
        let mut data = vec![0.0; n * self.ncols];
        for j in 0..self.ncols {
            let col = self.column(j);
            for (k, &i) in rows.iter().enumerate() {
                data[k + j * n] = col[i];
            }
        }
        Self {
            data,
            nrows: n,
            ncols: self.ncols,
        }
    }

    /// Set every `(i, i)` element to `value`.
    pub fn fill_diagonal(&mut self, value: f64) {
        for i in 0..self.nrows.min(self.ncols) {
            self.data[i + i * self.nrows] = value;
        }
    }

    /// Scale every element in place.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Convert to a nalgebra `DMatrix<f64>`. Both layouts are column-major.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.nrows, self.ncols, &self.data)
    }
}

impl std::ops::Index<(usize, usize)> for DenseMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "DenseMatrix index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &self.data[row + col * self.nrows]
    }
}

impl std::ops::IndexMut<(usize, usize)> for DenseMatrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "DenseMatrix index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &mut self.data[row + col * self.nrows]
    }
}

impl std::fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DenseMatrix({}x{})", self.nrows, self.ncols)
    }
}
