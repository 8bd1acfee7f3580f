//! Feature matrices: dense or sparse item-by-feature data.
//!
//! Text collections are usually represented as sparse term-frequency
//! matrices, while embeddings and stylometric profiles are dense. Both are
//! wrapped in [`FeatureMatrix`], which supports the two slicing operations
//! the estimator needs: row selection by index list (time buckets) and
//! column selection by a possibly repeating index list (feature bootstrap).

use crate::error::{Error, Result};
use crate::matrix::DenseMatrix;
use sprs::CsMat;
use std::borrow::Cow;

/// Item-by-feature matrix, rows are items.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureMatrix {
    Dense(DenseMatrix),
    /// Always stored in CSR order.
    Sparse(CsMat<f64>),
}

impl From<DenseMatrix> for FeatureMatrix {
    fn from(mat: DenseMatrix) -> Self {
        FeatureMatrix::Dense(mat)
    }
}

impl From<CsMat<f64>> for FeatureMatrix {
    fn from(mat: CsMat<f64>) -> Self {
        if mat.is_csr() {
            FeatureMatrix::Sparse(mat)
        } else {
            FeatureMatrix::Sparse(mat.to_csr())
        }
    }
}

impl FeatureMatrix {
    /// Dense matrix from equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let expected = rows.first().map_or(0, Vec::len);
        DenseMatrix::from_rows(rows)
            .map(FeatureMatrix::Dense)
            .ok_or_else(|| Error::DimensionMismatch {
                what: "row length",
                expected,
                found: rows
                    .iter()
                    .map(Vec::len)
                    .find(|&l| l != expected)
                    .unwrap_or(expected),
            })
    }

    /// Sparse CSR matrix from its raw parts.
    pub fn from_csr(
        shape: (usize, usize),
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self> {
        CsMat::try_new(shape, indptr, indices, data)
            .map(FeatureMatrix::Sparse)
            .map_err(|(_, _, _, e)| Error::InvalidSparse(e.to_string()))
    }

    pub fn nrows(&self) -> usize {
        match self {
            FeatureMatrix::Dense(m) => m.nrows(),
            FeatureMatrix::Sparse(m) => m.rows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            FeatureMatrix::Dense(m) => m.ncols(),
            FeatureMatrix::Sparse(m) => m.cols(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureMatrix::Sparse(_))
    }

    /// Columns `cols` in order, repeats allowed.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn select_columns(&self, cols: &[usize]) -> Self {
        match self {
            FeatureMatrix::Dense(m) => FeatureMatrix::Dense(m.select_columns(cols)),
            FeatureMatrix::Sparse(m) => FeatureMatrix::Sparse(sparse_select_columns(m, cols)),
        }
    }

    /// Rows `rows` in order.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        match self {
            FeatureMatrix::Dense(m) => FeatureMatrix::Dense(m.select_rows(rows)),
            FeatureMatrix::Sparse(m) => {
                let mut indptr = Vec::with_capacity(rows.len() + 1);
                let mut indices = Vec::new();
                let mut data = Vec::new();
                indptr.push(0);
                for &r in rows {
                    if let Some(row) = m.outer_view(r) {
                        indices.extend_from_slice(row.indices());
                        data.extend_from_slice(row.data());
                    }
                    indptr.push(indices.len());
                }
                FeatureMatrix::Sparse(CsMat::new((rows.len(), m.cols()), indptr, indices, data))
            }
        }
    }

    /// Row `i` as a dense vector.
    pub fn dense_row(&self, i: usize) -> Vec<f64> {
        match self {
            FeatureMatrix::Dense(m) => m.row(i),
            FeatureMatrix::Sparse(m) => {
                let mut out = vec![0.0; m.cols()];
                if let Some(row) = m.outer_view(i) {
                    for (j, &v) in row.iter() {
                        out[j] = v;
                    }
                }
                out
            }
        }
    }

    pub(crate) fn to_rows(&self) -> Rows {
        match self {
            FeatureMatrix::Dense(m) => Rows::Dense(m.rows()),
            FeatureMatrix::Sparse(m) => Rows::Sparse {
                dim: m.cols(),
                rows: m
                    .outer_iterator()
                    .map(|row| SparseRow {
                        indices: row.indices().to_vec(),
                        values: row.data().to_vec(),
                    })
                    .collect(),
            },
        }
    }
}

/// Column selection on a CSR matrix. A source column that was drawn several
/// times lands at several output positions.
fn sparse_select_columns(m: &CsMat<f64>, cols: &[usize]) -> CsMat<f64> {
    let mut targets: Vec<Vec<usize>> = vec![Vec::new(); m.cols()];
    for (pos, &c) in cols.iter().enumerate() {
        targets[c].push(pos);
    }

    let mut indptr = Vec::with_capacity(m.rows() + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();
    indptr.push(0);
    let mut entries: Vec<(usize, f64)> = Vec::new();
    for row in m.outer_iterator() {
        entries.clear();
        for (c, &v) in row.iter() {
            for &pos in &targets[c] {
                entries.push((pos, v));
            }
        }
        entries.sort_unstable_by_key(|&(pos, _)| pos);
        for &(pos, v) in &entries {
            indices.push(pos);
            data.push(v);
        }
        indptr.push(indices.len());
    }
    CsMat::new((m.rows(), cols.len()), indptr, indices, data)
}

/// Sparse row with sorted column indices.
#[derive(Debug, Clone)]
pub(crate) struct SparseRow {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseRow {
    pub fn to_dense(&self, dim: usize) -> Vec<f64> {
        let mut out = vec![0.0; dim];
        for (&j, &v) in self.indices.iter().zip(self.values.iter()) {
            out[j] = v;
        }
        out
    }
}

/// Row-major snapshot of a feature matrix, the form distance kernels read.
#[derive(Debug, Clone)]
pub(crate) enum Rows {
    Dense(Vec<Vec<f64>>),
    Sparse { dim: usize, rows: Vec<SparseRow> },
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Dense(r) => r.len(),
            Rows::Sparse { rows, .. } => rows.len(),
        }
    }

    pub fn dense(&self, i: usize) -> Cow<'_, [f64]> {
        match self {
            Rows::Dense(r) => Cow::Borrowed(&r[i]),
            Rows::Sparse { dim, rows } => Cow::Owned(rows[i].to_dense(*dim)),
        }
    }
}
