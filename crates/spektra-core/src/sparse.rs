//! Sparse matrix helpers on top of `sprs` CSR matrices.
//!
//! Everything here works on the stored entries only; nothing densifies an
//! `n x n` operator except [`to_dense`], which exists for small inspections
//! and tests.

use ndarray::Array2;
use sprs::{CsMat, TriMat};

/// Coordinate-list tensor handed across the model boundary.
///
/// Equivalent to a `(indices, values, shape)` triple: `indices[k] = [row, col]`
/// holds `values[k]`. Entries are in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    pub indices: Vec<[usize; 2]>,
    pub values: Vec<f32>,
    pub shape: [usize; 2],
}

impl SparseTensor {
    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Expand into a dense row-major buffer of `shape[0] * shape[1]` values.
    pub fn to_dense_vec(&self) -> Vec<f32> {
        let [rows, cols] = self.shape;
        let mut dense = vec![0.0f32; rows * cols];
        for (&[r, c], &v) in self.indices.iter().zip(&self.values) {
            dense[r * cols + c] += v;
        }
        dense
    }
}

impl From<&CsMat<f64>> for SparseTensor {
    #[allow(clippy::cast_possible_truncation)]
    fn from(m: &CsMat<f64>) -> Self {
        let mut indices = Vec::with_capacity(m.nnz());
        let mut values = Vec::with_capacity(m.nnz());
        for_each_entry(m, |r, c, v| {
            indices.push([r, c]);
            values.push(v as f32);
        });
        Self { indices, values, shape: [m.rows(), m.cols()] }
    }
}

impl From<&CsMat<f32>> for SparseTensor {
    fn from(m: &CsMat<f32>) -> Self {
        let mut indices = Vec::with_capacity(m.nnz());
        let mut values = Vec::with_capacity(m.nnz());
        for_each_entry(m, |r, c, v| {
            indices.push([r, c]);
            values.push(v);
        });
        Self { indices, values, shape: [m.rows(), m.cols()] }
    }
}

/// Visit every stored entry of a CSR matrix as `(row, col, value)`.
pub fn for_each_entry<N: Copy>(m: &CsMat<N>, mut f: impl FnMut(usize, usize, N)) {
    for (row, vec) in m.outer_iterator().enumerate() {
        for (col, &v) in vec.iter() {
            f(row, col, v);
        }
    }
}

/// `n x n` identity in CSR form.
pub fn identity(n: usize) -> CsMat<f64> {
    CsMat::eye(n)
}

/// Build a CSR matrix from `(row, col, value)` triplets. Duplicates are summed.
pub fn from_triplets(shape: (usize, usize), triplets: impl IntoIterator<Item = (usize, usize, f64)>) -> CsMat<f64> {
    let mut tri: TriMat<f64> = TriMat::new(shape);
    for (r, c, v) in triplets {
        tri.add_triplet(r, c, v);
    }
    tri.to_csr()
}

/// Multiply every stored value by `factor`.
pub fn scale(m: &CsMat<f64>, factor: f64) -> CsMat<f64> {
    m.map(|&v| v * factor)
}

/// Row sums (weighted degrees for an adjacency matrix).
pub fn row_sums(m: &CsMat<f64>) -> Vec<f64> {
    m.outer_iterator().map(|row| row.iter().map(|(_, &v)| v).sum()).collect()
}

/// Sparse matrix-vector product `y = M x`.
pub fn matvec(m: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    m.outer_iterator()
        .map(|row| row.iter().map(|(col, &v)| v * x[col]).sum())
        .collect()
}

/// Symmetric permutation `P M Pᵀ`.
///
/// `permutation[k]` is the old index placed at new position `k`, so entry
/// `(i, j)` moves to `(pos(i), pos(j))`.
pub fn permute_symmetric(m: &CsMat<f64>, permutation: &[usize]) -> CsMat<f64> {
    let position = invert_permutation(permutation);
    let mut triplets = Vec::with_capacity(m.nnz());
    for_each_entry(m, |r, c, v| triplets.push((position[r], position[c], v)));
    from_triplets((m.rows(), m.cols()), triplets)
}

/// Row permutation `P M` for an `f32` CSR matrix.
pub fn permute_rows_f32(m: &CsMat<f32>, permutation: &[usize]) -> CsMat<f32> {
    let position = invert_permutation(permutation);
    let mut tri: TriMat<f32> = TriMat::new((m.rows(), m.cols()));
    for_each_entry(m, |r, c, v| tri.add_triplet(position[r], c, v));
    tri.to_csr()
}

/// Inverse of a permutation: `inverse[permutation[k]] == k`.
pub fn invert_permutation(permutation: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; permutation.len()];
    for (new, &old) in permutation.iter().enumerate() {
        inverse[old] = new;
    }
    inverse
}

/// Dense copy of a sparse matrix.
pub fn to_dense(m: &CsMat<f64>) -> Array2<f64> {
    let mut dense = Array2::zeros((m.rows(), m.cols()));
    for_each_entry(m, |r, c, v| dense[[r, c]] += v);
    dense
}

/// Largest absolute entrywise difference between two equally shaped matrices.
pub fn max_abs_diff(a: &CsMat<f64>, b: &CsMat<f64>) -> f64 {
    let diff = &to_dense(a) - &to_dense(b);
    diff.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}
