//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices. Coefficient
//! matrices in canonical form are always `output_size x variable_size`.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together. Out-of-range entries are dropped.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Build a CSC matrix by mapping every stored entry of `m` to a new position.
fn remap(
    m: &CscMatrix<f64>,
    nrows: usize,
    ncols: usize,
    mut f: impl FnMut(usize, usize, f64) -> Option<(usize, usize, f64)>,
) -> CscMatrix<f64> {
    let mut rows = Vec::with_capacity(m.nnz());
    let mut cols = Vec::with_capacity(m.nnz());
    let mut vals = Vec::with_capacity(m.nnz());
    for (r, c, v) in m.triplet_iter() {
        if let Some((r, c, v)) = f(r, c, *v) {
            rows.push(r);
            cols.push(c);
            vals.push(v);
        }
    }
    csc_from_triplets(nrows, ncols, rows, cols, vals)
}

/// Convert a dense matrix to CSC format, dropping exact zeros.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for j in 0..dense.ncols() {
        for i in 0..dense.nrows() {
            let v = dense[(i, j)];
            if v != 0.0 {
                rows.push(i);
                cols.push(j);
                vals.push(v);
            }
        }
    }

    csc_from_triplets(dense.nrows(), dense.ncols(), rows, cols, vals)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Add two CSC matrices of the same shape.
pub fn csc_add(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(a.nrows(), a.ncols());
    for (r, c, v) in a.triplet_iter().chain(b.triplet_iter()) {
        coo.push(r, c, *v);
    }
    CscMatrix::from(&coo)
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    remap(a, a.nrows(), a.ncols(), |r, c, v| Some((r, c, v * scalar)))
}

/// Scale row `i` of a CSC matrix by `factors[i]`.
pub fn csc_scale_rows(a: &CscMatrix<f64>, factors: &[f64]) -> CscMatrix<f64> {
    remap(a, a.nrows(), a.ncols(), |r, c, v| {
        factors.get(r).map(|f| (r, c, v * f))
    })
}

/// Move row `r` of a CSC matrix to row `perm[r]`.
pub fn csc_permute_rows(a: &CscMatrix<f64>, perm: &[usize]) -> CscMatrix<f64> {
    remap(a, a.nrows(), a.ncols(), |r, c, v| {
        perm.get(r).map(|&p| (p, c, v))
    })
}

/// Repeat a single-row CSC matrix `times` times vertically.
pub fn csc_repeat_rows(m: &CscMatrix<f64>, times: usize) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for (r, c, v) in m.triplet_iter() {
        for t in 0..times {
            rows.push(t * m.nrows() + r);
            cols.push(c);
            vals.push(*v);
        }
    }

    csc_from_triplets(m.nrows() * times, m.ncols(), rows, cols, vals)
}

/// Sparse matrix product `a * b`.
pub fn csc_matmul(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    a * b
}

/// Kronecker product `a ⊗ b`.
pub fn csc_kron(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let (br, bc) = (b.nrows(), b.ncols());
    let mut rows = Vec::with_capacity(a.nnz() * b.nnz());
    let mut cols = Vec::with_capacity(a.nnz() * b.nnz());
    let mut vals = Vec::with_capacity(a.nnz() * b.nnz());
    for (ar, ac, av) in a.triplet_iter() {
        for (r, c, v) in b.triplet_iter() {
            rows.push(ar * br + r);
            cols.push(ac * bc + c);
            vals.push(av * v);
        }
    }
    csc_from_triplets(a.nrows() * br, a.ncols() * bc, rows, cols, vals)
}

/// Horizontally concatenate CSC matrices with the same row count.
pub fn csc_hstack(blocks: &[&CscMatrix<f64>]) -> CscMatrix<f64> {
    let nrows = blocks.first().map_or(0, |b| b.nrows());
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    let mut offset = 0;
    for block in blocks {
        for (r, c, v) in block.triplet_iter() {
            rows.push(r);
            cols.push(offset + c);
            vals.push(*v);
        }
        offset += block.ncols();
    }
    csc_from_triplets(nrows, offset, rows, cols, vals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_summed() {
        let m = csc_from_triplets(2, 2, vec![0, 0, 1], vec![0, 0, 1], vec![1.0, 2.0, 3.0]);
        let d = csc_to_dense(&m);
        assert_eq!(d[(0, 0)], 3.0);
        assert_eq!(d[(1, 1)], 3.0);
    }

    #[test]
    fn test_add_and_scale() {
        let i = CscMatrix::identity(3);
        let sum = csc_add(&i, &csc_scale(&i, 2.0));
        assert_eq!(csc_to_dense(&sum), DMatrix::identity(3, 3) * 3.0);
    }

    #[test]
    fn test_matmul_matches_dense() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        let b = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 0.0, 2.0, 4.0, 0.0]);
        let prod = csc_matmul(&dense_to_csc(&a), &dense_to_csc(&b));
        assert_eq!(csc_to_dense(&prod), &a * &b);
    }

    #[test]
    fn test_kron_with_identity() {
        let a = dense_to_csc(&DMatrix::from_row_slice(1, 2, &[1.0, 2.0]));
        let k = csc_kron(&CscMatrix::identity(2), &a);
        let expected = DMatrix::from_row_slice(2, 4, &[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
        assert_eq!(csc_to_dense(&k), expected);
    }

    #[test]
    fn test_row_operations() {
        let i = CscMatrix::identity(3);
        let scaled = csc_to_dense(&csc_scale_rows(&i, &[1.0, -1.0, 0.5]));
        assert_eq!(scaled[(1, 1)], -1.0);
        assert_eq!(scaled[(2, 2)], 0.5);

        let permuted = csc_to_dense(&csc_permute_rows(&i, &[2, 0, 1]));
        assert_eq!(permuted[(2, 0)], 1.0);
        assert_eq!(permuted[(0, 1)], 1.0);

        let row = dense_to_csc(&DMatrix::from_row_slice(1, 2, &[1.0, -1.0]));
        let repeated = csc_repeat_rows(&row, 3);
        assert_eq!(repeated.nrows(), 3);
        assert_eq!(csc_to_dense(&repeated)[(2, 1)], -1.0);
    }

    #[test]
    fn test_hstack() {
        let a = CscMatrix::identity(2);
        let b = csc_scale(&CscMatrix::identity(2), 3.0);
        let h = csc_to_dense(&csc_hstack(&[&a, &b]));
        assert_eq!(h.ncols(), 4);
        assert_eq!(h[(1, 3)], 3.0);
    }
}
