//! Conversions between our matrix formats and external libraries

use crate::matrix::SparseMatrix;
use num_traits::Num;
use sprs::CsMat;

/// Converts any of our storage formats to an sprs CsMat in CSC form.
///
/// Goes through sorted triplets, so the result is valid sprs storage even
/// when the source matrix is jumbled or holds a dense layout.
pub fn to_sprs_csc<T>(matrix: &SparseMatrix<T>) -> CsMat<T>
where
    T: Copy + PartialEq + Num + Default,
{
    let triplets = matrix.to_triplets();
    let mut col_ptr = vec![0usize; matrix.n_cols + 1];
    let mut row_idx = Vec::with_capacity(triplets.len());
    let mut values = Vec::with_capacity(triplets.len());

    for &(i, j, v) in &triplets {
        col_ptr[j + 1] += 1;
        row_idx.push(i);
        values.push(v);
    }
    for j in 0..matrix.n_cols {
        col_ptr[j + 1] += col_ptr[j];
    }

    CsMat::new_csc((matrix.n_rows, matrix.n_cols), col_ptr, row_idx, values)
}

/// Converts an sprs CsMat to our CSC storage
pub fn from_sprs_csc<T>(matrix: CsMat<T>) -> SparseMatrix<T>
where
    T: Copy + PartialEq + Num + Default,
{
    let matrix = if matrix.is_csc() { matrix } else { matrix.to_csc() };

    let shape = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();

    SparseMatrix::new_csc(shape.0, shape.1, indptr, indices, data)
}
