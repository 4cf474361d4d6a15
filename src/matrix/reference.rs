//! Reference implementation of masked semiring multiplication
//!
//! This provides a baseline for correctness testing. It uses a simple
//! column-by-column approach with a hashmap accumulator over any storage
//! variant, honoring the full mask semantics, and is not optimized for
//! performance.

use std::collections::HashMap;

use crate::matrix::mask::{Mask, MaskValue};
use crate::matrix::SparseMatrix;
use crate::semiring::SemiringOps;

/// Multiplies `C<M> = A*B` with a hashmap accumulator, as a correctness
/// oracle for the parallel engine.
///
/// The result is sparse CSC with sorted columns.
pub fn reference_multiply<S, M>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    mask: Option<Mask<'_, M>>,
    semiring: &S,
    flip: bool,
) -> SparseMatrix<S::CVal>
where
    S: SemiringOps,
    M: MaskValue,
{
    assert_eq!(
        a.n_cols, b.n_rows,
        "Matrix dimensions must be compatible for multiplication"
    );

    let n_rows = a.n_rows;
    let n_cols = b.n_cols;

    let mut col_ptr = Vec::with_capacity(n_cols + 1);
    let mut row_idx = Vec::new();
    let mut values = Vec::new();
    col_ptr.push(0);

    let mut next_col = 0;
    for kb in 0..b.nvec() {
        let j = b.col_id(kb);
        // hypersparse B skips columns; emit the empty ones
        while next_col < j {
            col_ptr.push(row_idx.len());
            next_col += 1;
        }

        let col_mask = mask.as_ref().map(|m| m.column(j));
        let mut accum: HashMap<usize, S::CVal> = HashMap::new();

        for (k, b_val) in b.col_iter(kb) {
            let (a_start, a_end) = a.lookup_col(k);
            for p in a_start..a_end {
                if !a.present_at(p) {
                    continue;
                }
                let i = a.row_at(p);
                if let Some(cm) = &col_mask {
                    if !cm.admits(i) {
                        continue;
                    }
                }
                let z = if flip {
                    semiring.multiply_flipped(a.value_at(p), b_val)
                } else {
                    semiring.multiply(a.value_at(p), b_val)
                };
                match accum.get_mut(&i) {
                    Some(acc) => *acc = semiring.fold(*acc, z),
                    None => {
                        accum.insert(i, z);
                    }
                }
            }
        }

        let mut col_entries: Vec<_> = accum.into_iter().collect();
        col_entries.sort_by_key(|&(i, _)| i);
        for (i, v) in col_entries {
            row_idx.push(i);
            values.push(v);
        }
        col_ptr.push(row_idx.len());
        next_col = j + 1;
    }
    while next_col < n_cols {
        col_ptr.push(row_idx.len());
        next_col += 1;
    }

    SparseMatrix::new_csc(n_rows, n_cols, col_ptr, row_idx, values)
}
