//! Flop estimation for `C = A*B`
//!
//! Computes, per output column, the number of scalar multiply-add operations
//! the multiply will perform, as a prefix-sum array usable for balanced task
//! partitioning. The count for column `j` is the sum of `nnz(A(:,k))` over
//! the entries `B(k,j)`, plus the cost of scanning `M(:,j)` when a
//! sparse-layout mask participates. Mask-scan work is also totalled
//! separately so the caller can decide whether applying the mask during the
//! multiply is worthwhile.

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{try_vec, Result};
use crate::matrix::mask::{Mask, MaskValue};
use crate::matrix::SparseMatrix;
use crate::utils::exclusive_scan;

/// Per-column flop estimates for one multiply call
#[derive(Debug)]
pub struct FlopCounts {
    /// Prefix sums over B's column slots: slot `k` costs
    /// `bflops[k+1] - bflops[k]`, and `bflops[nvec]` is the total.
    pub bflops: Vec<usize>,
    /// Total flops including any counted mask-scan work
    pub total: usize,
    /// Total mask-scan work, counted separately for the mask policy
    pub mask_work: usize,
}

impl FlopCounts {
    /// Flops for slot `k`
    pub fn col_flops(&self, k: usize) -> usize {
        self.bflops[k + 1] - self.bflops[k]
    }
}

/// Estimates the flops of `A*B` per column of B.
///
/// The per-column counts are computed by a data-parallel map over B's column
/// slots; the reduction to prefix sums is an associative sum, so the result
/// is identical for any thread count. A sparse-layout mask adds its
/// per-column entry count to each counted column; a column whose
/// non-complemented mask is empty costs nothing, since it can produce no
/// output. Dense-layout masks are not counted here; the caller's policy
/// accounts for them.
pub fn estimate_flops<TA, TB, M>(
    a: &SparseMatrix<TA>,
    b: &SparseMatrix<TB>,
    mask: Option<&Mask<'_, M>>,
    config: &EngineConfig,
) -> Result<FlopCounts>
where
    TA: Copy + Send + Sync,
    TB: Copy + Send + Sync,
    M: MaskValue,
{
    let bnvec = b.nvec();
    let mut per_col = try_vec(0usize, bnvec, "flop counts")?;
    let mut mask_per_col = try_vec(0usize, bnvec, "mask work")?;

    let sparse_mask = mask.filter(|m| !m.matrix.is_dense_layout());

    let nthreads = config.nthreads_for((b.nnz() + bnvec) as f64);
    let body = |kb: usize, fl: &mut usize, mw: &mut usize| {
        let j = b.col_id(kb);

        if let Some(m) = sparse_mask {
            let (ms, me) = m.matrix.lookup_col(j);
            let mjnz = me - ms;
            *mw = mjnz;
            if mjnz == 0 && !m.complement {
                // the mask admits nothing in this column
                return;
            }
            *fl = mjnz;
        }

        let (start, end) = b.col_range(kb);
        for p in start..end {
            if !b.present_at(p) {
                continue;
            }
            let k = b.row_at(p);
            let (a_start, a_end) = a.lookup_col(k);
            *fl += a_end - a_start;
        }
    };

    if nthreads > 1 {
        per_col
            .par_iter_mut()
            .zip(mask_per_col.par_iter_mut())
            .enumerate()
            .for_each(|(kb, (fl, mw))| body(kb, fl, mw));
    } else {
        for (kb, (fl, mw)) in per_col.iter_mut().zip(mask_per_col.iter_mut()).enumerate() {
            body(kb, fl, mw);
        }
    }

    let bflops = exclusive_scan(&per_col);
    let total = bflops[bnvec];
    let mask_work = mask_per_col.iter().sum();

    Ok(FlopCounts { bflops, total, mask_work })
}
