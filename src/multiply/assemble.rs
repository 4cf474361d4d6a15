//! Output gather and final matrix construction
//!
//! Fine-team results live in the team's shared table after the numeric
//! phase; the gather splits each table into one slice per team member,
//! counts the occupied slots per slice, prefix-sums those counts into write
//! offsets within the column's output range, and copies entries out in
//! parallel with no further synchronization. Coarse output was already
//! written in place, so the final step just wraps the arrays in the
//! requested storage format, pruning empty columns for hypersparse output.

use std::sync::atomic::Ordering;

use rayon::prelude::*;

use crate::config::OutputFormat;
use crate::error::{try_vec, Result};
use crate::matrix::SparseMatrix;
use crate::multiply::tasks::{Task, TaskList};
use crate::multiply::workspace::{fine_row, Workspace, FINE_EMPTY};
use crate::semiring::{SemiringOps, SyncCell};

/// The slot range of one fine task's slice of its team's table
fn slice_bounds(task: &Task, tid: usize) -> (usize, usize) {
    let ord = tid - task.leader;
    let lo = task.hash_size * ord / task.team_size;
    let hi = task.hash_size * (ord + 1) / task.team_size;
    (lo, hi)
}

/// Copies fine-team results from the workspace tables into the output
/// arrays.
pub fn gather_fine<S: SemiringOps>(
    semiring: &S,
    tasks: &TaskList,
    workspace: &Workspace<S::CVal>,
    cp: &[usize],
    ci: &[SyncCell<usize>],
    cx: &[SyncCell<S::CVal>],
) -> Result<()> {
    let n_fine = tasks.n_fine;
    if n_fine == 0 {
        return Ok(());
    }

    // occupied slots per slice
    let my_counts: Vec<usize> = (0..n_fine)
        .into_par_iter()
        .map(|tid| {
            let task = &tasks.tasks[tid];
            let tables = workspace.tables(tid);
            let (lo, hi) = slice_bounds(task, tid);
            tables.hf[lo..hi]
                .iter()
                .filter(|s| s.load(Ordering::Relaxed) != FINE_EMPTY)
                .count()
        })
        .collect();

    // write offsets: a team's slices pack its column's output range in
    // member order
    let mut offsets = try_vec(0usize, n_fine, "gather offsets")?;
    let mut cursor = 0usize;
    for tid in 0..n_fine {
        let task = &tasks.tasks[tid];
        if task.leader == tid {
            // vector is always set on fine tasks
            cursor = cp[task.vector.unwrap_or(0)];
        }
        offsets[tid] = cursor;
        cursor += my_counts[tid];
    }

    let constant = if semiring.is_any_pair() {
        semiring.constant_multiply_value()
    } else {
        None
    };

    (0..n_fine).into_par_iter().for_each(|tid| {
        let task = &tasks.tasks[tid];
        let tables = workspace.tables(tid);
        let (lo, hi) = slice_bounds(task, tid);
        let mut q = offsets[tid];
        for slot in lo..hi {
            let state = tables.hf[slot].load(Ordering::Relaxed);
            if state == FINE_EMPTY {
                continue;
            }
            unsafe { ci[q].store(fine_row(state)) };
            let v = match constant {
                Some(c) => c,
                None => unsafe { tables.hx[slot].load() },
            };
            unsafe { cx[q].store(v) };
            q += 1;
        }
        debug_assert_eq!(q, offsets[tid] + my_counts[tid]);
    });

    Ok(())
}

/// Wraps the finished output arrays in the requested storage format.
///
/// `cp`, `ci`, and `cx` are indexed by B's column slots. Sparse output over
/// a hypersparse B expands the pointer array to all columns; hypersparse
/// output keeps only the non-empty slots. The result is flagged jumbled:
/// hash accumulation emits rows in insertion order, not sorted.
pub fn build_output<C: Copy, TB: Copy>(
    b: &SparseMatrix<TB>,
    n_rows: usize,
    cp: Vec<usize>,
    ci: Vec<usize>,
    cx: Vec<C>,
    format: OutputFormat,
) -> Result<SparseMatrix<C>> {
    let bnvec = b.nvec();
    let nnz = ci.len();

    let mut c = match format {
        OutputFormat::Sparse => {
            let col_ptr = if bnvec == b.n_cols {
                cp
            } else {
                // spread the hypersparse slots over the full column range
                let mut col_ptr = try_vec(0usize, b.n_cols + 1, "output column pointers")?;
                for kk in 0..bnvec {
                    col_ptr[b.col_id(kk) + 1] = cp[kk + 1] - cp[kk];
                }
                for j in 0..b.n_cols {
                    col_ptr[j + 1] += col_ptr[j];
                }
                col_ptr
            };
            SparseMatrix::new_csc(n_rows, b.n_cols, col_ptr, ci, cx)
        }
        OutputFormat::Hypersparse => {
            let mut col_ids = Vec::new();
            let mut col_ptr = Vec::new();
            for kk in 0..bnvec {
                if cp[kk + 1] > cp[kk] {
                    col_ids.push(b.col_id(kk));
                    col_ptr.push(cp[kk]);
                }
            }
            col_ptr.push(nnz);
            SparseMatrix::new_hypersparse(n_rows, b.n_cols, col_ids, col_ptr, ci, cx)
        }
    };
    if nnz > 0 {
        c.set_jumbled(true);
    }
    Ok(c)
}
