//! Symbolic phase: output pattern sizes
//!
//! Counts the distinct (and mask-admitted) output rows of every column of C
//! without touching values, so the output arrays can be allocated exactly.
//! Coarse tasks sweep their column ranges with a per-column mark in `Hf`.
//! Fine tasks claim rows in their team's shared table by compare-and-swap;
//! a claim that succeeds counts the row exactly once across the team, and
//! the claimed table is left in place for the numeric phase, which is why
//! the output structure never depends on the thread count.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::constants::HASH_FACTOR;
use crate::error::{try_vec_with, Result};
use crate::matrix::mask::{ColMask, Mask, MaskValue};
use crate::matrix::SparseMatrix;
use crate::multiply::tasks::{Task, TaskList};
use crate::multiply::workspace::{TaskTables, Workspace, FINE_EMPTY};

/// Runs the symbolic phase and returns the entry count of every output
/// column slot.
pub fn symbolic_phase<TA, TB, C, M>(
    a: &SparseMatrix<TA>,
    b: &SparseMatrix<TB>,
    mask: Option<&Mask<'_, M>>,
    tasks: &TaskList,
    workspace: &Workspace<C>,
    cvlen: usize,
) -> Result<Vec<usize>>
where
    TA: Copy + Send + Sync,
    TB: Copy + Send + Sync,
    C: Copy + Send + Sync,
    M: MaskValue,
{
    let cjnz = try_vec_with(b.nvec(), "column counts", || AtomicUsize::new(0))?;

    (0..tasks.tasks.len()).into_par_iter().for_each(|tid| {
        let task = &tasks.tasks[tid];
        let tables = workspace.tables(tid);
        match task.vector {
            Some(kk) => fine_task(a, b, mask, task, kk, &tables, cvlen, &cjnz[kk]),
            None => coarse_task(a, b, mask, task, &tables, cvlen, &cjnz),
        }
    });

    Ok(cjnz.into_iter().map(AtomicUsize::into_inner).collect())
}

/// True when a non-complemented mask column admits nothing at all
fn column_dead<M: MaskValue>(mask: Option<&Mask<'_, M>>, col: &Option<ColMask<'_, M>>) -> bool {
    match (mask, col) {
        (Some(m), Some(c)) => !m.complement && !m.matrix.is_dense_layout() && c.is_empty(),
        _ => false,
    }
}

fn coarse_task<TA, TB, C, M>(
    a: &SparseMatrix<TA>,
    b: &SparseMatrix<TB>,
    mask: Option<&Mask<'_, M>>,
    task: &Task,
    tables: &TaskTables<'_, C>,
    cvlen: usize,
    cjnz: &[AtomicUsize],
) where
    TA: Copy + Send + Sync,
    TB: Copy + Send + Sync,
    C: Copy + Send + Sync,
    M: MaskValue,
{
    let gustavson = task.uses_gustavson(cvlen);
    let hash_bits = task.hash_size.wrapping_sub(1);

    for kk in task.start..task.end {
        let col = mask.map(|m| m.column(b.col_id(kk)));
        if column_dead(mask, &col) {
            continue;
        }
        // one fresh mark per column; the table never needs clearing
        let mark = (kk - task.start + 1) as i64;
        let mut count = 0usize;

        let (bs, be) = b.col_range(kk);
        for p in bs..be {
            if !b.present_at(p) {
                continue;
            }
            let (a_start, a_end) = a.lookup_col(b.row_at(p));
            for pa in a_start..a_end {
                if !a.present_at(pa) {
                    continue;
                }
                let i = a.row_at(pa);
                if let Some(c) = &col {
                    if !c.admits(i) {
                        continue;
                    }
                }
                if gustavson {
                    if tables.hf[i].load(Ordering::Relaxed) != mark {
                        tables.hf[i].store(mark, Ordering::Relaxed);
                        count += 1;
                    }
                } else {
                    let mut h = i.wrapping_mul(HASH_FACTOR) & hash_bits;
                    loop {
                        if tables.hf[h].load(Ordering::Relaxed) == mark {
                            // occupied for this column; ours or a collision
                            if unsafe { tables.hi[h].load() } == i {
                                break;
                            }
                            h = (h + 1) & hash_bits;
                        } else {
                            tables.hf[h].store(mark, Ordering::Relaxed);
                            unsafe { tables.hi[h].store(i) };
                            count += 1;
                            break;
                        }
                    }
                }
            }
        }
        cjnz[kk].store(count, Ordering::Relaxed);
    }
}

#[allow(clippy::too_many_arguments)]
fn fine_task<TA, TB, C, M>(
    a: &SparseMatrix<TA>,
    b: &SparseMatrix<TB>,
    mask: Option<&Mask<'_, M>>,
    task: &Task,
    kk: usize,
    tables: &TaskTables<'_, C>,
    cvlen: usize,
    counter: &AtomicUsize,
) where
    TA: Copy + Send + Sync,
    TB: Copy + Send + Sync,
    C: Copy + Send + Sync,
    M: MaskValue,
{
    let col = mask.map(|m| m.column(b.col_id(kk)));
    if column_dead(mask, &col) {
        return;
    }
    let gustavson = task.uses_gustavson(cvlen);
    let hash_bits = task.hash_size.wrapping_sub(1);
    let mut inserted = 0usize;

    for p in task.start..task.end {
        if !b.present_at(p) {
            continue;
        }
        let (a_start, a_end) = a.lookup_col(b.row_at(p));
        for pa in a_start..a_end {
            if !a.present_at(pa) {
                continue;
            }
            let i = a.row_at(pa);
            if let Some(c) = &col {
                if !c.admits(i) {
                    continue;
                }
            }
            if gustavson {
                // slot i belongs to row i; first claim wins
                if tables.hf[i].load(Ordering::Relaxed) == FINE_EMPTY
                    && tables.hf[i]
                        .compare_exchange(
                            FINE_EMPTY,
                            i as i64,
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                {
                    inserted += 1;
                }
            } else {
                let mut h = i.wrapping_mul(HASH_FACTOR) & hash_bits;
                loop {
                    let cur = tables.hf[h].load(Ordering::Relaxed);
                    if cur == i as i64 {
                        break;
                    }
                    if cur == FINE_EMPTY {
                        match tables.hf[h].compare_exchange(
                            FINE_EMPTY,
                            i as i64,
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        ) {
                            Ok(_) => {
                                inserted += 1;
                                break;
                            }
                            // lost the race; reinspect the same slot
                            Err(_) => continue,
                        }
                    }
                    h = (h + 1) & hash_bits;
                }
            }
        }
    }
    if inserted > 0 {
        counter.fetch_add(inserted, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlgorithmHint, EngineConfig};
    use crate::multiply::flops::estimate_flops;
    use crate::multiply::tasks::partition_tasks;

    fn counts(
        a: &SparseMatrix<f64>,
        b: &SparseMatrix<f64>,
        mask: Option<&Mask<'_, bool>>,
        hint: AlgorithmHint,
        nthreads: usize,
    ) -> Vec<usize> {
        let mut config = EngineConfig::with_threads(nthreads);
        config.chunk = 1.0;
        let flops = estimate_flops(a, b, mask, &config).unwrap();
        let tasks = partition_tasks(a, b, &flops, a.n_rows, nthreads, hint, &config);
        let ws = Workspace::build(&tasks, a.n_rows, 0.0f64, false).unwrap();
        symbolic_phase(a, b, mask, &tasks, &ws, a.n_rows).unwrap()
    }

    fn sample() -> (SparseMatrix<f64>, SparseMatrix<f64>) {
        // A: 4x4 with overlapping columns, B chosen so C(:,0) merges rows
        let a = SparseMatrix::from_entries(
            4,
            4,
            vec![
                (0, 0, 1.0),
                (2, 0, 1.0),
                (1, 1, 1.0),
                (2, 1, 1.0),
                (3, 2, 1.0),
                (0, 3, 1.0),
            ],
        );
        let b = SparseMatrix::from_entries(
            4,
            3,
            vec![(0, 0, 1.0), (1, 0, 1.0), (2, 1, 1.0), (3, 2, 1.0)],
        );
        (a, b)
    }

    #[test]
    fn test_counts_match_distinct_rows() {
        let (a, b) = sample();
        // C(:,0) = rows {0,2} ∪ {1,2} = {0,1,2}; C(:,1) = {3}; C(:,2) = {0}
        for hint in [AlgorithmHint::Default, AlgorithmHint::ForceHash] {
            for nthreads in [1, 4] {
                assert_eq!(counts(&a, &b, None, hint, nthreads), vec![3, 1, 1]);
            }
        }
    }

    #[test]
    fn test_masked_counts() {
        let (a, b) = sample();
        let m = SparseMatrix::from_entries(4, 3, vec![(1, 0, true), (0, 2, true)]);
        let mask = Mask::new(&m).structural(true);
        assert_eq!(counts(&a, &b, Some(&mask), AlgorithmHint::Default, 1), vec![1, 0, 1]);

        let comp = Mask::new(&m).structural(true).complemented(true);
        assert_eq!(counts(&a, &b, Some(&comp), AlgorithmHint::Default, 1), vec![2, 1, 0]);
    }

    #[test]
    fn test_fine_team_counts_each_row_once() {
        // one costly dense column split across a fine team
        let n = 48;
        let mut a_entries = Vec::new();
        for j in 0..n {
            for i in 0..n {
                a_entries.push((i, j, 1.0));
            }
        }
        let a = SparseMatrix::from_entries(n, n, a_entries);
        let mut b_entries: Vec<(usize, usize, f64)> =
            (0..n).map(|i| (i, 0, 1.0)).collect();
        b_entries.push((0, 1, 1.0));
        let b = SparseMatrix::from_entries(n, n, b_entries);

        let got = counts(&a, &b, None, AlgorithmHint::Default, 4);
        assert_eq!(got[0], n);
        assert_eq!(got[1], n);
        assert!(got[2..].iter().all(|&c| c == 0));
    }
}
