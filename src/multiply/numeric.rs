//! Numeric phase: value accumulation
//!
//! Runs after the symbolic phase has sized every output column and the
//! output arrays are allocated. Coarse tasks recompute their patterns with
//! fresh marks (the workspace is never cleared between phases) while folding
//! products, then scatter finished entries straight into their exclusive
//! output ranges. Fine tasks only look rows up in the claim table their
//! team built during the symbolic phase and fold into the shared value
//! cells: by hardware atomic when the monoid supports it, by first-writer
//! claim for the ANY monoid, and under the team lock otherwise. Fine
//! results reach the output arrays in the gather step afterwards.

use std::sync::atomic::{AtomicI64, Ordering};

use rayon::prelude::*;

use crate::constants::HASH_FACTOR;
use crate::matrix::mask::{Mask, MaskValue};
use crate::matrix::SparseMatrix;
use crate::multiply::tasks::{Task, TaskList};
use crate::multiply::workspace::{fine_row, TaskTables, Workspace, FINE_EMPTY, FINE_WRITTEN_BIT};
use crate::semiring::{SemiringOps, SyncCell};

/// Runs the numeric phase.
///
/// `ci` and `cx` are the output row/value arrays, already sized by the
/// symbolic counts. Coarse tasks fill their ranges here; fine teams leave
/// their results in the workspace for the gather step.
#[allow(clippy::too_many_arguments)]
pub fn numeric_phase<S, M>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    mask: Option<&Mask<'_, M>>,
    semiring: &S,
    flip: bool,
    tasks: &TaskList,
    workspace: &Workspace<S::CVal>,
    cvlen: usize,
    cp: &[usize],
    ci: &[SyncCell<usize>],
    cx: &[SyncCell<S::CVal>],
) where
    S: SemiringOps,
    M: MaskValue,
{
    (0..tasks.tasks.len()).into_par_iter().for_each(|tid| {
        let task = &tasks.tasks[tid];
        let tables = workspace.tables(tid);
        match task.vector {
            Some(_) => fine_task(a, b, semiring, flip, task, &tables, cvlen),
            None => coarse_task(a, b, mask, semiring, flip, task, &tables, cvlen, cp, ci, cx),
        }
    });
}

#[inline]
fn product<S: SemiringOps>(semiring: &S, flip: bool, aval: S::AVal, bval: S::BVal) -> S::CVal {
    if flip {
        semiring.multiply_flipped(aval, bval)
    } else {
        semiring.multiply(aval, bval)
    }
}

/// Locates row `i` in a fine team's claim table; `None` means the symbolic
/// phase never admitted it.
#[inline]
fn fine_slot(hf: &[AtomicI64], i: usize, gustavson: bool, hash_bits: usize) -> Option<usize> {
    if gustavson {
        if hf[i].load(Ordering::Relaxed) == FINE_EMPTY {
            None
        } else {
            Some(i)
        }
    } else {
        let mut h = i.wrapping_mul(HASH_FACTOR) & hash_bits;
        loop {
            let cur = hf[h].load(Ordering::Relaxed);
            if cur == FINE_EMPTY {
                return None;
            }
            if fine_row(cur) == i {
                return Some(h);
            }
            h = (h + 1) & hash_bits;
        }
    }
}

fn fine_task<S: SemiringOps>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    semiring: &S,
    flip: bool,
    task: &Task,
    tables: &TaskTables<'_, S::CVal>,
    cvlen: usize,
) {
    if semiring.is_any_pair() {
        // pattern-only; the gather writes the pair constant
        return;
    }
    let gustavson = task.uses_gustavson(cvlen);
    let hash_bits = task.hash_size.wrapping_sub(1);
    let is_any = semiring.monoid_is_any();
    let atomic = semiring.monoid_atomic();

    for p in task.start..task.end {
        if !b.present_at(p) {
            continue;
        }
        let bval = b.value_at(p);
        let (a_start, a_end) = a.lookup_col(b.row_at(p));
        for pa in a_start..a_end {
            if !a.present_at(pa) {
                continue;
            }
            let i = a.row_at(pa);
            let Some(h) = fine_slot(tables.hf, i, gustavson, hash_bits) else {
                continue;
            };
            let z = product(semiring, flip, a.value_at(pa), bval);
            if is_any {
                // first claimant publishes; everyone else backs off
                if tables.hf[h]
                    .compare_exchange(
                        i as i64,
                        i as i64 | FINE_WRITTEN_BIT,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    unsafe { tables.hx[h].store(z) };
                }
            } else if atomic {
                semiring.fold_atomic(&tables.hx[h], z);
            } else {
                let _guard = tables.lock.lock().unwrap_or_else(|e| e.into_inner());
                let cur = unsafe { tables.hx[h].load() };
                if semiring.terminal() != Some(cur) {
                    unsafe { tables.hx[h].store(semiring.fold(cur, z)) };
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn coarse_task<S, M>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    mask: Option<&Mask<'_, M>>,
    semiring: &S,
    flip: bool,
    task: &Task,
    tables: &TaskTables<'_, S::CVal>,
    cvlen: usize,
    cp: &[usize],
    ci: &[SyncCell<usize>],
    cx: &[SyncCell<S::CVal>],
) where
    S: SemiringOps,
    M: MaskValue,
{
    let gustavson = task.uses_gustavson(cvlen);
    let hash_bits = task.hash_size.wrapping_sub(1);
    let is_any = semiring.monoid_is_any();
    let has_values = !tables.hx.is_empty();
    let constant = if semiring.is_any_pair() {
        semiring.constant_multiply_value()
    } else {
        None
    };
    let ncols = task.end - task.start;

    for kk in task.start..task.end {
        let base = cp[kk];
        let cjnz = cp[kk + 1] - base;
        if cjnz == 0 {
            continue;
        }
        let col = mask.map(|m| m.column(b.col_id(kk)));
        // marks continue past the symbolic phase's, so no clearing needed
        let mark = (ncols + kk - task.start + 1) as i64;
        let mut out = 0usize;

        let (bs, be) = b.col_range(kk);
        for p in bs..be {
            if !b.present_at(p) {
                continue;
            }
            let bval = b.value_at(p);
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
                let z = product(semiring, flip, a.value_at(pa), bval);
                if gustavson {
                    if tables.hf[i].load(Ordering::Relaxed) != mark {
                        tables.hf[i].store(mark, Ordering::Relaxed);
                        unsafe { ci[base + out].store(i) };
                        if has_values {
                            unsafe { tables.hx[i].store(z) };
                        }
                        out += 1;
                    } else if !is_any && has_values {
                        let cur = unsafe { tables.hx[i].load() };
                        if semiring.terminal() != Some(cur) {
                            unsafe { tables.hx[i].store(semiring.fold(cur, z)) };
                        }
                    }
                } else {
                    let mut h = i.wrapping_mul(HASH_FACTOR) & hash_bits;
                    loop {
                        if tables.hf[h].load(Ordering::Relaxed) == mark {
                            if unsafe { tables.hi[h].load() } == i {
                                if !is_any && has_values {
                                    let cur = unsafe { tables.hx[h].load() };
                                    if semiring.terminal() != Some(cur) {
                                        unsafe {
                                            tables.hx[h].store(semiring.fold(cur, z))
                                        };
                                    }
                                }
                                break;
                            }
                            h = (h + 1) & hash_bits;
                        } else {
                            tables.hf[h].store(mark, Ordering::Relaxed);
                            unsafe { tables.hi[h].store(i) };
                            unsafe { ci[base + out].store(i) };
                            if has_values {
                                unsafe { tables.hx[h].store(z) };
                            }
                            out += 1;
                            break;
                        }
                    }
                }
            }
        }
        debug_assert_eq!(out, cjnz, "numeric pattern must match the symbolic count");

        // scatter this column's values behind its finished pattern
        if let Some(cval) = constant {
            for q in 0..cjnz {
                unsafe { cx[base + q].store(cval) };
            }
        } else if gustavson {
            for q in 0..cjnz {
                let i = unsafe { ci[base + q].load() };
                unsafe { cx[base + q].store(tables.hx[i].load()) };
            }
        } else {
            for q in 0..cjnz {
                let i = unsafe { ci[base + q].load() };
                let mut h = i.wrapping_mul(HASH_FACTOR) & hash_bits;
                while !(tables.hf[h].load(Ordering::Relaxed) == mark
                    && unsafe { tables.hi[h].load() } == i)
                {
                    h = (h + 1) & hash_bits;
                }
                unsafe { cx[base + q].store(tables.hx[h].load()) };
            }
        }
    }
}
