//! Per-task accumulation workspaces
//!
//! All task tables live in three shared slabs: `Hf` (per-slot state), `Hx`
//! (accumulated values), and `Hi` (row indices, coarse hash tasks only).
//! Each workspace owner gets a contiguous region padded out to a cache line
//! so neighbouring owners never share one; members of a fine team alias
//! their leader's region and synchronize through the `Hf` atomics, their
//! monoid's atomic fold, or the team lock.
//!
//! `Hf` state is method-specific. Coarse tasks treat it as a mark table
//! seeded with zero; a slot is occupied for the current column when it holds
//! that column's mark. Fine teams treat it as a claim table seeded with
//! [`FINE_EMPTY`]; the symbolic phase installs row indices by
//! compare-and-swap and the table survives untouched into the numeric
//! phase, which makes the output structure independent of the thread count.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::constants::CACHE_LINE_BYTES;
use crate::error::{try_vec_with, Result};
use crate::multiply::tasks::TaskList;
use crate::semiring::SyncCell;

/// Unclaimed slot in a fine team's `Hf` table
pub const FINE_EMPTY: i64 = -1;

/// Set on a claimed `Hf` slot once an ANY-monoid writer has published its
/// value; later writers leave the cell alone.
pub const FINE_WRITTEN_BIT: i64 = 1 << 62;

/// Recovers the row index from a claimed fine `Hf` slot
#[inline]
pub fn fine_row(state: i64) -> usize {
    (state & !FINE_WRITTEN_BIT) as usize
}

#[derive(Clone)]
struct TableView {
    hf_off: usize,
    hx_off: usize,
    hi_off: usize,
    len: usize,
    has_hi: bool,
    lock: usize,
}

/// The slab-backed tables for one multiply call
pub struct Workspace<C> {
    hf: Vec<AtomicI64>,
    hx: Vec<SyncCell<C>>,
    hi: Vec<SyncCell<usize>>,
    locks: Vec<Mutex<()>>,
    views: Vec<TableView>,
}

/// One task's slices of the workspace slabs
pub struct TaskTables<'w, C> {
    /// Per-slot state: marks (coarse) or claimed rows (fine)
    pub hf: &'w [AtomicI64],
    /// Accumulated values; empty when the semiring needs none
    pub hx: &'w [SyncCell<C>],
    /// Row index per slot; present only for coarse hash tasks
    pub hi: &'w [SyncCell<usize>],
    /// Serializes non-atomic fine folds within the team
    pub lock: &'w Mutex<()>,
}

fn pad_slots<T>() -> usize {
    CACHE_LINE_BYTES.div_ceil(std::mem::size_of::<T>().max(1))
}

impl<C: Copy + Send + Sync> Workspace<C> {
    /// Lays out and initializes the workspace for a task list.
    ///
    /// `skip_values` elides the `Hx` slab for pattern-only semirings. Every
    /// allocation is fallible; a failure drops whatever was built so far.
    pub fn build(
        tasks: &TaskList,
        cvlen: usize,
        identity: C,
        skip_values: bool,
    ) -> Result<Workspace<C>> {
        let hf_pad = pad_slots::<AtomicI64>();
        let hx_pad = pad_slots::<C>();
        let hi_pad = pad_slots::<usize>();

        let mut views: Vec<TableView> = Vec::with_capacity(tasks.tasks.len());
        let mut hf_len = 0;
        let mut hx_len = 0;
        let mut hi_len = 0;
        let mut n_owners = 0;

        for (tid, task) in tasks.tasks.iter().enumerate() {
            if task.is_fine() && task.leader != tid {
                // members share the leader's tables; leaders precede members
                views.push(views[task.leader].clone());
                continue;
            }
            let has_hi = !task.is_fine() && !task.uses_gustavson(cvlen);
            views.push(TableView {
                hf_off: hf_len,
                hx_off: hx_len,
                hi_off: hi_len,
                len: task.hash_size,
                has_hi,
                lock: n_owners,
            });
            hf_len += task.hash_size + hf_pad;
            if !skip_values {
                hx_len += task.hash_size + hx_pad;
            }
            if has_hi {
                hi_len += task.hash_size + hi_pad;
            }
            n_owners += 1;
        }

        let hf = try_vec_with(hf_len, "task state tables", || AtomicI64::new(0))?;
        let hx = try_vec_with(hx_len, "task value tables", || SyncCell::new(identity))?;
        let hi = try_vec_with(hi_len, "task index tables", || SyncCell::new(0usize))?;
        let locks = try_vec_with(n_owners, "team locks", || Mutex::new(()))?;

        // fine leaders' state tables start out unclaimed, not zero-marked
        for (tid, task) in tasks.tasks.iter().enumerate() {
            if task.is_fine() && task.leader == tid {
                let view = &views[tid];
                for slot in &hf[view.hf_off..view.hf_off + view.len] {
                    slot.store(FINE_EMPTY, Ordering::Relaxed);
                }
            }
        }

        Ok(Workspace { hf, hx, hi, locks, views })
    }

    /// The table slices for task `tid`
    pub fn tables(&self, tid: usize) -> TaskTables<'_, C> {
        let view = &self.views[tid];
        TaskTables {
            hf: &self.hf[view.hf_off..view.hf_off + view.len],
            hx: if self.hx.is_empty() {
                &[]
            } else {
                &self.hx[view.hx_off..view.hx_off + view.len]
            },
            hi: if view.has_hi {
                &self.hi[view.hi_off..view.hi_off + view.len]
            } else {
                &[]
            },
            lock: &self.locks[view.lock],
        }
    }
}
