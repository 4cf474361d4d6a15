//! Task construction for the multiply pipeline
//!
//! The flop prefix sums are split into roughly equal-work initial groups,
//! two per thread. A group of cheap columns becomes a *coarse* task that
//! owns a contiguous range of B's column slots and a private workspace. A
//! single column whose flop count exceeds `costly_factor` times the target
//! group size is instead handed to a team of *fine* tasks, each claiming a
//! slice of that column's entries in B and all sharing one workspace built
//! from atomics. Fine tasks come first in the task list so a team's leader
//! id is the id of its first member.

use rayon::prelude::*;

use crate::config::{AlgorithmHint, EngineConfig, Tuning};
use crate::matrix::SparseMatrix;
use crate::multiply::flops::FlopCounts;
use crate::utils::{balanced_partition, exclusive_scan};

/// One unit of scheduled work, coarse or fine
#[derive(Debug, Clone)]
pub struct Task {
    /// Coarse: first column slot of B. Fine: first entry position in B.
    pub start: usize,
    /// Exclusive end of the slot range (coarse) or entry range (fine)
    pub end: usize,
    /// The single column slot a fine task works on; `None` marks coarse
    pub vector: Option<usize>,
    /// Workspace table size in slots; equal to the output vector length
    /// when the task uses Gustavson's method, a power of two otherwise
    pub hash_size: usize,
    /// Task id of the workspace owner (self, for coarse tasks)
    pub leader: usize,
    /// Number of tasks sharing the leader's workspace
    pub team_size: usize,
    /// Estimated flops for this task
    pub flops: usize,
}

impl Task {
    pub fn is_fine(&self) -> bool {
        self.vector.is_some()
    }

    /// Gustavson tasks index their table by row; hash tasks probe it
    pub fn uses_gustavson(&self, cvlen: usize) -> bool {
        self.hash_size >= cvlen
    }
}

/// The scheduled tasks for one multiply, fine tasks first
#[derive(Debug)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub n_fine: usize,
}

impl TaskList {
    pub fn n_coarse(&self) -> usize {
        self.tasks.len() - self.n_fine
    }
}

/// Picks the workspace table size for a task with `flmax` flops.
///
/// The hash table gets twice the smallest power of two exceeding the flop
/// count, which bounds its load factor at one half. Once that reaches a
/// fraction of the output vector length, direct indexing is cheaper and the
/// task uses Gustavson's method instead (table size `cvlen`). A forced hash
/// still degrades to Gustavson when the table would be no smaller than the
/// output vector.
pub fn hash_table_size(
    flmax: usize,
    cvlen: usize,
    hint: AlgorithmHint,
    tuning: &Tuning,
) -> usize {
    let hash_size = 2 * (flmax.max(1) + 1).next_power_of_two();
    let use_gustavson = match hint {
        AlgorithmHint::ForceGustavson => true,
        AlgorithmHint::ForceHash => hash_size >= cvlen,
        AlgorithmHint::Default => hash_size >= cvlen / tuning.gustavson_switch_divisor,
    };
    if use_gustavson {
        cvlen
    } else {
        hash_size
    }
}

/// Builds the coarse/fine task list from the per-column flop estimates.
///
/// Every column slot of B lands in exactly one coarse task's range or one
/// fine team, and every fine team's entry slices tile its column's range in
/// B. A costly column with at most one entry is never split; there is
/// nothing to share. With a single thread the whole multiply is one task,
/// fine when B has a single column so the special case keeps one code path.
/// The per-task flop target is floored at `config.chunk`, so small
/// multiplies never pay the fine-task overhead.
pub fn partition_tasks<TA, TB>(
    a: &SparseMatrix<TA>,
    b: &SparseMatrix<TB>,
    flops: &FlopCounts,
    cvlen: usize,
    nthreads: usize,
    hint: AlgorithmHint,
    config: &EngineConfig,
) -> TaskList
where
    TA: Copy + Send + Sync,
    TB: Copy + Send + Sync,
{
    let tuning = &config.tuning;
    let bnvec = b.nvec();
    if bnvec == 0 {
        return TaskList { tasks: Vec::new(), n_fine: 0 };
    }

    let ntasks_initial = if nthreads == 1 {
        1
    } else {
        tuning.ntasks_per_thread * nthreads
    };
    let target = (flops.total as f64 / ntasks_initial as f64).max(config.chunk).max(1.0);

    if ntasks_initial == 1 {
        if bnvec == 1 {
            // one column, one fine task of team size one
            let (bs, be) = b.col_range(0);
            let hs = hash_table_size(flops.total, cvlen, hint, tuning);
            let task = Task {
                start: bs,
                end: be,
                vector: Some(0),
                hash_size: hs,
                leader: 0,
                team_size: 1,
                flops: flops.total,
            };
            return TaskList { tasks: vec![task], n_fine: 1 };
        }
        let flmax = (0..bnvec).map(|k| flops.col_flops(k)).max().unwrap_or(0);
        let task = Task {
            start: 0,
            end: bnvec,
            vector: None,
            hash_size: hash_table_size(flmax, cvlen, hint, tuning),
            leader: 0,
            team_size: 1,
            flops: flops.total,
        };
        return TaskList { tasks: vec![task], n_fine: 0 };
    }

    let bounds = balanced_partition(&flops.bflops, ntasks_initial);
    let costly = target * tuning.costly_factor;
    let fine_target = (target / tuning.fine_work_factor).max(config.chunk).max(1.0);

    let mut fine: Vec<Task> = Vec::new();
    // coarse slot ranges, finished after the max-flop reduction below
    let mut coarse_ranges: Vec<(usize, usize)> = Vec::new();

    for t in 0..ntasks_initial {
        let kfirst = bounds[t];
        let klast = bounds[t + 1];

        // a group well under twice the costly threshold cannot contain a
        // column worth splitting, so keep it whole
        let group_flops = flops.bflops[klast] - flops.bflops[kfirst];
        if (group_flops as f64) <= 2.0 * costly {
            if kfirst < klast {
                coarse_ranges.push((kfirst, klast));
            }
            continue;
        }

        let mut kcoarse = kfirst;
        for kk in kfirst..klast {
            let jflops = flops.col_flops(kk);
            let (bs, be) = b.col_range(kk);
            if (jflops as f64) <= costly || be - bs <= 1 {
                continue;
            }

            // flush the pending coarse range before this costly column
            if kcoarse < kk {
                coarse_ranges.push((kcoarse, kk));
            }
            kcoarse = kk + 1;

            let team_size = ((jflops as f64 / fine_target).ceil() as usize).max(1);
            let hs = hash_table_size(jflops, cvlen, hint, tuning);
            let leader = fine.len();

            // weight each entry of B(:,kk) by the length of its A column,
            // then slice the entries into equal-work pieces
            let weights: Vec<usize> = (bs..be)
                .map(|p| {
                    if b.present_at(p) {
                        let (a_start, a_end) = a.lookup_col(b.row_at(p));
                        a_end - a_start
                    } else {
                        0
                    }
                })
                .collect();
            let prefix = exclusive_scan(&weights);
            let fbounds = balanced_partition(&prefix, team_size);
            for f in 0..team_size {
                fine.push(Task {
                    start: bs + fbounds[f],
                    end: bs + fbounds[f + 1],
                    vector: Some(kk),
                    hash_size: hs,
                    leader,
                    team_size,
                    flops: prefix[fbounds[f + 1]] - prefix[fbounds[f]],
                });
            }
        }

        if kcoarse < klast {
            coarse_ranges.push((kcoarse, klast));
        }
    }

    // second reduction: each coarse task is sized for its costliest column
    let flmaxes: Vec<usize> = coarse_ranges
        .par_iter()
        .map(|&(ks, ke)| (ks..ke).map(|k| flops.col_flops(k)).max().unwrap_or(0))
        .collect();

    let n_fine = fine.len();
    let mut tasks = fine;
    for (i, &(ks, ke)) in coarse_ranges.iter().enumerate() {
        tasks.push(Task {
            start: ks,
            end: ke,
            vector: None,
            hash_size: hash_table_size(flmaxes[i], cvlen, hint, tuning),
            leader: n_fine + i,
            team_size: 1,
            flops: flops.bflops[ke] - flops.bflops[ks],
        });
    }

    TaskList { tasks, n_fine }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::matrix::mask::Mask;
    use crate::multiply::flops::estimate_flops;

    #[test]
    fn test_hash_table_size_doubles_next_power() {
        let tuning = Tuning::default();
        // smallest power of two above 4 is 8, doubled to 16
        assert_eq!(hash_table_size(4, 1 << 20, AlgorithmHint::Default, &tuning), 16);
        assert_eq!(hash_table_size(1, 1 << 20, AlgorithmHint::Default, &tuning), 4);
        assert_eq!(hash_table_size(100, 1 << 20, AlgorithmHint::Default, &tuning), 256);
    }

    #[test]
    fn test_gustavson_switch() {
        let tuning = Tuning::default();
        // cvlen/16 = 16, so a table of 16 slots already switches
        assert_eq!(hash_table_size(4, 256, AlgorithmHint::Default, &tuning), 256);
        // forced hash keeps the small table
        assert_eq!(hash_table_size(4, 256, AlgorithmHint::ForceHash, &tuning), 16);
        // forced hash degrades when the table reaches the vector length
        assert_eq!(hash_table_size(200, 256, AlgorithmHint::ForceHash, &tuning), 256);
        // forced Gustavson always direct-indexes
        assert_eq!(
            hash_table_size(2, 1 << 20, AlgorithmHint::ForceGustavson, &tuning),
            1 << 20
        );
    }

    fn band_matrix(n: usize, width: usize) -> SparseMatrix<f64> {
        let mut entries = Vec::new();
        for j in 0..n {
            for i in j.saturating_sub(width)..(j + width + 1).min(n) {
                entries.push((i, j, 1.0));
            }
        }
        SparseMatrix::from_entries(n, n, entries)
    }

    fn tasks_for(
        a: &SparseMatrix<f64>,
        b: &SparseMatrix<f64>,
        nthreads: usize,
    ) -> TaskList {
        // chunk of 1 so small test matrices still split into many tasks
        let mut config = EngineConfig::with_threads(nthreads);
        config.chunk = 1.0;
        let flops = estimate_flops(a, b, None::<&Mask<bool>>, &config).unwrap();
        partition_tasks(a, b, &flops, a.n_rows, nthreads, AlgorithmHint::Default, &config)
    }

    #[test]
    fn test_single_thread_is_one_coarse_task() {
        let a = band_matrix(20, 2);
        let list = tasks_for(&a, &a, 1);
        assert_eq!(list.tasks.len(), 1);
        assert_eq!(list.n_fine, 0);
        assert_eq!((list.tasks[0].start, list.tasks[0].end), (0, 20));
    }

    #[test]
    fn test_single_thread_one_column_is_fine() {
        let a = band_matrix(20, 2);
        let b = SparseMatrix::from_entries(
            20,
            1,
            (0..20).map(|i| (i, 0, 1.0)).collect(),
        );
        let list = tasks_for(&a, &b, 1);
        assert_eq!(list.n_fine, 1);
        assert_eq!(list.tasks[0].vector, Some(0));
        assert_eq!(list.tasks[0].team_size, 1);
    }

    #[test]
    fn test_coarse_ranges_tile_all_columns() {
        let a = band_matrix(64, 3);
        let list = tasks_for(&a, &a, 4);
        assert_eq!(list.n_fine, 0);
        let mut next = 0;
        for task in &list.tasks {
            assert_eq!(task.start, next, "coarse ranges must tile the columns");
            assert!(task.end > task.start, "empty groups are dropped");
            next = task.end;
        }
        assert_eq!(next, 64);
    }

    #[test]
    fn test_costly_column_becomes_fine_team() {
        // one dense column in B against a matrix with uniformly full columns
        let n = 64;
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

        let list = tasks_for(&a, &b, 4);
        assert!(list.n_fine > 1, "the dense column should get a fine team");

        // the team's entry slices tile B(:,0)
        let team: Vec<&Task> =
            list.tasks[..list.n_fine].iter().filter(|t| t.vector == Some(0)).collect();
        assert_eq!(team.len(), team[0].team_size);
        let (bs, be) = b.col_range(0);
        let mut next = bs;
        for t in &team {
            assert_eq!(t.leader, 0);
            assert_eq!(t.start, next);
            next = t.end;
        }
        assert_eq!(next, be);
    }

    #[test]
    fn test_singleton_column_never_split() {
        // column 0 is costly by flops but has one entry in B
        let n = 32;
        let mut a_entries = Vec::new();
        for i in 0..n {
            a_entries.push((i, 0, 1.0));
        }
        a_entries.push((0, 1, 1.0));
        let a = SparseMatrix::from_entries(n, n, a_entries);
        let b = SparseMatrix::from_entries(
            n,
            n,
            vec![(0, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0)],
        );
        let list = tasks_for(&a, &b, 4);
        assert_eq!(list.n_fine, 0);
    }
}
