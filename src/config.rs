//! Configuration and scheduling policy for the multiply engine

use crate::constants::{
    COSTLY_FACTOR, DEFAULT_CHUNK, FINE_WORK_FACTOR, GUSTAVSON_SWITCH_DIVISOR, MASK_ALPHA,
    MASK_BETA, NTASKS_PER_THREAD,
};

/// Accumulation strategy requested by the caller (descriptor setting)
///
/// `Default` selects per task between Gustavson's method (dense workspace,
/// direct indexing) and the hash method (open addressing, linear probing)
/// based on the hash table size relative to the output vector length. The
/// forced settings pin a method for every task, except that a forced hash
/// table that would be as large as the output vector still degrades to
/// Gustavson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmHint {
    /// Automatic per-task selection
    #[default]
    Default,
    /// Use Gustavson's method for all tasks
    ForceGustavson,
    /// Use the hash method for all tasks
    ForceHash,
}

/// Sparsity format for the output matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compressed sparse column, one slot per column
    Sparse,
    /// Only non-empty columns listed, with an explicit column-id array
    Hypersparse,
}

/// Empirically tuned scheduling thresholds
///
/// These are performance knobs only; any positive values produce correct
/// results. The defaults come from [`crate::constants`].
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Initial coarse tasks per thread
    pub ntasks_per_thread: usize,
    /// Costly-column factor for splitting fine tasks
    pub costly_factor: f64,
    /// Divisor from coarse target size to fine target size
    pub fine_work_factor: f64,
    /// Sparse-mask discard ratio
    pub mask_alpha: f64,
    /// Dense-mask in-place ratio
    pub mask_beta: f64,
    /// Gustavson switch at `output_len / gustavson_switch_divisor`
    pub gustavson_switch_divisor: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ntasks_per_thread: NTASKS_PER_THREAD,
            costly_factor: COSTLY_FACTOR,
            fine_work_factor: FINE_WORK_FACTOR,
            mask_alpha: MASK_ALPHA,
            mask_beta: MASK_BETA,
            gustavson_switch_divisor: GUSTAVSON_SWITCH_DIVISOR,
        }
    }
}

/// Configuration for one multiply call
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of worker threads
    pub max_threads: usize,
    /// Minimum flops per thread; smaller workloads use fewer threads
    pub chunk: f64,
    /// Scheduling thresholds
    pub tuning: Tuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_threads: num_cpus::get(),
            chunk: DEFAULT_CHUNK,
            tuning: Tuning::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration pinned to a fixed thread count
    pub fn with_threads(max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            ..Self::default()
        }
    }

    /// Number of threads to use for `work` units of work.
    ///
    /// Consulted once per phase; small workloads run on fewer threads so the
    /// per-task overhead never dominates.
    pub fn nthreads_for(&self, work: f64) -> usize {
        if work <= self.chunk || self.max_threads <= 1 {
            1
        } else {
            ((work / self.chunk).floor() as usize).clamp(1, self.max_threads)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_work_is_single_threaded() {
        let config = EngineConfig::with_threads(8);
        assert_eq!(config.nthreads_for(100.0), 1);
        assert_eq!(config.nthreads_for(DEFAULT_CHUNK), 1);
    }

    #[test]
    fn test_large_work_is_capped_by_max_threads() {
        let config = EngineConfig::with_threads(4);
        assert_eq!(config.nthreads_for(1.0e12), 4);
    }

    #[test]
    fn test_intermediate_work_scales() {
        let config = EngineConfig::with_threads(64);
        let n = config.nthreads_for(DEFAULT_CHUNK * 3.0);
        assert_eq!(n, 3);
    }

    #[test]
    fn test_default_hint() {
        assert_eq!(AlgorithmHint::default(), AlgorithmHint::Default);
    }
}
