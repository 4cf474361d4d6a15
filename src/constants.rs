//! Centralized constants for the saxpyr sparse multiply engine
//!
//! This module contains all hardcoded constants used throughout the codebase.
//! All new constants should be added here rather than scattered throughout the
//! code. The scheduling constants are empirically tuned values inherited from
//! the Gustavson/hash SpGEMM literature; they affect performance only, never
//! correctness, and can be overridden per call through
//! [`crate::config::Tuning`].

// ============================================================================
// TASK PARTITIONING
// ============================================================================

/// Initial coarse tasks created per available thread.
pub const NTASKS_PER_THREAD: usize = 2;

/// A column is "costly" when its flop count exceeds this multiple of the
/// target task size; costly columns are split into fine-task teams.
pub const COSTLY_FACTOR: f64 = 1.2;

/// Fine tasks target `target_task_size / FINE_WORK_FACTOR` flops each.
pub const FINE_WORK_FACTOR: f64 = 2.0;

/// Minimum work (flops) per thread; workloads smaller than this run with
/// fewer threads to avoid oversubscription overhead.
pub const DEFAULT_CHUNK: f64 = 65536.0;

// ============================================================================
// MASK POLICY
// ============================================================================

/// A sparse mask is discarded from the multiply (and applied afterwards by
/// the caller) when `flops(A*B) < MASK_ALPHA * mask_work`.
pub const MASK_ALPHA: f64 = 0.01;

/// A dense (bitmap/full) mask is probed in place during hash lookups, rather
/// than folded into the Gustavson workspace, when
/// `flops(A*B) < MASK_BETA * mask_work`.
pub const MASK_BETA: f64 = 0.10;

// ============================================================================
// HASH TABLE SIZING
// ============================================================================

/// Gustavson's method replaces the hash method once the hash table would
/// reach `output_len / GUSTAVSON_SWITCH_DIVISOR` slots.
pub const GUSTAVSON_SWITCH_DIVISOR: usize = 16;

/// Multiplier for the open-addressing hash function: a row index `i` probes
/// from slot `(i * HASH_FACTOR) & (hash_size - 1)`.
pub const HASH_FACTOR: usize = 107;

// ============================================================================
// WORKSPACE LAYOUT
// ============================================================================

/// Cache line size in bytes; each per-task table is padded to a cache line
/// boundary so adjacent tasks never share a line.
pub const CACHE_LINE_BYTES: usize = 64;
