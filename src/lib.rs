//! # saxpyr: Parallel Masked Sparse Matrix Multiply over Semirings
//!
//! saxpyr computes `C = A*B`, `C<M> = A*B`, and `C<!M> = A*B` for sparse
//! column-major matrices, where the `*` and `+` of the multiply come from an
//! arbitrary semiring.
//!
//! ## Overview
//!
//! Each call runs a two-phase saxpy-style pipeline:
//!
//! 1. **Scheduling**: per-column flop estimates split the output columns
//!    into *coarse* tasks (a range of columns, a private workspace) and
//!    *fine* teams (many tasks sharing one costly column and one atomic
//!    workspace).
//!
//! 2. **Accumulation**: each task uses either **Gustavson's method** (a
//!    dense workspace indexed directly by row) or the **hash method** (a
//!    small open-addressing table), chosen from its flop count.
//!
//! 3. **Two phases**: a *symbolic* sweep counts each output column's
//!    entries so the output is allocated exactly, then a *numeric* sweep
//!    fills in values. Fine-team claim tables persist across the phase
//!    barrier, so the output structure is identical for every thread count.
//!
//! Masks restrict which output positions are computed; the engine may also
//! decide a mask is cheaper to apply afterwards and reports that decision
//! to the caller.
//!
//! ## Usage
//!
//! ```
//! use saxpyr::{mxm, plus_times, EngineConfig, MultiplyOptions, SparseMatrix};
//!
//! let a = SparseMatrix::from_entries(2, 2, vec![(0, 0, 1.0f64), (1, 1, 2.0)]);
//! let b = SparseMatrix::from_entries(2, 2, vec![(0, 0, 3.0f64), (1, 0, 4.0)]);
//!
//! let semiring = plus_times::<f64>();
//! let (c, _mask_applied) = mxm(
//!     &a,
//!     &b,
//!     None::<saxpyr::Mask<'_, bool>>,
//!     &semiring,
//!     &MultiplyOptions::default(),
//!     &EngineConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(c.to_triplets(), vec![(0, 0, 3.0), (1, 0, 8.0)]);
//! ```
//!
//! Semirings beyond the built-ins can be assembled at runtime:
//!
//! ```
//! use saxpyr::RuntimeSemiring;
//!
//! // max-plus over f64
//! let s = RuntimeSemiring::new(|a: f64, b: f64| a + b, f64::max, f64::NEG_INFINITY);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod matrix;
pub mod multiply;
pub mod semiring;
pub mod utils;

// Re-export primary components
pub use config::{AlgorithmHint, EngineConfig, OutputFormat, Tuning};
pub use error::{Error, Result};
pub use matrix::{reference_multiply, Format, Mask, MaskValue, SparseMatrix, Storage};
pub use multiply::{mxm, mxm_with_backend, Accelerator, MultiplyOptions};
pub use semiring::{
    any_pair, max_times, min_plus, or_and, plus_times, BinaryOp, Monoid, RuntimeSemiring,
    Semiring, SemiringOps,
};
pub use utils::{from_sprs_csc, to_sprs_csc};

/// Version information for the saxpyr library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
