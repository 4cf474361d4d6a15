//! Masked sparse matrix-matrix multiply over a semiring
//!
//! `C = A*B`, `C<M> = A*B`, or `C<!M> = A*B`, all column-major. One call
//! runs a fixed pipeline: estimate per-column flops, split the columns into
//! coarse tasks and fine teams, build the task workspaces, size every
//! output column (symbolic phase), allocate the output exactly, accumulate
//! values (numeric phase), and gather fine-team results. Each phase is
//! data-parallel and the phases are separated by barriers; the structure of
//! C is identical for every thread count.

pub mod assemble;
pub mod backend;
pub mod flops;
pub mod symbolic;
pub mod tasks;
pub mod workspace;

pub mod numeric;

pub use backend::{mxm_with_backend, Accelerator};

use crate::config::{AlgorithmHint, EngineConfig, OutputFormat};
use crate::error::{try_vec, try_vec_with, Error, Result};
use crate::matrix::mask::{Mask, MaskValue};
use crate::matrix::{Format, SparseMatrix};
use crate::multiply::assemble::{build_output, gather_fine};
use crate::multiply::flops::estimate_flops;
use crate::multiply::symbolic::symbolic_phase;
use crate::multiply::tasks::partition_tasks;
use crate::multiply::workspace::Workspace;
use crate::semiring::{SemiringOps, SyncCell};

/// Per-call options for [`mxm`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplyOptions {
    /// Accumulation method selection
    pub hint: AlgorithmHint,
    /// Output storage format; `None` matches B (hypersparse B gives
    /// hypersparse C, anything else gives sparse C)
    pub output: Option<OutputFormat>,
    /// Apply the multiply operator with flipped operand roles,
    /// `z = f(B(k,j), A(i,k))`
    pub flip: bool,
}

/// Multiplies `A*B` over a semiring, optionally under a mask.
///
/// Returns the product and a flag telling whether the mask was applied
/// during the multiply. The engine may decide a very dense mask is cheaper
/// to honor afterwards; it then computes unmasked, returns `false`, and the
/// caller applies the mask itself. A dense-layout (bitmap or full) mask is
/// always applied.
///
/// Inputs must not be jumbled. The output may be: check
/// [`SparseMatrix::is_jumbled`] and sort before using it as an input.
pub fn mxm<S, M>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    mask: Option<Mask<'_, M>>,
    semiring: &S,
    options: &MultiplyOptions,
    config: &EngineConfig,
) -> Result<(SparseMatrix<S::CVal>, bool)>
where
    S: SemiringOps,
    M: MaskValue,
{
    if a.n_cols != b.n_rows {
        return Err(Error::DimensionMismatch {
            a_rows: a.n_rows,
            a_cols: a.n_cols,
            b_rows: b.n_rows,
            b_cols: b.n_cols,
        });
    }
    if let Some(m) = &mask {
        if m.matrix.n_rows != a.n_rows || m.matrix.n_cols != b.n_cols {
            return Err(Error::MaskMismatch {
                mask_rows: m.matrix.n_rows,
                mask_cols: m.matrix.n_cols,
                c_rows: a.n_rows,
                c_cols: b.n_cols,
            });
        }
        debug_assert!(!m.matrix.is_jumbled(), "mask must be sorted");
    }
    debug_assert!(!a.is_jumbled() && !b.is_jumbled(), "inputs must be sorted");

    let cvlen = a.n_rows;
    let mut mask = mask;
    let mut hint = options.hint;
    let mut mask_applied = mask.is_some();
    let mut flops = estimate_flops(a, b, mask.as_ref(), config)?;

    if let Some(m) = &mask {
        if m.matrix.is_dense_layout() {
            if hint == AlgorithmHint::Default {
                let mwork = (m.matrix.n_rows * m.matrix.n_cols) as f64;
                if (flops.total as f64) < config.tuning.mask_beta * mwork {
                    // the multiply is cheap next to the mask: probe the
                    // dense mask in place from small hash tables
                    hint = AlgorithmHint::ForceHash;
                } else {
                    // charge every column a full mask scan and let
                    // Gustavson tasks absorb it
                    hint = AlgorithmHint::ForceGustavson;
                    for (k, w) in flops.bflops.iter_mut().enumerate() {
                        *w += k * cvlen;
                    }
                    flops.total = flops.bflops[b.nvec()];
                }
            }
        } else {
            let axb_flops = (flops.total - flops.mask_work) as f64;
            if axb_flops < config.tuning.mask_alpha * flops.mask_work as f64 {
                // the mask costs more to scan than the multiply saves;
                // compute unmasked and let the caller filter
                mask = None;
                mask_applied = false;
                flops = estimate_flops(a, b, None::<&Mask<'_, M>>, config)?;
            }
        }
    }

    let nthreads = config.nthreads_for(flops.total as f64);
    let tasks = partition_tasks(a, b, &flops, cvlen, nthreads, hint, config);
    let n_gustavson = tasks.tasks.iter().filter(|t| t.uses_gustavson(cvlen)).count();
    tracing::debug!(
        nthreads,
        n_coarse = tasks.n_coarse(),
        n_fine = tasks.n_fine,
        n_gustavson,
        total_flops = flops.total,
        masked = mask.is_some(),
        "scheduled multiply"
    );

    let workspace =
        Workspace::build(&tasks, cvlen, semiring.identity(), semiring.is_any_pair())?;

    let cjnz = symbolic_phase(a, b, mask.as_ref(), &tasks, &workspace, cvlen)?;
    let cp = crate::utils::exclusive_scan(&cjnz);
    let cnz = cp[b.nvec()];

    let ci_cells = try_vec_with(cnz, "output row indices", || SyncCell::new(0usize))?;
    let cx_cells =
        try_vec_with(cnz, "output values", || SyncCell::new(semiring.identity()))?;

    numeric::numeric_phase(
        a,
        b,
        mask.as_ref(),
        semiring,
        options.flip,
        &tasks,
        &workspace,
        cvlen,
        &cp,
        &ci_cells,
        &cx_cells,
    );
    gather_fine(semiring, &tasks, &workspace, &cp, &ci_cells, &cx_cells)?;

    // phases are over; the cells have no remaining writers
    let mut ci = try_vec(0usize, cnz, "output rows")?;
    let mut cx = try_vec(semiring.identity(), cnz, "output values")?;
    for (dst, cell) in ci.iter_mut().zip(&ci_cells) {
        *dst = unsafe { cell.load() };
    }
    for (dst, cell) in cx.iter_mut().zip(&cx_cells) {
        *dst = unsafe { cell.load() };
    }

    let format = options.output.unwrap_or(if b.format() == Format::Hypersparse {
        OutputFormat::Hypersparse
    } else {
        OutputFormat::Sparse
    });
    let c = build_output(b, cvlen, cp, ci, cx, format)?;
    Ok((c, mask_applied))
}
