//! Error types for saxpyr

use thiserror::Error;

/// Result type alias using saxpyr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the multiply engine
///
/// Allocation failure is terminal for the call: all partially built state
/// (task list, workspaces, partially constructed output) is dropped before
/// the error is returned, so a failed call never leaves a new matrix behind.
#[derive(Error, Debug)]
pub enum Error {
    /// An allocation could not be satisfied at some stage of the pipeline
    #[error("out of memory: failed to allocate {bytes} bytes for {what}")]
    OutOfMemory {
        /// What was being allocated
        what: &'static str,
        /// Requested size in bytes
        bytes: usize,
    },

    /// Matrix dimensions are incompatible for the requested operation
    #[error("dimension mismatch: cannot multiply {a_rows}x{a_cols} by {b_rows}x{b_cols}")]
    DimensionMismatch {
        /// Rows of the left operand
        a_rows: usize,
        /// Columns of the left operand
        a_cols: usize,
        /// Rows of the right operand
        b_rows: usize,
        /// Columns of the right operand
        b_cols: usize,
    },

    /// Mask dimensions do not match the output dimensions
    #[error("mask mismatch: mask is {mask_rows}x{mask_cols}, output is {c_rows}x{c_cols}")]
    MaskMismatch {
        /// Rows of the mask
        mask_rows: usize,
        /// Columns of the mask
        mask_cols: usize,
        /// Rows of the output
        c_rows: usize,
        /// Columns of the output
        c_cols: usize,
    },

    /// An accelerated back-end declined the call.
    ///
    /// This is a signal, not a failure: the engine falls through to its own
    /// kernels when a backend returns it. It only escapes to callers that
    /// invoke a backend directly.
    #[error("operation not handled by this backend")]
    NotHandled,
}

impl Error {
    /// True if this error is the declined-backend signal rather than a
    /// genuine failure.
    pub fn is_not_handled(&self) -> bool {
        matches!(self, Error::NotHandled)
    }
}

/// Fallibly allocate a `Vec` of `len` copies of `fill`.
///
/// Large phase buffers go through this helper so that allocation failure
/// surfaces as [`Error::OutOfMemory`] instead of aborting the process.
pub(crate) fn try_vec<T: Clone>(fill: T, len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::OutOfMemory {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, fill);
    Ok(v)
}

/// Fallibly allocate a `Vec` filled from a closure.
pub(crate) fn try_vec_with<T>(
    len: usize,
    what: &'static str,
    mut f: impl FnMut() -> T,
) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::OutOfMemory {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    for _ in 0..len {
        v.push(f());
    }
    Ok(v)
}
