//! Sparse matrix storage with four variants
//!
//! Matrices are held column-major (CSC orientation) in one of four storage
//! variants:
//!
//! - **Sparse**: explicit column pointer array (`n_cols + 1` entries), with
//!   row-index and value arrays for the stored entries.
//! - **Hypersparse**: like sparse, but only non-empty columns are listed,
//!   with an explicit column-id array mapping slot to original column.
//! - **Bitmap**: a dense `n_rows * n_cols` presence byte per entry plus a
//!   parallel dense value array.
//! - **Full**: dense value array only; every entry is present.
//!
//! The multiply engine walks all four variants through a uniform "slot"
//! interface: a matrix exposes `nvec()` column slots, each slot maps to an
//! original column id and to a contiguous range of entry positions. For
//! sparse/hypersparse the positions index the compressed arrays; for
//! bitmap/full, position `p` in slot `k` is `k * n_rows + i` for row `i`,
//! and bitmap entries may be absent.

use std::fmt;

use num_traits::Num;

/// Storage variant of a [`SparseMatrix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Compressed sparse column
    Sparse,
    /// Compressed sparse column over non-empty columns only
    Hypersparse,
    /// Dense presence bytes plus dense values
    Bitmap,
    /// Dense values, all entries present
    Full,
}

/// Backing arrays for each storage variant
#[derive(Clone)]
pub enum Storage<T> {
    /// CSC arrays
    Sparse {
        /// Column pointers (size: n_cols + 1)
        col_ptr: Vec<usize>,
        /// Row indices (size: nnz)
        row_idx: Vec<usize>,
        /// Values (size: nnz)
        values: Vec<T>,
    },
    /// CSC arrays over the non-empty columns
    Hypersparse {
        /// Original column id of each stored slot (size: nvec, ascending)
        col_ids: Vec<usize>,
        /// Column pointers (size: nvec + 1)
        col_ptr: Vec<usize>,
        /// Row indices (size: nnz)
        row_idx: Vec<usize>,
        /// Values (size: nnz)
        values: Vec<T>,
    },
    /// Dense presence mask and values, column-major
    Bitmap {
        /// One byte per entry, nonzero means present (size: n_rows * n_cols)
        bitmap: Vec<u8>,
        /// Values (size: n_rows * n_cols)
        values: Vec<T>,
    },
    /// Dense values, column-major, all present
    Full {
        /// Values (size: n_rows * n_cols)
        values: Vec<T>,
    },
}

/// A sparse matrix in one of four storage variants, column-major
///
/// Row indices within a column are distinct. They are normally sorted;
/// freshly multiplied output may be "jumbled" (unsorted within columns),
/// flagged by [`SparseMatrix::is_jumbled`], and must be sorted via
/// [`SparseMatrix::sort_entries`] before use as a multiply input or mask.
#[derive(Clone)]
pub struct SparseMatrix<T> {
    /// Number of rows
    pub n_rows: usize,
    /// Number of columns
    pub n_cols: usize,
    storage: Storage<T>,
    jumbled: bool,
}

impl<T: Copy> SparseMatrix<T> {
    /// Creates a sparse (CSC) matrix from its backing arrays
    ///
    /// # Panics
    ///
    /// Panics if the arrays are inconsistent:
    /// - `col_ptr.len()` must be `n_cols + 1`
    /// - `row_idx.len()` must equal `values.len()`
    /// - `col_ptr[n_cols]` must equal `row_idx.len()`
    /// - row indices must be in bounds
    pub fn new_csc(
        n_rows: usize,
        n_cols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(col_ptr.len(), n_cols + 1, "col_ptr.len() must be n_cols + 1");
        assert_eq!(row_idx.len(), values.len(), "row_idx.len() must equal values.len()");
        assert_eq!(
            col_ptr[n_cols],
            row_idx.len(),
            "col_ptr[n_cols] must equal row_idx.len()"
        );
        for &row in &row_idx {
            assert!(row < n_rows, "Row index {} out of bounds (n_rows = {})", row, n_rows);
        }

        Self {
            n_rows,
            n_cols,
            storage: Storage::Sparse { col_ptr, row_idx, values },
            jumbled: false,
        }
    }

    /// Creates a hypersparse matrix listing only its non-empty columns
    ///
    /// # Panics
    ///
    /// Panics if the arrays are inconsistent or `col_ids` is not strictly
    /// ascending.
    pub fn new_hypersparse(
        n_rows: usize,
        n_cols: usize,
        col_ids: Vec<usize>,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(col_ptr.len(), col_ids.len() + 1, "col_ptr.len() must be col_ids.len() + 1");
        assert_eq!(row_idx.len(), values.len(), "row_idx.len() must equal values.len()");
        assert_eq!(
            *col_ptr.last().unwrap_or(&0),
            row_idx.len(),
            "col_ptr must end at row_idx.len()"
        );
        for w in col_ids.windows(2) {
            assert!(w[0] < w[1], "col_ids must be strictly ascending");
        }
        if let Some(&last) = col_ids.last() {
            assert!(last < n_cols, "Column id {} out of bounds (n_cols = {})", last, n_cols);
        }
        for &row in &row_idx {
            assert!(row < n_rows, "Row index {} out of bounds (n_rows = {})", row, n_rows);
        }

        Self {
            n_rows,
            n_cols,
            storage: Storage::Hypersparse { col_ids, col_ptr, row_idx, values },
            jumbled: false,
        }
    }

    /// Creates a bitmap matrix from column-major presence bytes and values
    pub fn new_bitmap(n_rows: usize, n_cols: usize, bitmap: Vec<u8>, values: Vec<T>) -> Self {
        assert_eq!(bitmap.len(), n_rows * n_cols, "bitmap.len() must be n_rows * n_cols");
        assert_eq!(values.len(), n_rows * n_cols, "values.len() must be n_rows * n_cols");

        Self {
            n_rows,
            n_cols,
            storage: Storage::Bitmap { bitmap, values },
            jumbled: false,
        }
    }

    /// Creates a full (dense) matrix from column-major values
    pub fn new_full(n_rows: usize, n_cols: usize, values: Vec<T>) -> Self {
        assert_eq!(values.len(), n_rows * n_cols, "values.len() must be n_rows * n_cols");

        Self {
            n_rows,
            n_cols,
            storage: Storage::Full { values },
            jumbled: false,
        }
    }

    /// Creates a sparse matrix from (row, col, value) triplets.
    ///
    /// Duplicate positions are not merged and will panic.
    pub fn from_entries(n_rows: usize, n_cols: usize, mut entries: Vec<(usize, usize, T)>) -> Self {
        entries.sort_by_key(|&(i, j, _)| (j, i));
        for w in entries.windows(2) {
            assert!(
                (w[0].0, w[0].1) != (w[1].0, w[1].1),
                "duplicate entry at ({}, {})",
                w[0].0,
                w[0].1
            );
        }

        let mut col_counts = vec![0usize; n_cols];
        for &(i, j, _) in &entries {
            assert!(i < n_rows && j < n_cols, "entry ({}, {}) out of bounds", i, j);
            col_counts[j] += 1;
        }
        let col_ptr = crate::utils::exclusive_scan(&col_counts);
        let row_idx = entries.iter().map(|&(i, _, _)| i).collect();
        let values = entries.iter().map(|&(_, _, v)| v).collect();

        Self::new_csc(n_rows, n_cols, col_ptr, row_idx, values)
    }

    /// Storage format tag
    pub fn format(&self) -> Format {
        match &self.storage {
            Storage::Sparse { .. } => Format::Sparse,
            Storage::Hypersparse { .. } => Format::Hypersparse,
            Storage::Bitmap { .. } => Format::Bitmap,
            Storage::Full { .. } => Format::Full,
        }
    }

    /// True for the dense-layout variants (bitmap or full)
    pub fn is_dense_layout(&self) -> bool {
        matches!(self.storage, Storage::Bitmap { .. } | Storage::Full { .. })
    }

    /// True if entries within columns may be unsorted
    pub fn is_jumbled(&self) -> bool {
        self.jumbled
    }

    pub(crate) fn set_jumbled(&mut self, jumbled: bool) {
        self.jumbled = jumbled;
    }

    /// Number of stored entries
    ///
    /// For bitmap matrices this counts the set presence bytes; for full
    /// matrices it is `n_rows * n_cols`.
    pub fn nnz(&self) -> usize {
        match &self.storage {
            Storage::Sparse { row_idx, .. } | Storage::Hypersparse { row_idx, .. } => row_idx.len(),
            Storage::Bitmap { bitmap, .. } => bitmap.iter().filter(|&&b| b != 0).count(),
            Storage::Full { values } => values.len(),
        }
    }

    /// Number of column slots walked by the multiply engine
    ///
    /// Equals `n_cols` except for hypersparse matrices, where only the
    /// non-empty columns are listed.
    pub fn nvec(&self) -> usize {
        match &self.storage {
            Storage::Sparse { col_ptr, .. } => col_ptr.len() - 1,
            Storage::Hypersparse { col_ids, .. } => col_ids.len(),
            Storage::Bitmap { .. } | Storage::Full { .. } => self.n_cols,
        }
    }

    /// Original column id of slot `k`
    #[inline]
    pub fn col_id(&self, k: usize) -> usize {
        match &self.storage {
            Storage::Hypersparse { col_ids, .. } => col_ids[k],
            _ => k,
        }
    }

    /// Entry-position range of slot `k`
    #[inline]
    pub fn col_range(&self, k: usize) -> (usize, usize) {
        match &self.storage {
            Storage::Sparse { col_ptr, .. } | Storage::Hypersparse { col_ptr, .. } => {
                (col_ptr[k], col_ptr[k + 1])
            }
            Storage::Bitmap { .. } | Storage::Full { .. } => {
                (k * self.n_rows, (k + 1) * self.n_rows)
            }
        }
    }

    /// Row index of entry position `p`
    #[inline]
    pub fn row_at(&self, p: usize) -> usize {
        match &self.storage {
            Storage::Sparse { row_idx, .. } | Storage::Hypersparse { row_idx, .. } => row_idx[p],
            Storage::Bitmap { .. } | Storage::Full { .. } => p % self.n_rows,
        }
    }

    /// True if entry position `p` holds an entry (false only for unset
    /// bitmap positions)
    #[inline]
    pub fn present_at(&self, p: usize) -> bool {
        match &self.storage {
            Storage::Bitmap { bitmap, .. } => bitmap[p] != 0,
            _ => true,
        }
    }

    /// Value at entry position `p`
    #[inline]
    pub fn value_at(&self, p: usize) -> T {
        match &self.storage {
            Storage::Sparse { values, .. }
            | Storage::Hypersparse { values, .. }
            | Storage::Bitmap { values, .. }
            | Storage::Full { values } => values[p],
        }
    }

    /// Entry-position range of original column `j`, empty if the column
    /// holds no entries.
    ///
    /// For hypersparse matrices this binary-searches the column-id list.
    pub fn lookup_col(&self, j: usize) -> (usize, usize) {
        debug_assert!(j < self.n_cols);
        match &self.storage {
            Storage::Sparse { col_ptr, .. } => (col_ptr[j], col_ptr[j + 1]),
            Storage::Hypersparse { col_ids, col_ptr, .. } => match col_ids.binary_search(&j) {
                Ok(k) => (col_ptr[k], col_ptr[k + 1]),
                Err(_) => (0, 0),
            },
            Storage::Bitmap { .. } | Storage::Full { .. } => {
                (j * self.n_rows, (j + 1) * self.n_rows)
            }
        }
    }

    /// Iterates the present entries of slot `k` as `(row, value)` pairs
    pub fn col_iter(&self, k: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let (start, end) = self.col_range(k);
        (start..end).filter(|&p| self.present_at(p)).map(|p| (self.row_at(p), self.value_at(p)))
    }

    /// Collects all entries as (row, col, value) triplets sorted by
    /// (col, row), regardless of storage variant or jumbled state.
    pub fn to_triplets(&self) -> Vec<(usize, usize, T)> {
        let mut out = Vec::with_capacity(self.nnz());
        for k in 0..self.nvec() {
            let j = self.col_id(k);
            for (i, v) in self.col_iter(k) {
                out.push((i, j, v));
            }
        }
        out.sort_by_key(|&(i, j, _)| (j, i));
        out
    }

    /// Sorts entries within each column by row index and clears the jumbled
    /// flag. No-op for the dense-layout variants.
    pub fn sort_entries(&mut self) {
        match &mut self.storage {
            Storage::Sparse { col_ptr, row_idx, values }
            | Storage::Hypersparse { col_ptr, row_idx, values, .. } => {
                for k in 0..col_ptr.len() - 1 {
                    let (start, end) = (col_ptr[k], col_ptr[k + 1]);
                    let mut perm: Vec<usize> = (start..end).collect();
                    perm.sort_by_key(|&p| row_idx[p]);
                    let rows: Vec<usize> = perm.iter().map(|&p| row_idx[p]).collect();
                    let vals: Vec<T> = perm.iter().map(|&p| values[p]).collect();
                    row_idx[start..end].copy_from_slice(&rows);
                    values[start..end].clone_from_slice(&vals);
                }
            }
            _ => {}
        }
        self.jumbled = false;
    }

    /// Converts to bitmap storage
    pub fn to_bitmap(&self) -> SparseMatrix<T>
    where
        T: Default,
    {
        let mut bitmap = vec![0u8; self.n_rows * self.n_cols];
        let mut values = vec![T::default(); self.n_rows * self.n_cols];
        for k in 0..self.nvec() {
            let j = self.col_id(k);
            for (i, v) in self.col_iter(k) {
                bitmap[j * self.n_rows + i] = 1;
                values[j * self.n_rows + i] = v;
            }
        }
        SparseMatrix::new_bitmap(self.n_rows, self.n_cols, bitmap, values)
    }

    /// Converts to hypersparse storage, keeping only non-empty columns
    pub fn to_hypersparse(&self) -> SparseMatrix<T> {
        let mut col_ids = Vec::new();
        let mut col_ptr = vec![0];
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for k in 0..self.nvec() {
            let entries: Vec<(usize, T)> = self.col_iter(k).collect();
            if entries.is_empty() {
                continue;
            }
            col_ids.push(self.col_id(k));
            for (i, v) in entries {
                row_idx.push(i);
                values.push(v);
            }
            col_ptr.push(row_idx.len());
        }
        let mut m =
            SparseMatrix::new_hypersparse(self.n_rows, self.n_cols, col_ids, col_ptr, row_idx, values);
        m.jumbled = self.jumbled;
        m
    }
}

impl<T: Copy + Num> SparseMatrix<T> {
    /// Creates an empty sparse matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self::new_csc(n_rows, n_cols, vec![0; n_cols + 1], Vec::new(), Vec::new())
    }

    /// Creates a sparse identity matrix of the given size
    pub fn identity(n: usize) -> Self {
        let col_ptr = (0..=n).collect();
        let row_idx = (0..n).collect();
        let values = vec![T::one(); n];
        Self::new_csc(n, n, col_ptr, row_idx, values)
    }
}

impl<T: fmt::Debug + Copy> fmt::Debug for SparseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SparseMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  format: {:?}, nnz: {}", self.format(), self.nnz())?;

        let max_cols_to_print = 5.min(self.nvec());
        if max_cols_to_print > 0 {
            writeln!(f, "  content sample:")?;
            for k in 0..max_cols_to_print {
                write!(f, "    col {}: ", self.col_id(k))?;
                let entries: Vec<(usize, T)> = self.col_iter(k).collect();
                if entries.is_empty() {
                    writeln!(f, "(empty)")?;
                } else {
                    let shown = 5.min(entries.len());
                    for &(i, v) in &entries[..shown] {
                        write!(f, "({}, {:?}) ", i, v)?;
                    }
                    if entries.len() > shown {
                        write!(f, "... ({} more)", entries.len() - shown)?;
                    }
                    writeln!(f)?;
                }
            }
            if self.nvec() > max_cols_to_print {
                writeln!(f, "    ... ({} more cols)", self.nvec() - max_cols_to_print)?;
            }
        }

        write!(f, "}}")
    }
}
