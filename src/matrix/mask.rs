//! Mask descriptors and per-column mask probing
//!
//! A mask restricts which output positions a multiply may produce. A
//! *structural* mask tests entry presence only; a *valued* mask additionally
//! requires the entry's value to cast to `true`. A *complemented* mask
//! inverts the test. The multiply engine builds one [`ColMask`] probe per
//! output column; probing is O(1) for dense-layout masks and a binary search
//! for sparse/hypersparse masks.

use crate::matrix::SparseMatrix;

/// Values usable as mask entries: anything castable to a boolean
pub trait MaskValue: Copy + Send + Sync {
    /// Casts this value to the mask convention (nonzero means keep)
    fn as_mask(&self) -> bool;
}

macro_rules! mask_value_int {
    ($($t:ty),*) => {
        $(impl MaskValue for $t {
            #[inline]
            fn as_mask(&self) -> bool { *self != 0 }
        })*
    };
}

mask_value_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl MaskValue for bool {
    #[inline]
    fn as_mask(&self) -> bool {
        *self
    }
}

impl MaskValue for f32 {
    #[inline]
    fn as_mask(&self) -> bool {
        *self != 0.0
    }
}

impl MaskValue for f64 {
    #[inline]
    fn as_mask(&self) -> bool {
        *self != 0.0
    }
}

/// A mask matrix together with its interpretation flags
#[derive(Clone, Copy)]
pub struct Mask<'a, M> {
    /// The mask matrix; dimensions must match the output
    pub matrix: &'a SparseMatrix<M>,
    /// If true, keep positions where the mask test fails instead
    pub complement: bool,
    /// If true, test entry presence only and ignore values
    pub structural: bool,
}

impl<'a, M: MaskValue> Mask<'a, M> {
    /// A non-complemented, valued mask
    pub fn new(matrix: &'a SparseMatrix<M>) -> Self {
        Self { matrix, complement: false, structural: false }
    }

    /// Sets the complement flag
    pub fn complemented(mut self, complement: bool) -> Self {
        self.complement = complement;
        self
    }

    /// Sets the structural flag
    pub fn structural(mut self, structural: bool) -> Self {
        self.structural = structural;
        self
    }

    /// Builds the probe for output column `j`
    pub fn column(&self, j: usize) -> ColMask<'a, M> {
        let (start, end) = self.matrix.lookup_col(j);
        ColMask {
            matrix: self.matrix,
            start,
            end,
            dense: self.matrix.is_dense_layout(),
            complement: self.complement,
            structural: self.structural,
        }
    }
}

/// Per-column mask probe
///
/// Answers whether the mask admits a row of one output column. The probe
/// holds the entry range of `M(:,j)`; sparse lookups binary-search it, which
/// requires the mask to be non-jumbled.
pub struct ColMask<'a, M> {
    matrix: &'a SparseMatrix<M>,
    start: usize,
    end: usize,
    dense: bool,
    complement: bool,
    structural: bool,
}

impl<M: MaskValue> ColMask<'_, M> {
    /// Number of mask entries in this column's range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the column holds no mask entries
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if row `i` passes the mask test for this column
    #[inline]
    pub fn admits(&self, i: usize) -> bool {
        let hit = if self.dense {
            // position start + i indexes the dense column directly
            let p = self.start + i;
            self.matrix.present_at(p) && (self.structural || self.matrix.value_at(p).as_mask())
        } else {
            match self.find(i) {
                Some(p) => self.structural || self.matrix.value_at(p).as_mask(),
                None => false,
            }
        };
        hit != self.complement
    }

    /// Binary search for row `i` within the column's entry range
    fn find(&self, i: usize) -> Option<usize> {
        let (mut lo, mut hi) = (self.start, self.end);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let row = self.matrix.row_at(mid);
            if row == i {
                return Some(mid);
            } else if row < i {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        None
    }
}
