//! Shared accumulator cells and primitive atomic folds
//!
//! Fine tasks in the same team fold products into one shared value table.
//! The table is a slab of [`SyncCell`]s: coarse tasks own their slices
//! outright and write them plainly, while fine teams go through
//! [`AtomicPrimitive::fold_atomic`], a compare-and-swap loop over the value's
//! bit pattern on the matching-width hardware atomic. Monoids over types
//! without a primitive-width atomic fall back to a per-team lock held by the
//! workspace.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// A shared mutable cell in a workspace value table
///
/// Soundness rests on the task partition: a cell is written either by the
/// single task that owns its table slice, or concurrently through
/// [`AtomicPrimitive`] / the team lock. Phase barriers publish writes to
/// later phases.
#[repr(transparent)]
pub struct SyncCell<T>(UnsafeCell<T>);

unsafe impl<T: Send> Sync for SyncCell<T> {}

impl<T: Copy> SyncCell<T> {
    /// Creates a cell holding `v`
    pub fn new(v: T) -> Self {
        SyncCell(UnsafeCell::new(v))
    }

    /// Raw pointer to the value
    pub fn as_ptr(&self) -> *mut T {
        self.0.get()
    }

    /// Reads the value.
    ///
    /// # Safety
    ///
    /// No concurrent writer may exist (exclusive task ownership, or a phase
    /// barrier separating this read from all writes).
    #[inline]
    pub unsafe fn load(&self) -> T {
        *self.0.get()
    }

    /// Writes the value.
    ///
    /// # Safety
    ///
    /// The caller must be the exclusive writer of this cell, or hold the
    /// team lock.
    #[inline]
    pub unsafe fn store(&self, v: T) {
        *self.0.get() = v;
    }
}

/// Primitive types whose cells support lock-free concurrent folds
pub trait AtomicPrimitive: Copy + PartialEq + Send + Sync {
    /// Folds `z` into the cell with `f` under a compare-and-swap loop.
    ///
    /// If the cell already holds `terminal`, the fold is skipped: a terminal
    /// value absorbs all further contributions.
    fn fold_atomic(cell: &SyncCell<Self>, z: Self, terminal: Option<Self>, f: impl Fn(Self, Self) -> Self);
}

macro_rules! atomic_primitive {
    ($ty:ty, $atomic:ty, $bits:ty, $to_bits:expr, $from_bits:expr) => {
        impl AtomicPrimitive for $ty {
            #[inline]
            fn fold_atomic(
                cell: &SyncCell<Self>,
                z: Self,
                terminal: Option<Self>,
                f: impl Fn(Self, Self) -> Self,
            ) {
                // The cell has the same size and alignment as the atomic.
                let a = unsafe { &*(cell.as_ptr() as *const $atomic) };
                let to_bits = $to_bits;
                let from_bits = $from_bits;
                let mut cur_bits = a.load(Ordering::Relaxed);
                loop {
                    let cur: $ty = from_bits(cur_bits);
                    if terminal == Some(cur) {
                        return;
                    }
                    let next: $ty = f(cur, z);
                    if next == cur {
                        return;
                    }
                    match a.compare_exchange_weak(
                        cur_bits,
                        to_bits(next),
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return,
                        Err(seen) => cur_bits = seen,
                    }
                }
            }
        }
    };
}

macro_rules! atomic_primitive_int {
    ($($ty:ty => $atomic:ty, $bits:ty);* $(;)?) => {
        $(atomic_primitive!($ty, $atomic, $bits,
            |v: $ty| v as $bits,
            |b: $bits| b as $ty);)*
    };
}

atomic_primitive_int! {
    u8 => AtomicU8, u8;
    i8 => AtomicU8, u8;
    u16 => AtomicU16, u16;
    i16 => AtomicU16, u16;
    u32 => AtomicU32, u32;
    i32 => AtomicU32, u32;
    u64 => AtomicU64, u64;
    i64 => AtomicU64, u64;
    usize => AtomicUsize, usize;
    isize => AtomicUsize, usize;
}

atomic_primitive!(f32, AtomicU32, u32, |v: f32| v.to_bits(), f32::from_bits);
atomic_primitive!(f64, AtomicU64, u64, |v: f64| v.to_bits(), f64::from_bits);
atomic_primitive!(bool, AtomicU8, u8, |v: bool| v as u8, |b: u8| b != 0);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fold_atomic_sum() {
        let cell = SyncCell::new(0.0f64);
        for _ in 0..100 {
            f64::fold_atomic(&cell, 1.5, None, |a, b| a + b);
        }
        assert_eq!(unsafe { cell.load() }, 150.0);
    }

    #[test]
    fn test_fold_atomic_concurrent() {
        let cell = SyncCell::new(0u64);
        let threads = 8;
        let per_thread = 10_000;
        std::thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for _ in 0..per_thread {
                        u64::fold_atomic(&cell, 1, None, |a, b| a.wrapping_add(b));
                    }
                });
            }
        });
        assert_eq!(unsafe { cell.load() }, (threads * per_thread) as u64);
    }

    #[test]
    fn test_terminal_stops_folding() {
        let cell = SyncCell::new(true);
        let folds = AtomicUsize::new(0);
        bool::fold_atomic(&cell, true, Some(true), |a, b| {
            folds.fetch_add(1, Ordering::Relaxed);
            a || b
        });
        // cell already terminal, so the fold closure never ran
        assert_eq!(folds.load(Ordering::Relaxed), 0);
        assert!(unsafe { cell.load() });
    }
}
