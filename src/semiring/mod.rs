//! Semirings: monoids paired with multiply operators
//!
//! A semiring is an additive [`Monoid`] (associative, commutative, with an
//! identity and an optional terminal short-circuit value) paired with a
//! multiplicative [`BinaryOp`]. The multiply engine is generic over
//! [`SemiringOps`]; built-in semirings are zero-sized types whose operators
//! inline and monomorphize (the fast path), while
//! [`runtime::RuntimeSemiring`] routes user-defined operators through
//! indirect calls (the generic fallback path). Both flow through the same
//! kernels, so no per-semiring source duplication exists.

pub mod atomic;
pub mod builtin;
pub mod runtime;

pub use atomic::{AtomicPrimitive, SyncCell};
pub use builtin::{
    any_pair, max_times, min_plus, or_and, plus_times, AnyMonoid, FirstOp, LAndMonoid, LOrMonoid,
    MaxMonoid, MinMonoid, PairOp, PlusMonoid, PlusOp, SecondOp, TimesOp,
};
pub use runtime::RuntimeSemiring;

/// An associative, commutative binary operator with an identity element
///
/// Optionally declares a terminal value: once an accumulator reaches it, no
/// further folds can change it, so accumulation loops may stop early.
pub trait Monoid: Send + Sync {
    /// The value type folded by this monoid
    type Z: Copy + PartialEq + Send + Sync;

    /// The identity element
    fn identity(&self) -> Self::Z;

    /// Folds `z` into `acc`
    fn fold(&self, acc: Self::Z, z: Self::Z) -> Self::Z;

    /// Terminal (short-circuit) value, if any
    fn terminal(&self) -> Option<Self::Z> {
        None
    }

    /// True for the ANY monoid: any contributing value is acceptable, so
    /// the first writer wins and no arithmetic is performed.
    fn is_any(&self) -> bool {
        false
    }

    /// True if [`Monoid::fold_atomic`] is backed by a hardware atomic of
    /// the value's width, allowing concurrent folds into shared cells.
    fn atomic_capable(&self) -> bool {
        false
    }

    /// Folds `z` into a shared cell with a compare-and-swap loop.
    ///
    /// Only called when [`Monoid::atomic_capable`] returns true.
    fn fold_atomic(&self, cell: &SyncCell<Self::Z>, z: Self::Z) {
        let _ = (cell, z);
        debug_assert!(false, "fold_atomic called on a non-atomic monoid");
    }
}

/// A binary multiply operator `z = f(x, y)`
pub trait BinaryOp: Send + Sync {
    /// Left operand type (from A)
    type X: Copy + Send + Sync;
    /// Right operand type (from B)
    type Y: Copy + Send + Sync;
    /// Result type
    type Z: Copy + Send + Sync;

    /// Applies the operator
    fn apply(&self, x: Self::X, y: Self::Y) -> Self::Z;

    /// Applies the operator with its operand roles flipped, `z = f(y, x)`.
    ///
    /// The default forwards to [`BinaryOp::apply`], which is correct for
    /// commutative operators; non-commutative operators over one type
    /// override it.
    fn apply_flipped(&self, x: Self::X, y: Self::Y) -> Self::Z {
        self.apply(x, y)
    }

    /// The constant result of an operator that never depends on its operand
    /// values (PAIR-like operators), `None` otherwise. Paired with the ANY
    /// monoid this lets the engine skip the value workspace entirely.
    fn constant_value(&self) -> Option<Self::Z> {
        None
    }
}

/// A monoid paired with a multiply operator
#[derive(Clone, Copy, Debug, Default)]
pub struct Semiring<M, F> {
    /// The additive monoid
    pub add: M,
    /// The multiplicative operator
    pub multiply: F,
}

impl<M, F> Semiring<M, F> {
    /// Pairs a monoid with a multiply operator
    pub fn new(add: M, multiply: F) -> Self {
        Self { add, multiply }
    }
}

/// The capability interface the multiply kernels consume
///
/// Implemented by [`Semiring`] for any compatible monoid/operator pair and
/// by [`RuntimeSemiring`] for operators supplied at runtime.
pub trait SemiringOps: Send + Sync {
    /// Element type of A
    type AVal: Copy + Send + Sync;
    /// Element type of B
    type BVal: Copy + Send + Sync;
    /// Element type of C (the monoid's value type)
    type CVal: Copy + PartialEq + Send + Sync;

    /// `z = multiply(a, b)`
    fn multiply(&self, a: Self::AVal, b: Self::BVal) -> Self::CVal;

    /// `z = multiply(b, a)`, for the operand-flip option
    fn multiply_flipped(&self, a: Self::AVal, b: Self::BVal) -> Self::CVal;

    /// Monoid fold
    fn fold(&self, acc: Self::CVal, z: Self::CVal) -> Self::CVal;

    /// Monoid identity
    fn identity(&self) -> Self::CVal;

    /// Monoid terminal value, if any
    fn terminal(&self) -> Option<Self::CVal>;

    /// True for the ANY monoid
    fn monoid_is_any(&self) -> bool;

    /// True if concurrent folds may use [`SemiringOps::fold_atomic`]
    fn monoid_atomic(&self) -> bool;

    /// Concurrent fold into a shared cell; see [`Monoid::fold_atomic`]
    fn fold_atomic(&self, cell: &SyncCell<Self::CVal>, z: Self::CVal);

    /// The constant multiply result of a value-ignoring operator, if any
    fn constant_multiply_value(&self) -> Option<Self::CVal>;

    /// True for the any-pair semiring, which needs no value workspace: the
    /// pattern alone determines C, and every value is the pair constant.
    fn is_any_pair(&self) -> bool {
        self.monoid_is_any() && self.constant_multiply_value().is_some()
    }
}

impl<M, F> SemiringOps for Semiring<M, F>
where
    M: Monoid,
    F: BinaryOp<Z = M::Z>,
{
    type AVal = F::X;
    type BVal = F::Y;
    type CVal = M::Z;

    #[inline]
    fn multiply(&self, a: Self::AVal, b: Self::BVal) -> Self::CVal {
        self.multiply.apply(a, b)
    }

    #[inline]
    fn multiply_flipped(&self, a: Self::AVal, b: Self::BVal) -> Self::CVal {
        self.multiply.apply_flipped(a, b)
    }

    #[inline]
    fn fold(&self, acc: Self::CVal, z: Self::CVal) -> Self::CVal {
        self.add.fold(acc, z)
    }

    #[inline]
    fn identity(&self) -> Self::CVal {
        self.add.identity()
    }

    fn terminal(&self) -> Option<Self::CVal> {
        self.add.terminal()
    }

    fn monoid_is_any(&self) -> bool {
        self.add.is_any()
    }

    fn monoid_atomic(&self) -> bool {
        self.add.atomic_capable()
    }

    #[inline]
    fn fold_atomic(&self, cell: &SyncCell<Self::CVal>, z: Self::CVal) {
        self.add.fold_atomic(cell, z)
    }

    fn constant_multiply_value(&self) -> Option<Self::CVal> {
        self.multiply.constant_value()
    }
}
