//! Built-in monoids, multiply operators, and named semirings
//!
//! These are all zero-sized marker types; pairing one with a kernel
//! monomorphizes the inner loops with the operators inlined, which is the
//! statically-specialized performance path. The numeric monoids over
//! primitive types are atomic-capable, so fine-task teams can fold into
//! shared cells without locking.

use std::marker::PhantomData;
use std::ops::{Add, Mul};

use num_traits::{Bounded, One, Zero};

use super::atomic::{AtomicPrimitive, SyncCell};
use super::{BinaryOp, Monoid, Semiring};

// ============================================================================
// MONOIDS
// ============================================================================

/// Additive monoid: identity 0, fold is `+`
#[derive(Clone, Copy, Debug, Default)]
pub struct PlusMonoid<T>(PhantomData<T>);

impl<T> Monoid for PlusMonoid<T>
where
    T: Copy + PartialEq + Send + Sync + Zero + Add<Output = T> + AtomicPrimitive,
{
    type Z = T;

    #[inline]
    fn identity(&self) -> T {
        T::zero()
    }

    #[inline]
    fn fold(&self, acc: T, z: T) -> T {
        acc + z
    }

    fn atomic_capable(&self) -> bool {
        true
    }

    #[inline]
    fn fold_atomic(&self, cell: &SyncCell<T>, z: T) {
        T::fold_atomic(cell, z, None, |a, b| a + b);
    }
}

/// Minimum monoid: identity is the type's maximum, terminal its minimum
#[derive(Clone, Copy, Debug, Default)]
pub struct MinMonoid<T>(PhantomData<T>);

impl<T> Monoid for MinMonoid<T>
where
    T: Copy + PartialEq + PartialOrd + Send + Sync + Bounded + AtomicPrimitive,
{
    type Z = T;

    #[inline]
    fn identity(&self) -> T {
        T::max_value()
    }

    #[inline]
    fn fold(&self, acc: T, z: T) -> T {
        if z < acc {
            z
        } else {
            acc
        }
    }

    fn terminal(&self) -> Option<T> {
        Some(T::min_value())
    }

    fn atomic_capable(&self) -> bool {
        true
    }

    #[inline]
    fn fold_atomic(&self, cell: &SyncCell<T>, z: T) {
        T::fold_atomic(cell, z, self.terminal(), |a, b| if b < a { b } else { a });
    }
}

/// Maximum monoid: identity is the type's minimum, terminal its maximum
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxMonoid<T>(PhantomData<T>);

impl<T> Monoid for MaxMonoid<T>
where
    T: Copy + PartialEq + PartialOrd + Send + Sync + Bounded + AtomicPrimitive,
{
    type Z = T;

    #[inline]
    fn identity(&self) -> T {
        T::min_value()
    }

    #[inline]
    fn fold(&self, acc: T, z: T) -> T {
        if z > acc {
            z
        } else {
            acc
        }
    }

    fn terminal(&self) -> Option<T> {
        Some(T::max_value())
    }

    fn atomic_capable(&self) -> bool {
        true
    }

    #[inline]
    fn fold_atomic(&self, cell: &SyncCell<T>, z: T) {
        T::fold_atomic(cell, z, self.terminal(), |a, b| if b > a { b } else { a });
    }
}

/// Logical-or monoid: identity false, terminal true
#[derive(Clone, Copy, Debug, Default)]
pub struct LOrMonoid;

impl Monoid for LOrMonoid {
    type Z = bool;

    #[inline]
    fn identity(&self) -> bool {
        false
    }

    #[inline]
    fn fold(&self, acc: bool, z: bool) -> bool {
        acc || z
    }

    fn terminal(&self) -> Option<bool> {
        Some(true)
    }

    fn atomic_capable(&self) -> bool {
        true
    }

    #[inline]
    fn fold_atomic(&self, cell: &SyncCell<bool>, z: bool) {
        bool::fold_atomic(cell, z, Some(true), |a, b| a || b);
    }
}

/// Logical-and monoid: identity true, terminal false
#[derive(Clone, Copy, Debug, Default)]
pub struct LAndMonoid;

impl Monoid for LAndMonoid {
    type Z = bool;

    #[inline]
    fn identity(&self) -> bool {
        true
    }

    #[inline]
    fn fold(&self, acc: bool, z: bool) -> bool {
        acc && z
    }

    fn terminal(&self) -> Option<bool> {
        Some(false)
    }

    fn atomic_capable(&self) -> bool {
        true
    }

    #[inline]
    fn fold_atomic(&self, cell: &SyncCell<bool>, z: bool) {
        bool::fold_atomic(cell, z, Some(false), |a, b| a && b);
    }
}

/// ANY monoid: keeps whichever contribution arrived first
///
/// No arithmetic is performed; correctness only requires that some
/// contributing value is kept, so the engine may use a flag-only write.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyMonoid<T>(PhantomData<T>);

impl<T> Monoid for AnyMonoid<T>
where
    T: Copy + PartialEq + Send + Sync + Default,
{
    type Z = T;

    #[inline]
    fn identity(&self) -> T {
        T::default()
    }

    #[inline]
    fn fold(&self, acc: T, _z: T) -> T {
        acc
    }

    fn is_any(&self) -> bool {
        true
    }
}

// ============================================================================
// MULTIPLY OPERATORS
// ============================================================================

/// `z = x * y`
#[derive(Clone, Copy, Debug, Default)]
pub struct TimesOp<T>(PhantomData<T>);

impl<T: Copy + Send + Sync + Mul<Output = T>> BinaryOp for TimesOp<T> {
    type X = T;
    type Y = T;
    type Z = T;

    #[inline]
    fn apply(&self, x: T, y: T) -> T {
        x * y
    }
}

/// `z = x + y`
#[derive(Clone, Copy, Debug, Default)]
pub struct PlusOp<T>(PhantomData<T>);

impl<T: Copy + Send + Sync + Add<Output = T>> BinaryOp for PlusOp<T> {
    type X = T;
    type Y = T;
    type Z = T;

    #[inline]
    fn apply(&self, x: T, y: T) -> T {
        x + y
    }
}

/// `z = x` (the A operand)
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstOp<T>(PhantomData<T>);

impl<T: Copy + Send + Sync> BinaryOp for FirstOp<T> {
    type X = T;
    type Y = T;
    type Z = T;

    #[inline]
    fn apply(&self, x: T, _y: T) -> T {
        x
    }

    #[inline]
    fn apply_flipped(&self, _x: T, y: T) -> T {
        y
    }
}

/// `z = y` (the B operand)
#[derive(Clone, Copy, Debug, Default)]
pub struct SecondOp<T>(PhantomData<T>);

impl<T: Copy + Send + Sync> BinaryOp for SecondOp<T> {
    type X = T;
    type Y = T;
    type Z = T;

    #[inline]
    fn apply(&self, _x: T, y: T) -> T {
        y
    }

    #[inline]
    fn apply_flipped(&self, x: T, _y: T) -> T {
        x
    }
}

/// `z = 1` regardless of operands
#[derive(Clone, Copy, Debug, Default)]
pub struct PairOp<T>(PhantomData<T>);

impl<T: Copy + Send + Sync + One> BinaryOp for PairOp<T> {
    type X = T;
    type Y = T;
    type Z = T;

    #[inline]
    fn apply(&self, _x: T, _y: T) -> T {
        T::one()
    }

    fn constant_value(&self) -> Option<T> {
        Some(T::one())
    }
}

// ============================================================================
// NAMED SEMIRINGS
// ============================================================================

/// The conventional arithmetic semiring `(+, *)`
pub fn plus_times<T>() -> Semiring<PlusMonoid<T>, TimesOp<T>> {
    Semiring::new(PlusMonoid(PhantomData), TimesOp(PhantomData))
}

/// The tropical shortest-path semiring `(min, +)`
pub fn min_plus<T>() -> Semiring<MinMonoid<T>, PlusOp<T>> {
    Semiring::new(MinMonoid(PhantomData), PlusOp(PhantomData))
}

/// The `(max, *)` semiring
pub fn max_times<T>() -> Semiring<MaxMonoid<T>, TimesOp<T>> {
    Semiring::new(MaxMonoid(PhantomData), TimesOp(PhantomData))
}

/// The boolean reachability semiring `(or, and)`
pub fn or_and() -> Semiring<LOrMonoid, LAndOp> {
    Semiring::new(LOrMonoid, LAndOp)
}

/// The structural semiring `(any, pair)`: presence only, no values
pub fn any_pair<T: Copy + PartialEq + Send + Sync + Default + One>(
) -> Semiring<AnyMonoid<T>, PairOp<T>> {
    Semiring::new(AnyMonoid(PhantomData), PairOp(PhantomData))
}

/// `z = x && y`
#[derive(Clone, Copy, Debug, Default)]
pub struct LAndOp;

impl BinaryOp for LAndOp {
    type X = bool;
    type Y = bool;
    type Z = bool;

    #[inline]
    fn apply(&self, x: bool, y: bool) -> bool {
        x && y
    }
}
