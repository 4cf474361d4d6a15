//! Semirings assembled from user-supplied operators at runtime
//!
//! A [`RuntimeSemiring`] carries its multiply and fold operators as boxed
//! closures, so user-defined types and operators run through the same
//! multiply kernels as the built-ins, paying an indirect call per operation
//! instead of monomorphized inlining. Runtime monoids are never
//! atomic-capable; fine-task teams folding a runtime monoid serialize
//! through a per-team lock.

use std::sync::Arc;

use super::atomic::SyncCell;
use super::SemiringOps;

type MulFn<A, B, C> = Arc<dyn Fn(A, B) -> C + Send + Sync>;
type FoldFn<C> = Arc<dyn Fn(C, C) -> C + Send + Sync>;

/// A semiring whose operators are invoked through indirect calls
#[derive(Clone)]
pub struct RuntimeSemiring<A, B, C> {
    multiply: MulFn<A, B, C>,
    multiply_flipped: Option<MulFn<A, B, C>>,
    fold: FoldFn<C>,
    identity: C,
    terminal: Option<C>,
    is_any: bool,
    constant: Option<C>,
}

impl<A, B, C> RuntimeSemiring<A, B, C>
where
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
    C: Copy + PartialEq + Send + Sync,
{
    /// Builds a semiring from a multiply closure, a fold closure, and the
    /// monoid identity
    pub fn new(
        multiply: impl Fn(A, B) -> C + Send + Sync + 'static,
        fold: impl Fn(C, C) -> C + Send + Sync + 'static,
        identity: C,
    ) -> Self {
        Self {
            multiply: Arc::new(multiply),
            multiply_flipped: None,
            fold: Arc::new(fold),
            identity,
            terminal: None,
            is_any: false,
            constant: None,
        }
    }

    /// Supplies the operand-flipped multiply, `z = f(y, x)`.
    ///
    /// Without it the flip option reuses the unflipped operator, which is
    /// only correct for commutative multiplies.
    pub fn with_flipped(
        mut self,
        multiply_flipped: impl Fn(A, B) -> C + Send + Sync + 'static,
    ) -> Self {
        self.multiply_flipped = Some(Arc::new(multiply_flipped));
        self
    }

    /// Declares a terminal value for the monoid
    pub fn with_terminal(mut self, terminal: C) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Marks the monoid as ANY (first contribution wins)
    pub fn with_any_monoid(mut self) -> Self {
        self.is_any = true;
        self
    }

    /// Declares the multiply value-ignoring with the given constant result.
    ///
    /// Combined with [`RuntimeSemiring::with_any_monoid`] this makes the
    /// semiring pattern-only; the engine skips the value workspace.
    pub fn with_constant_multiply(mut self, constant: C) -> Self {
        self.constant = Some(constant);
        self
    }
}

impl<A, B, C> SemiringOps for RuntimeSemiring<A, B, C>
where
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
    C: Copy + PartialEq + Send + Sync,
{
    type AVal = A;
    type BVal = B;
    type CVal = C;

    #[inline]
    fn multiply(&self, a: A, b: B) -> C {
        (self.multiply)(a, b)
    }

    #[inline]
    fn multiply_flipped(&self, a: A, b: B) -> C {
        match &self.multiply_flipped {
            Some(f) => f(a, b),
            None => (self.multiply)(a, b),
        }
    }

    #[inline]
    fn fold(&self, acc: C, z: C) -> C {
        (self.fold)(acc, z)
    }

    fn identity(&self) -> C {
        self.identity
    }

    fn terminal(&self) -> Option<C> {
        self.terminal
    }

    fn monoid_is_any(&self) -> bool {
        self.is_any
    }

    fn monoid_atomic(&self) -> bool {
        false
    }

    fn fold_atomic(&self, _cell: &SyncCell<C>, _z: C) {
        debug_assert!(false, "runtime monoids fold under the team lock");
    }

    fn constant_multiply_value(&self) -> Option<C> {
        self.constant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_semiring_ops() {
        let s = RuntimeSemiring::new(|a: i32, b: i32| a * b, |acc, z| acc + z, 0);
        assert_eq!(s.multiply(6, 7), 42);
        assert_eq!(s.fold(1, 42), 43);
        assert_eq!(s.identity(), 0);
        assert!(!s.monoid_atomic());
    }

    #[test]
    fn test_flipped_falls_back_when_unset() {
        let s = RuntimeSemiring::new(|a: i32, b: i32| a - b, |acc, z| acc + z, 0)
            .with_flipped(|a, b| b - a);
        assert_eq!(s.multiply(10, 3), 7);
        assert_eq!(s.multiply_flipped(10, 3), -7);

        let plain = RuntimeSemiring::new(|a: i32, b: i32| a - b, |acc, z| acc + z, 0);
        assert_eq!(plain.multiply_flipped(10, 3), 7);
    }

    #[test]
    fn test_terminal_and_any() {
        let s = RuntimeSemiring::new(|a: bool, b: bool| a && b, |acc, z| acc || z, false)
            .with_terminal(true);
        assert_eq!(s.terminal(), Some(true));
        let any = RuntimeSemiring::new(|a: u8, _b: u8| a, |acc, _z| acc, 0).with_any_monoid();
        assert!(any.monoid_is_any());
        assert!(!any.is_any_pair());
    }

    #[test]
    fn test_constant_multiply_makes_any_pair() {
        let s = RuntimeSemiring::new(|_a: f32, _b: f32| 1.0f32, |acc, _z| acc, 0.0)
            .with_any_monoid()
            .with_constant_multiply(1.0);
        assert!(s.is_any_pair());
        assert_eq!(s.constant_multiply_value(), Some(1.0));
    }
}
