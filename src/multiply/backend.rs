//! Pluggable accelerated back-ends
//!
//! A back-end is offered a multiply before the built-in pipeline runs. It
//! inspects the call and either computes the product itself or declines
//! with [`Error::NotHandled`], in which case the engine falls through to
//! its own kernels. Declining is the normal case for calls a back-end
//! cannot express (a runtime semiring, say, or an unsupported format);
//! any other error aborts the call.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::matrix::mask::{Mask, MaskValue};
use crate::matrix::SparseMatrix;
use crate::multiply::{mxm, MultiplyOptions};
use crate::semiring::SemiringOps;

/// An external implementation of the multiply
pub trait Accelerator<S: SemiringOps, M: MaskValue>: Send + Sync {
    /// Back-end name, for diagnostics
    fn name(&self) -> &str;

    /// Attempts the multiply; return [`crate::Error::NotHandled`] to
    /// decline. On success the flag reports whether the mask was applied,
    /// with the same meaning as [`mxm`]'s.
    fn try_multiply(
        &self,
        a: &SparseMatrix<S::AVal>,
        b: &SparseMatrix<S::BVal>,
        mask: Option<Mask<'_, M>>,
        semiring: &S,
        options: &MultiplyOptions,
    ) -> Result<(SparseMatrix<S::CVal>, bool)>;
}

/// [`mxm`], but offered to `backend` first.
pub fn mxm_with_backend<S, M>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    mask: Option<Mask<'_, M>>,
    semiring: &S,
    options: &MultiplyOptions,
    config: &EngineConfig,
    backend: &dyn Accelerator<S, M>,
) -> Result<(SparseMatrix<S::CVal>, bool)>
where
    S: SemiringOps,
    M: MaskValue,
{
    match backend.try_multiply(a, b, mask, semiring, options) {
        Err(e) if e.is_not_handled() => {
            tracing::debug!(backend = backend.name(), "backend declined, using built-in kernels");
            mxm(a, b, mask, semiring, options, config)
        }
        handled => handled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::semiring::plus_times;

    struct Decliner;

    impl<S: SemiringOps, M: MaskValue> Accelerator<S, M> for Decliner {
        fn name(&self) -> &str {
            "decliner"
        }

        fn try_multiply(
            &self,
            _a: &SparseMatrix<S::AVal>,
            _b: &SparseMatrix<S::BVal>,
            _mask: Option<Mask<'_, M>>,
            _semiring: &S,
            _options: &MultiplyOptions,
        ) -> Result<(SparseMatrix<S::CVal>, bool)> {
            Err(Error::NotHandled)
        }
    }

    struct FixedAnswer;

    impl Accelerator<crate::semiring::Semiring<crate::semiring::PlusMonoid<f64>, crate::semiring::TimesOp<f64>>, bool>
        for FixedAnswer
    {
        fn name(&self) -> &str {
            "fixed"
        }

        fn try_multiply(
            &self,
            _a: &SparseMatrix<f64>,
            _b: &SparseMatrix<f64>,
            _mask: Option<Mask<'_, bool>>,
            _semiring: &crate::semiring::Semiring<
                crate::semiring::PlusMonoid<f64>,
                crate::semiring::TimesOp<f64>,
            >,
            _options: &MultiplyOptions,
        ) -> Result<(SparseMatrix<f64>, bool)> {
            Ok((SparseMatrix::from_entries(1, 1, vec![(0, 0, 42.0)]), false))
        }
    }

    #[test]
    fn test_declined_backend_falls_through() {
        let a = SparseMatrix::<f64>::identity(2);
        let b = SparseMatrix::from_entries(2, 2, vec![(0, 0, 3.0f64), (1, 1, 4.0)]);
        let (c, _) = mxm_with_backend(
            &a,
            &b,
            None::<Mask<'_, bool>>,
            &plus_times::<f64>(),
            &MultiplyOptions::default(),
            &EngineConfig::default(),
            &Decliner,
        )
        .unwrap();
        assert_eq!(c.to_triplets(), vec![(0, 0, 3.0), (1, 1, 4.0)]);
    }

    #[test]
    fn test_handled_backend_short_circuits() {
        let a = SparseMatrix::<f64>::identity(2);
        let b = SparseMatrix::<f64>::identity(2);
        let (c, applied) = mxm_with_backend(
            &a,
            &b,
            None,
            &plus_times::<f64>(),
            &MultiplyOptions::default(),
            &EngineConfig::default(),
            &FixedAnswer,
        )
        .unwrap();
        assert!(!applied);
        assert_eq!(c.to_triplets(), vec![(0, 0, 42.0)]);
    }
}
