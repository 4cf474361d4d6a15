//! End-to-end correctness of the multiply engine against the reference

use proptest::prelude::*;

use saxpyr::{
    any_pair, min_plus, mxm, or_and, plus_times, reference_multiply, AlgorithmHint,
    EngineConfig, Mask, MultiplyOptions, RuntimeSemiring, SemiringOps, SparseMatrix,
};

/// Small deterministic generator so tests are reproducible without a rand
/// dependency. Values are small integers, which keeps floating-point sums
/// exact and independent of accumulation order.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn random_sparse(n_rows: usize, n_cols: usize, percent: u64, seed: u64) -> SparseMatrix<f64> {
    let mut rng = XorShift(seed | 1);
    let mut entries = Vec::new();
    for j in 0..n_cols {
        for i in 0..n_rows {
            if rng.next() % 100 < percent {
                entries.push((i, j, (rng.next() % 9 + 1) as f64));
            }
        }
    }
    SparseMatrix::from_entries(n_rows, n_cols, entries)
}

fn check_against_reference<S>(
    a: &SparseMatrix<S::AVal>,
    b: &SparseMatrix<S::BVal>,
    semiring: &S,
) where
    S: SemiringOps,
    S::CVal: std::fmt::Debug,
{
    let expected = reference_multiply(a, b, None::<Mask<'_, bool>>, semiring, false);
    for hint in [
        AlgorithmHint::Default,
        AlgorithmHint::ForceGustavson,
        AlgorithmHint::ForceHash,
    ] {
        for threads in [1, 2, 8] {
            let options = MultiplyOptions { hint, ..Default::default() };
            let mut config = EngineConfig::with_threads(threads);
            // force multi-task scheduling even for small test inputs
            config.chunk = 1.0;
            let (c, applied) =
                mxm(a, b, None::<Mask<'_, bool>>, semiring, &options, &config).unwrap();
            assert!(!applied);
            assert_eq!(
                c.to_triplets(),
                expected.to_triplets(),
                "hint {hint:?}, {threads} threads"
            );
        }
    }
}

#[test]
fn test_plus_times_matches_reference() {
    let a = random_sparse(60, 50, 12, 0xfeed);
    let b = random_sparse(50, 40, 15, 0xbeef);
    check_against_reference(&a, &b, &plus_times::<f64>());
}

#[test]
fn test_sparse_outputs_with_empty_columns() {
    let a = random_sparse(30, 30, 5, 7);
    let b = random_sparse(30, 25, 4, 11);
    check_against_reference(&a, &b, &plus_times::<f64>());
}

#[test]
fn test_min_plus_terminal_short_circuit() {
    // integer tropical semiring; MIN's terminal is i64::MIN, never reached
    let af = random_sparse(40, 40, 10, 21);
    let bf = random_sparse(40, 40, 10, 22);
    let a = SparseMatrix::from_entries(
        40,
        40,
        af.to_triplets().into_iter().map(|(i, j, v)| (i, j, v as i64)).collect(),
    );
    let b = SparseMatrix::from_entries(
        40,
        40,
        bf.to_triplets().into_iter().map(|(i, j, v)| (i, j, v as i64)).collect(),
    );
    check_against_reference(&a, &b, &min_plus::<i64>());
}

#[test]
fn test_or_and_reachability() {
    let af = random_sparse(35, 35, 8, 31);
    let a = SparseMatrix::from_entries(
        35,
        35,
        af.to_triplets().into_iter().map(|(i, j, _)| (i, j, true)).collect(),
    );
    check_against_reference(&a, &a, &or_and());
}

#[test]
fn test_any_pair_pattern() {
    let af = random_sparse(45, 45, 10, 41);
    let a = SparseMatrix::from_entries(
        45,
        45,
        af.to_triplets().into_iter().map(|(i, j, v)| (i, j, v as u8)).collect(),
    );
    check_against_reference(&a, &a, &any_pair::<u8>());
}

#[test]
fn test_runtime_semiring_max_plus() {
    let a = random_sparse(30, 30, 10, 51);
    let b = random_sparse(30, 30, 10, 52);
    let s = RuntimeSemiring::new(|x: f64, y: f64| x + y, f64::max, f64::NEG_INFINITY);
    check_against_reference(&a, &b, &s);
}

#[test]
fn test_flipped_multiply() {
    let a = random_sparse(25, 25, 12, 61);
    let b = random_sparse(25, 25, 12, 62);
    // subtraction is order-sensitive, so the flip is observable
    let s = RuntimeSemiring::new(|x: f64, y: f64| x - 2.0 * y, |acc, z| acc + z, 0.0)
        .with_flipped(|x, y| y - 2.0 * x);

    let expected = reference_multiply(&a, &b, None::<Mask<'_, bool>>, &s, true);
    let options = MultiplyOptions { flip: true, ..Default::default() };
    let (c, _) = mxm(
        &a,
        &b,
        None::<Mask<'_, bool>>,
        &s,
        &options,
        &EngineConfig::with_threads(4),
    )
    .unwrap();
    assert_eq!(c.to_triplets(), expected.to_triplets());
}

#[test]
fn test_all_input_formats() {
    let a = random_sparse(30, 30, 15, 71);
    let b = random_sparse(30, 20, 15, 72);
    let s = plus_times::<f64>();
    let expected = reference_multiply(&a, &b, None::<Mask<'_, bool>>, &s, false);

    let a_variants = [a.clone(), a.to_hypersparse(), a.to_bitmap()];
    let b_variants = [b.clone(), b.to_hypersparse(), b.to_bitmap()];
    for av in &a_variants {
        for bv in &b_variants {
            let (c, _) = mxm(
                av,
                bv,
                None::<Mask<'_, bool>>,
                &s,
                &MultiplyOptions::default(),
                &EngineConfig::with_threads(2),
            )
            .unwrap();
            assert_eq!(
                c.to_triplets(),
                expected.to_triplets(),
                "formats {:?} x {:?}",
                av.format(),
                bv.format()
            );
        }
    }
}

#[test]
fn test_single_column_output() {
    // B with one column exercises the single fine task path
    let a = random_sparse(50, 50, 20, 81);
    let b = random_sparse(50, 1, 60, 82);
    check_against_reference(&a, &b, &plus_times::<f64>());
}

#[test]
fn test_empty_operands() {
    let a = SparseMatrix::<f64>::zeros(10, 8);
    let b = SparseMatrix::<f64>::zeros(8, 6);
    let (c, _) = mxm(
        &a,
        &b,
        None::<Mask<'_, bool>>,
        &plus_times::<f64>(),
        &MultiplyOptions::default(),
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(c.n_rows, 10);
    assert_eq!(c.n_cols, 6);
    assert_eq!(c.nnz(), 0);
}

#[test]
fn test_output_sorts_clean() {
    let a = random_sparse(40, 40, 15, 91);
    let (mut c, _) = mxm(
        &a,
        &a,
        None::<Mask<'_, bool>>,
        &plus_times::<f64>(),
        &MultiplyOptions { hint: AlgorithmHint::ForceHash, ..Default::default() },
        &EngineConfig::with_threads(4),
    )
    .unwrap();
    c.sort_entries();
    assert!(!c.is_jumbled());
    // a sorted result can be reused as an input
    let (_, _) = mxm(
        &c,
        &a,
        None::<Mask<'_, bool>>,
        &plus_times::<f64>(),
        &MultiplyOptions::default(),
        &EngineConfig::default(),
    )
    .unwrap();
}

#[test]
fn test_max_times_with_diagonal() {
    // diag(2,3,5) against an identity pattern with one extra entry
    let a = SparseMatrix::from_entries(3, 3, vec![(0, 0, 2.0f64), (1, 1, 3.0), (2, 2, 5.0)]);
    let b = SparseMatrix::from_entries(
        3,
        3,
        vec![(0, 0, 1.0f64), (1, 0, 4.0), (1, 1, 1.0), (2, 2, 1.0)],
    );
    let s = saxpyr::max_times::<f64>();
    let (c, _) = mxm(
        &a,
        &b,
        None::<Mask<'_, bool>>,
        &s,
        &MultiplyOptions::default(),
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(
        c.to_triplets(),
        vec![(0, 0, 2.0), (1, 0, 12.0), (1, 1, 3.0), (2, 2, 5.0)]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_matches_reference(
        seed_a in 1u64..u64::MAX,
        seed_b in 1u64..u64::MAX,
        n in 1usize..40,
        k in 1usize..40,
        m in 1usize..40,
        pct in 0u64..30,
        threads in 1usize..5,
    ) {
        let a = random_sparse(n, k, pct, seed_a);
        let b = random_sparse(k, m, pct, seed_b);
        let s = plus_times::<f64>();
        let expected = reference_multiply(&a, &b, None::<Mask<'_, bool>>, &s, false);
        let mut config = EngineConfig::with_threads(threads);
        config.chunk = 1.0;
        let (c, _) = mxm(
            &a,
            &b,
            None::<Mask<'_, bool>>,
            &s,
            &MultiplyOptions::default(),
            &config,
        ).unwrap();
        prop_assert_eq!(c.to_triplets(), expected.to_triplets());
    }
}
